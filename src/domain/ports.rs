use super::catalog::CourseListing;
use super::enrollment::{Enrollment, ProgressRecord};
use super::order::{Currency, Order, OrderId, OrderStatus};
use super::payment::{GatewayPayment, Payment};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<T> {
    /// The record was written by this call.
    Created(T),
    /// A record with the same key already existed; it is returned unchanged.
    Existing(T),
}

impl<T> Insert<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(value) | Self::Existing(value) => value,
        }
    }
}

/// Outcome of a compare-and-set on an order's status.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Applied(Order),
    /// The stored status was not the expected one; carries the current order.
    Conflict(Order),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order. Order ids are unique.
    async fn insert(&self, order: Order) -> Result<Insert<Order>>;
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>>;
    /// Moves the order from `expected` to `next` only if its stored status is
    /// still `expected`. Fails with `OrderNotFound` for unknown ids.
    async fn update_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate>;
    /// Orders in `created` or `payment_pending`.
    async fn open_orders(&self) -> Result<Vec<Order>>;
}

/// Outcome of recording a payment against its order.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// The payment was stored and the order moved to `captured` by this call.
    Recorded { order: Order, payment: Payment },
    /// The order already has a payment; both are returned as stored.
    Existing { order: Order, payment: Payment },
    /// The order is no longer `payment_pending`. Nothing was written.
    Rejected(Order),
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Stores `payment` and moves its order from `payment_pending` to
    /// `captured` as one atomic write. At most one payment is ever stored per
    /// order, and only for an order that ends up captured. Fails with
    /// `OrderNotFound` for unknown orders.
    async fn capture(&self, payment: Payment) -> Result<Capture>;
    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Atomically creates the enrollment together with an empty progress
    /// record, unless the (user, course) pair is already enrolled.
    async fn insert(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>>;
    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<Enrollment>>;
    async fn get_all(&self) -> Result<Vec<Enrollment>>;
    async fn progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>>;
    /// Applies `update` to the progress record of an enrolled pair as a single
    /// read-modify-write. Returns `None` when the pair is not enrolled.
    async fn update_progress(
        &self,
        user_id: &str,
        course_id: &str,
        update: ProgressUpdate,
    ) -> Result<Option<ProgressRecord>>;
}

/// Mutation applied to a progress record inside the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    MarkViewed {
        lecture_id: String,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
}

impl ProgressUpdate {
    pub fn apply(&self, record: &mut ProgressRecord) {
        match self {
            Self::MarkViewed { lecture_id, at } => {
                record.mark_viewed(lecture_id, *at);
            }
            Self::Reset { at } => record.reset(*at),
        }
    }
}

/// Read-only course information owned by the catalog service.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn course(&self, course_id: &str) -> Result<Option<CourseListing>>;
}

/// The external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers an order with the gateway and returns its reference.
    async fn create_order(
        &self,
        receipt: &OrderId,
        amount: Decimal,
        currency: &Currency,
    ) -> Result<String>;
    /// Looks up a payment the gateway has recorded.
    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type EnrollmentStoreRef = Arc<dyn EnrollmentStore>;
pub type CatalogRef = Arc<dyn Catalog>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
