use crate::domain::catalog::CourseListing;
use crate::domain::enrollment::{Enrollment, ProgressRecord};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::{
    Capture, Catalog, EnrollmentStore, Insert, OrderStore, PaymentStore, ProgressUpdate,
    StatusUpdate,
};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct OrderTables {
    orders: HashMap<OrderId, Order>,
    payments: HashMap<OrderId, Payment>,
}

/// A thread-safe in-memory store for orders and their payments.
///
/// Both tables sit behind one `Arc<RwLock<_>>`, so clones share the same
/// data. Status updates and captures happen under the write lock, which makes
/// them compare-and-set, and a payment is only ever stored together with its
/// order's move to `captured`.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<OrderTables>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Insert<Order>> {
        let mut tables = self.tables.write().await;
        match tables.orders.entry(order.order_id) {
            Entry::Occupied(existing) => Ok(Insert::Existing(existing.get().clone())),
            Entry::Vacant(slot) => Ok(Insert::Created(slot.insert(order).clone())),
        }
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(order_id).cloned())
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(order_id)
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        if order.status != expected {
            return Ok(StatusUpdate::Conflict(order.clone()));
        }
        order.transition(next, at)?;
        Ok(StatusUpdate::Applied(order.clone()))
    }

    async fn open_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|order| !order.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentStore for InMemoryOrderStore {
    async fn capture(&self, payment: Payment) -> Result<Capture> {
        let mut tables = self.tables.write().await;
        let OrderTables { orders, payments } = &mut *tables;
        let order = orders
            .get_mut(&payment.order_id)
            .ok_or_else(|| LedgerError::OrderNotFound(payment.order_id.to_string()))?;
        if let Some(existing) = payments.get(&payment.order_id) {
            return Ok(Capture::Existing {
                order: order.clone(),
                payment: existing.clone(),
            });
        }
        if order.status != OrderStatus::PaymentPending {
            return Ok(Capture::Rejected(order.clone()));
        }
        order.transition(OrderStatus::Captured, payment.captured_at)?;
        payments.insert(payment.order_id, payment.clone());
        Ok(Capture::Recorded {
            order: order.clone(),
            payment,
        })
    }

    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(order_id).cloned())
    }
}

type EnrollmentKey = (String, String);

#[derive(Default)]
struct EnrollmentTables {
    enrollments: HashMap<EnrollmentKey, Enrollment>,
    progress: HashMap<EnrollmentKey, ProgressRecord>,
}

/// A thread-safe in-memory store for enrollments and their progress records.
///
/// Both tables sit behind one lock so an enrollment and its progress record
/// are always created together.
#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    tables: Arc<RwLock<EnrollmentTables>>,
}

impl InMemoryEnrollmentStore {
    /// Creates a new, empty in-memory enrollment store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(user_id: &str, course_id: &str) -> EnrollmentKey {
    (user_id.to_string(), course_id.to_string())
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn insert(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>> {
        let mut tables = self.tables.write().await;
        let key = key(&enrollment.user_id, &enrollment.course_id);
        if let Some(existing) = tables.enrollments.get(&key) {
            return Ok(Insert::Existing(existing.clone()));
        }
        tables
            .progress
            .insert(key.clone(), ProgressRecord::empty(&enrollment));
        tables.enrollments.insert(key, enrollment.clone());
        Ok(Insert::Created(enrollment))
    }

    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.get(&key(user_id, course_id)).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.values().cloned().collect())
    }

    async fn progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.progress.get(&key(user_id, course_id)).cloned())
    }

    async fn update_progress(
        &self,
        user_id: &str,
        course_id: &str,
        update: ProgressUpdate,
    ) -> Result<Option<ProgressRecord>> {
        let mut tables = self.tables.write().await;
        let key = key(user_id, course_id);
        let Some(enrollment) = tables.enrollments.get(&key).cloned() else {
            return Ok(None);
        };
        let record = tables
            .progress
            .entry(key)
            .or_insert_with(|| ProgressRecord::empty(&enrollment));
        update.apply(record);
        Ok(Some(record.clone()))
    }
}

/// Catalog held in memory, typically loaded from a CSV file at startup.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    courses: Arc<HashMap<String, CourseListing>>,
}

impl InMemoryCatalog {
    pub fn new(listings: impl IntoIterator<Item = CourseListing>) -> Self {
        let courses = listings
            .into_iter()
            .map(|listing| (listing.course_id.clone(), listing))
            .collect();
        Self {
            courses: Arc::new(courses),
        }
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn course(&self, course_id: &str) -> Result<Option<CourseListing>> {
        Ok(self.courses.get(course_id).cloned())
    }
}
