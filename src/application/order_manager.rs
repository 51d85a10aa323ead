use super::enrollment::EnrollmentActivator;
use crate::domain::enrollment::Enrollment;
use crate::domain::order::{Currency, Order, OrderId, OrderStatus};
use crate::domain::payment::{GatewayPayment, Payment};
use crate::domain::ports::{
    Capture, OrderStoreRef, PaymentGatewayRef, PaymentStoreRef, StatusUpdate,
};
use crate::domain::signature::SignatureVerifier;
use crate::error::{LedgerError, Result};
use crate::infrastructure::Ledger;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fields the client relays from the gateway after paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub order_id: String,
    pub gateway_payment_id: String,
    pub gateway_order_ref: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub order_id: OrderId,
    pub course_id: String,
    pub enrollment: Enrollment,
    /// True when this call found the order already captured, by an earlier
    /// call or by a concurrent one that won the payment insert.
    pub already_captured: bool,
}

/// Owns the order lifecycle: creation, capture and expiry.
///
/// Holds no per-request state. Every call re-reads the order from the ledger
/// and concurrent captures of one order are serialized solely by the unique
/// payment-per-order constraint of the payment store.
pub struct OrderManager {
    orders: OrderStoreRef,
    payments: PaymentStoreRef,
    gateway: PaymentGatewayRef,
    verifier: SignatureVerifier,
    activator: Arc<EnrollmentActivator>,
    order_ttl: Duration,
}

impl OrderManager {
    /// Creates a new `OrderManager`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Order and payment stores.
    /// * `gateway` - The payment processor issuing order references.
    /// * `verifier` - Checks callback signatures with the gateway secret.
    /// * `activator` - Grants enrollments for captured orders.
    /// * `order_ttl` - How long an unpaid order stays capturable.
    pub fn new(
        ledger: &Ledger,
        gateway: PaymentGatewayRef,
        verifier: SignatureVerifier,
        activator: Arc<EnrollmentActivator>,
        order_ttl: Duration,
    ) -> Self {
        Self {
            orders: ledger.orders.clone(),
            payments: ledger.payments.clone(),
            gateway,
            verifier,
            activator,
            order_ttl,
        }
    }

    /// Opens an order for `course_id` at the given price.
    ///
    /// A zero amount means the course is free: the order is settled
    /// immediately and the enrollment granted, without involving the gateway.
    pub async fn create_order(
        &self,
        user_id: &str,
        course_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<Order> {
        let currency = Currency::new(currency)?;
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if self.activator.is_enrolled(user_id, course_id).await? {
            return Err(LedgerError::AlreadyEnrolled {
                user_id: user_id.to_string(),
                course_id: course_id.to_string(),
            });
        }
        if amount.is_zero() {
            return self.settle_free_order(user_id, course_id, currency).await;
        }

        let order_id = OrderId::new();
        let gateway_order_ref = self
            .gateway
            .create_order(&order_id, amount, &currency)
            .await?;
        let order = Order::new(
            order_id,
            user_id,
            course_id,
            amount,
            currency,
            gateway_order_ref,
            Utc::now(),
        );
        self.orders.insert(order).await?;
        let order = self
            .advance(&order_id, OrderStatus::Created, OrderStatus::PaymentPending)
            .await?;

        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            course_id = %order.course_id,
            amount = %order.amount,
            currency = %order.currency,
            "order created"
        );
        Ok(order)
    }

    async fn settle_free_order(
        &self,
        user_id: &str,
        course_id: &str,
        currency: Currency,
    ) -> Result<Order> {
        let order_id = OrderId::new();
        let now = Utc::now();
        let reference = format!("free_{}", order_id);
        let order = Order::new(
            order_id,
            user_id,
            course_id,
            Decimal::ZERO,
            currency.clone(),
            reference.clone(),
            now,
        );
        self.orders.insert(order).await?;
        self.advance(&order_id, OrderStatus::Created, OrderStatus::PaymentPending)
            .await?;

        let payment = Payment {
            payment_id: reference,
            order_id,
            signature_payload: String::new(),
            amount: Decimal::ZERO,
            currency,
            verified_at: now,
            captured_at: now,
        };
        let (order, payment) = match self.payments.capture(payment).await? {
            Capture::Recorded { order, payment } | Capture::Existing { order, payment } => {
                (order, payment)
            }
            Capture::Rejected(order) => {
                return Err(LedgerError::InvalidTransition(format!(
                    "free order {} is {}, expected {}",
                    order_id,
                    order.status,
                    OrderStatus::PaymentPending
                )));
            }
        };
        self.activator.activate(&order, &payment).await?;

        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            course_id = %order.course_id,
            "free course enrolled"
        );
        Ok(order)
    }

    /// Reads an order on behalf of its owner, applying lazy expiry.
    pub async fn get_order(&self, user_id: &str, order_id: &str) -> Result<Order> {
        let order_id = OrderId::parse(order_id)?;
        let order = self.load_order(&order_id).await?;
        if order.user_id != user_id {
            return Err(LedgerError::OrderNotFound(order_id.to_string()));
        }
        Ok(order)
    }

    /// Confirms a gateway payment against an order and enrolls its user.
    ///
    /// Safe to call any number of times, concurrently or not, with the same
    /// fields: every successful call returns the same enrollment and at most
    /// one payment is ever recorded for the order.
    pub async fn capture_order(
        &self,
        user_id: &str,
        request: &CaptureRequest,
    ) -> Result<CaptureResult> {
        let order_id = OrderId::parse(&request.order_id)?;
        let order = self.load_order(&order_id).await?;
        if order.user_id != user_id {
            return Err(LedgerError::OrderNotFound(order_id.to_string()));
        }

        let status = order.status;
        let order = match status {
            OrderStatus::Expired | OrderStatus::Failed => {
                return Err(LedgerError::OrderExpired(order_id.to_string()));
            }
            OrderStatus::Captured => return self.replay_capture(order).await,
            OrderStatus::Created | OrderStatus::PaymentPending => order,
        };

        if request.gateway_order_ref != order.gateway_order_ref {
            return Err(LedgerError::OrderMismatch(order_id.to_string()));
        }
        let order = if order.status == OrderStatus::Created {
            self.advance(&order_id, OrderStatus::Created, OrderStatus::PaymentPending)
                .await?
        } else {
            order
        };

        if !self.verifier.verify(
            &request.gateway_order_ref,
            &request.gateway_payment_id,
            &request.signature,
        ) {
            self.fail(&order, "signature verification failed").await?;
            return Err(LedgerError::SignatureInvalid(order_id.to_string()));
        }
        let verified_at = Utc::now();

        let reported = self
            .gateway
            .fetch_payment(&request.gateway_payment_id)
            .await?;
        let reported = match check_reported_payment(&order, reported) {
            Ok(reported) => reported,
            Err(reason) => {
                self.fail(&order, &reason).await?;
                return Err(LedgerError::AmountMismatch {
                    order_id: order_id.to_string(),
                    reason,
                });
            }
        };

        let payment = Payment {
            payment_id: reported.payment_id,
            order_id,
            signature_payload: request.signature.clone(),
            amount: reported.amount,
            currency: reported.currency,
            verified_at,
            captured_at: Utc::now(),
        };
        let (order, payment, already_captured) = match self.payments.capture(payment).await? {
            Capture::Recorded { order, payment } => (order, payment, false),
            Capture::Existing { order, payment } => {
                debug!(
                    order_id = %order_id,
                    payment_id = %payment.payment_id,
                    "payment already recorded by a concurrent capture"
                );
                (order, payment, true)
            }
            Capture::Rejected(current) => {
                warn!(
                    order_id = %order_id,
                    status = %current.status,
                    "capture refused, order left payment_pending before the payment was recorded"
                );
                return Err(LedgerError::OrderExpired(order_id.to_string()));
            }
        };

        let enrollment = self.activator.activate(&order, &payment).await?;
        if !already_captured {
            info!(
                order_id = %order.order_id,
                payment_id = %payment.payment_id,
                user_id = %order.user_id,
                course_id = %order.course_id,
                "order captured"
            );
        }

        Ok(CaptureResult {
            order_id,
            course_id: order.course_id,
            enrollment,
            already_captured,
        })
    }

    /// Expires every open order that has outlived its TTL. Returns how many
    /// orders were expired.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut expired = 0;
        for order in self.orders.open_orders().await? {
            if !order.is_stale(now, self.order_ttl) {
                continue;
            }
            let update = self
                .orders
                .update_status(&order.order_id, order.status, OrderStatus::Expired, now)
                .await?;
            if let StatusUpdate::Applied(order) = update {
                info!(order_id = %order.order_id, "order expired by sweep");
                expired += 1;
            }
        }
        Ok(expired)
    }

    /// Loads an order, expiring it first if it is open past its TTL.
    async fn load_order(&self, order_id: &OrderId) -> Result<Order> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        if !order.is_stale(Utc::now(), self.order_ttl) {
            return Ok(order);
        }

        match self
            .orders
            .update_status(order_id, order.status, OrderStatus::Expired, Utc::now())
            .await?
        {
            StatusUpdate::Applied(order) => {
                info!(order_id = %order.order_id, "order expired");
                Ok(order)
            }
            StatusUpdate::Conflict(current) => Ok(current),
        }
    }

    /// Result for an order that was captured before this call.
    async fn replay_capture(&self, order: Order) -> Result<CaptureResult> {
        let payment = self
            .payments
            .get_by_order(&order.order_id)
            .await?
            .ok_or_else(|| {
                LedgerError::storage(format!(
                    "captured order {} has no payment record",
                    order.order_id
                ))
            })?;
        // Also restores the enrollment if a previous call stopped before it.
        let enrollment = self.activator.activate(&order, &payment).await?;
        Ok(CaptureResult {
            order_id: order.order_id,
            course_id: order.course_id,
            enrollment,
            already_captured: true,
        })
    }

    async fn fail(&self, order: &Order, reason: &str) -> Result<()> {
        match self
            .orders
            .update_status(
                &order.order_id,
                OrderStatus::PaymentPending,
                OrderStatus::Failed,
                Utc::now(),
            )
            .await?
        {
            StatusUpdate::Applied(_) => {
                warn!(order_id = %order.order_id, reason, "order failed");
            }
            StatusUpdate::Conflict(current) => {
                warn!(
                    order_id = %order.order_id,
                    status = %current.status,
                    reason,
                    "rejected capture for order in another state"
                );
            }
        }
        Ok(())
    }

    async fn advance(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        match self
            .orders
            .update_status(order_id, from, to, Utc::now())
            .await?
        {
            StatusUpdate::Applied(order) => Ok(order),
            StatusUpdate::Conflict(order) if order.status == to => Ok(order),
            StatusUpdate::Conflict(order) => Err(LedgerError::InvalidTransition(format!(
                "order {} is {}, expected {}",
                order_id, order.status, from
            ))),
        }
    }
}

/// Checks the gateway's view of a payment against the stored order.
fn check_reported_payment(
    order: &Order,
    reported: Option<GatewayPayment>,
) -> std::result::Result<GatewayPayment, String> {
    let reported = reported.ok_or_else(|| "payment unknown to the gateway".to_string())?;
    if reported.gateway_order_ref != order.gateway_order_ref {
        return Err(format!(
            "payment {} belongs to gateway order {}",
            reported.payment_id, reported.gateway_order_ref
        ));
    }
    if reported.amount != order.amount || reported.currency != order.currency {
        return Err(format!(
            "gateway reported {} {}, order is {} {}",
            reported.amount, reported.currency, order.amount, order.currency
        ));
    }
    Ok(reported)
}
