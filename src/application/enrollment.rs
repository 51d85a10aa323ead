use crate::domain::enrollment::Enrollment;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::{EnrollmentStoreRef, Insert};
use crate::error::{LedgerError, Result};
use tracing::{debug, info};

/// Turns a captured order into a course enrollment.
pub struct EnrollmentActivator {
    enrollments: EnrollmentStoreRef,
}

impl EnrollmentActivator {
    pub fn new(enrollments: EnrollmentStoreRef) -> Self {
        Self { enrollments }
    }

    /// Grants the order's user access to the order's course.
    ///
    /// The enrollment and its empty progress record are written together. If
    /// the user is already enrolled (for example because two captures of the
    /// same order raced) the existing enrollment is returned unchanged.
    pub async fn activate(&self, order: &Order, payment: &Payment) -> Result<Enrollment> {
        if order.status != OrderStatus::Captured {
            return Err(LedgerError::InvalidTransition(format!(
                "cannot enroll from order {} in status {}",
                order.order_id, order.status
            )));
        }
        if payment.order_id != order.order_id {
            return Err(LedgerError::InvalidTransition(format!(
                "payment {} belongs to order {}, not {}",
                payment.payment_id, payment.order_id, order.order_id
            )));
        }

        let enrollment = Enrollment {
            user_id: order.user_id.clone(),
            course_id: order.course_id.clone(),
            order_id: order.order_id,
            granted_at: payment.captured_at,
        };

        match self.enrollments.insert(enrollment).await? {
            Insert::Created(enrollment) => {
                info!(
                    user_id = %enrollment.user_id,
                    course_id = %enrollment.course_id,
                    order_id = %enrollment.order_id,
                    "enrollment granted"
                );
                Ok(enrollment)
            }
            Insert::Existing(enrollment) => {
                debug!(
                    user_id = %enrollment.user_id,
                    course_id = %enrollment.course_id,
                    "enrollment already present"
                );
                Ok(enrollment)
            }
        }
    }

    pub async fn enrollment(&self, user_id: &str, course_id: &str) -> Result<Option<Enrollment>> {
        self.enrollments.get(user_id, course_id).await
    }

    pub async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool> {
        Ok(self.enrollment(user_id, course_id).await?.is_some())
    }

    /// Every enrollment in the ledger.
    pub async fn all(&self) -> Result<Vec<Enrollment>> {
        self.enrollments.get_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Currency, OrderId};
    use crate::domain::ports::EnrollmentStore;
    use crate::infrastructure::in_memory::InMemoryEnrollmentStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn captured_order() -> (Order, Payment) {
        let mut order = Order::new(
            OrderId::new(),
            "u1",
            "rust-101",
            dec!(500),
            Currency::new("INR").unwrap(),
            "order_ref_1",
            Utc::now(),
        );
        order.status = OrderStatus::Captured;
        let payment = Payment {
            payment_id: "pay_1".to_string(),
            order_id: order.order_id,
            signature_payload: "sig".to_string(),
            amount: dec!(500),
            currency: Currency::new("INR").unwrap(),
            verified_at: Utc::now(),
            captured_at: Utc::now(),
        };
        (order, payment)
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let store = Arc::new(InMemoryEnrollmentStore::new());
        let activator = EnrollmentActivator::new(store.clone());
        let (order, payment) = captured_order();

        let first = activator.activate(&order, &payment).await.unwrap();
        let second = activator.activate(&order, &payment).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(activator.all().await.unwrap().len(), 1);
        assert!(activator.is_enrolled("u1", "rust-101").await.unwrap());
        assert!(store.progress("u1", "rust-101").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_activate_requires_captured_order() {
        let activator = EnrollmentActivator::new(Arc::new(InMemoryEnrollmentStore::new()));
        let (mut order, payment) = captured_order();
        order.status = OrderStatus::PaymentPending;

        let result = activator.activate(&order, &payment).await;
        assert!(matches!(result, Err(LedgerError::InvalidTransition(_))));
        assert!(!activator.is_enrolled("u1", "rust-101").await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_rejects_foreign_payment() {
        let activator = EnrollmentActivator::new(Arc::new(InMemoryEnrollmentStore::new()));
        let (order, mut payment) = captured_order();
        payment.order_id = OrderId::new();

        assert!(activator.activate(&order, &payment).await.is_err());
    }
}
