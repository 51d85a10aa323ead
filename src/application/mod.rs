//! Application layer containing the core business logic orchestration.
//!
//! [`OrderManager`](order_manager::OrderManager) drives orders from creation to
//! capture, [`EnrollmentActivator`](enrollment::EnrollmentActivator) grants
//! access for captured orders and
//! [`ProgressTracker`](progress::ProgressTracker) records lecture views for
//! enrolled users. [`Services`] wires them to one ledger.

pub mod enrollment;
pub mod order_manager;
pub mod progress;

use crate::domain::ports::PaymentGatewayRef;
use crate::domain::signature::SignatureVerifier;
use crate::infrastructure::Ledger;
use chrono::Duration;
use enrollment::EnrollmentActivator;
use order_manager::OrderManager;
use progress::ProgressTracker;
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub orders: Arc<OrderManager>,
    pub enrollments: Arc<EnrollmentActivator>,
    pub progress: Arc<ProgressTracker>,
}

impl Services {
    pub fn new(
        ledger: Ledger,
        gateway: PaymentGatewayRef,
        verifier: SignatureVerifier,
        order_ttl: Duration,
    ) -> Self {
        let enrollments = Arc::new(EnrollmentActivator::new(ledger.enrollments.clone()));
        let progress = Arc::new(ProgressTracker::new(
            enrollments.clone(),
            ledger.enrollments.clone(),
        ));
        let orders = Arc::new(OrderManager::new(
            &ledger,
            gateway,
            verifier,
            enrollments.clone(),
            order_ttl,
        ));
        Self {
            orders,
            enrollments,
            progress,
        }
    }
}
