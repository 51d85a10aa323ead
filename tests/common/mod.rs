#![allow(dead_code)]

use chrono::Duration;
use coursepay::application::Services;
use coursepay::application::order_manager::CaptureRequest;
use coursepay::domain::order::Order;
use coursepay::domain::signature::SignatureVerifier;
use coursepay::infrastructure::Ledger;
use coursepay::infrastructure::sandbox_gateway::SandboxGateway;
use rust_decimal::Decimal;
use std::sync::Arc;

pub const SECRET: &str = "whsec_test_secret";

pub struct Harness {
    pub services: Services,
    pub gateway: SandboxGateway,
    pub ledger: Ledger,
}

pub fn harness() -> Harness {
    harness_with(Ledger::in_memory(), Duration::minutes(30))
}

pub fn harness_with(ledger: Ledger, order_ttl: Duration) -> Harness {
    let verifier = SignatureVerifier::new(SECRET);
    let gateway = SandboxGateway::new(verifier.clone());
    let services = Services::new(
        ledger.clone(),
        Arc::new(gateway.clone()),
        verifier,
        order_ttl,
    );
    Harness {
        services,
        gateway,
        ledger,
    }
}

impl Harness {
    /// Creates an order and pays for it at the gateway, returning the capture
    /// request the client would submit.
    pub async fn checkout(
        &self,
        user_id: &str,
        course_id: &str,
        amount: Decimal,
    ) -> (Order, CaptureRequest) {
        let order = self
            .services
            .orders
            .create_order(user_id, course_id, amount, "INR")
            .await
            .unwrap();
        let callback = self.gateway.pay(&order.gateway_order_ref).await.unwrap();
        let request = CaptureRequest {
            order_id: order.order_id.to_string(),
            gateway_payment_id: callback.gateway_payment_id,
            gateway_order_ref: callback.gateway_order_ref,
            signature: callback.signature,
        };
        (order, request)
    }

    /// Creates a paid and captured enrollment.
    pub async fn enroll(&self, user_id: &str, course_id: &str) {
        let (_, request) = self.checkout(user_id, course_id, Decimal::ONE_HUNDRED).await;
        self.services
            .orders
            .capture_order(user_id, &request)
            .await
            .unwrap();
    }
}
