mod common;

use chrono::Duration;
use common::{Harness, harness, harness_with};
use coursepay::domain::order::OrderStatus;
use coursepay::error::LedgerError;
use coursepay::infrastructure::Ledger;
use rand::Rng;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_purchase_scenario_inr_500() {
    let h = harness();
    let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;
    assert_eq!(order.amount, dec!(500));
    assert_eq!(order.currency.code(), "INR");

    let first = h
        .services
        .orders
        .capture_order("student-1", &request)
        .await
        .unwrap();
    assert_eq!(first.course_id, "rust-101");

    let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Captured);
    let enrollment = h
        .ledger
        .enrollments
        .get("student-1", "rust-101")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.order_id, order.order_id);

    // Same body again: same enrollment, no error.
    let second = h
        .services
        .orders
        .capture_order("student-1", &request)
        .await
        .unwrap();
    assert_eq!(second.enrollment, first.enrollment);
    assert!(second.already_captured);
}

#[tokio::test]
async fn test_capture_twice_records_one_payment() {
    let h = harness();
    let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;

    h.services.orders.capture_order("student-1", &request).await.unwrap();
    let payment = h.ledger.payments.get_by_order(&order.order_id).await.unwrap().unwrap();
    h.services.orders.capture_order("student-1", &request).await.unwrap();

    assert_eq!(
        h.ledger.payments.get_by_order(&order.order_id).await.unwrap(),
        Some(payment)
    );
    assert_eq!(h.ledger.enrollments.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_captures() {
    let h = Arc::new(harness());
    let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let h: Arc<Harness> = h.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            h.services.orders.capture_order("student-1", &request).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    let fresh = results.iter().filter(|r| !r.already_captured).count();
    assert_eq!(fresh, 1, "exactly one caller wins the payment insert");
    assert!(results.iter().all(|r| r.enrollment == results[0].enrollment));

    let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Captured);
    assert_eq!(h.ledger.enrollments.get_all().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capture_racing_tampered_callback_never_strands_payment() {
    for _ in 0..50 {
        let h = Arc::new(harness());
        let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;
        let mut tampered = request.clone();
        tampered.signature = "00".repeat(32);

        let valid = {
            let h = h.clone();
            tokio::spawn(async move {
                h.services.orders.capture_order("student-1", &request).await
            })
        };
        let bad = {
            let h = h.clone();
            tokio::spawn(async move {
                h.services.orders.capture_order("student-1", &tampered).await
            })
        };
        let valid = valid.await.unwrap();
        let _ = bad.await.unwrap();

        let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
        let payment = h.ledger.payments.get_by_order(&order.order_id).await.unwrap();
        let enrollment = h
            .ledger
            .enrollments
            .get("student-1", "rust-101")
            .await
            .unwrap();

        let captured = stored.status == OrderStatus::Captured;
        assert_eq!(payment.is_some(), captured, "payment recorded on a {} order", stored.status);
        assert_eq!(enrollment.is_some(), captured);
        match valid {
            Ok(result) => {
                assert!(captured);
                assert_eq!(Some(result.enrollment), enrollment);
            }
            Err(err) => {
                assert!(matches!(err, LedgerError::OrderExpired(_)), "{:?}", err);
                assert_eq!(stored.status, OrderStatus::Failed);
            }
        }
    }
}

#[tokio::test]
async fn test_tampered_signatures_fail_the_order() {
    let mut rng = rand::thread_rng();
    for _ in 0..8 {
        let h = harness();
        let (order, mut request) = h.checkout("student-1", "rust-101", dec!(500)).await;

        // Flip one hex digit somewhere in the signature.
        let mut chars: Vec<char> = request.signature.chars().collect();
        let index = rng.gen_range(0..chars.len());
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        request.signature = chars.into_iter().collect();

        let result = h.services.orders.capture_order("student-1", &request).await;
        assert!(matches!(result, Err(LedgerError::SignatureInvalid(_))));

        let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
        assert!(h.ledger.enrollments.get("student-1", "rust-101").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_failed_order_cannot_be_captured_later() {
    let h = harness();
    let (_, request) = h.checkout("student-1", "rust-101", dec!(500)).await;
    let mut tampered = request.clone();
    tampered.signature = "00".repeat(32);

    assert!(h.services.orders.capture_order("student-1", &tampered).await.is_err());
    let result = h.services.orders.capture_order("student-1", &request).await;
    assert!(matches!(result, Err(LedgerError::OrderExpired(_))));
}

#[tokio::test]
async fn test_expired_order_rejects_even_valid_signature() {
    let h = harness_with(Ledger::in_memory(), Duration::zero());
    let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;

    let result = h.services.orders.capture_order("student-1", &request).await;
    assert!(matches!(result, Err(LedgerError::OrderExpired(_))));

    let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Expired);
}

#[tokio::test]
async fn test_gateway_amount_mismatch() {
    let h = harness();
    let order = h
        .services
        .orders
        .create_order("student-1", "rust-101", dec!(500), "INR")
        .await
        .unwrap();
    let callback = h
        .gateway
        .pay_amount(&order.gateway_order_ref, dec!(499.99), order.currency.clone())
        .await
        .unwrap();
    let request = coursepay::application::order_manager::CaptureRequest {
        order_id: order.order_id.to_string(),
        gateway_payment_id: callback.gateway_payment_id,
        gateway_order_ref: callback.gateway_order_ref,
        signature: callback.signature,
    };

    let result = h.services.orders.capture_order("student-1", &request).await;
    assert!(matches!(result, Err(LedgerError::AmountMismatch { .. })));
    assert!(h.ledger.enrollments.get("student-1", "rust-101").await.unwrap().is_none());
    assert!(h.ledger.payments.get_by_order(&order.order_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payment_from_other_order_is_rejected() {
    let h = harness();
    let (_, first) = h.checkout("student-1", "rust-101", dec!(500)).await;
    let (second_order, _) = h.checkout("student-1", "async-deep-dive", dec!(500)).await;

    // Correctly signed for its own gateway order, replayed against another.
    let request = coursepay::application::order_manager::CaptureRequest {
        order_id: second_order.order_id.to_string(),
        ..first
    };
    let result = h.services.orders.capture_order("student-1", &request).await;
    assert!(matches!(result, Err(LedgerError::OrderMismatch(_))));
}

#[tokio::test]
async fn test_sweep_then_capture() {
    let h = harness_with(Ledger::in_memory(), Duration::zero());
    let (_, request) = h.checkout("student-1", "rust-101", dec!(500)).await;
    h.checkout("student-2", "rust-101", dec!(500)).await;

    assert_eq!(h.services.orders.sweep_expired().await.unwrap(), 2);
    let result = h.services.orders.capture_order("student-1", &request).await;
    assert!(matches!(result, Err(LedgerError::OrderExpired(_))));
}
