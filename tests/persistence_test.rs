#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use chrono::Duration;
use common::harness_with;
use coursepay::domain::order::OrderStatus;
use coursepay::infrastructure::Ledger;
use coursepay::infrastructure::rocksdb::RocksDBStore;
use rust_decimal_macros::dec;
use std::process::Command;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: capture an order and view a lecture.
    let (order, request) = {
        let h = harness_with(
            Ledger::rocksdb(RocksDBStore::open(&db_path).unwrap()),
            Duration::minutes(30),
        );
        let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;
        h.services
            .orders
            .capture_order("student-1", &request)
            .await
            .unwrap();
        h.services
            .progress
            .mark_viewed("student-1", "rust-101", "lecture-1")
            .await
            .unwrap();
        (order, request)
    };

    // 2. Second run on the same database: state is recovered and a replayed
    // capture is still idempotent.
    {
        let h = harness_with(
            Ledger::rocksdb(RocksDBStore::open(&db_path).unwrap()),
            Duration::minutes(30),
        );
        let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Captured);

        let replay = h
            .services
            .orders
            .capture_order("student-1", &request)
            .await
            .unwrap();
        assert!(replay.already_captured);

        let progress = h
            .services
            .progress
            .get_progress("student-1", "rust-101")
            .await
            .unwrap()
            .unwrap();
        assert!(progress.viewed_lecture_ids.contains("lecture-1"));
    }

    // 3. The CLI export reads the same database.
    let output = Command::new(cargo_bin!("coursepay"))
        .arg("enrollments")
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("student-1,rust-101,{}", order.order_id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocksdb_concurrent_duplicate_captures() {
    let dir = tempdir().unwrap();
    let h = Arc::new(harness_with(
        Ledger::rocksdb(RocksDBStore::open(dir.path().join("race_db")).unwrap()),
        Duration::minutes(30),
    ));
    let (order, request) = h.checkout("student-1", "rust-101", dec!(500)).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let h = h.clone();
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
    assert_eq!(fresh, 1);
    assert!(results.iter().all(|r| r.enrollment == results[0].enrollment));

    let stored = h.ledger.orders.get(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Captured);
    assert_eq!(h.ledger.enrollments.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rocksdb_sweep_via_cli() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("sweep_db");

    {
        let h = harness_with(
            Ledger::rocksdb(RocksDBStore::open(&db_path).unwrap()),
            Duration::minutes(30),
        );
        h.checkout("student-1", "rust-101", dec!(500)).await;
    }

    let output = Command::new(cargo_bin!("coursepay"))
        .arg("sweep")
        .arg("--db-path")
        .arg(&db_path)
        .arg("--order-ttl-secs")
        .arg("0")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("expired 1 orders"));
}
