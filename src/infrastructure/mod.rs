//! Adapters for the domain ports: storage backends, the catalog and the
//! payment gateway.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox_gateway;

use crate::domain::ports::{EnrollmentStoreRef, OrderStoreRef, PaymentStoreRef};
use in_memory::{InMemoryEnrollmentStore, InMemoryOrderStore};
use std::sync::Arc;

/// The three ledger stores, shared by the application services.
///
/// `orders` and `payments` must be views of one backend so a capture can
/// update both atomically.
#[derive(Clone)]
pub struct Ledger {
    pub orders: OrderStoreRef,
    pub payments: PaymentStoreRef,
    pub enrollments: EnrollmentStoreRef,
}

impl Ledger {
    /// A ledger kept entirely in memory.
    pub fn in_memory() -> Self {
        let orders = InMemoryOrderStore::new();
        Self {
            payments: Arc::new(orders.clone()),
            orders: Arc::new(orders),
            enrollments: Arc::new(InMemoryEnrollmentStore::new()),
        }
    }

    /// A ledger backed by a single RocksDB instance.
    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb(store: self::rocksdb::RocksDBStore) -> Self {
        Self {
            orders: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
            enrollments: Arc::new(store),
        }
    }
}
