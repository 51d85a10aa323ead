use crate::domain::enrollment::{Enrollment, ProgressRecord};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::{
    Capture, EnrollmentStore, Insert, OrderStore, PaymentStore, ProgressUpdate, StatusUpdate,
};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing payments, keyed by order id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for storing enrollments, keyed by (user, course).
pub const CF_ENROLLMENTS: &str = "enrollments";
/// Column Family for storing progress records, keyed by (user, course).
pub const CF_PROGRESS: &str = "progress";

/// A persistent ledger implementation using RocksDB.
///
/// Orders, payments, enrollments and progress records live in separate Column
/// Families. Writes guarded by a uniqueness constraint run inside a RocksDB
/// transaction that takes a row lock with `get_for_update`, so exactly one
/// concurrent writer can create a given key, across threads and handles.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all ledger column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ORDERS, CF_PAYMENTS, CF_ENROLLMENTS, CF_PROGRESS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            descriptors,
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::storage(format!("{} column family not found", name)))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    /// Writes `value` under `key` unless the key is already taken.
    fn insert_unique<T>(&self, cf_name: &str, key: &[u8], value: T) -> Result<Insert<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let cf = self.cf(cf_name)?;
        let txn = self.db.transaction();
        if let Some(bytes) = txn.get_for_update_cf(cf, key, true)? {
            return Ok(Insert::Existing(serde_json::from_slice(&bytes)?));
        }
        txn.put_cf(cf, key, serde_json::to_vec(&value)?)?;
        txn.commit()?;
        Ok(Insert::Created(value))
    }
}

/// Length-prefixed (user, course) key, so no pair of ids can collide.
fn enrollment_key(user_id: &str, course_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + user_id.len() + course_id.len());
    key.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(course_id.as_bytes());
    key
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: Order) -> Result<Insert<Order>> {
        let key = *order.order_id.as_bytes();
        self.insert_unique(CF_ORDERS, &key, order)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_bytes())
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let cf = self.cf(CF_ORDERS)?;
        let txn = self.db.transaction();
        let bytes = txn
            .get_for_update_cf(cf, order_id.as_bytes(), true)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        let mut order: Order = serde_json::from_slice(&bytes)?;
        if order.status != expected {
            return Ok(StatusUpdate::Conflict(order));
        }
        order.transition(next, at)?;
        txn.put_cf(cf, order_id.as_bytes(), serde_json::to_vec(&order)?)?;
        txn.commit()?;
        Ok(StatusUpdate::Applied(order))
    }

    async fn open_orders(&self) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(orders
            .into_iter()
            .filter(|order| !order.status.is_terminal())
            .collect())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn capture(&self, payment: Payment) -> Result<Capture> {
        let orders = self.cf(CF_ORDERS)?;
        let payments = self.cf(CF_PAYMENTS)?;
        let key = *payment.order_id.as_bytes();

        // Lock order: the order row first, then its payment row.
        let txn = self.db.transaction();
        let order_bytes = txn
            .get_for_update_cf(orders, &key, true)?
            .ok_or_else(|| LedgerError::OrderNotFound(payment.order_id.to_string()))?;
        let mut order: Order = serde_json::from_slice(&order_bytes)?;
        if let Some(bytes) = txn.get_for_update_cf(payments, &key, true)? {
            return Ok(Capture::Existing {
                order,
                payment: serde_json::from_slice(&bytes)?,
            });
        }
        if order.status != OrderStatus::PaymentPending {
            return Ok(Capture::Rejected(order));
        }
        order.transition(OrderStatus::Captured, payment.captured_at)?;
        txn.put_cf(payments, &key, serde_json::to_vec(&payment)?)?;
        txn.put_cf(orders, &key, serde_json::to_vec(&order)?)?;
        txn.commit()?;
        Ok(Capture::Recorded { order, payment })
    }

    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, order_id.as_bytes())
    }
}

#[async_trait]
impl EnrollmentStore for RocksDBStore {
    async fn insert(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>> {
        let enrollments = self.cf(CF_ENROLLMENTS)?;
        let progress = self.cf(CF_PROGRESS)?;
        let key = enrollment_key(&enrollment.user_id, &enrollment.course_id);

        let txn = self.db.transaction();
        if let Some(bytes) = txn.get_for_update_cf(enrollments, &key, true)? {
            return Ok(Insert::Existing(serde_json::from_slice(&bytes)?));
        }
        let record = ProgressRecord::empty(&enrollment);
        txn.put_cf(enrollments, &key, serde_json::to_vec(&enrollment)?)?;
        txn.put_cf(progress, &key, serde_json::to_vec(&record)?)?;
        txn.commit()?;
        Ok(Insert::Created(enrollment))
    }

    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<Enrollment>> {
        self.read(CF_ENROLLMENTS, &enrollment_key(user_id, course_id))
    }

    async fn get_all(&self) -> Result<Vec<Enrollment>> {
        self.scan(CF_ENROLLMENTS)
    }

    async fn progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>> {
        self.read(CF_PROGRESS, &enrollment_key(user_id, course_id))
    }

    async fn update_progress(
        &self,
        user_id: &str,
        course_id: &str,
        update: ProgressUpdate,
    ) -> Result<Option<ProgressRecord>> {
        let enrollments = self.cf(CF_ENROLLMENTS)?;
        let progress = self.cf(CF_PROGRESS)?;
        let key = enrollment_key(user_id, course_id);

        let txn = self.db.transaction();
        let Some(enrollment_bytes) = txn.get_for_update_cf(enrollments, &key, false)? else {
            return Ok(None);
        };
        let mut record = match txn.get_for_update_cf(progress, &key, true)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => {
                let enrollment: Enrollment = serde_json::from_slice(&enrollment_bytes)?;
                ProgressRecord::empty(&enrollment)
            }
        };
        update.apply(&mut record);
        txn.put_cf(progress, &key, serde_json::to_vec(&record)?)?;
        txn.commit()?;
        Ok(Some(record))
    }
}
