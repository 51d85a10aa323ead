use crate::error::Result;
use crate::infrastructure::Ledger;
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default time an unpaid order stays capturable: 30 minutes.
pub const DEFAULT_ORDER_TTL_SECS: u64 = 1800;

#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "COURSEPAY_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl StorageArgs {
    /// Opens the ledger selected by the arguments.
    pub fn open_ledger(&self) -> Result<Ledger> {
        match &self.db_path {
            None => Ok(Ledger::in_memory()),
            Some(path) => open_persistent(path),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(path: &std::path::Path) -> Result<Ledger> {
    let store = crate::infrastructure::rocksdb::RocksDBStore::open(path)?;
    Ok(Ledger::rocksdb(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(path: &std::path::Path) -> Result<Ledger> {
    Err(crate::error::LedgerError::storage(format!(
        "cannot open {}: built without the storage-rocksdb feature",
        path.display()
    )))
}

#[derive(Args, Debug, Clone)]
pub struct OrderArgs {
    /// Seconds an unpaid order stays capturable before it expires.
    #[arg(long, env = "COURSEPAY_ORDER_TTL_SECS", default_value_t = DEFAULT_ORDER_TTL_SECS)]
    pub order_ttl_secs: u64,
}

impl Default for OrderArgs {
    fn default() -> Self {
        Self {
            order_ttl_secs: DEFAULT_ORDER_TTL_SECS,
        }
    }
}

impl OrderArgs {
    pub fn order_ttl(&self) -> chrono::Duration {
        i64::try_from(self.order_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "COURSEPAY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Course catalog CSV (course_id,price,currency,total_lectures).
    #[arg(long, env = "COURSEPAY_CATALOG")]
    pub catalog: PathBuf,

    /// Secret shared with the payment gateway for callback signatures.
    #[arg(long, env = "COURSEPAY_GATEWAY_SECRET", hide_env_values = true)]
    pub gateway_secret: String,

    /// Mount `POST /sandbox/pay`, which signs a payment for any order.
    /// Development only.
    #[arg(long, env = "COURSEPAY_SANDBOX")]
    pub sandbox: bool,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub orders: OrderArgs,
}
