use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("User {user_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { user_id: String, course_id: String },
    #[error("Order {0} not found")]
    OrderNotFound(String),
    #[error("Order {0} is expired or failed and can no longer be captured")]
    OrderExpired(String),
    #[error("Gateway order reference does not match order {0}")]
    OrderMismatch(String),
    #[error("Payment signature is invalid for order {0}")]
    SignatureInvalid(String),
    #[error("Gateway reported payment does not match order {order_id}: {reason}")]
    AmountMismatch { order_id: String, reason: String },
    #[error("User {user_id} is not enrolled in course {course_id}")]
    NotEnrolled { user_id: String, course_id: String },
    #[error("Course {0} not found")]
    CourseNotFound(String),
    #[error("Invalid lecture id: {0}")]
    InvalidLecture(String),
    #[error("Invalid order transition: {0}")]
    InvalidTransition(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Stable name of the error kind, surfaced to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "InvalidAmount",
            Self::AlreadyEnrolled { .. } => "AlreadyEnrolled",
            Self::OrderNotFound(_) => "OrderNotFound",
            Self::OrderExpired(_) => "OrderExpired",
            Self::OrderMismatch(_) => "OrderMismatch",
            Self::SignatureInvalid(_) => "SignatureInvalid",
            Self::AmountMismatch { .. } => "AmountMismatch",
            Self::NotEnrolled { .. } => "NotEnrolled",
            Self::CourseNotFound(_) => "CourseNotFound",
            Self::InvalidLecture(_) => "InvalidLecture",
            Self::InvalidTransition(_) => "InvalidTransition",
            Self::Gateway(_) => "Gateway",
            Self::Storage(_) => "Storage",
        }
    }

    /// Server-side faults. Callers may retry these with the same `orderId`
    /// because capture is idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Gateway(_))
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::Storage(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}
