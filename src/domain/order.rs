use crate::error::{LedgerError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of an [`Order`], issued by the order manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a client-supplied order id. Anything that is not a valid id
    /// cannot name an existing order.
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| LedgerError::OrderNotFound(raw.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for OrderId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A three letter, upper-case currency code such as `INR` or `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(LedgerError::InvalidAmount(format!(
                "unsupported currency code '{}'",
                code
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PaymentPending,
    Captured,
    Failed,
    Expired,
}

impl OrderStatus {
    /// Orders in a terminal state never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Captured | Self::Failed | Self::Expired)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, PaymentPending)
                | (Created, Expired)
                | (PaymentPending, Captured)
                | (PaymentPending, Failed)
                | (PaymentPending, Expired)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::PaymentPending => "payment_pending",
            Self::Captured => "captured",
            Self::Failed => "failed",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// A user's intent to purchase one course at a price frozen at creation time.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub course_id: String,
    /// Price charged for the course. Never changes after creation.
    pub amount: Decimal,
    pub currency: Currency,
    pub status: OrderStatus,
    /// Reference issued by the payment gateway for this order.
    pub gateway_order_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        amount: Decimal,
        currency: Currency,
        gateway_order_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            user_id: user_id.into(),
            course_id: course_id.into(),
            amount,
            currency,
            status: OrderStatus::Created,
            gateway_order_ref: gateway_order_ref.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the order to `next`, rejecting edges outside the state machine.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status.can_transition_to(next) {
            self.status = next;
            self.updated_at = now;
            Ok(())
        } else {
            Err(LedgerError::InvalidTransition(format!(
                "order {} cannot move from {} to {}",
                self.order_id, self.status, next
            )))
        }
    }

    /// True when an open order has outlived its time to live.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.status.is_terminal()
            && self
                .created_at
                .checked_add_signed(ttl)
                .is_some_and(|deadline| now >= deadline)
    }
}
