use super::order::{Currency, OrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Append-only evidence that an order was paid for.
///
/// At most one payment exists per order; the store enforces that uniqueness
/// and it is what serializes concurrent captures.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Identifier assigned by the payment gateway.
    pub payment_id: String,
    pub order_id: OrderId,
    /// The gateway signature that was verified for this payment.
    pub signature_payload: String,
    /// Amount as reported by the gateway.
    pub amount: Decimal,
    pub currency: Currency,
    pub verified_at: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
}

/// A payment as the gateway reports it when queried by payment id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayment {
    pub payment_id: String,
    pub gateway_order_ref: String,
    pub amount: Decimal,
    pub currency: Currency,
}

/// Fields the gateway hands back to the client after checkout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCallback {
    pub gateway_payment_id: String,
    pub gateway_order_ref: String,
    pub signature: String,
}
