use crate::domain::order::{Currency, OrderId};
use crate::domain::payment::{GatewayCallback, GatewayPayment};
use crate::domain::ports::PaymentGateway;
use crate::domain::signature::SignatureVerifier;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct GatewayOrder {
    amount: Decimal,
    currency: Currency,
}

#[derive(Default)]
struct GatewayBook {
    orders: HashMap<String, GatewayOrder>,
    payments: HashMap<String, GatewayPayment>,
}

/// In-process stand-in for the external payment processor.
///
/// Issues `order_*` references, records payments made through [`pay`] and
/// signs the resulting callback with the shared secret exactly like the real
/// gateway would.
///
/// [`pay`]: SandboxGateway::pay
#[derive(Clone)]
pub struct SandboxGateway {
    signer: SignatureVerifier,
    book: Arc<RwLock<GatewayBook>>,
}

impl SandboxGateway {
    pub fn new(signer: SignatureVerifier) -> Self {
        Self {
            signer,
            book: Arc::new(RwLock::new(GatewayBook::default())),
        }
    }

    /// Simulates the customer completing checkout for `gateway_order_ref` at
    /// the order's full amount.
    pub async fn pay(&self, gateway_order_ref: &str) -> Result<GatewayCallback> {
        let order = {
            let book = self.book.read().await;
            book.orders.get(gateway_order_ref).cloned()
        }
        .ok_or_else(|| {
            LedgerError::Gateway(format!("unknown gateway order {}", gateway_order_ref))
        })?;
        self.pay_amount(gateway_order_ref, order.amount, order.currency)
            .await
    }

    /// Records a payment of an arbitrary amount against `gateway_order_ref`.
    /// Used to simulate processors reporting a different amount than ordered.
    pub async fn pay_amount(
        &self,
        gateway_order_ref: &str,
        amount: Decimal,
        currency: Currency,
    ) -> Result<GatewayCallback> {
        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        let payment = GatewayPayment {
            payment_id: payment_id.clone(),
            gateway_order_ref: gateway_order_ref.to_string(),
            amount,
            currency,
        };
        self.book
            .write()
            .await
            .payments
            .insert(payment_id.clone(), payment);

        Ok(GatewayCallback {
            signature: self.signer.sign(gateway_order_ref, &payment_id),
            gateway_payment_id: payment_id,
            gateway_order_ref: gateway_order_ref.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_order(
        &self,
        _receipt: &OrderId,
        amount: Decimal,
        currency: &Currency,
    ) -> Result<String> {
        let reference = format!("order_{}", Uuid::new_v4().simple());
        self.book.write().await.orders.insert(
            reference.clone(),
            GatewayOrder {
                amount,
                currency: currency.clone(),
            },
        );
        Ok(reference)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>> {
        Ok(self.book.read().await.payments.get(payment_id).cloned())
    }
}
