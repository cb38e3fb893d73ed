use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The lifecycle states of a payment intent, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

impl IntentStatus {
    pub fn is_canceled(&self) -> bool {
        matches!(self, IntentStatus::Canceled)
    }
}

impl Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Succeeded => "succeeded",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    /// Replaying a request with the same key returns the original intent instead of creating a new one.
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway is not configured")]
    NotConfigured,
    #[error("The payment gateway could not be reached. {0}")]
    Unreachable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("Payment intent {0} does not exist")]
    NotFound(String),
}

/// An external payment provider that manages payment intents.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;

    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;

    async fn confirm_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}
