use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A payment intent as returned by the gateway. Only the fields the checkout engine needs are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StripeIntent {
    pub id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntentParams {
    pub amount: i64,
    pub currency: String,
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

/// The error envelope of a failed gateway call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StripeErrorBody {
    /// The most useful human-readable description of the error.
    pub fn describe(&self) -> String {
        let detail = &self.error;
        match (&detail.message, &detail.code) {
            (Some(m), Some(c)) => format!("{m} ({c})"),
            (Some(m), None) => m.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => detail.error_type.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_intent() {
        let json = r#"{
            "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
            "object": "payment_intent",
            "amount": 2000,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_3MtwBwLkdIwHu7ix28a3tqPa_secret_YrKJUKribcBjcG8HVhfZluoGH",
            "metadata": { "session_id": "abc" },
            "livemode": false
        }"#;
        let intent: StripeIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.amount, 2000);
        assert_eq!(intent.status, "requires_payment_method");
        assert_eq!(intent.metadata["session_id"], "abc");
    }

    #[test]
    fn describe_error() {
        let json = r#"{"error": {"type": "invalid_request_error", "code": "amount_too_small",
            "message": "Amount must be at least $0.50 usd"}}"#;
        let body: StripeErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.describe(), "Amount must be at least $0.50 usd (amount_too_small)");
    }
}
