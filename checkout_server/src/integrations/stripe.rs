use std::fmt::Debug;

use checkout_engine::traits::{GatewayError, IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent};
use log::*;
use stripe_tools::{NewIntentParams, StripeApi, StripeApiError, StripeConfig, StripeIntent};

/// The checkout engine's payment gateway, backed by the Stripe payment-intents API.
///
/// A gateway built without configuration answers every call with [`GatewayError::NotConfigured`], so cash on
/// delivery checkouts keep working when no secret key is set.
#[derive(Clone)]
pub struct StripeGateway {
    api: Option<StripeApi>,
}

impl Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StripeGateway(configured: {})", self.api.is_some())
    }
}

impl StripeGateway {
    pub fn new(config: Option<StripeConfig>) -> Self {
        let api = config.and_then(|c| {
            StripeApi::new(c)
                .map_err(|e| error!("💳 Could not create the payment gateway client. Online payments are disabled. {e}"))
                .ok()
        });
        Self { api }
    }

    pub fn unconfigured() -> Self {
        Self { api: None }
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    fn api(&self) -> Result<&StripeApi, GatewayError> {
        self.api.as_ref().ok_or(GatewayError::NotConfigured)
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let params = NewIntentParams {
            amount: intent.amount,
            currency: intent.currency,
            idempotency_key: intent.idempotency_key,
            metadata: intent.metadata,
        };
        let result = self.api()?.create_payment_intent(&params).await.map_err(|e| to_gateway_error("new", e))?;
        convert_intent(result)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let result = self.api()?.get_payment_intent(id).await.map_err(|e| to_gateway_error(id, e))?;
        convert_intent(result)
    }

    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let result = self.api()?.cancel_payment_intent(id).await.map_err(|e| to_gateway_error(id, e))?;
        convert_intent(result)
    }

    async fn confirm_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let result = self.api()?.confirm_payment_intent(id).await.map_err(|e| to_gateway_error(id, e))?;
        convert_intent(result)
    }
}

fn to_gateway_error(id: &str, e: StripeApiError) -> GatewayError {
    if e.is_not_found() {
        GatewayError::NotFound(id.to_string())
    } else if e.is_transport_error() {
        GatewayError::Unreachable(e.to_string())
    } else {
        GatewayError::Rejected(e.to_string())
    }
}

fn convert_intent(intent: StripeIntent) -> Result<PaymentIntent, GatewayError> {
    let status = intent_status_from_str(&intent.status)
        .ok_or_else(|| GatewayError::Rejected(format!("Unknown payment intent status '{}'", intent.status)))?;
    Ok(PaymentIntent {
        id: intent.id,
        client_secret: intent.client_secret,
        amount: intent.amount,
        currency: intent.currency,
        status,
    })
}

pub fn intent_status_from_str(s: &str) -> Option<IntentStatus> {
    match s {
        "requires_payment_method" => Some(IntentStatus::RequiresPaymentMethod),
        "requires_confirmation" => Some(IntentStatus::RequiresConfirmation),
        "requires_action" => Some(IntentStatus::RequiresAction),
        "processing" => Some(IntentStatus::Processing),
        "requires_capture" => Some(IntentStatus::RequiresCapture),
        "canceled" => Some(IntentStatus::Canceled),
        "succeeded" => Some(IntentStatus::Succeeded),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(intent_status_from_str("succeeded"), Some(IntentStatus::Succeeded));
        assert_eq!(intent_status_from_str("requires_capture"), Some(IntentStatus::RequiresCapture));
        assert_eq!(intent_status_from_str("cancelled"), None);
    }

    #[test]
    fn api_errors_map_onto_gateway_errors() {
        let e = to_gateway_error("pi_1", StripeApiError::QueryError { status: 404, message: "gone".into() });
        assert!(matches!(e, GatewayError::NotFound(id) if id == "pi_1"));
        let e = to_gateway_error("pi_1", StripeApiError::RestResponseError("connection refused".into()));
        assert!(matches!(e, GatewayError::Unreachable(_)));
        let e = to_gateway_error("pi_1", StripeApiError::QueryError { status: 402, message: "card declined".into() });
        assert!(matches!(e, GatewayError::Rejected(_)));
    }

    #[test]
    fn unknown_statuses_are_rejected() {
        let intent = StripeIntent {
            id: "pi_1".into(),
            amount: 1000,
            currency: "usd".into(),
            status: "mystery".into(),
            client_secret: None,
            metadata: BTreeMap::new(),
        };
        assert!(matches!(convert_intent(intent), Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn unconfigured_gateway() {
        let gateway = StripeGateway::new(None);
        assert!(!gateway.is_configured());
        let err = gateway.retrieve_intent("pi_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }
}
