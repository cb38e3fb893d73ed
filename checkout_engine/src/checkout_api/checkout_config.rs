use campus_common::{Money, Rate, DEFAULT_CURRENCY_CODE};
use chrono::Duration;

use crate::{
    db_types::DeliveryMethod,
    fees::{DeliveryFeeDefaults, FeeSchedule},
};

/// Tuning knobs for the checkout engine.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub fees: FeeSchedule,
    pub delivery_defaults: DeliveryFeeDefaults,
    /// How long a checkout session stays open.
    pub session_ttl: Duration,
    /// The delivery method used to price a new session before the buyer picks one.
    pub default_delivery_method: DeliveryMethod,
    /// The smallest amount a payment intent may be created for.
    pub min_intent_amount: Money,
    pub currency: String,
    /// Platform fee taken from the order total when earnings are credited on completion.
    pub completion_fee_rate: Rate,
    /// Outbox tasks are given up on after this many failed deliveries.
    pub outbox_max_attempts: i64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            delivery_defaults: DeliveryFeeDefaults::default(),
            session_ttl: Duration::minutes(10),
            default_delivery_method: DeliveryMethod::SelfPickup,
            min_intent_amount: Money::from_cents(50),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            completion_fee_rate: Rate::from_percent(5),
            outbox_max_attempts: 10,
        }
    }
}

impl CheckoutConfig {
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_min_intent_amount(mut self, amount: Money) -> Self {
        self.min_intent_amount = amount;
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}
