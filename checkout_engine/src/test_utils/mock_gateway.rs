use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use crate::traits::{GatewayError, IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent};

#[derive(Default)]
struct GatewayState {
    intents: HashMap<String, PaymentIntent>,
    idempotency_keys: HashMap<String, String>,
    creates: usize,
    cancels: usize,
    unavailable: bool,
}

/// An in-memory payment gateway. Tests script intent statuses and can take the gateway offline.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl Debug for MockGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGateway")
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status the gateway reports for an intent from now on.
    pub fn set_status(&self, intent_id: &str, status: IntentStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(intent) = state.intents.get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// The number of intents actually created. Replays of an idempotency key do not count.
    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancels
    }

    pub fn intent(&self, intent_id: &str) -> Option<PaymentIntent> {
        self.state.lock().unwrap().intents.get(intent_id).cloned()
    }

    fn check_available(state: &GatewayState) -> Result<(), GatewayError> {
        if state.unavailable {
            Err(GatewayError::Unreachable("mock gateway is offline".into()))
        } else {
            Ok(())
        }
    }

    fn update(&self, intent_id: &str, status: IntentStatus) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if status == IntentStatus::Canceled {
            state.cancels += 1;
        }
        let intent = state.intents.get_mut(intent_id).ok_or_else(|| GatewayError::NotFound(intent_id.to_string()))?;
        intent.status = status;
        Ok(intent.clone())
    }
}

impl PaymentGateway for MockGateway {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if let Some(id) = state.idempotency_keys.get(&intent.idempotency_key) {
            return state.intents.get(id).cloned().ok_or_else(|| GatewayError::NotFound(id.clone()));
        }
        if intent.amount <= 0 {
            return Err(GatewayError::Rejected(format!("Invalid amount {}", intent.amount)));
        }
        let id = format!("pi_{:016x}", rand::random::<u64>());
        let created = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret_{:08x}", rand::random::<u32>())),
            amount: intent.amount,
            currency: intent.currency,
            status: IntentStatus::RequiresPaymentMethod,
        };
        state.creates += 1;
        state.idempotency_keys.insert(intent.idempotency_key, id.clone());
        state.intents.insert(id, created.clone());
        Ok(created)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state.intents.get(id).cloned().ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.update(id, IntentStatus::Canceled)
    }

    async fn confirm_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.update(id, IntentStatus::Succeeded)
    }
}
