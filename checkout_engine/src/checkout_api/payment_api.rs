//! Payment intents for online checkouts.
//!
//! Intents are created for the whole session total and are reused for as long as the gateway has not cancelled
//! them. Cash-on-delivery checkouts never talk to the gateway.
use std::{collections::BTreeMap, fmt::Debug};

use chrono::Utc;
use log::*;

use crate::{
    checkout_api::{
        checkout_config::CheckoutConfig,
        errors::CheckoutError,
        session_api::CheckoutSessionApi,
        session_objects::{IntentResponse, PaymentStatusReport, PaymentVerification},
    },
    db_types::{CheckoutSession, SessionId, SessionStatus, UserId},
    traits::{
        CartManagement,
        CheckoutSessionManagement,
        GatewayError,
        IntentStatus,
        ListingManagement,
        NewPaymentIntent,
        PaymentGateway,
        StoreError,
        UserManagement,
    },
};

pub struct PaymentIntentApi<B, G> {
    db: B,
    gateway: G,
    sessions: CheckoutSessionApi<B, G>,
}

impl<B, G> Debug for PaymentIntentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntentApi")
    }
}

impl<B: Clone, G: Clone> Clone for PaymentIntentApi<B, G> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), gateway: self.gateway.clone(), sessions: self.sessions.clone() }
    }
}

impl<B: Clone, G: Clone> PaymentIntentApi<B, G> {
    pub fn new(db: B, gateway: G, config: CheckoutConfig) -> Self {
        let sessions = CheckoutSessionApi::new(db.clone(), gateway.clone(), config);
        Self { db, gateway, sessions }
    }

    fn config(&self) -> &CheckoutConfig {
        self.sessions.config()
    }
}

impl<B, G> PaymentIntentApi<B, G>
where
    B: ListingManagement + CartManagement + UserManagement + CheckoutSessionManagement,
    G: PaymentGateway,
{
    /// Creates a payment intent for the session total, or returns the session's existing intent if the gateway has
    /// not cancelled it.
    pub async fn create_intent(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
    ) -> Result<IntentResponse, CheckoutError> {
        let session = self.open_session(session_id, buyer_id, "create a payment intent for").await?;
        let method = session.payment_method.ok_or(CheckoutError::MissingCheckoutDetails("payment method"))?;
        if !method.is_online() {
            return Err(CheckoutError::OfflinePayment);
        }
        let amount = session.pricing.total;
        let minimum = self.config().min_intent_amount;
        if amount < minimum {
            return Err(CheckoutError::AmountBelowMinimum { amount, minimum });
        }
        if let Some(intent_id) = &session.payment_intent_id {
            let existing = self.gateway.retrieve_intent(intent_id).await?;
            if !existing.status.is_canceled() {
                debug!("💳 Reusing payment intent {intent_id} for checkout session {session_id}");
                return Ok(existing.into());
            }
            debug!("💳 Payment intent {intent_id} was cancelled. Creating a new one for {session_id}");
        }
        let mut metadata = BTreeMap::new();
        metadata.insert("session_id".to_string(), session.id.to_string());
        metadata.insert("buyer_id".to_string(), session.buyer_id.to_string());
        let request = NewPaymentIntent {
            amount: amount.minor_units(),
            currency: self.config().currency.clone(),
            idempotency_key: format!("checkout-{}-{}", session.id, session.version),
            metadata,
        };
        let intent = self.gateway.create_intent(request).await?;
        let mut updated = session;
        updated.payment_intent_id = Some(intent.id.clone());
        updated.status = SessionStatus::PaymentIntentCreated;
        match self.db.update_session(&updated).await {
            Ok(_) => {
                info!("💳 Payment intent {} for {} created for checkout session {session_id}", intent.id, amount);
                Ok(intent.into())
            },
            Err(e) => {
                warn!("💳 Could not attach payment intent {} to session {session_id}: {e}", intent.id);
                cancel_intent_quietly(&self.gateway, &intent.id).await;
                Err(e.into())
            },
        }
    }

    /// Reports the gateway status of the session's payment intent.
    ///
    /// Gateway failures, including a gateway that was never configured, are reported as
    /// [`PaymentStatusReport::GatewayUnavailable`] rather than as errors.
    pub async fn get_status(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
    ) -> Result<PaymentStatusReport, CheckoutError> {
        let session = self.sessions.get(session_id, buyer_id).await?;
        let Some(intent_id) = session.payment_intent_id else {
            return Ok(PaymentStatusReport::NoIntent);
        };
        match self.gateway.retrieve_intent(&intent_id).await {
            Ok(intent) => Ok(PaymentStatusReport::Intent(intent.status)),
            Err(e) => {
                warn!("💳 Could not fetch payment intent {intent_id}: {e}");
                Ok(PaymentStatusReport::GatewayUnavailable)
            },
        }
    }

    pub async fn confirm_intent(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
    ) -> Result<IntentResponse, CheckoutError> {
        let session = self.open_session(session_id, buyer_id, "confirm the payment for").await?;
        let intent_id = session.payment_intent_id.ok_or_else(|| CheckoutError::PaymentIntentRequired(session.id))?;
        let intent = self.gateway.confirm_intent(&intent_id).await?;
        debug!("💳 Payment intent {intent_id} confirmed. Status is now {}", intent.status);
        Ok(intent.into())
    }

    /// Cancels the session's payment intent and reopens the session for changes.
    ///
    /// A failure to cancel at the gateway is logged and otherwise ignored.
    pub async fn cancel_intent(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
    ) -> Result<CheckoutSession, CheckoutError> {
        let mut retried = false;
        loop {
            let mut session = self.open_session(session_id, buyer_id, "cancel the payment for").await?;
            let Some(intent_id) = session.payment_intent_id.take() else {
                return Err(CheckoutError::PaymentIntentRequired(session.id));
            };
            session.status = SessionStatus::Pending;
            match self.db.update_session(&session).await {
                Ok(session) => {
                    cancel_intent_quietly(&self.gateway, &intent_id).await;
                    info!("💳 Payment intent {intent_id} for checkout session {session_id} cancelled");
                    return Ok(session);
                },
                Err(StoreError::VersionConflict(_)) if !retried => retried = true,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decides how the payment of an online checkout stands before orders are created from it.
    ///
    /// If the gateway cannot be asked, the payment is treated as pending rather than failed.
    pub async fn verify_payment(&self, session: &CheckoutSession) -> Result<PaymentVerification, CheckoutError> {
        let intent_id =
            session.payment_intent_id.as_ref().ok_or_else(|| CheckoutError::PaymentIntentRequired(session.id.clone()))?;
        let intent = match self.gateway.retrieve_intent(intent_id).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!("💳 Could not verify payment intent {intent_id}: {e}. Treating the payment as pending");
                return Ok(PaymentVerification::Pending);
            },
        };
        let verification = match intent.status {
            IntentStatus::Succeeded => {
                PaymentVerification::Paid { transaction_ref: intent.id.clone(), paid_at: Utc::now() }
            },
            IntentStatus::Canceled => PaymentVerification::Failed("The payment was cancelled".into()),
            IntentStatus::RequiresPaymentMethod => {
                PaymentVerification::Failed("The payment method was declined".into())
            },
            _ => PaymentVerification::Pending,
        };
        debug!("💳 Payment intent {intent_id} is {}: {verification:?}", intent.status);
        Ok(verification)
    }

    async fn open_session(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
        action: &'static str,
    ) -> Result<CheckoutSession, CheckoutError> {
        let session = self.sessions.get(session_id, buyer_id).await?;
        match session.status {
            SessionStatus::Pending | SessionStatus::PaymentIntentCreated => Ok(session),
            SessionStatus::Expired => Err(CheckoutError::SessionExpired(session.id)),
            status => Err(CheckoutError::InvalidSessionState { session_id: session.id, status, action }),
        }
    }
}

/// Cancels an intent, logging rather than returning any failure.
pub(crate) async fn cancel_intent_quietly<G: PaymentGateway>(gateway: &G, intent_id: &str) {
    match gateway.cancel_intent(intent_id).await {
        Ok(_) => debug!("💳 Payment intent {intent_id} cancelled"),
        Err(GatewayError::NotConfigured) => {
            debug!("💳 No payment gateway configured. Payment intent {intent_id} left as is")
        },
        Err(e) => warn!("💳 Could not cancel payment intent {intent_id}: {e}"),
    }
}
