//! Checkout session lifecycle.
//!
//! A session moves `pending -> payment_intent_created -> processing -> completed`, and can end early as `cancelled`
//! or `expired`. Delivery and payment details can only change while the session is `pending`. Sessions expire
//! lazily: any read that finds an open session past its expiry time expires it on the spot.
use std::fmt::Debug;

use campus_common::Money;
use chrono::Utc;
use log::*;

use crate::{
    checkout_api::{
        checkout_config::CheckoutConfig,
        errors::CheckoutError,
        payment_api::cancel_intent_quietly,
        session_objects::{DirectPurchase, ItemRequest, SessionUpdate},
        stock_api::StockReservationApi,
    },
    db_types::{
        CheckoutSession,
        DeliveryAddress,
        DeliveryCategory,
        DeliveryMethod,
        NewCheckoutSession,
        PaymentMethod,
        SellerGroup,
        SessionId,
        SessionItem,
        SessionPricing,
        SessionStatus,
        SessionType,
        UserId,
    },
    fees::DeliveryFeeResolver,
    traits::{
        CartManagement,
        CheckoutSessionManagement,
        ListingManagement,
        PaymentGateway,
        StoreError,
        UserManagement,
    },
};

/// How to treat a seller that has disabled the chosen delivery category when pricing seller groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnavailableDelivery {
    /// Price the delivery at zero. Used for the provisional default method of a new session.
    PriceAsFree,
    /// Reject the request, naming the sellers.
    Reject,
}

pub struct CheckoutSessionApi<B, G> {
    db: B,
    gateway: G,
    config: CheckoutConfig,
    stock: StockReservationApi<B>,
    delivery: DeliveryFeeResolver<B>,
}

impl<B, G> Debug for CheckoutSessionApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutSessionApi")
    }
}

impl<B: Clone, G: Clone> Clone for CheckoutSessionApi<B, G> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            stock: self.stock.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

impl<B: Clone, G> CheckoutSessionApi<B, G> {
    pub fn new(db: B, gateway: G, config: CheckoutConfig) -> Self {
        let stock = StockReservationApi::new(db.clone());
        let delivery = DeliveryFeeResolver::new(db.clone(), config.delivery_defaults.clone());
        Self { db, gateway, config, stock, delivery }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn stock(&self) -> &StockReservationApi<B> {
        &self.stock
    }
}

impl<B, G> CheckoutSessionApi<B, G>
where
    B: ListingManagement + CartManagement + UserManagement + CheckoutSessionManagement,
    G: PaymentGateway,
{
    /// Starts a checkout for everything in the buyer's cart, replacing any open checkout.
    pub async fn create_from_cart(&self, buyer_id: &UserId) -> Result<CheckoutSession, CheckoutError> {
        let cart = self.db.fetch_cart(buyer_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let requests = cart.items.iter().map(ItemRequest::from).collect::<Vec<_>>();
        self.create_session(buyer_id, SessionType::Cart, &requests).await
    }

    /// Starts a checkout for a single listing, replacing any open checkout.
    pub async fn create_from_direct(
        &self,
        buyer_id: &UserId,
        purchase: DirectPurchase,
    ) -> Result<CheckoutSession, CheckoutError> {
        let request =
            ItemRequest { listing_id: purchase.listing_id, variant_id: purchase.variant_id, quantity: purchase.quantity };
        self.create_session(buyer_id, SessionType::Direct, &[request]).await
    }

    async fn create_session(
        &self,
        buyer_id: &UserId,
        session_type: SessionType,
        requests: &[ItemRequest],
    ) -> Result<CheckoutSession, CheckoutError> {
        let validation = self.stock.validate_items(requests).await?;
        if !validation.valid {
            debug!("🛒 Checkout for {buyer_id} rejected. {} items are invalid", validation.errors.len());
            return Err(CheckoutError::InvalidItems(validation.errors));
        }
        let items = validation.items.into_iter().map(SessionItem::from).collect::<Vec<_>>();
        let seller_groups = self
            .build_seller_groups(
                &items,
                self.config.default_delivery_method,
                PaymentMethod::Cod,
                UnavailableDelivery::PriceAsFree,
            )
            .await?;
        let pricing = SessionPricing::from_groups(&seller_groups);
        let reservations = self.stock.reserve(&items);
        let now = Utc::now();
        let new_session = NewCheckoutSession {
            id: SessionId::random(),
            buyer_id: buyer_id.clone(),
            session_type,
            items,
            seller_groups,
            pricing,
            payment_method: PaymentMethod::Cod,
            reservations,
            created_at: now,
            expires_at: now + self.config.session_ttl,
        };
        let (session, replaced) = self.db.insert_session_replacing_active(new_session).await?;
        for old in replaced {
            info!("🛒 Checkout session {} was replaced by {}", old.id, session.id);
            self.release_session_resources(&old).await;
        }
        info!(
            "🛒 New {session_type:?} checkout session {} for {buyer_id}: {} items from {} sellers, total {}",
            session.id,
            session.items.len(),
            session.seller_groups.len(),
            session.pricing.total
        );
        Ok(session)
    }

    /// Applies the buyer's delivery and payment choices to an open session and reprices every seller group.
    ///
    /// If another request updates the session concurrently, the current session is re-read and the same changes are
    /// applied once more before giving up with [`CheckoutError::VersionConflict`].
    pub async fn update(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
        update: SessionUpdate,
    ) -> Result<CheckoutSession, CheckoutError> {
        if update.is_empty() {
            return Err(CheckoutError::InvalidInput("Nothing to update".into()));
        }
        let mut retried = false;
        loop {
            let session = self.fetch_owned(session_id, buyer_id).await?;
            let session = self.expire_if_stale(session).await?;
            match session.status {
                SessionStatus::Pending => {},
                SessionStatus::Expired => return Err(CheckoutError::SessionExpired(session.id)),
                status => {
                    return Err(CheckoutError::InvalidSessionState {
                        session_id: session.id,
                        status,
                        action: "update",
                    })
                },
            }
            let updated = self.apply_update(session, &update).await?;
            match self.db.update_session(&updated).await {
                Ok(session) => {
                    debug!("🛒 Checkout session {} updated. New total {}", session.id, session.pricing.total);
                    return Ok(session);
                },
                Err(StoreError::VersionConflict(_)) if !retried => {
                    debug!("🛒 Checkout session {session_id} changed underneath us. Reapplying the update");
                    retried = true;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn apply_update(
        &self,
        mut session: CheckoutSession,
        update: &SessionUpdate,
    ) -> Result<CheckoutSession, CheckoutError> {
        if let Some(method) = update.delivery_method {
            // An address of the wrong shape for the new method is dropped rather than kept around.
            let stale = session.delivery_address.as_ref().map(|a| a.category() != method.category()).unwrap_or(false);
            if stale && update.delivery_address.is_none() {
                session.delivery_address = None;
            }
            session.delivery_method = Some(method);
        }
        if let Some(address) = &update.delivery_address {
            let method = session.delivery_method.unwrap_or(self.config.default_delivery_method);
            address.validate_for(method).map_err(CheckoutError::AddressMismatch)?;
            session.delivery_address = Some(address.clone());
        }
        if let Some(method) = update.payment_method {
            session.payment_method = Some(method);
        }
        let delivery_method = session.delivery_method.unwrap_or(self.config.default_delivery_method);
        if let (DeliveryCategory::Campus, Some(address)) = (delivery_method.category(), &session.delivery_address) {
            self.check_campus_deliverability(&session.seller_groups, address).await?;
        }
        let payment_method = session.payment_method.unwrap_or(PaymentMethod::Cod);
        let groups =
            self.build_seller_groups(&session.items, delivery_method, payment_method, UnavailableDelivery::Reject).await?;
        if payment_method.is_online() && groups.iter().any(|g| !g.allow_online_payment) {
            return Err(CheckoutError::PaymentMethodNotAllowed {
                method: payment_method,
                minimum: self.config.fees.online_threshold,
            });
        }
        session.pricing = SessionPricing::from_groups(&groups);
        session.seller_groups = groups;
        Ok(session)
    }

    /// Every seller in the session must deliver to the campus. Sellers without a profile cannot.
    async fn check_campus_deliverability(
        &self,
        groups: &[SellerGroup],
        address: &DeliveryAddress,
    ) -> Result<(), CheckoutError> {
        let Some(campus) = address.campus() else {
            return Ok(());
        };
        let mut missing = Vec::new();
        for group in groups {
            let delivers = match self.db.fetch_user(&group.seller_id).await? {
                Some(seller) => seller.delivers_to_campus(campus),
                None => false,
            };
            if !delivers {
                missing.push(group.seller_name.clone());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::NotDeliverable { campus: campus.to_string(), sellers: missing })
        }
    }

    /// Partitions the items by seller, in order of first appearance, and prices each partition.
    async fn build_seller_groups(
        &self,
        items: &[SessionItem],
        delivery_method: DeliveryMethod,
        payment_method: PaymentMethod,
        unavailable: UnavailableDelivery,
    ) -> Result<Vec<SellerGroup>, CheckoutError> {
        let mut partitions: Vec<(UserId, Vec<SessionItem>)> = Vec::new();
        for item in items {
            match partitions.iter_mut().find(|(seller, _)| seller == &item.seller_id) {
                Some((_, group)) => group.push(item.clone()),
                None => partitions.push((item.seller_id.clone(), vec![item.clone()])),
            }
        }
        let mut groups = Vec::with_capacity(partitions.len());
        let mut unavailable_for = Vec::new();
        for (seller_id, items) in partitions {
            let seller_name = match self.db.fetch_user(&seller_id).await {
                Ok(Some(seller)) => seller.display_name,
                Ok(None) => seller_id.to_string(),
                Err(e) => {
                    warn!("🛒 Could not load seller {seller_id}: {e}");
                    seller_id.to_string()
                },
            };
            let subtotal: Money = items.iter().map(SessionItem::line_total).sum();
            let delivery_fee = match self.delivery.resolve(delivery_method, &seller_id, subtotal).await {
                Some(fee) => fee,
                None if unavailable == UnavailableDelivery::PriceAsFree => Money::default(),
                None => {
                    unavailable_for.push(seller_name);
                    continue;
                },
            };
            let fees = self.config.fees.compute(subtotal, delivery_fee, payment_method);
            groups.push(SellerGroup {
                seller_id,
                seller_name,
                items,
                subtotal,
                delivery_fee,
                platform_fee: fees.platform_fee,
                platform_fee_rate: fees.platform_fee_rate,
                processor_fee: fees.processor_fee,
                total_amount: fees.total_amount,
                seller_receives: fees.seller_receives,
                tier: fees.tier,
                allow_online_payment: fees.allow_online_payment,
            });
        }
        if !unavailable_for.is_empty() {
            return Err(CheckoutError::DeliveryUnavailable { method: delivery_method, sellers: unavailable_for });
        }
        Ok(groups)
    }

    /// Cancels an open session and releases its reservations and payment intent.
    ///
    /// Cancelling a session that is already cancelled or expired is a no-op. Sessions that are being confirmed or are
    /// completed cannot be cancelled.
    pub async fn cancel(&self, session_id: &SessionId, buyer_id: &UserId) -> Result<CheckoutSession, CheckoutError> {
        let mut retried = false;
        loop {
            let mut session = self.fetch_owned(session_id, buyer_id).await?;
            match session.status {
                SessionStatus::Completed | SessionStatus::Processing => {
                    return Err(CheckoutError::InvalidSessionState {
                        session_id: session.id,
                        status: session.status,
                        action: "cancel",
                    })
                },
                SessionStatus::Cancelled | SessionStatus::Expired => return Ok(session),
                SessionStatus::Pending | SessionStatus::PaymentIntentCreated => {},
            }
            session.status = SessionStatus::Cancelled;
            match self.db.update_session(&session).await {
                Ok(cancelled) => {
                    self.release_session_resources(&cancelled).await;
                    info!("🛒 Checkout session {session_id} cancelled by the buyer");
                    return Ok(cancelled);
                },
                Err(StoreError::VersionConflict(_)) if !retried => retried = true,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The buyer's open session, if any. A session found past its expiry time is expired and `None` is returned.
    pub async fn get_active(&self, buyer_id: &UserId) -> Result<Option<CheckoutSession>, CheckoutError> {
        let Some(session) = self.db.fetch_active_session(buyer_id).await? else {
            return Ok(None);
        };
        let session = self.expire_if_stale(session).await?;
        Ok((!session.status.is_terminal()).then_some(session))
    }

    /// Fetches one of the buyer's sessions, expiring it first if it is stale.
    pub async fn get(&self, session_id: &SessionId, buyer_id: &UserId) -> Result<CheckoutSession, CheckoutError> {
        let session = self.fetch_owned(session_id, buyer_id).await?;
        self.expire_if_stale(session).await
    }

    /// Expires every open session that is past its expiry time. Returns the number of sessions expired.
    pub async fn expire_stale_sessions(&self) -> Result<usize, CheckoutError> {
        let now = Utc::now();
        let stale =
            self.db.fetch_open_sessions().await?.into_iter().filter(|s| is_expirable(s, now)).collect::<Vec<_>>();
        let mut count = 0;
        for session in stale {
            let id = session.id.clone();
            match self.expire(session).await {
                Ok(s) if s.status == SessionStatus::Expired => count += 1,
                Ok(_) => {},
                Err(e) => warn!("🛒 Could not expire checkout session {id}: {e}"),
            }
        }
        if count > 0 {
            info!("🛒 Expired {count} stale checkout sessions");
        }
        Ok(count)
    }

    pub(crate) async fn fetch_owned(
        &self,
        session_id: &SessionId,
        buyer_id: &UserId,
    ) -> Result<CheckoutSession, CheckoutError> {
        let session =
            self.db.fetch_session(session_id).await?.ok_or_else(|| CheckoutError::SessionNotFound(session_id.clone()))?;
        if &session.buyer_id != buyer_id {
            warn!("🛒 {buyer_id} tried to access checkout session {session_id}, which belongs to {}", session.buyer_id);
            return Err(CheckoutError::Forbidden("This checkout session belongs to someone else".into()));
        }
        Ok(session)
    }

    /// Expires the session if it is open and past its expiry time, otherwise returns it unchanged.
    pub(crate) async fn expire_if_stale(&self, session: CheckoutSession) -> Result<CheckoutSession, CheckoutError> {
        if is_expirable(&session, Utc::now()) {
            self.expire(session).await
        } else {
            Ok(session)
        }
    }

    async fn expire(&self, mut session: CheckoutSession) -> Result<CheckoutSession, CheckoutError> {
        let id = session.id.clone();
        session.status = SessionStatus::Expired;
        match self.db.update_session(&session).await {
            Ok(expired) => {
                self.release_session_resources(&expired).await;
                info!("🛒 Checkout session {id} has expired");
                Ok(expired)
            },
            Err(StoreError::VersionConflict(_)) => {
                // Someone else moved the session on. Whatever they did wins.
                debug!("🛒 Checkout session {id} changed while expiring it");
                self.db.fetch_session(&id).await?.ok_or(CheckoutError::SessionNotFound(id))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn release_session_resources(&self, session: &CheckoutSession) {
        self.stock.release(&session.id, &session.reservations);
        if let Some(intent_id) = &session.payment_intent_id {
            cancel_intent_quietly(&self.gateway, intent_id).await;
        }
    }
}

/// Sessions in `processing` are being turned into orders and are left alone.
fn is_expirable(session: &CheckoutSession, now: chrono::DateTime<Utc>) -> bool {
    matches!(session.status, SessionStatus::Pending | SessionStatus::PaymentIntentCreated) && session.is_past_expiry(now)
}
