//! Turning a checkout into orders.
//!
//! Confirming a checkout creates one order per seller group. Each group succeeds or fails on its own: a seller that
//! has run out of stock does not stop the other sellers' orders from being created. Each order is persisted together
//! with its stock decrements in a single transaction, so an order never exists without its stock effect.
use std::fmt::Debug;

use campus_common::Money;
use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    checkout_api::{
        checkout_config::CheckoutConfig,
        errors::{CheckoutError, ItemError, SellerFailure},
        order_objects::{ConfirmationResult, OrderRequest},
        payment_api::PaymentIntentApi,
        session_api::CheckoutSessionApi,
        session_objects::{ItemRequest, PaymentVerification},
        stock_api::StockReservationApi,
    },
    db_types::{
        CheckoutSession,
        NewNotification,
        NewOrder,
        NotificationKind,
        Order,
        OrderId,
        OrderItem,
        PartySnapshot,
        PaymentDetails,
        PaymentStatus,
        SellerGroup,
        SessionId,
        SessionStatus,
        SessionType,
        SideEffect,
        UserId,
    },
    events::{CheckoutCompletedEvent, EventProducers, OrderCreatedEvent},
    fees::DeliveryFeeResolver,
    traits::{
        CartManagement,
        CheckoutSessionManagement,
        ListingManagement,
        OrderManagement,
        PaymentGateway,
        UserManagement,
    },
};

pub struct OrderFulfillmentApi<B, G> {
    db: B,
    sessions: CheckoutSessionApi<B, G>,
    payments: PaymentIntentApi<B, G>,
    stock: StockReservationApi<B>,
    delivery: DeliveryFeeResolver<B>,
    producers: EventProducers,
}

impl<B, G> Debug for OrderFulfillmentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFulfillmentApi")
    }
}

impl<B: Clone, G: Clone> OrderFulfillmentApi<B, G> {
    pub fn new(db: B, gateway: G, config: CheckoutConfig, producers: EventProducers) -> Self {
        let sessions = CheckoutSessionApi::new(db.clone(), gateway.clone(), config.clone());
        let payments = PaymentIntentApi::new(db.clone(), gateway, config.clone());
        let stock = StockReservationApi::new(db.clone());
        let delivery = DeliveryFeeResolver::new(db.clone(), config.delivery_defaults);
        Self { db, sessions, payments, stock, delivery, producers }
    }
}

impl<B, G> OrderFulfillmentApi<B, G>
where
    B: ListingManagement + CartManagement + UserManagement + CheckoutSessionManagement + OrderManagement,
    G: PaymentGateway,
{
    /// Confirms a checkout, creating one order per seller group.
    ///
    /// The session is held in `processing` while orders are created. If no order at all could be created the session
    /// is put back the way it was and [`CheckoutError::OrderCreationFailed`] lists every seller's failure. Otherwise
    /// the session completes, and for cart checkouts the listings that made it into an order are removed from the
    /// cart. Listings from failed sellers stay in the cart. Once any order exists the confirmation succeeds, even if the
    /// session itself cannot be marked as completed.
    pub async fn confirm(&self, session_id: &SessionId, buyer_id: &UserId) -> Result<ConfirmationResult, CheckoutError> {
        let session = self.sessions.get(session_id, buyer_id).await?;
        match session.status {
            SessionStatus::Pending | SessionStatus::PaymentIntentCreated => {},
            SessionStatus::Expired => return Err(CheckoutError::SessionExpired(session.id)),
            status => {
                return Err(CheckoutError::InvalidSessionState { session_id: session.id, status, action: "confirm" })
            },
        }
        let delivery_method = session.delivery_method.ok_or(CheckoutError::MissingCheckoutDetails("delivery method"))?;
        let delivery_address =
            session.delivery_address.clone().ok_or(CheckoutError::MissingCheckoutDetails("delivery address"))?;
        let payment_method = session.payment_method.ok_or(CheckoutError::MissingCheckoutDetails("payment method"))?;

        let (payment_status, payment_details) = if payment_method.is_online() {
            match self.payments.verify_payment(&session).await? {
                PaymentVerification::Paid { transaction_ref, paid_at } => {
                    (PaymentStatus::Paid, Some(PaymentDetails { paid_at, transaction_ref }))
                },
                PaymentVerification::Pending => (PaymentStatus::Pending, None),
                PaymentVerification::Failed(reason) => return Err(CheckoutError::PaymentFailed(reason)),
            }
        } else {
            (PaymentStatus::Pending, None)
        };

        let previous_status = session.status;
        let mut locked = session;
        locked.status = SessionStatus::Processing;
        let mut locked = self.db.update_session(&locked).await?;
        debug!("📦 Checkout session {session_id} is processing {} seller groups", locked.seller_groups.len());

        let mut orders = Vec::with_capacity(locked.seller_groups.len());
        let mut failures = Vec::new();
        for group in &locked.seller_groups {
            let request = OrderRequest {
                buyer_id: locked.buyer_id.clone(),
                seller_id: group.seller_id.clone(),
                session_id: Some(locked.id.clone()),
                items: group.items.iter().map(ItemRequest::from).collect(),
                delivery_method,
                delivery_address: delivery_address.clone(),
                payment_method,
                payment_status,
                payment_details: payment_details.clone(),
            };
            match self.create_order(request).await {
                Ok(order) => orders.push(order),
                Err(e) => {
                    warn!("📦 Order for seller {} in checkout {session_id} could not be created: {e}", group.seller_id);
                    failures.push(seller_failure(group, &e));
                },
            }
        }

        if orders.is_empty() {
            locked.status = previous_status;
            if let Err(e) = self.db.update_session(&locked).await {
                error!("📦 Could not release checkout session {session_id} after every order failed: {e}");
            }
            return Err(CheckoutError::OrderCreationFailed(failures));
        }

        locked.status = SessionStatus::Completed;
        locked.order_ids = orders.iter().map(|o| o.id.clone()).collect();
        // Orders exist from here on. The confirmation succeeds even if the session write fails
        let session = match self.db.update_session(&locked).await {
            Ok(session) => session,
            Err(e) => {
                error!(
                    "📦 Orders for checkout session {session_id} were created but the session could not be completed: \
                     {e}"
                );
                locked
            },
        };
        if session.session_type == SessionType::Cart {
            self.clear_checked_out_items(&session, &orders).await;
        }
        info!(
            "📦 Checkout session {session_id} completed with {} orders and {} failed sellers",
            orders.len(),
            failures.len()
        );
        let failed_sellers = failures.iter().map(|f| f.seller_id.clone()).collect();
        self.producers.publish_checkout_completed(CheckoutCompletedEvent { session: session.clone(), failed_sellers }).await;
        Ok(ConfirmationResult { session, orders, failures })
    }

    async fn clear_checked_out_items(&self, session: &CheckoutSession, orders: &[Order]) {
        let mut listing_ids = orders.iter().flat_map(Order::listing_ids).collect::<Vec<_>>();
        listing_ids.sort();
        listing_ids.dedup();
        match self.db.remove_cart_items(&session.buyer_id, &listing_ids).await {
            Ok(n) => debug!("📦 Removed {n} checked-out items from the cart of {}", session.buyer_id),
            Err(e) => warn!("📦 Could not remove checked-out items from the cart of {}: {e}", session.buyer_id),
        }
    }

    /// Creates a single seller's order at current listing prices.
    ///
    /// The buyer's profile must have a username and phone number. Items are re-validated against live listings and
    /// must all belong to `request.seller_id`. Stock is taken atomically with the insert, so a concurrent buyer who
    /// got there first results in [`CheckoutError::InsufficientStock`] and no order.
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::InvalidInput("An order needs at least one item".into()));
        }
        let buyer = self
            .db
            .fetch_user(&request.buyer_id)
            .await?
            .ok_or_else(|| CheckoutError::UserNotFound(request.buyer_id.clone()))?;
        let missing = buyer.missing_profile_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::IncompleteProfile(missing));
        }
        let seller = match self.db.fetch_user(&request.seller_id).await? {
            Some(profile) => PartySnapshot::seller(&profile),
            None => {
                debug!("📦 Seller {} has no profile. Using a bare snapshot", request.seller_id);
                PartySnapshot { id: request.seller_id.clone(), name: request.seller_id.to_string(), email: None, phone: None }
            },
        };

        let validation = self.stock.validate_items(&request.items).await?;
        if !validation.valid {
            return Err(item_errors_to_checkout_error(&request, validation.errors));
        }
        if validation.items.iter().any(|i| i.seller_id != request.seller_id) {
            return Err(CheckoutError::MultipleSellers);
        }
        request.delivery_address.validate_for(request.delivery_method).map_err(CheckoutError::AddressMismatch)?;

        let items = validation
            .items
            .into_iter()
            .map(|i| OrderItem {
                line_total: i.unit_price * i.quantity,
                listing_id: i.listing_id,
                name: i.name,
                unit_price: i.unit_price,
                quantity: i.quantity,
                item_type: i.item_type,
                variant: i.variant,
                image: i.image,
            })
            .collect::<Vec<_>>();
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();
        let shipping_fee = self
            .delivery
            .resolve(request.delivery_method, &request.seller_id, subtotal)
            .await
            .ok_or_else(|| CheckoutError::DeliveryUnavailable {
                method: request.delivery_method,
                sellers: vec![seller.name.clone()],
            })?;
        let order = NewOrder {
            id: OrderId::random(),
            session_id: request.session_id,
            buyer: PartySnapshot::buyer(&buyer),
            seller,
            items,
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            payment_method: request.payment_method,
            payment_status: request.payment_status,
            payment_details: request.payment_details,
            delivery_method: request.delivery_method,
            delivery_address: request.delivery_address,
            created_at: Utc::now(),
        };
        let notice = NewNotification::new(
            order.seller.id.clone(),
            NotificationKind::NewOrder,
            "New order".to_string(),
            format!("{} ordered {} item(s) for {}", order.buyer.name, order.items.len(), order.total),
        )
        .with_data(json!({ "order_id": order.id }));
        let order = self.db.create_order_with_stock(order, vec![SideEffect::Notify(notice)]).await?;
        info!("📦 Order {} for {} created for buyer {} with seller {}", order.id, order.total, order.buyer.id, order.seller.id);
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        Ok(order)
    }
}

/// A lone stock shortfall is reported as such, so that callers can tell it apart from other item problems.
fn item_errors_to_checkout_error(request: &OrderRequest, mut errors: Vec<ItemError>) -> CheckoutError {
    if errors.len() == 1 && errors[0].code == "INSUFFICIENT_STOCK" {
        let error = errors.remove(0);
        let requested = request.items.iter().filter(|i| i.listing_id == error.listing_id).map(|i| i.quantity).sum();
        return CheckoutError::InsufficientStock { listing_id: error.listing_id, requested, available: None };
    }
    CheckoutError::InvalidItems(errors)
}

fn seller_failure(group: &SellerGroup, error: &CheckoutError) -> SellerFailure {
    SellerFailure {
        seller_id: group.seller_id.clone(),
        seller_name: group.seller_name.clone(),
        code: error.code().to_string(),
        reason: error.to_string(),
    }
}
