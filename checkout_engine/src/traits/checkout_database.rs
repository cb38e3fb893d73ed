use thiserror::Error;

use crate::{
    db_types::{ListingId, OrderId, OrderStatus, SessionId, UserId, VariantId},
    traits::{
        CartManagement,
        CheckoutSessionManagement,
        EarningsLedger,
        ListingManagement,
        NotificationDispatch,
        OrderManagement,
        OutboxManagement,
        UserManagement,
    },
};

/// The full set of behaviour a storage backend needs to support the checkout engine.
///
/// This is a convenience bound. The individual APIs only ask for the traits they use.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase:
    Clone
    + ListingManagement
    + CartManagement
    + UserManagement
    + CheckoutSessionManagement
    + OrderManagement
    + OutboxManagement
    + NotificationDispatch
    + EarningsLedger
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Listing {0} does not exist")]
    ListingNotFound(ListingId),
    #[error("Variant {variant_id} of listing {listing_id} does not exist")]
    VariantNotFound { listing_id: ListingId, variant_id: VariantId },
    #[error("User {0} does not exist")]
    UserNotFound(UserId),
    #[error("Checkout session {0} does not exist")]
    SessionNotFound(SessionId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Checkout session {0} was modified by another request")]
    VersionConflict(SessionId),
    #[error("Buyer {0} already has an active checkout session")]
    ActiveSessionExists(UserId),
    #[error("Not enough stock for listing {listing_id} to take {requested} units")]
    InsufficientStock { listing_id: ListingId, variant_id: Option<VariantId>, requested: i64 },
    #[error("Order {order_id} is no longer {expected}")]
    OrderStatusChanged { order_id: OrderId, expected: OrderStatus },
    #[error("Side effect could not be delivered. {0}")]
    DeliveryFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::DatabaseError(format!("Could not (de)serialize a stored document. {e}"))
    }
}
