//! Data types that are stored by the checkout backends and passed across the engine APIs.
use thiserror::Error;

mod carts;
mod delivery;
mod ids;
mod listings;
mod orders;
mod outbox;
mod sessions;
mod users;

pub use carts::{Cart, CartItem};
pub use delivery::{DeliveryAddress, DeliveryCategory, DeliveryMethod, PaymentMethod};
pub use ids::{ListingId, OrderId, SessionId, UserId, VariantId};
pub use listings::{
    Listing,
    ListingType,
    ListingVariant,
    NewListing,
    StockMovement,
    StockMovementReason,
    VariantSnapshot,
};
pub use orders::{
    NewOrder,
    Order,
    OrderItem,
    OrderStatus,
    OrderStatusUpdate,
    PartySnapshot,
    PaymentDetails,
    PaymentStatus,
    StatusChange,
};
pub use outbox::{EarningsEntry, NewNotification, Notification, NotificationKind, OutboxTask, SideEffect};
pub use sessions::{
    CheckoutSession,
    NewCheckoutSession,
    SellerGroup,
    SessionItem,
    SessionPricing,
    SessionStatus,
    SessionType,
    StockReservation,
};
pub use users::{Actor, CategoryFeeOverride, DeliverySettings, NewUser, Role, UserProfile};

#[derive(Debug, Clone, Error)]
#[error("Type conversion error: {0}")]
pub struct ConversionError(pub String);
