use std::fmt::Display;

use campus_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{DeliveryMethod, ListingId, OrderId, OrderStatus, PaymentMethod, SessionId, SessionStatus, UserId},
    traits::{GatewayError, StoreError},
};

/// The broad class of a [`CheckoutError`]. Callers map this onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    ExternalDependency,
    ServiceError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::ExternalDependency => "EXTERNAL_DEPENDENCY",
            ErrorKind::ServiceError => "SERVICE_ERROR",
        };
        write!(f, "{s}")
    }
}

/// A problem with one requested line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub listing_id: ListingId,
    pub code: String,
    pub reason: String,
}

impl Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.listing_id, self.reason)
    }
}

/// Why the order for one seller group could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerFailure {
    pub seller_id: UserId,
    pub seller_name: String,
    pub code: String,
    pub reason: String,
}

fn join<T: Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid request. {0}")]
    InvalidInput(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Some items cannot be checked out. {}", join(.0))]
    InvalidItems(Vec<ItemError>),
    #[error("Not enough stock for listing {listing_id}. Requested {requested}{}", .available.map(|a| format!(", {a} available")).unwrap_or_default())]
    InsufficientStock { listing_id: ListingId, requested: i64, available: Option<i64> },
    #[error("Checkout session {0} does not exist")]
    SessionNotFound(SessionId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Listing {0} does not exist")]
    ListingNotFound(ListingId),
    #[error("User {0} does not exist")]
    UserNotFound(UserId),
    #[error("{0}")]
    Forbidden(String),
    #[error("Checkout session {0} has expired")]
    SessionExpired(SessionId),
    #[error("Cannot {action} checkout session {session_id} while it is {status}")]
    InvalidSessionState { session_id: SessionId, status: SessionStatus, action: &'static str },
    #[error("Invalid delivery address. {0}")]
    AddressMismatch(String),
    #[error("{method} is not offered by: {}", .sellers.join(", "))]
    DeliveryUnavailable { method: DeliveryMethod, sellers: Vec<String> },
    #[error("These sellers do not deliver to {campus}: {}", .sellers.join(", "))]
    NotDeliverable { campus: String, sellers: Vec<String> },
    #[error("{method} payment is only available for orders of at least {minimum} per seller")]
    PaymentMethodNotAllowed { method: PaymentMethod, minimum: Money },
    #[error("The checkout is missing its {0}")]
    MissingCheckoutDetails(&'static str),
    #[error("Please complete your profile before ordering. Missing: {}", .0.join(", "))]
    IncompleteProfile(Vec<&'static str>),
    #[error("All items in an order must come from the same seller")]
    MultipleSellers,
    #[error("The amount {amount} is below the minimum of {minimum} for online payment")]
    AmountBelowMinimum { amount: Money, minimum: Money },
    #[error("Cash on delivery checkouts do not use payment intents")]
    OfflinePayment,
    #[error("Checkout session {0} has no payment intent")]
    PaymentIntentRequired(SessionId),
    #[error("Payment failed. {0}")]
    PaymentFailed(String),
    #[error("No orders could be created. {}", join_failures(.0))]
    OrderCreationFailed(Vec<SellerFailure>),
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Checkout session {0} was changed by another request. Please try again")]
    VersionConflict(SessionId),
    #[error("Another checkout for buyer {0} was started at the same time")]
    ConcurrentCheckout(UserId),
    #[error("Order {order_id} changed status while it was being updated (it is no longer {expected})")]
    OrderStatusChanged { order_id: OrderId, expected: OrderStatus },
    #[error("Payment gateway error. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Internal error. {0}")]
    DatabaseError(String),
}

fn join_failures(failures: &[SellerFailure]) -> String {
    failures.iter().map(|f| format!("{}: {}", f.seller_name, f.reason)).collect::<Vec<_>>().join("; ")
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        use CheckoutError::*;
        match self {
            InvalidInput(_) |
            EmptyCart |
            InvalidItems(_) |
            InsufficientStock { .. } |
            SessionExpired(_) |
            InvalidSessionState { .. } |
            AddressMismatch(_) |
            DeliveryUnavailable { .. } |
            NotDeliverable { .. } |
            PaymentMethodNotAllowed { .. } |
            MissingCheckoutDetails(_) |
            IncompleteProfile(_) |
            MultipleSellers |
            AmountBelowMinimum { .. } |
            OfflinePayment |
            PaymentIntentRequired(_) |
            PaymentFailed(_) |
            OrderCreationFailed(_) |
            InvalidTransition { .. } => ErrorKind::Validation,
            SessionNotFound(_) | OrderNotFound(_) | ListingNotFound(_) | UserNotFound(_) => ErrorKind::NotFound,
            Forbidden(_) => ErrorKind::Forbidden,
            VersionConflict(_) | ConcurrentCheckout(_) | OrderStatusChanged { .. } => ErrorKind::Conflict,
            CheckoutError::GatewayError(_) => ErrorKind::ExternalDependency,
            DatabaseError(_) => ErrorKind::ServiceError,
        }
    }

    /// A stable, machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        use CheckoutError::*;
        match self {
            InvalidInput(_) => "VALIDATION_ERROR",
            EmptyCart => "EMPTY_CART",
            InvalidItems(_) => "INVALID_ITEMS",
            InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            SessionNotFound(_) => "SESSION_NOT_FOUND",
            OrderNotFound(_) => "ORDER_NOT_FOUND",
            ListingNotFound(_) => "LISTING_NOT_FOUND",
            UserNotFound(_) => "USER_NOT_FOUND",
            Forbidden(_) => "FORBIDDEN",
            SessionExpired(_) => "SESSION_EXPIRED",
            InvalidSessionState { .. } => "INVALID_SESSION_STATE",
            AddressMismatch(_) => "INVALID_DELIVERY_ADDRESS",
            DeliveryUnavailable { .. } => "DELIVERY_METHOD_UNAVAILABLE",
            NotDeliverable { .. } => "NOT_DELIVERABLE",
            PaymentMethodNotAllowed { .. } => "PAYMENT_METHOD_NOT_ALLOWED",
            MissingCheckoutDetails(_) => "MISSING_CHECKOUT_DETAILS",
            IncompleteProfile(_) => "INCOMPLETE_PROFILE",
            MultipleSellers => "MULTIPLE_SELLERS",
            AmountBelowMinimum { .. } => "AMOUNT_BELOW_MINIMUM",
            OfflinePayment => "PAYMENT_METHOD_NOT_ONLINE",
            PaymentIntentRequired(_) => "PAYMENT_INTENT_REQUIRED",
            PaymentFailed(_) => "PAYMENT_FAILED",
            OrderCreationFailed(_) => "ORDER_CREATION_FAILED",
            InvalidTransition { .. } => "INVALID_TRANSITION",
            VersionConflict(_) => "VERSION_CONFLICT",
            ConcurrentCheckout(_) => "CONCURRENT_CHECKOUT",
            OrderStatusChanged { .. } => "ORDER_STATUS_CHANGED",
            CheckoutError::GatewayError(crate::traits::GatewayError::NotConfigured) => "GATEWAY_NOT_CONFIGURED",
            CheckoutError::GatewayError(_) => "GATEWAY_ERROR",
            DatabaseError(_) => "SERVICE_ERROR",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ListingNotFound(id) => CheckoutError::ListingNotFound(id),
            StoreError::VariantNotFound { listing_id, variant_id } => {
                CheckoutError::InvalidInput(format!("Listing {listing_id} has no variant {variant_id}"))
            },
            StoreError::UserNotFound(id) => CheckoutError::UserNotFound(id),
            StoreError::SessionNotFound(id) => CheckoutError::SessionNotFound(id),
            StoreError::OrderNotFound(id) => CheckoutError::OrderNotFound(id),
            StoreError::VersionConflict(id) => CheckoutError::VersionConflict(id),
            StoreError::ActiveSessionExists(id) => CheckoutError::ConcurrentCheckout(id),
            StoreError::InsufficientStock { listing_id, requested, .. } => {
                CheckoutError::InsufficientStock { listing_id, requested, available: None }
            },
            StoreError::OrderStatusChanged { order_id, expected } => {
                CheckoutError::OrderStatusChanged { order_id, expected }
            },
            StoreError::DatabaseError(s) | StoreError::DeliveryFailed(s) => CheckoutError::DatabaseError(s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_and_kinds() {
        let e = CheckoutError::InvalidTransition { from: OrderStatus::Cancelled, to: OrderStatus::Cancelled };
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert_eq!(e.code(), "INVALID_TRANSITION");
        assert_eq!(e.to_string(), "Cannot change order status from cancelled to cancelled");

        let e = CheckoutError::from(StoreError::VersionConflict(SessionId::from("s1")));
        assert_eq!(e.kind(), ErrorKind::Conflict);
        assert_eq!(e.code(), "VERSION_CONFLICT");

        let e = CheckoutError::from(GatewayError::NotConfigured);
        assert_eq!(e.kind(), ErrorKind::ExternalDependency);
        assert_eq!(e.code(), "GATEWAY_NOT_CONFIGURED");
    }

    #[test]
    fn stock_message_mentions_availability() {
        let e = CheckoutError::InsufficientStock { listing_id: "l1".into(), requested: 3, available: Some(1) };
        assert_eq!(e.to_string(), "Not enough stock for listing l1. Requested 3, 1 available");
        let e = CheckoutError::InsufficientStock { listing_id: "l1".into(), requested: 3, available: None };
        assert_eq!(e.to_string(), "Not enough stock for listing l1. Requested 3");
    }
}
