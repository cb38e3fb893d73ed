//! # Backend and collaborator contracts
//!
//! This module defines the interfaces that storage backends and external collaborators need to provide to the
//! checkout engine.
//!
//! * [`ListingManagement`], [`CartManagement`] and [`UserManagement`] give access to the marketplace data the
//!   checkout reads from.
//! * [`CheckoutSessionManagement`] stores checkout sessions and enforces the one-active-session-per-buyer rule.
//! * [`OrderManagement`] persists orders together with their stock effects.
//! * [`OutboxManagement`], [`NotificationDispatch`] and [`EarningsLedger`] carry the at-least-once side effects of
//!   order state changes.
//! * [`PaymentGateway`] is the external payment provider.
//! * [`CheckoutDatabase`] bundles everything a storage backend implements.
mod cart_management;
mod checkout_database;
mod listing_management;
mod order_management;
mod outbox_management;
mod payment_gateway;
mod session_management;
mod side_effect_targets;
mod user_management;

pub use cart_management::CartManagement;
pub use checkout_database::{CheckoutDatabase, StoreError};
pub use listing_management::ListingManagement;
pub use order_management::OrderManagement;
pub use outbox_management::OutboxManagement;
pub use payment_gateway::{GatewayError, IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent};
pub use session_management::CheckoutSessionManagement;
pub use side_effect_targets::{EarningsLedger, NotificationDispatch};
pub use user_management::UserManagement;
