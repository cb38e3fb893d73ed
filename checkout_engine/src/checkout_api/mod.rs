//! # Campus checkout public API
//!
//! The `checkout_api` module exposes the programmatic API of the checkout engine. It is split by concern, so that
//! clients can pick the parts they need:
//!
//! * [`session_api`] creates, updates, cancels and expires checkout sessions.
//! * [`payment_api`] creates and tracks payment intents for online checkouts.
//! * [`fulfillment_api`] turns a checkout into one order per seller.
//! * [`order_status_api`] runs the order status machine and answers order queries.
//! * [`side_effects`] delivers the notifications and earnings credits queued by status changes.
//! * [`stock_api`] validates items against live listings and keeps the advisory reservation records.
//!
//! # API usage
//!
//! Every API is created from a backend that implements the traits it needs, plus a payment gateway where payments
//! are involved.
//!
//! ```rust,ignore
//! use checkout_engine::{CheckoutConfig, CheckoutSessionApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/campus_market.db", 5).await?;
//! let api = CheckoutSessionApi::new(db, gateway, CheckoutConfig::default());
//! let session = api.create_from_cart(&buyer_id).await?;
//! ```
pub mod checkout_config;
pub mod errors;
pub mod fulfillment_api;
pub mod order_objects;
pub mod order_status_api;
pub mod payment_api;
pub mod session_api;
pub mod session_objects;
pub mod side_effects;
pub mod stock_api;
