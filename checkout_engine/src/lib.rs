//! Campus Checkout Engine
//!
//! The checkout engine turns a campus marketplace buyer's cart (or a single "buy now" item) into one order per
//! seller. It prices each seller's share with tiered platform fees and seller-configured delivery fees, takes payment
//! through an external payment-intent gateway, deducts stock atomically and runs the order status machine afterwards.
//!
//! The library is divided into these main sections:
//! 1. Data types ([`mod@db_types`]) and the backend traits ([`mod@traits`]) that a storage backend must implement.
//!    The SQLite backend ([`SqliteDatabase`]) is the one shipped with the engine. You should never need to access the
//!    database directly. Use the public API instead.
//! 2. The public API ([`mod@checkout_api`]): checkout sessions, payment intents, order fulfillment, the order status
//!    machine and the outbox dispatcher for side effects.
//! 3. Fee calculation ([`mod@fees`]), which is pure and has no storage dependencies.
//!
//! The engine also emits events when orders are created, orders change status and checkouts complete. Subscribers
//! register async handlers for these in [`events::EventHooks`].
pub mod checkout_api;
pub mod db_types;
pub mod events;
pub mod fees;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    checkout_config::CheckoutConfig,
    errors::{CheckoutError, ErrorKind, ItemError, SellerFailure},
    fulfillment_api::OrderFulfillmentApi,
    order_objects,
    order_status_api::OrderStatusApi,
    payment_api::PaymentIntentApi,
    session_api::CheckoutSessionApi,
    session_objects,
    side_effects::{DispatchSummary, SideEffectDispatcher},
    stock_api::StockReservationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
