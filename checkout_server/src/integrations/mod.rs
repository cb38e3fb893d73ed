mod audit;
mod stripe;

pub use audit::audit_event_handlers;
pub use stripe::{intent_status_from_str, StripeGateway};
