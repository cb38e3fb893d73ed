//! A client for the payment-intents endpoints of a Stripe-compatible REST API.
mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{NewIntentParams, StripeErrorBody, StripeIntent};
pub use error::StripeApiError;
pub use helpers::form_params;
