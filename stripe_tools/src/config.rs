use campus_common::Secret;
use log::*;

pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
}

impl StripeConfig {
    pub fn new<S: Into<String>>(api_url: S, secret_key: S) -> Self {
        Self { api_url: api_url.into(), secret_key: Secret::new(secret_key.into()) }
    }

    /// Reads the gateway configuration from the environment.
    ///
    /// Returns `None` if `CMP_STRIPE_SECRET_KEY` is not set, in which case online payments are unavailable.
    pub fn from_env() -> Option<Self> {
        let secret_key = match std::env::var("CMP_STRIPE_SECRET_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!("💳 CMP_STRIPE_SECRET_KEY is not set. Online payments are disabled.");
                return None;
            },
        };
        let api_url = std::env::var("CMP_STRIPE_API_URL").unwrap_or_else(|_| {
            info!("💳 CMP_STRIPE_API_URL is not set. Using {DEFAULT_STRIPE_API_URL}");
            DEFAULT_STRIPE_API_URL.to_string()
        });
        Some(Self { api_url, secret_key: Secret::new(secret_key) })
    }
}
