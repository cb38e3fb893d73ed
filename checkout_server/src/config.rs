use std::env;

use campus_common::{
    helpers::{parse_boolean_flag, parse_seconds},
    Money,
    DEFAULT_CURRENCY_CODE,
};
use checkout_engine::CheckoutConfig;
use chrono::Duration;
use log::*;
use stripe_tools::StripeConfig;

const DEFAULT_CMP_HOST: &str = "127.0.0.1";
const DEFAULT_CMP_PORT: u16 = 8370;
const DEFAULT_SESSION_TTL_SECS: u64 = 600;
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 60;
const DEFAULT_OUTBOX_POLL_SECS: u64 = 5;
const DEFAULT_MIN_INTENT_AMOUNT: Money = Money::from_cents(50);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long a checkout session stays open before it is expired.
    pub session_ttl: Duration,
    /// How often the background worker looks for expired checkout sessions.
    pub expiry_sweep_interval: std::time::Duration,
    /// How often the outbox worker delivers pending side effects.
    pub outbox_poll_interval: std::time::Duration,
    pub min_intent_amount: Money,
    pub currency: String,
    /// If true, the caller's role is taken from the `X-User-Role` header. Otherwise every caller is a plain user.
    pub trust_role_header: bool,
    /// Payment gateway configuration. Online payments are disabled when this is `None`.
    pub stripe: Option<StripeConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CMP_HOST.to_string(),
            port: DEFAULT_CMP_PORT,
            database_url: String::default(),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
            expiry_sweep_interval: std::time::Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS),
            outbox_poll_interval: std::time::Duration::from_secs(DEFAULT_OUTBOX_POLL_SECS),
            min_intent_amount: DEFAULT_MIN_INTENT_AMOUNT,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            trust_role_header: true,
            stripe: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CMP_HOST").ok().unwrap_or_else(|| DEFAULT_CMP_HOST.into());
        let port = env::var("CMP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CMP_PORT. {e} Using the default, {DEFAULT_CMP_PORT}, instead."
                    );
                    DEFAULT_CMP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CMP_PORT);
        let database_url = env::var("CMP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CMP_DATABASE_URL is not set. Please set it to the URL for the checkout database.");
            String::default()
        });
        let session_ttl = seconds_from_env("CMP_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);
        let expiry_sweep = seconds_from_env("CMP_EXPIRY_SWEEP_SECS", DEFAULT_EXPIRY_SWEEP_SECS);
        let outbox_poll = seconds_from_env("CMP_OUTBOX_POLL_SECS", DEFAULT_OUTBOX_POLL_SECS);
        let min_intent_amount = env::var("CMP_MIN_INTENT_AMOUNT")
            .map_err(|_| info!("🪛️ CMP_MIN_INTENT_AMOUNT is not set. Using {DEFAULT_MIN_INTENT_AMOUNT}."))
            .and_then(|s| {
                s.parse::<Money>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for CMP_MIN_INTENT_AMOUNT. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_MIN_INTENT_AMOUNT);
        let currency = env::var("CMP_CURRENCY")
            .ok()
            .filter(|s| s.trim().len() == 3)
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let trust_role_header = parse_boolean_flag(env::var("CMP_TRUST_ROLE_HEADER").ok(), true);
        if !trust_role_header {
            info!("🪛️ The X-User-Role header is ignored. Admin routes are unreachable.");
        }
        Self {
            host,
            port,
            database_url,
            session_ttl: Duration::seconds(session_ttl as i64),
            expiry_sweep_interval: std::time::Duration::from_secs(expiry_sweep),
            outbox_poll_interval: std::time::Duration::from_secs(outbox_poll),
            min_intent_amount,
            currency,
            trust_role_header,
            stripe: StripeConfig::from_env(),
        }
    }

    /// The engine configuration derived from the server settings.
    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig::default()
            .with_session_ttl(self.session_ttl)
            .with_min_intent_amount(self.min_intent_amount)
            .with_currency(self.currency.clone())
    }
}

fn seconds_from_env(name: &str, default: u64) -> u64 {
    let value = env::var(name).ok();
    if value.is_none() {
        info!("🪛️ {name} is not set. Using the default value of {default}s.");
    }
    let result = parse_seconds(value, default);
    debug!("🪛️ {name} = {result}s");
    result
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the server configuration that request handlers need. Contains no secrets.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub trust_role_header: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { trust_role_header: config.trust_role_header }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { trust_role_header: true }
    }
}
