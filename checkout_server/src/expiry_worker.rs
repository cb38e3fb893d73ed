use std::time::Duration;

use checkout_engine::{CheckoutConfig, CheckoutSessionApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::StripeGateway;

/// Starts the session expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Sessions are also expired lazily when they are read. The sweep makes sure abandoned sessions release their stock
/// reservations and payment intents even if the buyer never comes back.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    gateway: StripeGateway,
    config: CheckoutConfig,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        let api = CheckoutSessionApi::new(db, gateway, config);
        info!("🕰️ Checkout session expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running checkout session expiry job");
            match api.expire_stale_sessions().await {
                Ok(0) => trace!("🕰️ No checkout sessions expired"),
                Ok(n) => info!("🕰️ {n} checkout sessions expired"),
                Err(e) => error!("🕰️ Error running checkout session expiry job: {e}"),
            }
        }
    })
}
