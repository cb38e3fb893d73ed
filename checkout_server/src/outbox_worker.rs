use std::time::Duration;

use checkout_engine::{SideEffectDispatcher, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

const BATCH_SIZE: i64 = 50;

/// Starts the outbox worker, which delivers order side effects (notifications and earnings credits) at least once.
/// Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_outbox_worker(db: SqliteDatabase, max_attempts: i64, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone(), db, max_attempts);
        info!("🕰️ Outbox worker started");
        loop {
            timer.tick().await;
            // Keep draining while full batches are delivered cleanly. Failures wait for the next tick.
            loop {
                match dispatcher.run_once(BATCH_SIZE).await {
                    Ok(summary) if summary.is_idle() => break,
                    Ok(summary) => {
                        debug!("🕰️ Outbox run: {} delivered, {} failed", summary.delivered, summary.failed);
                        if summary.failed > 0 || summary.delivered < BATCH_SIZE as usize {
                            break;
                        }
                    },
                    Err(e) => {
                        error!("🕰️ Error running the outbox dispatcher: {e}");
                        break;
                    },
                }
            }
        }
    })
}
