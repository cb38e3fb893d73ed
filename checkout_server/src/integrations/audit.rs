use checkout_engine::events::{EventHandlers, EventHooks};
use log::*;

const AUDIT_TARGET: &str = "checkout::audit";

/// Event handlers that write an audit trail of order activity to the `checkout::audit` log target.
pub fn audit_event_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            Box::pin(async move {
                let order = ev.order;
                info!(
                    target: AUDIT_TARGET,
                    "📬️ Order {} placed. buyer: {} seller: {} total: {} payment: {} ({})",
                    order.id, order.buyer.id, order.seller.id, order.total, order.payment_method, order.payment_status
                );
            })
        })
        .on_status_changed(|ev| {
            Box::pin(async move {
                info!(
                    target: AUDIT_TARGET,
                    "📬️ Order {} moved from {} to {} by {}",
                    ev.order.id, ev.old_status, ev.order.status, ev.changed_by
                );
            })
        })
        .on_checkout_completed(|ev| {
            Box::pin(async move {
                let session = ev.session;
                if ev.failed_sellers.is_empty() {
                    info!(target: AUDIT_TARGET, "📬️ Checkout {} completed for {}", session.id, session.buyer_id);
                } else {
                    let failed = ev.failed_sellers.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
                    warn!(
                        target: AUDIT_TARGET,
                        "📬️ Checkout {} completed for {} without these sellers: {failed}", session.id, session.buyer_id
                    );
                }
            })
        });
    EventHandlers::new(buffer_size, hooks)
}
