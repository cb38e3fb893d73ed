//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! It uses SQLite for storage and implements all the traits defined in the [`crate::traits`] module. Every operation
//! that must be atomic runs in a single SQLite transaction.
use std::fmt::Debug;

use campus_common::{Money, Rate};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

use super::db::{
    carts,
    db_url,
    earnings,
    listings,
    new_pool,
    notifications,
    orders,
    orders::Party,
    outbox,
    sessions,
    users,
};
use crate::{
    db_types::{
        Cart,
        CartItem,
        CheckoutSession,
        EarningsEntry,
        Listing,
        ListingId,
        NewCheckoutSession,
        NewListing,
        NewNotification,
        NewOrder,
        NewUser,
        Notification,
        Order,
        OrderId,
        OrderStatus,
        OrderStatusUpdate,
        OutboxTask,
        SessionId,
        SideEffect,
        StockMovement,
        StockMovementReason,
        UserId,
        UserProfile,
        VariantId,
    },
    traits::{
        CartManagement,
        CheckoutDatabase,
        CheckoutSessionManagement,
        EarningsLedger,
        ListingManagement,
        NotificationDispatch,
        OrderManagement,
        OutboxManagement,
        StoreError,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `CMP_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file if it does not exist yet.
    pub async fn create_if_missing(url: &str) -> Result<(), sqlx::Error> {
        if !Sqlite::database_exists(url).await? {
            info!("🗃️ Creating new database at {url}");
            Sqlite::create_database(url).await?;
        }
        Ok(())
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ListingManagement for SqliteDatabase {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let mut tx = self.pool.begin().await?;
        let listing = listings::insert_listing(listing, &mut tx).await?;
        tx.commit().await?;
        Ok(listing)
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing(id, &mut conn).await
    }

    async fn fetch_listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listings(ids, &mut conn).await
    }

    async fn increment_stock(&self, id: &ListingId, delta: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = listings::increment_stock(id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn increment_variant_stock(
        &self,
        id: &ListingId,
        variant_id: &VariantId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = listings::increment_variant_stock(id, variant_id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_listing_availability(&self, id: &ListingId, available: bool) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        listings::set_availability(id, available, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, buyer_id: &UserId) -> Result<Cart, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart(buyer_id, &mut conn).await
    }

    async fn add_cart_item(&self, buyer_id: &UserId, item: CartItem) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;
        carts::upsert_cart_item(buyer_id, item, &mut tx).await?;
        let result = carts::fetch_cart(buyer_id, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn remove_cart_items(&self, buyer_id: &UserId, listing_ids: &[ListingId]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = carts::remove_cart_items(buyer_id, listing_ids, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl UserManagement for SqliteDatabase {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(id, &mut conn).await
    }

    async fn upsert_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = users::upsert_user(user, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl CheckoutSessionManagement for SqliteDatabase {
    async fn insert_session_replacing_active(
        &self,
        session: NewCheckoutSession,
    ) -> Result<(CheckoutSession, Vec<CheckoutSession>), StoreError> {
        let mut tx = self.pool.begin().await?;
        let replaced = sessions::cancel_open_sessions_for_buyer(&session.buyer_id, &mut tx).await?;
        let session = sessions::insert_session(session, &mut tx).await?;
        tx.commit().await?;
        Ok((session, replaced))
    }

    async fn fetch_session(&self, id: &SessionId) -> Result<Option<CheckoutSession>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_session(id, &mut conn).await
    }

    async fn fetch_active_session(&self, buyer_id: &UserId) -> Result<Option<CheckoutSession>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let mut open = sessions::fetch_open_sessions_for_buyer(buyer_id, &mut conn).await?;
        Ok(open.pop())
    }

    async fn update_session(&self, session: &CheckoutSession) -> Result<CheckoutSession, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sessions::update_session(session, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_open_sessions(&self) -> Result<Vec<CheckoutSession>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_open_sessions(&mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order_with_stock(&self, order: NewOrder, effects: Vec<SideEffect>) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        for item in order.items.iter().filter(|i| i.item_type.has_stock()) {
            let variant_id = item.variant_id();
            if !listings::try_take_stock(&item.listing_id, variant_id, item.quantity, &mut tx).await? {
                debug!("🗃️ Not enough stock of {} for order {}. Rolling back", item.listing_id, order.id);
                // Dropping the transaction rolls it back
                return Err(StoreError::InsufficientStock {
                    listing_id: item.listing_id.clone(),
                    variant_id: variant_id.cloned(),
                    requested: item.quantity,
                });
            }
            let reason = StockMovementReason::OrderPlaced;
            listings::insert_stock_movement(&order.id, &item.listing_id, variant_id, -item.quantity, reason, &mut tx)
                .await?;
        }
        outbox::enqueue(&effects, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_orders_for_buyer(
        &self,
        buyer_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_party(Party::Buyer, buyer_id, status, &mut conn).await
    }

    async fn fetch_orders_for_seller(
        &self,
        seller_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_party(Party::Seller, seller_id, status, &mut conn).await
    }

    async fn apply_status_change(
        &self,
        update: OrderStatusUpdate,
        effects: Vec<SideEffect>,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let OrderStatusUpdate { order_id, from, to, change, restore_stock, record_sale } = update;
        let order = match orders::conditional_status_update(&order_id, from, to, change, &mut tx).await? {
            Some(order) => order,
            None => {
                let exists = orders::fetch_order(&order_id, &mut tx).await?.is_some();
                return if exists {
                    Err(StoreError::OrderStatusChanged { order_id, expected: from })
                } else {
                    Err(StoreError::OrderNotFound(order_id))
                };
            },
        };
        if restore_stock {
            for item in order.items.iter().filter(|i| i.item_type.has_stock()) {
                let variant_id = item.variant_id();
                let restored = match variant_id {
                    Some(v) => listings::increment_variant_stock(&item.listing_id, v, item.quantity, &mut tx).await,
                    None => listings::increment_stock(&item.listing_id, item.quantity, &mut tx).await,
                };
                let (delta, reason) = match restored {
                    Ok(_) => (item.quantity, StockMovementReason::OrderCancelled),
                    Err(e @ (StoreError::ListingNotFound(_) | StoreError::VariantNotFound { .. })) => {
                        warn!("🗃️ Could not put {} units back for order {}: {e}", item.quantity, order.id);
                        (0, StockMovementReason::RestoreSkipped)
                    },
                    Err(e) => return Err(e),
                };
                listings::insert_stock_movement(&order.id, &item.listing_id, variant_id, delta, reason, &mut tx).await?;
            }
            debug!("🗃️ Stock restored for order {}", order.id);
        }
        if record_sale {
            users::record_sale(order.seller_id(), order.total, &mut tx).await?;
        }
        outbox::enqueue(&effects, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_stock_movements(&self, order_id: &OrderId) -> Result<Vec<StockMovement>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_stock_movements(order_id, &mut conn).await
    }
}

impl OutboxManagement for SqliteDatabase {
    async fn fetch_pending_tasks(&self, limit: i64, max_attempts: i64) -> Result<Vec<OutboxTask>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_pending(limit, max_attempts, &mut conn).await
    }

    async fn mark_task_delivered(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        outbox::mark_delivered(id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_task_failure(&self, id: i64, error: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        outbox::record_failure(id, error, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_outbox_task(&self, id: i64) -> Result<Option<OutboxTask>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_task(id, &mut conn).await
    }
}

impl NotificationDispatch for SqliteDatabase {
    async fn notify(&self, notification: &NewNotification) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::fetch_notifications(user_id, &mut conn).await
    }
}

impl EarningsLedger for SqliteDatabase {
    async fn credit_earnings(
        &self,
        seller_id: &UserId,
        order_id: &OrderId,
        gross: Money,
        fee_rate: Rate,
    ) -> Result<EarningsEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = earnings::credit_earnings(seller_id, order_id, gross, fee_rate, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_earnings(&self, seller_id: &UserId) -> Result<Vec<EarningsEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        earnings::fetch_for_seller(seller_id, &mut conn).await
    }
}
