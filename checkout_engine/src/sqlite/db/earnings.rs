use campus_common::{Money, Rate};
use log::{debug, info};
use sqlx::SqliteConnection;

use crate::{
    db_types::{EarningsEntry, OrderId, UserId},
    traits::StoreError,
};

/// Records the seller's earnings for an order. Crediting an order that already has an entry returns the existing
/// entry unchanged.
pub async fn credit_earnings(
    seller_id: &UserId,
    order_id: &OrderId,
    gross: Money,
    fee_rate: Rate,
    conn: &mut SqliteConnection,
) -> Result<EarningsEntry, StoreError> {
    if let Some(existing) = fetch_for_order(order_id, &mut *conn).await? {
        debug!("🗃️ Earnings for order {order_id} were already credited");
        return Ok(existing);
    }
    let platform_fee = fee_rate.apply(gross);
    let net = (gross - platform_fee).floor_zero();
    let entry: EarningsEntry = sqlx::query_as(
        r#"
        INSERT INTO seller_earnings (seller_id, order_id, gross, fee_rate, platform_fee, net, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (order_id) DO UPDATE SET order_id = excluded.order_id
        RETURNING *
        "#,
    )
    .bind(seller_id)
    .bind(order_id)
    .bind(gross)
    .bind(fee_rate)
    .bind(platform_fee)
    .bind(net)
    .bind(chrono::Utc::now())
    .fetch_one(conn)
    .await?;
    info!("🗃️ Credited {net} to seller {seller_id} for order {order_id} ({fee_rate} platform fee on {gross})");
    Ok(entry)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<EarningsEntry>, StoreError> {
    let entry = sqlx::query_as("SELECT * FROM seller_earnings WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

pub async fn fetch_for_seller(seller_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<EarningsEntry>, StoreError> {
    let entries = sqlx::query_as("SELECT * FROM seller_earnings WHERE seller_id = $1 ORDER BY id")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
