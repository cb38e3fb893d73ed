use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Cart, CartItem, ListingId, UserId, VariantId},
    traits::StoreError,
};

#[derive(FromRow)]
struct CartItemRow {
    listing_id: ListingId,
    variant_id: String,
    quantity: i64,
    added_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        let variant_id = (!row.variant_id.is_empty()).then(|| VariantId::from(row.variant_id));
        Self { listing_id: row.listing_id, variant_id, quantity: row.quantity, added_at: row.added_at }
    }
}

pub async fn fetch_cart(buyer_id: &UserId, conn: &mut SqliteConnection) -> Result<Cart, StoreError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        "SELECT listing_id, variant_id, quantity, added_at FROM cart_items WHERE buyer_id = $1 ORDER BY added_at, \
         listing_id",
    )
    .bind(buyer_id)
    .fetch_all(conn)
    .await?;
    Ok(Cart { buyer_id: buyer_id.clone(), items: rows.into_iter().map(CartItem::from).collect() })
}

pub async fn upsert_cart_item(buyer_id: &UserId, item: CartItem, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let variant = item.variant_id.as_ref().map(|v| v.as_str()).unwrap_or_default();
    sqlx::query(
        r#"
        INSERT INTO cart_items (buyer_id, listing_id, variant_id, quantity, added_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (buyer_id, listing_id, variant_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(buyer_id)
    .bind(&item.listing_id)
    .bind(variant)
    .bind(item.quantity)
    .bind(item.added_at)
    .execute(conn)
    .await?;
    debug!("🗃️ Cart of {buyer_id} now holds {} x {}", item.quantity, item.listing_id);
    Ok(())
}

/// Removes every line for the given listings, whatever the variant. Other lines in the cart are left alone.
pub async fn remove_cart_items(
    buyer_id: &UserId,
    listing_ids: &[ListingId],
    conn: &mut SqliteConnection,
) -> Result<u64, StoreError> {
    if listing_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM cart_items WHERE buyer_id = ");
    builder.push_bind(buyer_id.as_str());
    builder.push(" AND listing_id IN (");
    let mut in_list = builder.separated(", ");
    listing_ids.iter().for_each(|id| {
        in_list.push_bind(id.as_str());
    });
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    debug!("🗃️ Removed {} lines from the cart of {buyer_id}", result.rows_affected());
    Ok(result.rows_affected())
}
