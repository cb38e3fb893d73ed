use std::collections::HashMap;

use campus_common::Money;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        Listing,
        ListingId,
        ListingType,
        ListingVariant,
        NewListing,
        OrderId,
        StockMovement,
        StockMovementReason,
        UserId,
        VariantId,
    },
    traits::StoreError,
};

#[derive(FromRow)]
struct ListingRow {
    id: ListingId,
    seller_id: UserId,
    name: String,
    price: Money,
    listing_type: ListingType,
    stock: i64,
    is_available: bool,
    images: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct VariantRow {
    listing_id: ListingId,
    id: VariantId,
    name: String,
    price: Option<Money>,
    stock: i64,
}

impl ListingRow {
    fn into_listing(self, variants: Vec<ListingVariant>) -> Listing {
        Listing {
            id: self.id,
            seller_id: self.seller_id,
            name: self.name,
            price: self.price,
            listing_type: self.listing_type,
            stock: self.stock,
            is_available: self.is_available,
            images: self.images.0,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<VariantRow> for ListingVariant {
    fn from(row: VariantRow) -> Self {
        Self { id: row.id, name: row.name, price: row.price, stock: row.stock }
    }
}

pub async fn insert_listing(listing: NewListing, conn: &mut SqliteConnection) -> Result<Listing, StoreError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO listings (id, seller_id, name, price, listing_type, stock, is_available, images, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        "#,
    )
    .bind(&listing.id)
    .bind(&listing.seller_id)
    .bind(&listing.name)
    .bind(listing.price)
    .bind(listing.listing_type)
    .bind(listing.stock)
    .bind(listing.is_available)
    .bind(Json(&listing.images))
    .bind(now)
    .execute(&mut *conn)
    .await?;
    for (position, variant) in listing.variants.iter().enumerate() {
        sqlx::query(
            "INSERT INTO listing_variants (listing_id, id, name, price, stock, position) VALUES ($1, $2, $3, $4, $5, \
             $6)",
        )
        .bind(&listing.id)
        .bind(&variant.id)
        .bind(&variant.name)
        .bind(variant.price)
        .bind(variant.stock)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Listing [{}] inserted with {} variants", listing.id, listing.variants.len());
    fetch_listing(&listing.id, conn).await?.ok_or(StoreError::ListingNotFound(listing.id))
}

pub async fn fetch_listing(id: &ListingId, conn: &mut SqliteConnection) -> Result<Option<Listing>, StoreError> {
    let row: Option<ListingRow> =
        sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let variants: Vec<VariantRow> = sqlx::query_as("SELECT * FROM listing_variants WHERE listing_id = $1 ORDER BY position")
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(Some(row.into_listing(variants.into_iter().map(ListingVariant::from).collect())))
}

/// Fetches all the given listings (and their variants) in two queries. Missing ids are skipped.
pub async fn fetch_listings(ids: &[ListingId], conn: &mut SqliteConnection) -> Result<Vec<Listing>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM listings WHERE id IN (");
    let mut in_list = builder.separated(", ");
    ids.iter().for_each(|id| {
        in_list.push_bind(id.as_str());
    });
    builder.push(")");
    let rows: Vec<ListingRow> = builder.build_query_as().fetch_all(&mut *conn).await?;

    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT listing_id, id, name, price, stock FROM listing_variants WHERE listing_id IN (");
    let mut in_list = builder.separated(", ");
    ids.iter().for_each(|id| {
        in_list.push_bind(id.as_str());
    });
    builder.push(") ORDER BY listing_id, position");
    let variant_rows: Vec<VariantRow> = builder.build_query_as().fetch_all(conn).await?;
    let mut variants = HashMap::<ListingId, Vec<ListingVariant>>::new();
    for row in variant_rows {
        variants.entry(row.listing_id.clone()).or_default().push(row.into());
    }
    trace!("🗃️ Fetched {} of {} requested listings", rows.len(), ids.len());
    let listings = rows
        .into_iter()
        .map(|row| {
            let v = variants.remove(&row.id).unwrap_or_default();
            row.into_listing(v)
        })
        .collect();
    Ok(listings)
}

/// Adds `delta` to the listing stock and returns the new level.
pub async fn increment_stock(id: &ListingId, delta: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let stock: Option<i64> =
        sqlx::query_scalar("UPDATE listings SET stock = stock + $1, updated_at = $2 WHERE id = $3 RETURNING stock")
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    stock.ok_or_else(|| StoreError::ListingNotFound(id.clone()))
}

pub async fn increment_variant_stock(
    id: &ListingId,
    variant_id: &VariantId,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, StoreError> {
    let stock: Option<i64> = sqlx::query_scalar(
        "UPDATE listing_variants SET stock = stock + $1 WHERE listing_id = $2 AND id = $3 RETURNING stock",
    )
    .bind(delta)
    .bind(id)
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    stock.ok_or_else(|| StoreError::VariantNotFound { listing_id: id.clone(), variant_id: variant_id.clone() })
}

/// Takes `quantity` units of stock if, and only if, at least that many are left.
///
/// Returns `false` (and changes nothing) if there is not enough stock, or the listing or variant does not exist.
pub async fn try_take_stock(
    id: &ListingId,
    variant_id: Option<&VariantId>,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result = match variant_id {
        Some(variant_id) => {
            sqlx::query(
                "UPDATE listing_variants SET stock = stock - $1 WHERE listing_id = $2 AND id = $3 AND stock >= $1",
            )
            .bind(quantity)
            .bind(id)
            .bind(variant_id)
            .execute(conn)
            .await?
        },
        None => {
            sqlx::query("UPDATE listings SET stock = stock - $1, updated_at = $2 WHERE id = $3 AND stock >= $1")
                .bind(quantity)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await?
        },
    };
    Ok(result.rows_affected() == 1)
}

pub async fn set_availability(id: &ListingId, available: bool, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE listings SET is_available = $1, updated_at = $2 WHERE id = $3")
        .bind(available)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::ListingNotFound(id.clone()));
    }
    Ok(())
}

pub async fn insert_stock_movement(
    order_id: &OrderId,
    listing_id: &ListingId,
    variant_id: Option<&VariantId>,
    delta: i64,
    reason: StockMovementReason,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO stock_movements (order_id, listing_id, variant_id, delta, reason, created_at) VALUES ($1, $2, $3, \
         $4, $5, $6)",
    )
    .bind(order_id)
    .bind(listing_id)
    .bind(variant_id)
    .bind(delta)
    .bind(reason)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🗃️ Stock movement of {delta} recorded for listing {listing_id} ({reason:?})");
    Ok(())
}

pub async fn fetch_stock_movements(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockMovement>, StoreError> {
    let movements = sqlx::query_as("SELECT * FROM stock_movements WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(movements)
}
