//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction when several calls must be atomic, and
//! call through to the functions without any other changes.
//!
//! Nested documents (session items, seller groups, order items, addresses and so on) are stored in JSON columns.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod carts;
pub mod earnings;
pub mod listings;
pub mod notifications;
pub mod orders;
pub mod outbox;
pub mod sessions;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/campus_market.db";

pub fn db_url() -> String {
    let result = env::var("CMP_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ CMP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
