//! # Campus checkout server
//! This crate hosts the HTTP server for the campus marketplace checkout engine. It is responsible for:
//! * Exposing checkout sessions, payment intents, checkout confirmation and the order lifecycle over a JSON API.
//! * Connecting the engine to the payment gateway.
//! * Running the background workers that expire abandoned checkouts and deliver order side effects.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/checkout/...`: Checkout sessions, payment intents and confirmation.
//! * `/api/orders/...`: Order queries and status changes.
//! * `/api/notifications`, `/api/earnings`: The caller's notifications and seller earnings.
//! * `/api/admin/...`: Admin-only order queries and outbox control.
//!
//! See [routes](routes/index.html) for the details of each route.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod integrations;
pub mod middleware;
pub mod outbox_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
