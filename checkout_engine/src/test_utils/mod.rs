//! Helpers for tests: throw-away databases, seed data and a scripted payment gateway.
mod mock_gateway;
pub mod prepare_env;
pub mod seed;

pub use mock_gateway::MockGateway;
