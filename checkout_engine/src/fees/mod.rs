//! Fee computation.
//!
//! [`calculator`] holds the pure, tiered platform/processor fee function. [`delivery`] resolves the per-seller
//! delivery fee from the seller's delivery settings.
mod calculator;
mod delivery;

pub use calculator::{compute_fees, FeeBreakdown, FeeSchedule, FeeTier};
pub use delivery::{fee_from_settings, DeliveryFeeDefaults, DeliveryFeeResolver};
