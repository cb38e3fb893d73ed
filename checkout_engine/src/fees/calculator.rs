use std::fmt::Display;

use campus_common::{Money, Rate};
use serde::{Deserialize, Serialize};

use crate::db_types::PaymentMethod;

/// Subtotal brackets. The bracket decides the platform fee rate and whether online payment is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    /// Below the online-payment threshold. No platform fee, cash on delivery only.
    Tier1,
    Tier2,
    Tier3,
}

impl FeeTier {
    pub fn allows_online_payment(&self) -> bool {
        !matches!(self, FeeTier::Tier1)
    }
}

impl Display for FeeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeTier::Tier1 => write!(f, "tier1"),
            FeeTier::Tier2 => write!(f, "tier2"),
            FeeTier::Tier3 => write!(f, "tier3"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Orders below this amount fall into tier 1.
    pub online_threshold: Money,
    /// Orders at or above this amount fall into tier 3.
    pub midpoint: Money,
    pub tier2_rate: Rate,
    pub tier3_rate: Rate,
    pub processor_rate: Rate,
    pub processor_fixed: Money,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            online_threshold: Money::from_major(10),
            midpoint: Money::from_major(100),
            tier2_rate: Rate::from_percent(3),
            tier3_rate: Rate::from_percent(5),
            processor_rate: Rate::from_bps(290),
            processor_fixed: Money::from_cents(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub platform_fee: Money,
    pub platform_fee_rate: Rate,
    pub processor_fee: Money,
    pub total_amount: Money,
    pub seller_receives: Money,
    pub allow_online_payment: bool,
    pub tier: FeeTier,
}

impl FeeSchedule {
    pub fn tier_for(&self, amount: Money) -> FeeTier {
        if amount < self.online_threshold {
            FeeTier::Tier1
        } else if amount < self.midpoint {
            FeeTier::Tier2
        } else {
            FeeTier::Tier3
        }
    }

    pub fn platform_rate(&self, tier: FeeTier) -> Rate {
        match tier {
            FeeTier::Tier1 => Rate::ZERO,
            FeeTier::Tier2 => self.tier2_rate,
            FeeTier::Tier3 => self.tier3_rate,
        }
    }

    /// Computes the fee breakdown for a seller's share of a checkout.
    ///
    /// The tier is chosen on `subtotal + shipping_fee`. The processor fee only applies when an online payment method
    /// is used and the tier allows it. Each fee is rounded once, directly from the exact total.
    pub fn compute(&self, subtotal: Money, shipping_fee: Money, payment_method: PaymentMethod) -> FeeBreakdown {
        let total_amount = subtotal + shipping_fee;
        let tier = self.tier_for(total_amount);
        let platform_fee_rate = self.platform_rate(tier);
        let platform_fee = platform_fee_rate.apply(total_amount);
        let allow_online_payment = tier.allows_online_payment();
        let processor_fee = if payment_method.is_online() && allow_online_payment {
            self.processor_rate.apply_with_fixed(total_amount, self.processor_fixed)
        } else {
            Money::default()
        };
        let seller_receives = (total_amount - platform_fee - processor_fee).floor_zero();
        FeeBreakdown {
            platform_fee,
            platform_fee_rate,
            processor_fee,
            total_amount,
            seller_receives,
            allow_online_payment,
            tier,
        }
    }
}

/// [`FeeSchedule::compute`] with the default schedule.
pub fn compute_fees(subtotal: Money, shipping_fee: Money, payment_method: PaymentMethod) -> FeeBreakdown {
    FeeSchedule::default().compute(subtotal, shipping_fee, payment_method)
}
