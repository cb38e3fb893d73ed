use campus_common::Money;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{DeliveryCategory, DeliveryMethod, DeliverySettings, UserId},
    traits::UserManagement,
};

/// Platform delivery fees, used when a seller has not configured their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFeeDefaults {
    pub personal: Money,
    pub campus: Money,
    pub pickup: Money,
}

impl Default for DeliveryFeeDefaults {
    fn default() -> Self {
        Self { personal: Money::from_major(5), campus: Money::from_major(2), pickup: Money::default() }
    }
}

impl DeliveryFeeDefaults {
    pub fn for_category(&self, category: DeliveryCategory) -> Money {
        match category {
            DeliveryCategory::Personal => self.personal,
            DeliveryCategory::Campus => self.campus,
            DeliveryCategory::Pickup => self.pickup,
        }
    }
}

/// Resolves a delivery fee from a seller's settings.
///
/// Returns `None` if the seller has disabled the category, meaning the delivery method is not offered at all.
/// The free-delivery threshold takes precedence over a custom fee.
pub fn fee_from_settings(
    settings: &DeliverySettings,
    category: DeliveryCategory,
    subtotal: Money,
    defaults: &DeliveryFeeDefaults,
) -> Option<Money> {
    if settings.free_delivery_for_all {
        return Some(Money::default());
    }
    let Some(config) = settings.for_category(category) else {
        return Some(defaults.for_category(category));
    };
    if !config.enabled {
        return None;
    }
    if config.free_delivery_threshold.map(|t| subtotal >= t).unwrap_or(false) {
        return Some(Money::default());
    }
    Some(config.fee.unwrap_or_else(|| defaults.for_category(category)))
}

/// Looks up a seller's delivery settings and resolves the fee for a delivery method.
///
/// Lookup failures fall back to the platform default. A missing seller record never blocks a checkout.
#[derive(Clone)]
pub struct DeliveryFeeResolver<B> {
    db: B,
    defaults: DeliveryFeeDefaults,
}

impl<B> DeliveryFeeResolver<B> {
    pub fn new(db: B, defaults: DeliveryFeeDefaults) -> Self {
        Self { db, defaults }
    }

    pub fn defaults(&self) -> &DeliveryFeeDefaults {
        &self.defaults
    }
}

impl<B: UserManagement> DeliveryFeeResolver<B> {
    pub async fn resolve(&self, method: DeliveryMethod, seller_id: &UserId, subtotal: Money) -> Option<Money> {
        let category = method.category();
        match self.db.fetch_user(seller_id).await {
            Ok(Some(seller)) => fee_from_settings(&seller.delivery_settings, category, subtotal, &self.defaults),
            Ok(None) => {
                debug!("🛒 Seller {seller_id} has no profile. Using the default {category} delivery fee");
                Some(self.defaults.for_category(category))
            },
            Err(e) => {
                warn!("🛒 Could not load delivery settings for seller {seller_id}: {e}. Using the default fee");
                Some(self.defaults.for_category(category))
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::CategoryFeeOverride;

    fn money(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn unconfigured_seller_gets_defaults() {
        let defaults = DeliveryFeeDefaults::default();
        let settings = DeliverySettings::default();
        assert_eq!(fee_from_settings(&settings, DeliveryCategory::Personal, money(100), &defaults), Some(money(500)));
        assert_eq!(fee_from_settings(&settings, DeliveryCategory::Campus, money(100), &defaults), Some(money(200)));
        assert_eq!(fee_from_settings(&settings, DeliveryCategory::Pickup, money(100), &defaults), Some(money(0)));
    }

    #[test]
    fn threshold_and_disabled_categories() {
        let defaults = DeliveryFeeDefaults::default();
        let settings = DeliverySettings {
            personal: Some(CategoryFeeOverride::with_fee(money(350)).free_above(money(5000))),
            campus: Some(CategoryFeeOverride::disabled()),
            ..Default::default()
        };
        let personal = DeliveryCategory::Personal;
        assert_eq!(fee_from_settings(&settings, personal, money(4999), &defaults), Some(money(350)));
        assert_eq!(fee_from_settings(&settings, personal, money(5000), &defaults), Some(money(0)));
        assert_eq!(fee_from_settings(&settings, DeliveryCategory::Campus, money(100), &defaults), None);
    }

    #[test]
    fn free_delivery_for_all_wins() {
        let defaults = DeliveryFeeDefaults::default();
        let settings = DeliverySettings {
            free_delivery_for_all: true,
            campus: Some(CategoryFeeOverride::disabled()),
            ..Default::default()
        };
        assert_eq!(fee_from_settings(&settings, DeliveryCategory::Campus, money(1), &defaults), Some(money(0)));
    }
}
