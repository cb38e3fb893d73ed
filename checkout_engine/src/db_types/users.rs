use std::fmt::Display;

use campus_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

use super::{DeliveryCategory, UserId};

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn user<U: Into<UserId>>(id: U) -> Self {
        Self { id: id.into(), role: Role::User }
    }

    pub fn admin<U: Into<UserId>>(id: U) -> Self {
        Self { id: id.into(), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//--------------------------------------   DeliverySettings    ---------------------------------------------------------
/// A seller's override for one delivery fee category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFeeOverride {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub fee: Option<Money>,
    #[serde(default)]
    pub free_delivery_threshold: Option<Money>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for CategoryFeeOverride {
    fn default() -> Self {
        Self { enabled: true, fee: None, free_delivery_threshold: None }
    }
}

impl CategoryFeeOverride {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Default::default() }
    }

    pub fn with_fee(fee: Money) -> Self {
        Self { fee: Some(fee), ..Default::default() }
    }

    pub fn free_above(mut self, threshold: Money) -> Self {
        self.free_delivery_threshold = Some(threshold);
        self
    }
}

/// Seller-configured delivery pricing. Missing categories fall back to the platform defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeliverySettings {
    #[serde(default)]
    pub free_delivery_for_all: bool,
    #[serde(default)]
    pub personal: Option<CategoryFeeOverride>,
    #[serde(default)]
    pub campus: Option<CategoryFeeOverride>,
    #[serde(default)]
    pub pickup: Option<CategoryFeeOverride>,
}

impl DeliverySettings {
    pub fn for_category(&self, category: DeliveryCategory) -> Option<&CategoryFeeOverride> {
        match category {
            DeliveryCategory::Personal => self.personal.as_ref(),
            DeliveryCategory::Campus => self.campus.as_ref(),
            DeliveryCategory::Pickup => self.pickup.as_ref(),
        }
    }
}

//--------------------------------------      UserProfile      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub delivery_settings: DeliverySettings,
    /// Campuses this user delivers to when acting as a seller.
    pub deliverable_campuses: Vec<String>,
    pub total_revenue: Money,
    pub total_sales: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Orders need a way to reach the buyer: a username and a phone number.
    pub fn missing_profile_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            missing.push("username");
        }
        if self.phone.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            missing.push("phone");
        }
        missing
    }

    pub fn delivers_to_campus(&self, campus: &str) -> bool {
        let campus = campus.trim();
        self.deliverable_campuses.iter().any(|c| c.trim().eq_ignore_ascii_case(campus))
    }
}

//--------------------------------------        NewUser        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub delivery_settings: DeliverySettings,
    pub deliverable_campuses: Vec<String>,
}

impl NewUser {
    pub fn new<U: Into<UserId>, S: Into<String>>(id: U, display_name: S) -> Self {
        Self {
            id: id.into(),
            username: None,
            display_name: display_name.into(),
            email: None,
            phone: None,
            role: Role::User,
            delivery_settings: DeliverySettings::default(),
            deliverable_campuses: Vec::new(),
        }
    }

    pub fn with_contact<S: Into<String>>(mut self, username: S, email: S, phone: S) -> Self {
        self.username = Some(username.into());
        self.email = Some(email.into());
        self.phone = Some(phone.into());
        self
    }

    pub fn with_delivery_settings(mut self, settings: DeliverySettings) -> Self {
        self.delivery_settings = settings;
        self
    }

    pub fn delivering_to<S: Into<String>>(mut self, campus: S) -> Self {
        self.deliverable_campuses.push(campus.into());
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.role = Role::Admin;
        self
    }
}
