use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use super::ConversionError;

//--------------------------------------    DeliveryMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[serde(alias = "delivery")]
    HomeDelivery,
    CampusDelivery,
    RoomDelivery,
    #[serde(alias = "pickup")]
    SelfPickup,
    Meetup,
}

/// Delivery fees are configured per category rather than per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryCategory {
    Personal,
    Campus,
    Pickup,
}

impl DeliveryMethod {
    pub fn category(&self) -> DeliveryCategory {
        match self {
            DeliveryMethod::HomeDelivery => DeliveryCategory::Personal,
            DeliveryMethod::CampusDelivery | DeliveryMethod::RoomDelivery => DeliveryCategory::Campus,
            DeliveryMethod::SelfPickup | DeliveryMethod::Meetup => DeliveryCategory::Pickup,
        }
    }
}

impl Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::HomeDelivery => write!(f, "home_delivery"),
            DeliveryMethod::CampusDelivery => write!(f, "campus_delivery"),
            DeliveryMethod::RoomDelivery => write!(f, "room_delivery"),
            DeliveryMethod::SelfPickup => write!(f, "self_pickup"),
            DeliveryMethod::Meetup => write!(f, "meetup"),
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home_delivery" | "delivery" => Ok(Self::HomeDelivery),
            "campus_delivery" => Ok(Self::CampusDelivery),
            "room_delivery" => Ok(Self::RoomDelivery),
            "self_pickup" | "pickup" => Ok(Self::SelfPickup),
            "meetup" => Ok(Self::Meetup),
            s => Err(ConversionError(format!("Invalid delivery method: {s}"))),
        }
    }
}

impl Display for DeliveryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryCategory::Personal => write!(f, "personal"),
            DeliveryCategory::Campus => write!(f, "campus"),
            DeliveryCategory::Pickup => write!(f, "pickup"),
        }
    }
}

//--------------------------------------    DeliveryAddress    ---------------------------------------------------------
/// A delivery address snapshot. The shape must match the category of the chosen delivery method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryAddress {
    Personal {
        street: String,
        city: String,
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        landmark: Option<String>,
    },
    Campus {
        campus: String,
        building: String,
        #[serde(default)]
        room: Option<String>,
    },
    Pickup {
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl DeliveryAddress {
    pub fn category(&self) -> DeliveryCategory {
        match self {
            DeliveryAddress::Personal { .. } => DeliveryCategory::Personal,
            DeliveryAddress::Campus { .. } => DeliveryCategory::Campus,
            DeliveryAddress::Pickup { .. } => DeliveryCategory::Pickup,
        }
    }

    pub fn campus(&self) -> Option<&str> {
        match self {
            DeliveryAddress::Campus { campus, .. } => Some(campus.as_str()),
            _ => None,
        }
    }

    /// Checks that the address has the shape the delivery method needs. Returns a human-readable reason otherwise.
    pub fn validate_for(&self, method: DeliveryMethod) -> Result<(), String> {
        if self.category() != method.category() {
            return Err(format!(
                "{method} requires a {} address, but a {} address was supplied",
                method.category(),
                self.category()
            ));
        }
        let blank = |s: &str| s.trim().is_empty();
        match (self, method) {
            (DeliveryAddress::Personal { street, city, .. }, _) => {
                if blank(street) || blank(city) {
                    return Err("A personal address needs a street and a city".to_string());
                }
            },
            (DeliveryAddress::Campus { campus, building, room }, m) => {
                if blank(campus) || blank(building) {
                    return Err("A campus address needs a campus and a building".to_string());
                }
                if m == DeliveryMethod::RoomDelivery && room.as_deref().map(blank).unwrap_or(true) {
                    return Err("Room delivery needs a room number".to_string());
                }
            },
            (DeliveryAddress::Pickup { location, .. }, DeliveryMethod::Meetup) => {
                if location.as_deref().map(blank).unwrap_or(true) {
                    return Err("A meetup needs a meeting location".to_string());
                }
            },
            (DeliveryAddress::Pickup { .. }, _) => {},
        }
        Ok(())
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery. Never touches the payment gateway.
    Cod,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn is_online(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "cod"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "card" => Ok(Self::Card),
            "bank_transfer" => Ok(Self::BankTransfer),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}
