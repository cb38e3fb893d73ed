mod money;

pub mod helpers;
pub mod op;
mod rate;
mod secret;

pub use money::{Money, MoneyParseError, DEFAULT_CURRENCY_CODE};
pub use rate::Rate;
pub use secret::Secret;
