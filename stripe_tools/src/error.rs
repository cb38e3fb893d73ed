use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl StripeApiError {
    /// True if the request never got a usable answer from the gateway, as opposed to being refused by it.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, StripeApiError::RestResponseError(_) | StripeApiError::Initialization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StripeApiError::QueryError { status: 404, .. })
    }
}
