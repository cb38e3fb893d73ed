use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::{traits::StoreError, CheckoutError, ErrorKind};
use log::error;
use serde_json::{json, Value};
use thiserror::Error;

use crate::data_objects::JsonResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The caller could not be identified. {0}")]
    MissingCaller(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Checkout(#[from] CheckoutError),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl ServerError {
    /// The machine-readable error code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Checkout(e) => e.code(),
            Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => "VALIDATION_ERROR",
            Self::MissingCaller(_) => "UNAUTHENTICATED",
            Self::InsufficientPermissions(_) => "FORBIDDEN",
            _ => "SERVICE_ERROR",
        }
    }

    /// Structured details for errors that carry more than a message.
    fn details(&self) -> Option<Value> {
        match self {
            Self::Checkout(CheckoutError::InvalidItems(items)) => Some(json!({ "items": items })),
            Self::Checkout(CheckoutError::OrderCreationFailed(failures)) => Some(json!({ "failures": failures })),
            Self::Checkout(CheckoutError::InsufficientStock { listing_id, requested, available }) => {
                Some(json!({ "listing_id": listing_id, "requested": requested, "available": available }))
            },
            Self::Checkout(CheckoutError::PaymentMethodNotAllowed { minimum, .. }) => {
                Some(json!({ "minimum": minimum }))
            },
            Self::Checkout(CheckoutError::AmountBelowMinimum { amount, minimum }) => {
                Some(json!({ "amount": amount, "minimum": minimum }))
            },
            Self::Checkout(CheckoutError::IncompleteProfile(fields)) => Some(json!({ "missing": fields })),
            Self::Checkout(CheckoutError::NotDeliverable { campus, sellers }) => {
                Some(json!({ "campus": campus, "sellers": sellers }))
            },
            _ => None,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::MissingCaller(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::ExternalDependency => StatusCode::BAD_GATEWAY,
                ErrorKind::ServiceError => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ Request failed with a server error. {self}");
        }
        let body = JsonResponse::failure(self.code(), self.to_string(), self.details());
        HttpResponse::build(status).insert_header(ContentType::json()).json(body)
    }
}
