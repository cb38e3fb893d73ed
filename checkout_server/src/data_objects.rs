use std::{
    fmt::Display,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, http::header::HeaderMap, web, FromRequest, HttpRequest};
use checkout_engine::db_types::{Actor, OrderStatus, Role, UserId};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::ServerOptions, errors::ServerError};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The envelope every API response is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display, T: Serialize>(message: S, data: T) -> Self {
        let data = serde_json::to_value(data).ok();
        Self { success: true, data, error: None, message: message.to_string() }
    }

    pub fn failure<S: Display>(code: &str, message: S, details: Option<Value>) -> Self {
        Self { success: false, data: details, error: Some(code.to_string()), message: message.to_string() }
    }
}

//--------------------------------------        Caller         ---------------------------------------------------------
/// The user making a request, taken from the `X-User-Id` and `X-User-Role` headers.
///
/// Authentication happens upstream of this server. Requests without a user id are rejected with a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap, trust_role_header: bool) -> Result<Self, ServerError> {
        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServerError::MissingCaller(format!("The {USER_ID_HEADER} header is required")))?;
        let role = match headers.get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(r) if trust_role_header && r.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        };
        Ok(Self { id: UserId::from(id), role })
    }

    pub fn actor(&self) -> Actor {
        Actor { id: self.id.clone(), role: self.role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let trust_role_header =
            req.app_data::<web::Data<ServerOptions>>().map(|o| o.trust_role_header).unwrap_or(true);
        let caller = Caller::from_headers(req.headers(), trust_role_header);
        if let Err(e) = &caller {
            debug!("💻️ Rejecting request to {}. {e}", req.path());
        }
        ready(caller)
    }
}

//--------------------------------------    Request bodies     ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}
