//! Access control list middleware for the checkout server.
//! This middleware can be placed on any route or service.
//!
//! It identifies the caller from the `X-User-Id` and `X-User-Role` headers and checks the caller's role against the
//! required roles for the route. If the caller has the required roles, the request will be allowed to continue.
//! Otherwise, a 401 (no caller) or 403 (wrong role) response will be returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use checkout_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::warn;

use crate::{config::ServerOptions, data_objects::Caller, errors::ServerError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let trust_role_header =
                req.app_data::<web::Data<ServerOptions>>().map(|o| o.trust_role_header).unwrap_or(true);
            let caller = Caller::from_headers(req.headers(), trust_role_header)?;
            if required_roles.iter().all(|role| *role == caller.role) {
                service.call(req).await
            } else {
                warn!("💻️ {} tried to access {} without the required roles", caller.id, req.path());
                Err(ServerError::InsufficientPermissions(format!("{} requires {required_roles:?}", req.path())).into())
            }
        })
    }
}
