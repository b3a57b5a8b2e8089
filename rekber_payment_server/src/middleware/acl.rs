//! Access control middleware.
//!
//! Wrap a route with [`AclMiddlewareFactory`] to require a valid bearer token whose role covers every role in the
//! list. On success the decoded claims are stored in the request extensions, where the [`JwtClaims`] extractor picks
//! them up without decoding the token a second time.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{
    auth::{bearer_token, decode_access_token, JwtClaims, Role},
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

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
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

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
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let config = req
                .app_data::<web::Data<AuthConfig>>()
                .ok_or_else(|| {
                    log::warn!("No authentication configuration found in the app data");
                    ServerError::InitializeError("Authentication configuration is not available".to_string())
                })?
                .clone();
            let claims = bearer_token(req.request())
                .and_then(|token| decode_access_token(&token, &config))
                .map_err(ServerError::AuthenticationError)?;
            if !required_roles.iter().all(|role| claims.role.covers(*role)) {
                let err = AuthError::InsufficientPermissions(format!(
                    "The {} role does not grant access to this resource",
                    claims.role
                ));
                return Err(ServerError::AuthenticationError(err).into());
            }
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
