//! Bearer-token authentication for the payment gateway.
//!
//! Identity lives with an external provider; the server only verifies the HS256 access tokens it issued (or that
//! were issued with the shared `RPG_JWT_SECRET`). Claims carry the user id and a single [`Role`], and routes declare
//! the role they require via the ACL middleware.

use std::{fmt::Display, str::FromStr};

use actix_web::{dev::Payload, http::header, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const DEFAULT_TOKEN_VALIDITY: Duration = Duration::hours(24);

/// What a user is allowed to do. Roles are strictly ordered; a higher role covers everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
            Role::SuperAdmin => 2,
        }
    }

    pub fn covers(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn is_admin(self) -> bool {
        self.covers(Role::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id, as assigned by the identity provider.
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

//----------------------------------------------  TokenIssuer  --------------------------------------------------------
/// Signs access tokens. Mostly used by operator tooling and tests; in production the shared secret lets the identity
/// provider issue tokens directly.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { encoding_key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Issue a new access token for `user_id` with the given role. This method does NOT verify that the caller is
    /// entitled to the role; that must be done before calling it.
    pub fn issue_token(&self, user_id: &str, role: Role, validity: Option<Duration>) -> Result<String, AuthError> {
        let now = Utc::now();
        let validity = validity.unwrap_or(DEFAULT_TOKEN_VALIDITY);
        let claims = JwtClaims {
            sub: user_id.to_string(),
            role,
            exp: (now + validity).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

pub fn decode_access_token(token: &str, config: &AuthConfig) -> Result<JwtClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => AuthError::PoorlyFormattedToken(e.to_string()),
            _ => AuthError::ValidationError(e.to_string()),
        })
}

/// Pulls the bearer token out of the `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let header = req.headers().get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    // The ACL middleware has usually decoded the token already.
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let config = req
        .app_data::<actix_web::web::Data<AuthConfig>>()
        .ok_or_else(|| ServerError::InitializeError("Authentication configuration is not available".to_string()))?;
    let token = bearer_token(req)?;
    let claims = decode_access_token(&token, config)?;
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

/// Extractor for routes that work with or without a logged-in user, like the public payment-proof endpoint.
/// A missing `Authorization` header yields `None`; a token that is present but invalid is still an error.
pub struct MaybeAuthenticated(pub Option<JwtClaims>);

impl FromRequest for MaybeAuthenticated {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if req.headers().get(header::AUTHORIZATION).is_none() && req.extensions().get::<JwtClaims>().is_none() {
            debug!("💻️ Anonymous request to {}", req.path());
            return ready(Ok(MaybeAuthenticated(None)));
        }
        ready(claims_from_request(req).map(|claims| MaybeAuthenticated(Some(claims))))
    }
}
