/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWTs identify restaurant staff, admins and delivery drivers. Every
 * token is bound to one restaurant; handlers scope their queries with
 * `AuthUser::restaurant_id`.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::order_status::{Actor, ActorType};

mod permissions;

pub use permissions::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Driver,
}

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub restaurant_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
    pub restaurant_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Staff user id as a UUID, for audit columns. Non-UUID subjects are
    /// recorded without an id.
    pub fn user_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.user_id).ok()
    }

    /// How this caller is recorded in an order's status history.
    pub fn actor(&self) -> Actor {
        match (self.role, self.driver_id) {
            (Role::Driver, Some(driver_id)) => Actor::driver(driver_id),
            _ => Actor {
                kind: ActorType::User,
                id: self.user_uuid(),
            },
        }
    }

    /// The driver this token belongs to.
    pub fn require_driver(&self) -> Result<Uuid, ServiceError> {
        match (self.role, self.driver_id) {
            (Role::Driver, Some(driver_id)) => Ok(driver_id),
            _ => Err(ServiceError::Forbidden("Driver token required".to_string())),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            permissions: permissions_for_role(claims.role),
            user_id: claims.sub,
            role: claims.role,
            restaurant_id: claims.restaurant_id,
            driver_id: claims.driver_id,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, token_ttl_secs: i64) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            token_ttl_secs,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            cfg.jwt_expiration as i64,
        )
    }
}

/// Issues and validates access tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

/// Who a new token is for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub subject: String,
    pub role: Role,
    pub restaurant_id: Uuid,
    pub driver_id: Option<Uuid>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn issue_token(&self, subject: &TokenSubject) -> Result<String, AuthError> {
        if subject.role == Role::Driver && subject.driver_id.is_none() {
            return Err(AuthError::TokenCreation(
                "driver tokens need a driver id".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.subject.clone(),
            role: subject.role,
            restaurant_id: subject.restaurant_id,
            driver_id: subject.driver_id,
            iat: now,
            exp: now + self.config.token_ttl_secs,
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if claims.role == Role::Driver && claims.driver_id.is_none() {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    // Admins have all permissions
    if !user.is_admin() && !user.has_permission(&required_permission) {
        debug!(
            user_id = %user.user_id,
            permission = %required_permission,
            "permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if user.role != required_role {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    let token = bearer_token(&request).or_else(|| query_token(&request));
    let Some(token) = token else {
        return AuthError::MissingAuth.into_response();
    };

    match auth_service.validate_token(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser::from(claims));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

// Browsers cannot set headers on WebSocket upgrades, so only those may
// carry the token in the query string.
fn query_token(request: &Request) -> Option<String> {
    if !is_websocket_upgrade(request) {
        return None;
    }
    request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("token=")
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
    })
}

fn is_websocket_upgrade(request: &Request) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "k9Qw3rTy7uIo1pAs5dFg2hJk8lZx4cVb6nMq0wEr3tYu7iOp1aSd5fGh9jKl2zXcV".into(),
            "restaurant-orders-api".into(),
            3600,
        ))
    }

    #[test]
    fn query_token_is_read_only_on_websocket_upgrades() {
        let plain = Request::builder()
            .uri("/restaurant/orders?token=abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(query_token(&plain), None);

        let upgrade = Request::builder()
            .uri("/restaurant/orders/ws?status=pending&token=abc")
            .header(header::UPGRADE, "WebSocket")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(query_token(&upgrade).as_deref(), Some("abc"));
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let auth = service();
        let restaurant_id = Uuid::new_v4();
        let token = auth
            .issue_token(&TokenSubject {
                subject: "staff-1".into(),
                role: Role::Staff,
                restaurant_id,
                driver_id: None,
            })
            .unwrap();

        let user = AuthUser::from(auth.validate_token(&token).unwrap());
        assert_eq!(user.restaurant_id, restaurant_id);
        assert!(user.has_permission(consts::ORDERS_UPDATE));
        assert!(!user.has_permission(consts::DELIVERIES_UPDATE));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let auth = service();
        let token = auth
            .issue_token(&TokenSubject {
                subject: "x".into(),
                role: Role::Admin,
                restaurant_id: Uuid::new_v4(),
                driver_id: None,
            })
            .unwrap();

        let mut other = service();
        other.config.jwt_issuer = "someone-else".into();
        assert_matches!(other.validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn driver_tokens_require_driver_id() {
        let result = service().issue_token(&TokenSubject {
            subject: "d".into(),
            role: Role::Driver,
            restaurant_id: Uuid::new_v4(),
            driver_id: None,
        });
        assert_matches!(result, Err(AuthError::TokenCreation(_)));
    }

    #[test]
    fn expired_token_is_reported() {
        let mut auth = service();
        auth.config.token_ttl_secs = -600;
        let token = auth
            .issue_token(&TokenSubject {
                subject: "s".into(),
                role: Role::Staff,
                restaurant_id: Uuid::new_v4(),
                driver_id: None,
            })
            .unwrap();
        assert_matches!(auth.validate_token(&token), Err(AuthError::TokenExpired));
    }
}
