use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    config::AuthSettings,
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

/// Header carrying the guest cart id for anonymous shoppers.
pub const CART_SESSION_HEADER: &str = "x-cart-session";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Staff role, or an email under the staff domain.
    pub fn is_admin(&self, settings: &AuthSettings) -> bool {
        if self.role.is_elevated() {
            return true;
        }
        let domain = settings.admin_email_domain.trim_start_matches('@');
        !domain.is_empty()
            && self
                .email
                .to_lowercase()
                .ends_with(&format!("@{}", domain.to_lowercase()))
    }
}

pub fn ensure_admin(user: &AuthUser, settings: &AuthSettings) -> AppResult<()> {
    if !user.is_admin(settings) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn decode_token(token: &str, settings: &AuthSettings) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    Ok(decoded.claims)
}

fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;
    Ok(Some(token.trim()))
}

/// Resolves the token subject against the store so role changes and
/// deletions take effect on the next request.
async fn current_user(claims: Claims, state: &AppState) -> AppResult<AuthUser> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let account = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".into()))?;
    Ok(AuthUser {
        user_id: account.id,
        email: account.email,
        role: account.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
        current_user(decode_token(token, &state.config.auth)?, state).await
    }
}

/// Identity for routes open to guests. A present but invalid token is
/// still rejected so clients notice an expired session.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers)? {
            Some(token) => {
                let claims = decode_token(token, &state.config.auth)?;
                Ok(MaybeAuthUser(Some(current_user(claims, state).await?)))
            }
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// Guest cart id from the `x-cart-session` header, if any.
#[derive(Debug, Clone, Copy)]
pub struct CartSession(pub Option<Uuid>);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(CART_SESSION_HEADER) else {
            return Ok(CartSession(None));
        };
        let id = value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| AppError::BadRequest(format!("{CART_SESSION_HEADER} must be a UUID")))?;
        Ok(CartSession(Some(id)))
    }
}
