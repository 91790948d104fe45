pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::Cookie;
use axum_extra::TypedHeader;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Permission,
    schema::permissions,
    state::AppState,
};

/// Name of the HTTP-only cookie carrying the signed token.
pub const AUTH_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(cookies) = TypedHeader::<Cookie>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized())?;

        let token = cookies
            .get(AUTH_COOKIE_NAME)
            .ok_or_else(AppError::unauthorized)?;

        let claims = state
            .jwt
            .verify_token(token)
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}

pub fn load_permissions(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Permission> {
    let row = permissions::table
        .filter(permissions::user_id.eq(user_id))
        .first(conn)?;
    Ok(row)
}

/// Gate for staff-only operations; 403 unless the caller carries a manager flag.
pub fn require_manager(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Permission> {
    let permission = load_permissions(conn, user_id)?;
    if !permission.is_manager() {
        return Err(AppError::forbidden());
    }
    Ok(permission)
}
