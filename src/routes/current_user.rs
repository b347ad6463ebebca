use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

/// Header carrying the authenticated user's id, set by the auth layer in front
/// of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, resolved from [`USER_ID_HEADER`] against the users table.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user_id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::Unauthorized)?;

        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(user))
    }
}
