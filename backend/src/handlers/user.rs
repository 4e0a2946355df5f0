//! Current user handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::user::{UserProfile, UserService};
use crate::AppState;

/// Get the authenticated user's profile
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    let service = UserService::new(state.db);
    let profile = service.touch(&current_user.0).await?;
    Ok(Json(profile))
}
