use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::Profile;
use crate::repositories;
use crate::services::canvas::CanvasConnection;

/// The authenticated teacher, resolved from the bearer JWT minted by the
/// auth provider. Carries only the subject id; the profile row is loaded
/// on demand where the Canvas connection is needed.
pub(crate) struct CurrentTeacher {
    pub(crate) teacher_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        Ok(CurrentTeacher { teacher_id: claims.sub })
    }
}

pub(crate) async fn load_profile(
    state: &AppState,
    teacher_id: &str,
) -> Result<Option<Profile>, ApiError> {
    repositories::profiles::find_by_teacher_id(state.db(), teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher profile"))
}

/// The teacher's stored Canvas credentials. A missing profile means setup
/// was never completed; that is a caller error, not an upstream one.
pub(crate) async fn require_canvas_connection(
    state: &AppState,
    teacher_id: &str,
) -> Result<CanvasConnection, ApiError> {
    let profile = load_profile(state, teacher_id).await?.ok_or_else(|| {
        ApiError::BadRequest("Canvas connection is not configured for this account".to_string())
    })?;

    Ok(CanvasConnection::new(&profile.canvas_instance_url, &profile.canvas_access_token))
}
