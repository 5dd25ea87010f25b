use axum::{extract::State, routing::get, routing::post, routing::put, Json, Router};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{load_profile, CurrentTeacher};
use crate::api::validation;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::profile::{
    CanvasSetupRequest, CanvasTestRequest, CanvasTestResponse, ProfileResponse,
};
use crate::services::canvas::CanvasConnection;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/canvas", put(setup_canvas))
        .route("/canvas/test", post(test_canvas))
}

async fn get_profile(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = load_profile(&state, &teacher.teacher_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Canvas profile is not set up".to_string()))?;

    Ok(Json(ProfileResponse::from_db(profile)))
}

/// Stores the teacher's Canvas credentials, but only after the token has
/// been proven against the instance.
async fn setup_canvas(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CanvasSetupRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    validation::check(&payload)?;
    validation::validate_instance_url(&payload.instance_url)?;

    let conn = CanvasConnection::new(&payload.instance_url, &payload.access_token);
    let canvas_user = state
        .canvas()
        .test_connection(&conn)
        .await
        .map_err(|e| ApiError::upstream(e, "Canvas connection test failed"))?;

    let now = primitive_now_utc();
    let profile = repositories::profiles::upsert(
        state.db(),
        repositories::profiles::UpsertProfile {
            id: &Uuid::new_v4().to_string(),
            teacher_id: &teacher.teacher_id,
            canvas_instance_url: &conn.base_url,
            canvas_access_token: &conn.access_token,
            school_name: payload.school_name.as_deref(),
            connection_verified_at: now,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save Canvas profile"))?;

    tracing::info!(
        teacher_id = %teacher.teacher_id,
        canvas_user = %canvas_user.name,
        "Canvas connection configured"
    );
    Ok(Json(ProfileResponse::from_db(profile)))
}

/// Dry-run connection check; nothing is persisted. A failed check is a
/// normal answer here, not an error response.
async fn test_canvas(
    _teacher: CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CanvasTestRequest>,
) -> Result<Json<CanvasTestResponse>, ApiError> {
    validation::check(&payload)?;
    validation::validate_instance_url(&payload.instance_url)?;

    let conn = CanvasConnection::new(&payload.instance_url, &payload.access_token);
    match state.canvas().test_connection(&conn).await {
        Ok(user) => {
            Ok(Json(CanvasTestResponse { connected: true, canvas_user_name: Some(user.name) }))
        }
        Err(err) => {
            tracing::info!(error = %err, "Canvas connection test failed");
            Ok(Json(CanvasTestResponse { connected: false, canvas_user_name: None }))
        }
    }
}
