use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::core::state::AppState;
use crate::schemas::canvas::CanvasCourse;
use crate::services::canvas::CourseNeedsGrading;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/needs-grading", get(needs_grading))
}

async fn list_courses(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<CanvasCourse>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let courses = state
        .canvas()
        .list_courses(&conn)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch courses from Canvas"))?;
    Ok(Json(courses))
}

async fn needs_grading(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseNeedsGrading>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let pending = state
        .canvas()
        .assignments_needing_grading(&conn)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch grading backlog from Canvas"))?;
    Ok(Json(pending))
}
