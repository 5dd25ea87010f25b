use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::core::state::AppState;
use crate::schemas::canvas::{CanvasAssignment, CanvasSubmission};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id", get(list_assignments))
        .route("/:course_id/:assignment_id", get(assignment_details))
        .route("/:course_id/:assignment_id/submissions", get(list_submissions))
}

async fn list_assignments(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<CanvasAssignment>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let assignments = state
        .canvas()
        .list_assignments(&conn, &course_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch assignments from Canvas"))?;
    Ok(Json(assignments))
}

async fn assignment_details(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, assignment_id)): Path<(String, String)>,
) -> Result<Json<CanvasAssignment>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let assignment = state
        .canvas()
        .assignment_details(&conn, &course_id, &assignment_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch assignment from Canvas"))?;
    Ok(Json(assignment))
}

async fn list_submissions(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, assignment_id)): Path<(String, String)>,
) -> Result<Json<Vec<CanvasSubmission>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let submissions = state
        .canvas()
        .list_submissions(&conn, &course_id, &assignment_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch submissions from Canvas"))?;
    Ok(Json(submissions))
}
