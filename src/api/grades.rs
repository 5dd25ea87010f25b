use axum::{extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::api::validation;
use crate::core::state::AppState;
use crate::schemas::grading::{GradeSubmitRequest, GradeSubmitResponse};
use crate::services::grading::{is_placeholder_id, validate_score};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_grade))
}

async fn submit_grade(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeSubmitRequest>,
) -> Result<Json<GradeSubmitResponse>, ApiError> {
    // Placeholder rows exist only to show non-submitting students in the
    // roster; refusing them here is an answer, not an error.
    if is_placeholder_id(&payload.submission_id) {
        return Ok(Json(GradeSubmitResponse {
            submitted: false,
            submission_id: payload.submission_id,
            score: None,
            workflow_state: "unsubmitted".to_string(),
            detail: Some("This student has not submitted anything to grade".to_string()),
        }));
    }

    validation::check(&payload)?;
    let score = validate_score(&payload.grade, payload.points_possible)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let updated = state
        .canvas()
        .grade_submission(
            &conn,
            &payload.course_id,
            &payload.assignment_id,
            &payload.user_id,
            &payload.grade,
            payload.feedback.as_deref(),
        )
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to submit grade to Canvas"))?;

    tracing::info!(
        teacher_id = %teacher.teacher_id,
        submission_id = %payload.submission_id,
        score,
        "Grade submitted"
    );

    // Canvas can lag on recomputing workflow_state; the caller treats the
    // save as graded immediately.
    Ok(Json(GradeSubmitResponse {
        submitted: true,
        submission_id: payload.submission_id,
        score: updated.score.or(Some(score)),
        workflow_state: "graded".to_string(),
        detail: None,
    }))
}
