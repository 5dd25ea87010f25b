use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::delete, routing::get, routing::post, Json, Router};
use serde::Serialize;

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::core::state::AppState;
use crate::schemas::canvas::{Quiz, QuizQuestion, SubmissionAnswer};
use crate::services::progress::{self, SubmissionProgressView};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id", get(list_quizzes))
        .route("/:course_id/:quiz_id/submissions", get(quiz_submissions))
        .route("/:course_id/:quiz_id/questions", get(quiz_questions))
        .route("/:course_id/:quiz_id/submissions/:submission_id/answers", get(submission_answers))
        .route("/submissions/:submission_id/questions/:question_id/graded", post(mark_graded))
        .route("/progress", delete(reset_progress))
}

async fn list_quizzes(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Quiz>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let quizzes = state
        .canvas()
        .list_quizzes(&conn, &course_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch quizzes from Canvas"))?;
    Ok(Json(quizzes))
}

/// Submissions annotated with session-local grading progress and a status
/// badge. Progress is measured against the manually graded question count.
async fn quiz_submissions(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, quiz_id)): Path<(String, String)>,
) -> Result<Json<Vec<SubmissionProgressView>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let submissions = state
        .canvas()
        .quiz_submissions(&conn, &course_id, &quiz_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch quiz submissions from Canvas"))?;
    let questions = state
        .canvas()
        .quiz_questions(&conn, &course_id, &quiz_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch quiz questions from Canvas"))?;

    let manual_questions =
        questions.iter().filter(|question| question.requires_manual_grading()).count();

    Ok(Json(progress::annotate_submissions(state.progress(), submissions, manual_questions)))
}

async fn quiz_questions(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, quiz_id)): Path<(String, String)>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let questions = state
        .canvas()
        .quiz_questions(&conn, &course_id, &quiz_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch quiz questions from Canvas"))?;
    Ok(Json(questions))
}

async fn submission_answers(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, quiz_id, submission_id)): Path<(String, String, String)>,
) -> Result<Json<Vec<SubmissionAnswer>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let answers = state
        .canvas()
        .submission_answers(&conn, &course_id, &quiz_id, &submission_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch submission answers from Canvas"))?;
    Ok(Json(answers))
}

#[derive(Debug, Serialize)]
struct TrackedResponse {
    submission_id: String,
    graded_question_ids: Vec<String>,
}

async fn mark_graded(
    _teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((submission_id, question_id)): Path<(String, String)>,
) -> Result<Json<TrackedResponse>, ApiError> {
    state.progress().record_graded(&submission_id, &question_id);

    let mut graded_question_ids: Vec<String> =
        state.progress().tracked_for(&submission_id).into_iter().collect();
    graded_question_ids.sort();
    Ok(Json(TrackedResponse { submission_id, graded_question_ids }))
}

async fn reset_progress(
    _teacher: CurrentTeacher,
    State(state): State<AppState>,
) -> StatusCode {
    state.progress().reset();
    StatusCode::NO_CONTENT
}
