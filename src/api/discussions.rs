use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::core::state::AppState;
use crate::schemas::canvas::{DiscussionEntry, DiscussionGrade, DiscussionTopic};
use crate::services::participation::{
    self, RosterPartition, RosterStudent, StudentParticipation,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id", get(list_discussions))
        .route("/:course_id/:topic_id/entries", get(list_entries))
        .route("/:course_id/:topic_id/roster", get(roster))
        .route("/:course_id/:topic_id/participation/:user_id", get(student_participation))
}

async fn list_discussions(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<DiscussionTopic>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let topics = state
        .canvas()
        .list_discussions(&conn, &course_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch discussions from Canvas"))?;
    Ok(Json(topics))
}

async fn list_entries(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, topic_id)): Path<(String, String)>,
) -> Result<Json<Vec<DiscussionEntry>>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let entries = state
        .canvas()
        .discussion_entries(&conn, &course_id, &topic_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch discussion entries from Canvas"))?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
struct RosterQuery {
    /// When the discussion is graded through an assignment, passing its id
    /// adds the graded/ungraded split to the response.
    assignment_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RosterResponse {
    students: Vec<RosterStudent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partition: Option<RosterPartition>,
}

async fn roster(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, topic_id)): Path<(String, String)>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<RosterResponse>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let entries = state
        .canvas()
        .discussion_entries(&conn, &course_id, &topic_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch discussion entries from Canvas"))?;

    let students = participation::build_roster(&entries);

    let partition = match query.assignment_id {
        Some(assignment_id) => {
            let submissions = state
                .canvas()
                .list_submissions(&conn, &course_id, &assignment_id)
                .await
                .map_err(|e| ApiError::upstream(e, "Failed to fetch submissions from Canvas"))?;
            let grades: Vec<DiscussionGrade> = submissions
                .into_iter()
                .map(|submission| DiscussionGrade {
                    user_id: submission.user_id,
                    grade: submission.grade,
                    score: submission.score,
                    feedback: None,
                })
                .collect();
            Some(participation::partition_by_grade(students.clone(), &grades))
        }
        None => None,
    };

    Ok(Json(RosterResponse { students, partition }))
}

async fn student_participation(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Path((course_id, topic_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<StudentParticipation>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;
    let entries = state
        .canvas()
        .discussion_entries(&conn, &course_id, &topic_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch discussion entries from Canvas"))?;

    Ok(Json(participation::group_and_summarize(&entries, &user_id)))
}
