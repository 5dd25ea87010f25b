use axum::{extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_canvas_connection, CurrentTeacher};
use crate::core::state::AppState;
use crate::schemas::feedback::{FeedbackGenerateRequest, FeedbackGenerateResponse, GradingTarget};
use crate::services::canvas::CanvasConnection;
use crate::services::feedback::FeedbackRequest;
use crate::services::grading::{merge_feedback, FeedbackOutcome};
use crate::services::{context, participation};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(generate_feedback))
}

/// Fetches the graded material from Canvas, assembles the prompt context,
/// calls the feedback service and merges the result into the submitted
/// form. The response echoes the target id so a caller that has moved on
/// can discard it; the same check happens server-side against
/// `active_target`.
async fn generate_feedback(
    teacher: CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<FeedbackGenerateRequest>,
) -> Result<Json<FeedbackGenerateResponse>, ApiError> {
    let conn = require_canvas_connection(&state, &teacher.teacher_id).await?;

    let (context, max_points) = assemble_context(&state, &conn, &payload.target).await?;

    let result = state
        .feedback()
        .generate(FeedbackRequest {
            context,
            options: payload.options,
            current_grade: payload.form.grade.clone(),
            max_points,
        })
        .await
        .map_err(|e| ApiError::upstream(e, "Feedback generation failed"))?;

    let outcome = FeedbackOutcome { target: payload.target.id(), result };
    let (form, applied) =
        merge_feedback(&payload.form, &outcome, payload.active_target.as_ref());

    Ok(Json(FeedbackGenerateResponse { target: outcome.target, applied, form }))
}

async fn assemble_context(
    state: &AppState,
    conn: &CanvasConnection,
    target: &GradingTarget,
) -> Result<(String, Option<f64>), ApiError> {
    match target {
        GradingTarget::AssignmentSubmission { course_id, assignment_id, submission_id, user_id } => {
            let assignment = state
                .canvas()
                .assignment_details(conn, course_id, assignment_id)
                .await
                .map_err(|e| ApiError::upstream(e, "Failed to fetch assignment from Canvas"))?;
            let submissions = state
                .canvas()
                .list_submissions(conn, course_id, assignment_id)
                .await
                .map_err(|e| ApiError::upstream(e, "Failed to fetch submissions from Canvas"))?;
            let submission = submissions
                .into_iter()
                .find(|submission| {
                    submission.id.as_deref() == Some(submission_id.as_str())
                        || submission.user_id == *user_id
                })
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Submission {submission_id} was not found"))
                })?;

            let use_rubric = assignment.use_rubric_for_grading.unwrap_or(false);
            let doc = context::build_assignment_context(&assignment, &submission, use_rubric);
            Ok((doc, assignment.points_possible))
        }
        GradingTarget::DiscussionParticipation { course_id, topic_id, user_id } => {
            let topic = state
                .canvas()
                .discussion_topic(conn, course_id, topic_id)
                .await
                .map_err(|e| ApiError::upstream(e, "Failed to fetch discussion from Canvas"))?;
            let entries = state
                .canvas()
                .discussion_entries(conn, course_id, topic_id)
                .await
                .map_err(|e| {
                    ApiError::upstream(e, "Failed to fetch discussion entries from Canvas")
                })?;

            let summary = participation::group_and_summarize(&entries, user_id);
            let student_name = summary
                .student_entries
                .first()
                .map(|entry| entry.author_name().to_string())
                .unwrap_or_else(|| format!("Student {user_id}"));

            let doc = context::build_discussion_context(&topic, &summary, &entries, &student_name);
            Ok((doc, None))
        }
        GradingTarget::QuizQuestion { course_id, quiz_id, quiz_submission_id, question_id } => {
            let questions = state
                .canvas()
                .quiz_questions(conn, course_id, quiz_id)
                .await
                .map_err(|e| ApiError::upstream(e, "Failed to fetch quiz questions from Canvas"))?;
            let question = questions
                .into_iter()
                .find(|question| question.id == *question_id)
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Quiz question {question_id} was not found"))
                })?;

            // A missing answer is survivable; the context says so explicitly.
            let answers = state
                .canvas()
                .submission_answers(conn, course_id, quiz_id, quiz_submission_id)
                .await
                .unwrap_or_default();
            let answer = answers.iter().find(|answer| answer.question_id == *question_id);

            let doc = context::build_question_context(&question, answer);
            Ok((doc, question.points_possible))
        }
    }
}
