use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identity of the entity a grading operation belongs to. Async results are
/// only applied when this still matches the active selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TargetId {
    pub(crate) entity_id: String,
    #[serde(default)]
    pub(crate) question_id: Option<String>,
}

/// The teacher-editable grade/feedback state for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub(crate) struct GradeForm {
    #[serde(default)]
    pub(crate) grade: Option<String>,
    #[serde(default)]
    pub(crate) feedback: String,
    /// Teacher-only rationale; never part of the student-facing feedback.
    #[serde(default)]
    pub(crate) grade_review: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeSubmitRequest {
    pub(crate) course_id: String,
    pub(crate) assignment_id: String,
    pub(crate) user_id: String,
    pub(crate) submission_id: String,
    #[validate(length(min = 1, message = "grade must not be empty"))]
    pub(crate) grade: String,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
    #[serde(default)]
    pub(crate) points_possible: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeSubmitResponse {
    pub(crate) submitted: bool,
    pub(crate) submission_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) workflow_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}
