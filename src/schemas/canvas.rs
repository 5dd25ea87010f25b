use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

/// Canvas mixes numeric and string ids across endpoints; everything is kept
/// as a string on our side so synthetic placeholder ids fit the same fields.
fn de_stringly<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Num(value) => value.to_string(),
        Repr::Float(value) => value.to_string(),
        Repr::Text(value) => value,
    })
}

fn de_opt_stringly<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Num(value) => value.to_string(),
        Repr::Float(value) => value.to_string(),
        Repr::Text(value) => value,
    }))
}

// Quiz answer payloads occasionally carry "undefined" instead of a boolean.
fn de_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|inner| inner.as_bool()))
}

/// Authoritative grading status, set only by Canvas. Unknown labels are kept
/// verbatim so they can still be rendered as a fallback badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkflowState {
    Untaken,
    PendingReview,
    Complete,
    Graded,
    Submitted,
    Unsubmitted,
    Other(String),
}

impl WorkflowState {
    pub(crate) fn from_label(label: &str) -> Self {
        match label {
            "untaken" => Self::Untaken,
            "pending_review" => Self::PendingReview,
            "complete" => Self::Complete,
            "graded" => Self::Graded,
            "submitted" => Self::Submitted,
            "unsubmitted" => Self::Unsubmitted,
            other => Self::Other(other.to_string()),
        }
    }

    pub(crate) fn label(&self) -> &str {
        match self {
            Self::Untaken => "untaken",
            Self::PendingReview => "pending_review",
            Self::Complete => "complete",
            Self::Graded => "graded",
            Self::Submitted => "submitted",
            Self::Unsubmitted => "unsubmitted",
            Self::Other(label) => label,
        }
    }

    fn default_unsubmitted() -> Self {
        Self::Unsubmitted
    }

    fn default_untaken() -> Self {
        Self::Untaken
    }
}

impl Serialize for WorkflowState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for WorkflowState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CanvasCourse {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) course_code: Option<String>,
    #[serde(default)]
    pub(crate) total_students: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CanvasAssignment {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) points_possible: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) due_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) needs_grading_count: Option<i64>,
    #[serde(default)]
    pub(crate) rubric: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) use_rubric_for_grading: Option<bool>,
    #[serde(default)]
    pub(crate) html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CanvasUser {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    #[serde(default, alias = "display_name")]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) sortable_name: Option<String>,
    #[serde(default, alias = "avatar_image_url")]
    pub(crate) avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubmissionAttachment {
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default, alias = "content-type")]
    pub(crate) content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CanvasSubmission {
    /// Canvas omits the id for students with nothing submitted yet; the
    /// client fills in a synthetic placeholder id after fetching.
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub(crate) id: Option<String>,
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub(crate) grade: Option<String>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) submitted_at: Option<OffsetDateTime>,
    #[serde(default = "WorkflowState::default_unsubmitted")]
    pub(crate) workflow_state: WorkflowState,
    #[serde(default)]
    pub(crate) user: Option<CanvasUser>,
    #[serde(default)]
    pub(crate) attachments: Vec<SubmissionAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DiscussionTopic {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) posted_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) discussion_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryAuthor {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    #[serde(default, alias = "display_name")]
    pub(crate) name: String,
    #[serde(default, alias = "avatar_image_url")]
    pub(crate) avatar_url: Option<String>,
}

/// A single discussion post or reply, flattened out of Canvas's nested
/// full-topic view. `parent_id == None` marks a top-level (initial) post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DiscussionEntry {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) user: Option<EntryAuthor>,
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub(crate) parent_id: Option<String>,
    pub(crate) message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

impl DiscussionEntry {
    pub(crate) fn author_name(&self) -> &str {
        self.user.as_ref().map(|author| author.name.as_str()).unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DiscussionGrade {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) user_id: String,
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub(crate) grade: Option<String>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

impl DiscussionGrade {
    pub(crate) fn is_graded(&self) -> bool {
        self.grade.is_some() || self.score.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Quiz {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) question_count: Option<i64>,
    #[serde(default)]
    pub(crate) points_possible: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuizSubmission {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) attempt: Option<i64>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default)]
    pub(crate) kept_score: Option<f64>,
    #[serde(default = "WorkflowState::default_untaken")]
    pub(crate) workflow_state: WorkflowState,
    #[serde(default)]
    pub(crate) user: Option<CanvasUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuizQuestion {
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) id: String,
    pub(crate) question_type: String,
    #[serde(default)]
    pub(crate) question_name: Option<String>,
    #[serde(default)]
    pub(crate) question_text: String,
    #[serde(default)]
    pub(crate) points_possible: Option<f64>,
}

impl QuizQuestion {
    /// Canvas auto-grades everything except these types.
    pub(crate) fn requires_manual_grading(&self) -> bool {
        matches!(self.question_type.as_str(), "essay_question" | "file_upload_question")
    }
}

/// A student's raw answer; Canvas returns a bare string, an array of
/// strings, or a structured blob depending on the question type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Text(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl AnswerValue {
    pub(crate) fn as_display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Many(items) => items.join(", "),
            Self::Other(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubmissionAnswer {
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub(crate) id: Option<String>,
    #[serde(deserialize_with = "de_stringly")]
    pub(crate) question_id: String,
    #[serde(default, alias = "text")]
    pub(crate) answer: Option<AnswerValue>,
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub(crate) correct: Option<bool>,
    #[serde(default)]
    pub(crate) points: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_accepts_numeric_and_missing_ids() {
        let with_id: CanvasSubmission =
            serde_json::from_value(serde_json::json!({"id": 42, "user_id": 7})).unwrap();
        assert_eq!(with_id.id.as_deref(), Some("42"));
        assert_eq!(with_id.user_id, "7");
        assert_eq!(with_id.workflow_state, WorkflowState::Unsubmitted);

        let without_id: CanvasSubmission = serde_json::from_value(serde_json::json!({
            "user_id": "9",
            "workflow_state": "submitted"
        }))
        .unwrap();
        assert!(without_id.id.is_none());
        assert_eq!(without_id.workflow_state, WorkflowState::Submitted);
    }

    #[test]
    fn workflow_state_keeps_unknown_labels() {
        let state = WorkflowState::from_label("settings_only");
        assert_eq!(state.label(), "settings_only");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"settings_only\"");
    }

    #[test]
    fn answer_value_variants_display() {
        let text: AnswerValue = serde_json::from_value(serde_json::json!("photosynthesis")).unwrap();
        assert_eq!(text.as_display(), "photosynthesis");

        let many: AnswerValue = serde_json::from_value(serde_json::json!(["a", "b"])).unwrap();
        assert_eq!(many.as_display(), "a, b");

        let other: AnswerValue =
            serde_json::from_value(serde_json::json!({"matching": [1, 2]})).unwrap();
        assert_eq!(other.as_display(), "{\"matching\":[1,2]}");
    }

    #[test]
    fn lenient_bool_tolerates_non_boolean_correct() {
        let answer: SubmissionAnswer = serde_json::from_value(serde_json::json!({
            "id": 1,
            "question_id": 2,
            "correct": "undefined"
        }))
        .unwrap();
        assert_eq!(answer.id.as_deref(), Some("1"));
        assert_eq!(answer.correct, None);

        let graded: SubmissionAnswer = serde_json::from_value(serde_json::json!({
            "id": 1,
            "question_id": 2,
            "correct": true,
            "points": 3.0
        }))
        .unwrap();
        assert_eq!(graded.correct, Some(true));
    }
}
