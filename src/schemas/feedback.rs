use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schemas::grading::{GradeForm, TargetId};

/// Summative feedback judges the finished work; formative feedback coaches
/// toward the next draft. Passed through to the prompt unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AssessmentKind {
    #[default]
    Summative,
    Formative,
}

/// Stable subject variant set plus a free-text carrier, replacing the ad hoc
/// lowercase/underscore munging the setup wizard used to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Subject {
    Math,
    Science,
    English,
    History,
    SocialStudies,
    ForeignLanguage,
    ComputerScience,
    Art,
    Music,
    PhysicalEducation,
    Custom(String),
}

impl Subject {
    pub(crate) fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");
        match normalized.as_str() {
            "math" | "mathematics" => Self::Math,
            "science" => Self::Science,
            "english" => Self::English,
            "history" => Self::History,
            "social_studies" => Self::SocialStudies,
            "foreign_language" => Self::ForeignLanguage,
            "computer_science" => Self::ComputerScience,
            "art" => Self::Art,
            "music" => Self::Music,
            "physical_education" => Self::PhysicalEducation,
            _ => Self::Custom(raw.trim().to_string()),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Self::Math => "math",
            Self::Science => "science",
            Self::English => "english",
            Self::History => "history",
            Self::SocialStudies => "social_studies",
            Self::ForeignLanguage => "foreign_language",
            Self::ComputerScience => "computer_science",
            Self::Art => "art",
            Self::Music => "music",
            Self::PhysicalEducation => "physical_education",
            Self::Custom(raw) => raw,
        }
    }
}

impl Serialize for Subject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub(crate) struct FeedbackOptions {
    #[serde(default)]
    pub(crate) use_rubric: bool,
    #[serde(default)]
    pub(crate) assessment: AssessmentKind,
    #[serde(default)]
    pub(crate) subject: Option<Subject>,
    #[serde(default)]
    pub(crate) custom_prompt: Option<String>,
}

/// What is being graded. One tagged variant per entity shape so context
/// assembly can be matched exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum GradingTarget {
    AssignmentSubmission {
        course_id: String,
        assignment_id: String,
        user_id: String,
        submission_id: String,
    },
    DiscussionParticipation {
        course_id: String,
        topic_id: String,
        user_id: String,
    },
    QuizQuestion {
        course_id: String,
        quiz_id: String,
        quiz_submission_id: String,
        question_id: String,
    },
}

impl GradingTarget {
    pub(crate) fn id(&self) -> TargetId {
        match self {
            Self::AssignmentSubmission { submission_id, .. } => {
                TargetId { entity_id: submission_id.clone(), question_id: None }
            }
            Self::DiscussionParticipation { topic_id, user_id, .. } => {
                TargetId { entity_id: format!("{topic_id}/{user_id}"), question_id: None }
            }
            Self::QuizQuestion { quiz_submission_id, question_id, .. } => TargetId {
                entity_id: quiz_submission_id.clone(),
                question_id: Some(question_id.clone()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackGenerateRequest {
    pub(crate) target: GradingTarget,
    #[serde(default)]
    pub(crate) options: FeedbackOptions,
    /// The teacher's current editable form; fields the AI does not replace
    /// come back unchanged.
    #[serde(default)]
    pub(crate) form: GradeForm,
    /// The submission/question the caller is looking at right now. A result
    /// for a different target is discarded instead of merged.
    #[serde(default)]
    pub(crate) active_target: Option<TargetId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackGenerateResponse {
    pub(crate) target: TargetId,
    pub(crate) applied: bool,
    pub(crate) form: GradeForm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parses_known_variants_from_loose_input() {
        assert_eq!(Subject::parse("Social Studies"), Subject::SocialStudies);
        assert_eq!(Subject::parse("  MATH "), Subject::Math);
        assert_eq!(Subject::parse("computer science"), Subject::ComputerScience);
    }

    #[test]
    fn subject_keeps_free_text_verbatim() {
        let subject = Subject::parse("Marine Biology AP");
        assert_eq!(subject, Subject::Custom("Marine Biology AP".to_string()));
        assert_eq!(subject.as_str(), "Marine Biology AP");
    }

    #[test]
    fn target_id_carries_question_for_quiz_targets() {
        let target = GradingTarget::QuizQuestion {
            course_id: "c1".into(),
            quiz_id: "q1".into(),
            quiz_submission_id: "qs9".into(),
            question_id: "7".into(),
        };
        let id = target.id();
        assert_eq!(id.entity_id, "qs9");
        assert_eq!(id.question_id.as_deref(), Some("7"));
    }
}
