use thiserror::Error;

use crate::schemas::grading::{GradeForm, TargetId};
use crate::services::feedback::FeedbackResult;

/// Synthetic id given to submission rows Canvas returns without one (students
/// who have not submitted). These rows render in rosters but must never be
/// graded against the Canvas API.
pub(crate) const PLACEHOLDER_ID_PREFIX: &str = "placeholder_";

pub(crate) fn placeholder_id(user_id: &str) -> String {
    format!("{PLACEHOLDER_ID_PREFIX}{user_id}")
}

pub(crate) fn is_placeholder_id(submission_id: &str) -> bool {
    submission_id.starts_with(PLACEHOLDER_ID_PREFIX)
}

/// A generated result tagged with the target it was requested for.
#[derive(Debug, Clone)]
pub(crate) struct FeedbackOutcome {
    pub(crate) target: TargetId,
    pub(crate) result: FeedbackResult,
}

/// Merges a generated result into the teacher's editable form. Returns the
/// merged form and whether it was applied. When `active` names a different
/// target than the outcome was generated for (the teacher navigated away
/// while the request was in flight), the form comes back untouched.
pub(crate) fn merge_feedback(
    form: &GradeForm,
    outcome: &FeedbackOutcome,
    active: Option<&TargetId>,
) -> (GradeForm, bool) {
    if let Some(active) = active {
        if *active != outcome.target {
            return (form.clone(), false);
        }
    }

    let merged = GradeForm {
        // A null grade from the model means "no opinion"; the teacher's
        // current grade stands.
        grade: outcome.result.grade.clone().or_else(|| form.grade.clone()),
        feedback: outcome.result.feedback.clone(),
        grade_review: outcome.result.grade_review.clone(),
    };
    (merged, true)
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum GradeValidationError {
    #[error("grade must not be empty")]
    Empty,
    #[error("grade '{0}' is not a number")]
    NotNumeric(String),
    #[error("score {score} is outside the allowed range 0..={max}")]
    OutOfRange { score: f64, max: f64 },
    #[error("score {0} must not be negative")]
    Negative(f64),
}

/// Validates a grade string before it is posted to Canvas. Scores are
/// numeric, non-negative, and capped at the assignment's points when known.
pub(crate) fn validate_score(
    grade: &str,
    points_possible: Option<f64>,
) -> Result<f64, GradeValidationError> {
    let trimmed = grade.trim();
    if trimmed.is_empty() {
        return Err(GradeValidationError::Empty);
    }
    let score: f64 = trimmed
        .parse()
        .map_err(|_| GradeValidationError::NotNumeric(trimmed.to_string()))?;
    if !score.is_finite() || score < 0.0 {
        return Err(GradeValidationError::Negative(score));
    }
    if let Some(max) = points_possible {
        if score > max {
            return Err(GradeValidationError::OutOfRange { score, max });
        }
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(grade: Option<&str>) -> FeedbackResult {
        FeedbackResult {
            grade: grade.map(String::from),
            feedback: "Strong thesis; cite the second source.".to_string(),
            grade_review: Some("Argument quality outweighs citation gaps.".to_string()),
        }
    }

    fn form() -> GradeForm {
        GradeForm {
            grade: Some("7".to_string()),
            feedback: "old draft".to_string(),
            grade_review: None,
        }
    }

    #[test]
    fn null_grade_keeps_existing_while_feedback_is_replaced() {
        let outcome = FeedbackOutcome {
            target: TargetId { entity_id: "s1".into(), question_id: None },
            result: result(None),
        };
        let (merged, applied) = merge_feedback(&form(), &outcome, None);
        assert!(applied);
        assert_eq!(merged.grade.as_deref(), Some("7"));
        assert_eq!(merged.feedback, "Strong thesis; cite the second source.");
        assert!(merged.grade_review.is_some());
    }

    #[test]
    fn returned_grade_overwrites_existing() {
        let outcome = FeedbackOutcome {
            target: TargetId { entity_id: "s1".into(), question_id: None },
            result: result(Some("9")),
        };
        let (merged, applied) = merge_feedback(&form(), &outcome, None);
        assert!(applied);
        assert_eq!(merged.grade.as_deref(), Some("9"));
    }

    #[test]
    fn result_for_another_target_is_discarded() {
        let outcome = FeedbackOutcome {
            target: TargetId { entity_id: "s1".into(), question_id: None },
            result: result(Some("9")),
        };
        let active = TargetId { entity_id: "s2".into(), question_id: None };
        let (merged, applied) = merge_feedback(&form(), &outcome, Some(&active));
        assert!(!applied);
        assert_eq!(merged.grade.as_deref(), Some("7"));
        assert_eq!(merged.feedback, "old draft");
    }

    #[test]
    fn quiz_targets_match_on_question_too() {
        let outcome = FeedbackOutcome {
            target: TargetId { entity_id: "qs1".into(), question_id: Some("3".into()) },
            result: result(Some("2")),
        };
        let same_submission_other_question =
            TargetId { entity_id: "qs1".into(), question_id: Some("4".into()) };
        let (_, applied) =
            merge_feedback(&form(), &outcome, Some(&same_submission_other_question));
        assert!(!applied);
    }

    #[test]
    fn placeholder_ids_round_trip() {
        let id = placeholder_id("314");
        assert_eq!(id, "placeholder_314");
        assert!(is_placeholder_id(&id));
        assert!(!is_placeholder_id("98765"));
    }

    #[test]
    fn score_validation_bounds() {
        assert_eq!(validate_score("8.5", Some(10.0)), Ok(8.5));
        assert_eq!(validate_score("10", Some(10.0)), Ok(10.0));
        assert_eq!(validate_score("  ", Some(10.0)), Err(GradeValidationError::Empty));
        assert!(matches!(
            validate_score("eleven", Some(10.0)),
            Err(GradeValidationError::NotNumeric(_))
        ));
        assert_eq!(
            validate_score("11", Some(10.0)),
            Err(GradeValidationError::OutOfRange { score: 11.0, max: 10.0 })
        );
        assert_eq!(validate_score("-1", None), Err(GradeValidationError::Negative(-1.0)));
        // Without a known maximum any non-negative number is accepted.
        assert_eq!(validate_score("250", None), Ok(250.0));
    }
}
