use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::schemas::canvas::{QuizSubmission, WorkflowState};

/// Questions graded during the current grading session, keyed by quiz
/// submission id. A display optimization only: Canvas's `workflow_state`
/// always wins when the two disagree. Held in `AppState` and reset per
/// session, never a module-level singleton.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressStore {
    inner: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

impl ProgressStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_graded(&self, submission_id: &str, question_id: &str) {
        let mut tracked = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracked.entry(submission_id.to_string()).or_default().insert(question_id.to_string());
    }

    pub(crate) fn tracked_for(&self, submission_id: &str) -> HashSet<String> {
        let tracked = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracked.get(submission_id).cloned().unwrap_or_default()
    }

    pub(crate) fn reset(&self) {
        let mut tracked = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracked.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct GradingProgress {
    pub(crate) graded_count: usize,
    pub(crate) total_questions: usize,
    pub(crate) percentage: f64,
}

/// Reconciles the session-local tracked set against Canvas's authoritative
/// state. `graded` from Canvas short-circuits to 100% even when the local
/// set is stale or empty (e.g. after a reload).
pub(crate) fn grading_progress(
    workflow_state: &WorkflowState,
    tracked: &HashSet<String>,
    total_questions: usize,
) -> GradingProgress {
    if *workflow_state == WorkflowState::Graded {
        return GradingProgress {
            graded_count: total_questions,
            total_questions,
            percentage: 100.0,
        };
    }

    let graded_count = tracked.len();
    let percentage = if total_questions == 0 {
        0.0
    } else {
        graded_count as f64 / total_questions as f64 * 100.0
    };

    GradingProgress { graded_count, total_questions, percentage }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GradingStatus {
    Graded,
    PartiallyGraded,
    NeedsGrading,
    NotTaken,
    Other(String),
}

pub(crate) fn classify_status(
    workflow_state: &WorkflowState,
    graded_count: usize,
) -> GradingStatus {
    match workflow_state {
        WorkflowState::Graded => GradingStatus::Graded,
        _ if graded_count > 0 => GradingStatus::PartiallyGraded,
        WorkflowState::Complete | WorkflowState::PendingReview => GradingStatus::NeedsGrading,
        WorkflowState::Untaken => GradingStatus::NotTaken,
        other => GradingStatus::Other(other.label().to_string()),
    }
}

pub(crate) fn status_badge(workflow_state: &WorkflowState, progress: GradingProgress) -> String {
    match classify_status(workflow_state, progress.graded_count) {
        GradingStatus::Graded => "Graded".to_string(),
        GradingStatus::PartiallyGraded => {
            format!("Partially Graded ({}/{})", progress.graded_count, progress.total_questions)
        }
        GradingStatus::NeedsGrading => "Needs Grading".to_string(),
        GradingStatus::NotTaken => "Not Taken".to_string(),
        GradingStatus::Other(label) => label,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionProgressView {
    pub(crate) submission: QuizSubmission,
    pub(crate) progress: GradingProgress,
    pub(crate) status: String,
}

pub(crate) fn annotate_submissions(
    store: &ProgressStore,
    submissions: Vec<QuizSubmission>,
    total_manual_questions: usize,
) -> Vec<SubmissionProgressView> {
    submissions
        .into_iter()
        .map(|submission| {
            let tracked = store.tracked_for(&submission.id);
            let progress =
                grading_progress(&submission.workflow_state, &tracked, total_manual_questions);
            let status = status_badge(&submission.workflow_state, progress);
            SubmissionProgressView { submission, progress, status }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn canvas_graded_overrides_empty_local_set() {
        let progress = grading_progress(&WorkflowState::Graded, &HashSet::new(), 5);
        assert_eq!(progress.graded_count, 5);
        assert_eq!(progress.percentage, 100.0);
    }

    #[test]
    fn partial_progress_counts_tracked_questions() {
        let progress = grading_progress(&WorkflowState::Complete, &tracked(&["q1", "q2"]), 5);
        assert_eq!(progress.graded_count, 2);
        assert_eq!(progress.percentage, 40.0);
    }

    #[test]
    fn zero_questions_reports_zero_percent() {
        let progress = grading_progress(&WorkflowState::Complete, &HashSet::new(), 0);
        assert_eq!(progress.percentage, 0.0);
    }

    #[test]
    fn complete_with_partial_tracking_is_partially_graded_badge() {
        let progress = grading_progress(&WorkflowState::Complete, &tracked(&["q1", "q2"]), 5);
        let badge = status_badge(&WorkflowState::Complete, progress);
        assert_eq!(badge, "Partially Graded (2/5)");
    }

    #[test]
    fn status_priority_ordering() {
        assert_eq!(classify_status(&WorkflowState::Graded, 0), GradingStatus::Graded);
        // Canvas-confirmed wins even over a populated local set.
        assert_eq!(classify_status(&WorkflowState::Graded, 3), GradingStatus::Graded);
        assert_eq!(
            classify_status(&WorkflowState::PendingReview, 0),
            GradingStatus::NeedsGrading
        );
        assert_eq!(classify_status(&WorkflowState::Untaken, 0), GradingStatus::NotTaken);
        assert_eq!(
            classify_status(&WorkflowState::Other("settings_only".to_string()), 0),
            GradingStatus::Other("settings_only".to_string())
        );
    }

    #[test]
    fn store_accumulates_and_resets() {
        let store = ProgressStore::new();
        store.record_graded("sub1", "q1");
        store.record_graded("sub1", "q2");
        store.record_graded("sub1", "q2");
        store.record_graded("sub2", "q1");

        assert_eq!(store.tracked_for("sub1").len(), 2);
        assert_eq!(store.tracked_for("sub2").len(), 1);
        assert!(store.tracked_for("sub3").is_empty());

        store.reset();
        assert!(store.tracked_for("sub1").is_empty());
    }
}
