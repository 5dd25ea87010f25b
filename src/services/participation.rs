use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::schemas::canvas::{DiscussionEntry, DiscussionGrade};

/// Per-student view of one discussion, recomputed from the flat entry list
/// on every request; nothing here has an independent lifecycle.
#[derive(Debug, Clone, Serialize, Default)]
pub(crate) struct StudentParticipation {
    pub(crate) student_entries: Vec<DiscussionEntry>,
    pub(crate) initial_posts: Vec<DiscussionEntry>,
    pub(crate) replies: Vec<DiscussionEntry>,
    /// The posts the student replied to, resolved against the full entry
    /// collection. Parents Canvas no longer returns are dropped silently.
    pub(crate) replied_to_posts: Vec<DiscussionEntry>,
    /// Initial posts, replies and resolved parents merged chronologically.
    pub(crate) all_relevant_entries: Vec<DiscussionEntry>,
    pub(crate) total_participation: usize,
}

pub(crate) fn group_and_summarize(
    entries: &[DiscussionEntry],
    target_user_id: &str,
) -> StudentParticipation {
    let student_entries: Vec<DiscussionEntry> =
        entries.iter().filter(|entry| entry.user_id == target_user_id).cloned().collect();

    let initial_posts: Vec<DiscussionEntry> =
        student_entries.iter().filter(|entry| entry.parent_id.is_none()).cloned().collect();
    let replies: Vec<DiscussionEntry> =
        student_entries.iter().filter(|entry| entry.parent_id.is_some()).cloned().collect();

    let by_id: HashMap<&str, &DiscussionEntry> =
        entries.iter().map(|entry| (entry.id.as_str(), entry)).collect();

    let replied_to_posts: Vec<DiscussionEntry> = replies
        .iter()
        .filter_map(|reply| reply.parent_id.as_deref())
        .filter_map(|parent_id| by_id.get(parent_id).map(|entry| (*entry).clone()))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut all_relevant_entries: Vec<DiscussionEntry> = Vec::new();
    for entry in initial_posts.iter().chain(replies.iter()).chain(replied_to_posts.iter()) {
        if seen.insert(entry.id.as_str()) {
            all_relevant_entries.push(entry.clone());
        }
    }
    // Stable sort: entries sharing a timestamp keep their fetch order.
    all_relevant_entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let total_participation = initial_posts.len() + replies.len();

    StudentParticipation {
        student_entries,
        initial_posts,
        replies,
        replied_to_posts,
        all_relevant_entries,
        total_participation,
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RosterStudent {
    pub(crate) user_id: String,
    pub(crate) name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) entry_count: usize,
    pub(crate) initial_posts: usize,
    pub(crate) replies: usize,
}

/// Groups all entries by author for the sidebar roster, sorted
/// alphabetically by last-name token, case-insensitively.
pub(crate) fn build_roster(entries: &[DiscussionEntry]) -> Vec<RosterStudent> {
    let mut order: Vec<String> = Vec::new();
    let mut by_user: HashMap<String, RosterStudent> = HashMap::new();

    for entry in entries {
        let student = by_user.entry(entry.user_id.clone()).or_insert_with(|| {
            order.push(entry.user_id.clone());
            RosterStudent {
                user_id: entry.user_id.clone(),
                name: entry.author_name().to_string(),
                avatar_url: entry.user.as_ref().and_then(|user| user.avatar_url.clone()),
                entry_count: 0,
                initial_posts: 0,
                replies: 0,
            }
        });
        student.entry_count += 1;
        if entry.parent_id.is_none() {
            student.initial_posts += 1;
        } else {
            student.replies += 1;
        }
    }

    let mut roster: Vec<RosterStudent> =
        order.into_iter().filter_map(|user_id| by_user.remove(&user_id)).collect();
    roster.sort_by(|a, b| {
        last_name_key(&a.name)
            .cmp(&last_name_key(&b.name))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    roster
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterPartition {
    pub(crate) graded: Vec<RosterStudent>,
    pub(crate) ungraded: Vec<RosterStudent>,
    pub(crate) graded_count: usize,
    pub(crate) ungraded_count: usize,
}

pub(crate) fn partition_by_grade(
    roster: Vec<RosterStudent>,
    grades: &[DiscussionGrade],
) -> RosterPartition {
    let graded_ids: HashSet<&str> = grades
        .iter()
        .filter(|grade| grade.is_graded())
        .map(|grade| grade.user_id.as_str())
        .collect();

    let (graded, ungraded): (Vec<RosterStudent>, Vec<RosterStudent>) = roster
        .into_iter()
        .partition(|student| graded_ids.contains(student.user_id.as_str()));

    let graded_count = graded.len();
    let ungraded_count = ungraded.len();
    RosterPartition { graded, ungraded, graded_count, ungraded_count }
}

/// Last whitespace-delimited segment of the display name; single-token
/// names use the whole token.
fn last_name_key(name: &str) -> String {
    name.split_whitespace().next_back().unwrap_or(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    use crate::schemas::canvas::EntryAuthor;

    fn entry(id: &str, user_id: &str, name: &str, parent: Option<&str>, ts: i64) -> DiscussionEntry {
        DiscussionEntry {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user: Some(EntryAuthor {
                id: user_id.to_string(),
                name: name.to_string(),
                avatar_url: None,
            }),
            parent_id: parent.map(|value| value.to_string()),
            message: format!("message {id}"),
            created_at: OffsetDateTime::from_unix_timestamp(ts).unwrap(),
        }
    }

    #[test]
    fn summarizes_initial_posts_replies_and_parents_chronologically() {
        // A posts at T1, B replies to A at T2, A replies back to B at T3.
        let entries = vec![
            entry("e1", "a", "Alice", None, 100),
            entry("e2", "b", "Bob", Some("e1"), 200),
            entry("e3", "a", "Alice", Some("e2"), 300),
        ];

        let summary = group_and_summarize(&entries, "a");

        assert_eq!(summary.initial_posts.len(), 1);
        assert_eq!(summary.initial_posts[0].id, "e1");
        assert_eq!(summary.replies.len(), 1);
        assert_eq!(summary.replies[0].id, "e3");
        assert_eq!(summary.replied_to_posts.len(), 1);
        assert_eq!(summary.replied_to_posts[0].id, "e2");
        let order: Vec<&str> =
            summary.all_relevant_entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["e1", "e2", "e3"]);
        assert_eq!(summary.total_participation, 2);
    }

    #[test]
    fn total_participation_is_initials_plus_replies() {
        let entries = vec![
            entry("e1", "a", "Alice", None, 10),
            entry("e2", "a", "Alice", None, 20),
            entry("e3", "a", "Alice", Some("e1"), 30),
            entry("e4", "b", "Bob", None, 40),
        ];

        let summary = group_and_summarize(&entries, "a");
        assert_eq!(
            summary.total_participation,
            summary.initial_posts.len() + summary.replies.len()
        );
        assert_eq!(summary.total_participation, 3);
    }

    #[test]
    fn no_entries_yields_empty_summary_not_error() {
        let entries = vec![entry("e1", "b", "Bob", None, 10)];
        let summary = group_and_summarize(&entries, "a");
        assert_eq!(summary.total_participation, 0);
        assert!(summary.student_entries.is_empty());
        assert!(summary.all_relevant_entries.is_empty());
    }

    #[test]
    fn unresolved_parents_are_dropped_silently() {
        let entries = vec![entry("e1", "a", "Alice", Some("gone"), 10)];
        let summary = group_and_summarize(&entries, "a");
        assert_eq!(summary.replies.len(), 1);
        assert!(summary.replied_to_posts.is_empty());
        assert_eq!(summary.all_relevant_entries.len(), 1);
    }

    #[test]
    fn chronological_merge_is_stable_on_ties() {
        let entries = vec![
            entry("e1", "a", "Alice", None, 50),
            entry("e2", "a", "Alice", None, 50),
            entry("e3", "a", "Alice", None, 50),
        ];
        let summary = group_and_summarize(&entries, "a");
        let order: Vec<&str> =
            summary.all_relevant_entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn roster_sorts_by_last_name_token_case_insensitively() {
        let entries = vec![
            entry("e1", "u1", "alice Zephyr", None, 10),
            entry("e2", "u2", "Bob Apple", None, 20),
            entry("e3", "u3", "cher", Some("e1"), 30),
        ];

        let roster = build_roster(&entries);
        let names: Vec<&str> = roster.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bob Apple", "cher", "alice Zephyr"]);
    }

    #[test]
    fn roster_counts_initials_and_replies_per_student() {
        let entries = vec![
            entry("e1", "u1", "Ann Lee", None, 10),
            entry("e2", "u1", "Ann Lee", Some("e3"), 20),
            entry("e3", "u2", "Ben Ray", None, 5),
        ];

        let roster = build_roster(&entries);
        let ann = roster.iter().find(|s| s.user_id == "u1").unwrap();
        assert_eq!(ann.entry_count, 2);
        assert_eq!(ann.initial_posts, 1);
        assert_eq!(ann.replies, 1);
    }

    #[test]
    fn partition_splits_roster_by_existing_grades() {
        let entries = vec![
            entry("e1", "u1", "Ann Lee", None, 10),
            entry("e2", "u2", "Ben Ray", None, 20),
        ];
        let grades = vec![DiscussionGrade {
            user_id: "u1".to_string(),
            grade: Some("8".to_string()),
            score: Some(8.0),
            feedback: None,
        }];

        let partition = partition_by_grade(build_roster(&entries), &grades);
        assert_eq!(partition.graded_count, 1);
        assert_eq!(partition.graded[0].user_id, "u1");
        assert_eq!(partition.ungraded_count, 1);
        assert_eq!(partition.ungraded[0].user_id, "u2");
    }
}
