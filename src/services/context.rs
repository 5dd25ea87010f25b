use std::collections::HashMap;
use std::fmt::Write;

use crate::core::time::format_offset;
use crate::schemas::canvas::{
    CanvasAssignment, CanvasSubmission, DiscussionEntry, DiscussionTopic, QuizQuestion,
    SubmissionAnswer,
};
use crate::services::participation::StudentParticipation;

const EXCERPT_MAX_CHARS: usize = 200;

/// Char-based truncation with a trailing ellipsis past the cap. Canvas
/// messages are HTML fragments; they go into the prompt as-is.
fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_MAX_CHARS).collect();
    format!("{cut}...")
}

/// Assembles the prompt context for an assignment submission. The rubric is
/// included only when the teacher asked for rubric-based grading and the
/// assignment actually carries one; otherwise the description stands in.
pub(crate) fn build_assignment_context(
    assignment: &CanvasAssignment,
    submission: &CanvasSubmission,
    use_rubric: bool,
) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "Assignment: {}", assignment.name);
    if let Some(points) = assignment.points_possible {
        let _ = writeln!(doc, "Points possible: {points}");
    }

    match (use_rubric, assignment.rubric.as_ref()) {
        (true, Some(rubric)) => {
            let rendered = serde_json::to_string_pretty(rubric)
                .unwrap_or_else(|_| rubric.to_string());
            let _ = writeln!(doc, "\nGrading rubric:\n{rendered}");
        }
        _ => {
            let description = assignment.description.as_deref().unwrap_or("").trim();
            if !description.is_empty() {
                let _ = writeln!(doc, "\nAssignment description:\n{description}");
            }
        }
    }

    let _ = writeln!(doc, "\nStudent submission:");
    match submission.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => {
            let _ = writeln!(doc, "{body}");
        }
        _ => {
            let _ = writeln!(doc, "[no text submission]");
        }
    }

    if !submission.attachments.is_empty() {
        let names: Vec<&str> = submission
            .attachments
            .iter()
            .map(|attachment| attachment.display_name.as_deref().unwrap_or("unnamed file"))
            .collect();
        let _ = writeln!(doc, "\nAttached files: {}", names.join(", "));
    }

    doc
}

/// Assembles the prompt context for one student's discussion participation.
/// `entries` is the full flat entry list, used to resolve what each reply
/// was responding to.
pub(crate) fn build_discussion_context(
    topic: &DiscussionTopic,
    participation: &StudentParticipation,
    entries: &[DiscussionEntry],
    student_name: &str,
) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "Discussion topic: {}", topic.title);
    if let Some(prompt) = topic.message.as_deref().map(str::trim) {
        if !prompt.is_empty() {
            let _ = writeln!(doc, "Topic prompt:\n{prompt}");
        }
    }

    let _ = writeln!(
        doc,
        "\nStudent: {student_name}\nParticipation: {} total ({} initial posts, {} replies)",
        participation.total_participation,
        participation.initial_posts.len(),
        participation.replies.len(),
    );

    if participation.total_participation == 0 {
        let _ = writeln!(
            doc,
            "\nNO PARTICIPATION: this student has not posted in this discussion. \
             Grade accordingly."
        );
        return doc;
    }

    if !participation.initial_posts.is_empty() {
        let _ = writeln!(doc, "\nInitial posts:");
        for (index, post) in participation.initial_posts.iter().enumerate() {
            let _ = writeln!(
                doc,
                "{}. [{}] {}",
                index + 1,
                format_offset(post.created_at),
                post.message.trim(),
            );
        }
    }

    if !participation.replies.is_empty() {
        let by_id: HashMap<&str, &DiscussionEntry> =
            entries.iter().map(|entry| (entry.id.as_str(), entry)).collect();

        let _ = writeln!(doc, "\nReplies:");
        for (index, reply) in participation.replies.iter().enumerate() {
            let parent = reply
                .parent_id
                .as_deref()
                .and_then(|parent_id| by_id.get(parent_id).copied());
            match parent {
                Some(parent) => {
                    let _ = writeln!(
                        doc,
                        "{}. [{}] (replying to {}: \"{}\") {}",
                        index + 1,
                        format_offset(reply.created_at),
                        parent.author_name(),
                        excerpt(&parent.message),
                        reply.message.trim(),
                    );
                }
                None => {
                    let _ = writeln!(
                        doc,
                        "{}. [{}] {}",
                        index + 1,
                        format_offset(reply.created_at),
                        reply.message.trim(),
                    );
                }
            }
        }
    }

    doc
}

/// Assembles the prompt context for one quiz question. A missing answer is
/// stated explicitly and grading proceeds on what is known.
pub(crate) fn build_question_context(
    question: &QuizQuestion,
    answer: Option<&SubmissionAnswer>,
) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "Question type: {}", question.question_type);
    if let Some(points) = question.points_possible {
        let _ = writeln!(doc, "Points possible: {points}");
    }
    let _ = writeln!(doc, "Question:\n{}", question.question_text.trim());

    let _ = writeln!(doc, "\nStudent answer:");
    match answer.and_then(|answer| answer.answer.as_ref()) {
        Some(value) => {
            let _ = writeln!(doc, "{}", value.as_display());
        }
        None => {
            let _ = writeln!(doc, "[answer unavailable]");
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    use crate::schemas::canvas::{AnswerValue, EntryAuthor, WorkflowState};
    use crate::services::participation::group_and_summarize;

    fn assignment(rubric: Option<serde_json::Value>) -> CanvasAssignment {
        CanvasAssignment {
            id: "a1".into(),
            name: "Essay 2".into(),
            description: Some("Write about a turning point.".into()),
            points_possible: Some(10.0),
            due_at: None,
            needs_grading_count: None,
            rubric,
            use_rubric_for_grading: Some(true),
            html_url: None,
        }
    }

    fn submission(body: Option<&str>) -> CanvasSubmission {
        CanvasSubmission {
            id: Some("s1".into()),
            user_id: "u1".into(),
            body: body.map(String::from),
            grade: None,
            score: None,
            submitted_at: None,
            workflow_state: WorkflowState::Submitted,
            user: None,
            attachments: Vec::new(),
        }
    }

    fn entry(id: &str, user_id: &str, name: &str, parent: Option<&str>, message: &str) -> DiscussionEntry {
        DiscussionEntry {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user: Some(EntryAuthor {
                id: user_id.to_string(),
                name: name.to_string(),
                avatar_url: None,
            }),
            parent_id: parent.map(String::from),
            message: message.to_string(),
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    fn topic() -> DiscussionTopic {
        DiscussionTopic {
            id: "t1".into(),
            title: "Week 3".into(),
            message: Some("Discuss the reading.".into()),
            posted_at: None,
            discussion_type: None,
        }
    }

    #[test]
    fn rubric_replaces_description_only_when_requested_and_present() {
        let with_rubric = assignment(Some(serde_json::json!([{"description": "Clarity"}])));
        let doc = build_assignment_context(&with_rubric, &submission(Some("my essay")), true);
        assert!(doc.contains("Grading rubric:"));
        assert!(!doc.contains("Assignment description:"));

        let doc = build_assignment_context(&with_rubric, &submission(Some("my essay")), false);
        assert!(!doc.contains("Grading rubric:"));
        assert!(doc.contains("Assignment description:"));

        let doc = build_assignment_context(&assignment(None), &submission(Some("my essay")), true);
        assert!(!doc.contains("Grading rubric:"));
        assert!(doc.contains("Assignment description:"));
    }

    #[test]
    fn missing_body_is_stated() {
        let doc = build_assignment_context(&assignment(None), &submission(None), false);
        assert!(doc.contains("[no text submission]"));
    }

    #[test]
    fn discussion_context_annotates_replies_with_parent_excerpt() {
        let long_parent = "x".repeat(250);
        let entries = vec![
            entry("e1", "b", "Bob Apple", None, &long_parent),
            entry("e2", "a", "Alice Zephyr", Some("e1"), "I agree with Bob."),
        ];
        let participation = group_and_summarize(&entries, "a");
        let doc = build_discussion_context(&topic(), &participation, &entries, "Alice Zephyr");

        assert!(doc.contains("Participation: 1 total (0 initial posts, 1 replies)"));
        assert!(doc.contains("replying to Bob Apple"));
        let expected_excerpt = format!("{}...", "x".repeat(200));
        assert!(doc.contains(&expected_excerpt));
        assert!(!doc.contains(&"x".repeat(201)));
    }

    #[test]
    fn zero_participation_yields_explicit_block() {
        let entries = vec![entry("e1", "b", "Bob Apple", None, "hello")];
        let participation = group_and_summarize(&entries, "a");
        let doc = build_discussion_context(&topic(), &participation, &entries, "Alice Zephyr");
        assert!(doc.contains("NO PARTICIPATION"));
        assert!(!doc.contains("Initial posts:"));
    }

    #[test]
    fn question_context_marks_missing_answers() {
        let question = QuizQuestion {
            id: "q1".into(),
            question_type: "essay_question".into(),
            question_name: None,
            question_text: "Explain photosynthesis.".into(),
            points_possible: Some(5.0),
        };
        let doc = build_question_context(&question, None);
        assert!(doc.contains("[answer unavailable]"));

        let answer = SubmissionAnswer {
            id: None,
            question_id: "q1".into(),
            answer: Some(AnswerValue::Many(vec!["light".into(), "water".into()])),
            correct: None,
            points: None,
        };
        let doc = build_question_context(&question, Some(&answer));
        assert!(doc.contains("light, water"));
    }
}
