use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::core::config::Settings;
use crate::schemas::canvas::{
    CanvasAssignment, CanvasCourse, CanvasSubmission, CanvasUser, DiscussionEntry,
    DiscussionTopic, EntryAuthor, Quiz, QuizQuestion, QuizSubmission, SubmissionAnswer,
};
use crate::services::grading::placeholder_id;

/// One teacher's Canvas credentials, loaded from their profile per request.
#[derive(Debug, Clone)]
pub(crate) struct CanvasConnection {
    pub(crate) base_url: String,
    pub(crate) access_token: String,
}

impl CanvasConnection {
    pub(crate) fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CanvasClient {
    client: Client,
    per_page: u32,
    max_pages: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseNeedsGrading {
    pub(crate) course: CanvasCourse,
    pub(crate) assignments: Vec<CanvasAssignment>,
}

impl CanvasClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.canvas().request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            per_page: settings.canvas().per_page,
            max_pages: settings.canvas().max_pages,
        })
    }

    /// `GET /users/self`; a 2xx proves the token works for this instance.
    pub(crate) async fn test_connection(&self, conn: &CanvasConnection) -> Result<CanvasUser> {
        self.get_one(conn, "users/self", &[]).await
    }

    pub(crate) async fn list_courses(&self, conn: &CanvasConnection) -> Result<Vec<CanvasCourse>> {
        self.get_paginated(
            conn,
            "courses",
            &[
                ("enrollment_type", "teacher".to_string()),
                ("include[]", "total_students".to_string()),
            ],
        )
        .await
    }

    pub(crate) async fn list_assignments(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
    ) -> Result<Vec<CanvasAssignment>> {
        self.get_paginated(conn, &format!("courses/{course_id}/assignments"), &[]).await
    }

    pub(crate) async fn assignment_details(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<CanvasAssignment> {
        self.get_one(conn, &format!("courses/{course_id}/assignments/{assignment_id}"), &[]).await
    }

    /// Submissions with `include[]=user`. Rows Canvas returns without an id
    /// (students with nothing submitted) get a synthetic placeholder id so
    /// they still render in the roster.
    pub(crate) async fn list_submissions(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<Vec<CanvasSubmission>> {
        let mut submissions: Vec<CanvasSubmission> = self
            .get_paginated(
                conn,
                &format!("courses/{course_id}/assignments/{assignment_id}/submissions"),
                &[("include[]", "user".to_string())],
            )
            .await?;

        for submission in &mut submissions {
            if submission.id.is_none() {
                submission.id = Some(placeholder_id(&submission.user_id));
            }
        }
        Ok(submissions)
    }

    /// Walks all teacher courses and keeps only assignments Canvas reports
    /// as having ungraded submissions.
    pub(crate) async fn assignments_needing_grading(
        &self,
        conn: &CanvasConnection,
    ) -> Result<Vec<CourseNeedsGrading>> {
        let courses = self.list_courses(conn).await?;
        let mut result = Vec::new();

        for course in courses {
            let assignments: Vec<CanvasAssignment> = self
                .get_paginated(
                    conn,
                    &format!("courses/{}/assignments", course.id),
                    &[("include[]", "needs_grading_count".to_string())],
                )
                .await?;
            let pending: Vec<CanvasAssignment> = assignments
                .into_iter()
                .filter(|assignment| assignment.needs_grading_count.unwrap_or(0) > 0)
                .collect();
            if !pending.is_empty() {
                result.push(CourseNeedsGrading { course, assignments: pending });
            }
        }
        Ok(result)
    }

    pub(crate) async fn list_discussions(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
    ) -> Result<Vec<DiscussionTopic>> {
        self.get_paginated(conn, &format!("courses/{course_id}/discussion_topics"), &[]).await
    }

    pub(crate) async fn discussion_topic(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        topic_id: &str,
    ) -> Result<DiscussionTopic> {
        self.get_one(conn, &format!("courses/{course_id}/discussion_topics/{topic_id}"), &[]).await
    }

    /// Fetches the full-topic `view` document and flattens the nested reply
    /// tree into a flat entry list.
    pub(crate) async fn discussion_entries(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        topic_id: &str,
    ) -> Result<Vec<DiscussionEntry>> {
        let view: Value = self
            .get_one(conn, &format!("courses/{course_id}/discussion_topics/{topic_id}/view"), &[])
            .await?;
        Ok(flatten_discussion_view(&view))
    }

    pub(crate) async fn list_quizzes(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
    ) -> Result<Vec<Quiz>> {
        self.get_paginated(conn, &format!("courses/{course_id}/quizzes"), &[]).await
    }

    pub(crate) async fn quiz_submissions(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<QuizSubmission>> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            quiz_submissions: Vec<QuizSubmission>,
            #[serde(default)]
            users: Vec<CanvasUser>,
        }

        let envelope: Envelope = self
            .get_one(
                conn,
                &format!("courses/{course_id}/quizzes/{quiz_id}/submissions"),
                &[("include[]", "user".to_string())],
            )
            .await?;

        let mut submissions = envelope.quiz_submissions;
        for submission in &mut submissions {
            if submission.user.is_none() {
                submission.user =
                    envelope.users.iter().find(|user| user.id == submission.user_id).cloned();
            }
        }
        Ok(submissions)
    }

    pub(crate) async fn quiz_questions(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<QuizQuestion>> {
        self.get_paginated(conn, &format!("courses/{course_id}/quizzes/{quiz_id}/questions"), &[])
            .await
    }

    /// The student's per-question answers, taken from the submission's
    /// latest attempt history.
    pub(crate) async fn submission_answers(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        quiz_id: &str,
        submission_id: &str,
    ) -> Result<Vec<SubmissionAnswer>> {
        let envelope: Value = self
            .get_one(
                conn,
                &format!("courses/{course_id}/quizzes/{quiz_id}/submissions/{submission_id}"),
                &[("include[]", "submission_history".to_string())],
            )
            .await?;

        let history = envelope
            .get("quiz_submissions")
            .and_then(|subs| subs.get(0))
            .and_then(|sub| sub.get("submission_history"))
            .or_else(|| envelope.get("submission_history"));

        let Some(history) = history else {
            return Ok(Vec::new());
        };
        let latest = history.as_array().and_then(|attempts| attempts.last());
        let Some(data) = latest.and_then(|attempt| attempt.get("submission_data")) else {
            return Ok(Vec::new());
        };

        let answers: Vec<SubmissionAnswer> = serde_json::from_value(data.clone())
            .context("Unexpected submission_data shape from Canvas")?;
        Ok(answers)
    }

    /// `PUT .../submissions/:user_id` posting the grade and an optional
    /// feedback comment. Returns the updated submission as Canvas sees it.
    pub(crate) async fn grade_submission(
        &self,
        conn: &CanvasConnection,
        course_id: &str,
        assignment_id: &str,
        user_id: &str,
        grade: &str,
        comment: Option<&str>,
    ) -> Result<CanvasSubmission> {
        let url = format!(
            "{}/api/v1/courses/{course_id}/assignments/{assignment_id}/submissions/{user_id}",
            conn.base_url
        );

        let mut payload = serde_json::json!({
            "submission": {"posted_grade": grade}
        });
        if let Some(comment) = comment.map(str::trim).filter(|text| !text.is_empty()) {
            payload["comment"] = serde_json::json!({"text_comment": comment});
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(&conn.access_token)
            .json(&payload)
            .send()
            .await
            .context("Canvas request failed")?;
        let response = check_status(response).await?;
        metrics::counter!("canvas_requests_total", "outcome" => "success").increment(1);
        response.json().await.context("Failed to decode Canvas submission")
    }

    async fn get_one<T: DeserializeOwned>(
        &self,
        conn: &CanvasConnection,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/api/v1/{path}", conn.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&conn.access_token)
            .query(query)
            .send()
            .await
            .context("Canvas request failed")?;
        let response = check_status(response).await?;
        metrics::counter!("canvas_requests_total", "outcome" => "success").increment(1);
        response.json().await.with_context(|| format!("Failed to decode Canvas response for {path}"))
    }

    /// Follows `Link: rel="next"` headers up to the configured page cap.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        conn: &CanvasConnection,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut next_url: Option<String> = None;

        for page in 0..self.max_pages {
            let request = match next_url.take() {
                // Canvas bakes the original query into the next link.
                Some(url) => self.client.get(url),
                None if page == 0 => {
                    let url = format!("{}/api/v1/{path}", conn.base_url);
                    self.client
                        .get(url)
                        .query(query)
                        .query(&[("per_page", self.per_page.to_string())])
                }
                None => break,
            };

            let response = request
                .bearer_auth(&conn.access_token)
                .send()
                .await
                .context("Canvas request failed")?;
            let response = check_status(response).await?;

            next_url = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_next_link);

            let page_items: Vec<T> = response
                .json()
                .await
                .with_context(|| format!("Failed to decode Canvas response for {path}"))?;
            items.extend(page_items);

            if next_url.is_none() {
                break;
            }
        }

        metrics::counter!("canvas_requests_total", "outcome" => "success").increment(1);
        Ok(items)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    metrics::counter!("canvas_requests_total", "outcome" => "error").increment(1);
    let body = response.text().await.unwrap_or_default();
    bail!("Canvas API error ({}): {}", status.as_u16(), canvas_error_detail(&body));
}

/// Pulls a readable message out of Canvas's `{errors: [...]}` or
/// `{message: ...}` error bodies, falling back to the raw text.
fn canvas_error_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(value) = parsed {
        if let Some(errors) = value.get("errors").and_then(Value::as_array) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    body.trim().chars().take(300).collect()
}

/// Extracts the `rel="next"` URL from a Canvas `Link` header.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (url, params) = part.trim().split_once(';')?;
        if params.contains("rel=\"next\"") {
            Some(url.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        } else {
            None
        }
    })
}

/// Flattens the nested `view` document into a flat entry list: parent ids
/// come from nesting, deleted entries are dropped (their replies keep the
/// deleted parent's id), and authors are resolved from `participants`.
pub(crate) fn flatten_discussion_view(view: &Value) -> Vec<DiscussionEntry> {
    let participants: Vec<EntryAuthor> = view
        .get("participants")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let mut entries = Vec::new();
    if let Some(roots) = view.get("view").and_then(Value::as_array) {
        for node in roots {
            collect_entries(node, None, &participants, &mut entries);
        }
    }
    entries
}

fn collect_entries(
    node: &Value,
    parent_id: Option<&str>,
    participants: &[EntryAuthor],
    out: &mut Vec<DiscussionEntry>,
) {
    let id = stringly(node.get("id"));

    let deleted = node.get("deleted").and_then(Value::as_bool).unwrap_or(false);
    if !deleted {
        if let (Some(id), Some(user_id)) = (id.clone(), stringly(node.get("user_id"))) {
            let message = node.get("message").and_then(Value::as_str).unwrap_or("").to_string();
            let created_at = node
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);
            let user = participants.iter().find(|author| author.id == user_id).cloned();

            out.push(DiscussionEntry {
                id,
                user_id,
                user,
                parent_id: parent_id.map(String::from),
                message,
                created_at,
            });
        }
    }

    if let Some(replies) = node.get("replies").and_then(Value::as_array) {
        for reply in replies {
            collect_entries(reply, id.as_deref(), participants, out);
        }
    }
}

fn stringly(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_link_is_extracted_from_header() {
        let header = "<https://canvas.test/api/v1/courses?page=2&per_page=100>; rel=\"next\", \
                      <https://canvas.test/api/v1/courses?page=1&per_page=100>; rel=\"first\"";
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://canvas.test/api/v1/courses?page=2&per_page=100")
        );
    }

    #[test]
    fn missing_next_rel_yields_none() {
        let header = "<https://canvas.test/api/v1/courses?page=1>; rel=\"current\", \
                      <https://canvas.test/api/v1/courses?page=1>; rel=\"last\"";
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn view_flattening_assigns_parents_and_drops_deleted() {
        let view = serde_json::json!({
            "participants": [
                {"id": 1, "display_name": "Alice Zephyr"},
                {"id": 2, "display_name": "Bob Apple"}
            ],
            "view": [
                {
                    "id": 10,
                    "user_id": 1,
                    "message": "<p>initial</p>",
                    "created_at": "2025-03-01T10:00:00Z",
                    "replies": [
                        {
                            "id": 11,
                            "user_id": 2,
                            "message": "<p>reply</p>",
                            "created_at": "2025-03-01T11:00:00Z"
                        },
                        {"id": 12, "user_id": 1, "deleted": true, "replies": [
                            {
                                "id": 13,
                                "user_id": 2,
                                "message": "<p>reply to deleted</p>",
                                "created_at": "2025-03-01T12:00:00Z"
                            }
                        ]}
                    ]
                }
            ]
        });

        let entries = flatten_discussion_view(&view);
        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11", "13"]);

        assert_eq!(entries[0].parent_id, None);
        assert_eq!(entries[0].author_name(), "Alice Zephyr");
        assert_eq!(entries[1].parent_id.as_deref(), Some("10"));
        // The reply under the deleted entry keeps that entry as its parent.
        assert_eq!(entries[2].parent_id.as_deref(), Some("12"));
    }

    #[test]
    fn canvas_error_bodies_are_summarized() {
        assert_eq!(
            canvas_error_detail(r#"{"errors": [{"message": "Invalid access token."}]}"#),
            "Invalid access token."
        );
        assert_eq!(
            canvas_error_detail(r#"{"message": "Not found"}"#),
            "Not found"
        );
        assert_eq!(canvas_error_detail("plain text"), "plain text");
    }

    #[test]
    fn long_error_bodies_are_clipped_on_char_boundaries() {
        let body = format!("{}ошибка сервера", "x".repeat(299));
        let detail = canvas_error_detail(&body);
        assert_eq!(detail.chars().count(), 300);
        assert!(detail.ends_with('о'));
    }
}
