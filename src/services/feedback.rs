use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::schemas::feedback::{AssessmentKind, FeedbackOptions};

const FEEDBACK_SYSTEM_PROMPT: &str = r#"You are an experienced teacher writing grades and feedback for student work in a learning management system.

You will receive the graded material (assignment description or rubric, discussion prompt, or quiz question) together with the student's work. Evaluate the work on its merits. If participation or an answer is explicitly marked as missing, grade what is actually there.

Respond with strict JSON in exactly this shape:
{
  "grade": <number or null>,
  "feedback": "<feedback addressed to the student>",
  "gradeReview": "<a short note for the teacher explaining how the grade was reached; never shown to the student>"
}

Return null for "grade" when you cannot justify a numeric score. Never exceed the maximum points when one is given. "feedback" must be specific to the student's work, not generic praise."#;

/// The parsed model output. `grade` stays a string so it merges into the
/// form the same way a hand-typed grade does.
#[derive(Debug, Clone)]
pub(crate) struct FeedbackResult {
    pub(crate) grade: Option<String>,
    pub(crate) feedback: String,
    pub(crate) grade_review: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct FeedbackRequest {
    pub(crate) context: String,
    pub(crate) options: FeedbackOptions,
    /// The grade currently in the form, if any; the model treats it as a
    /// regrade anchor rather than starting from scratch.
    pub(crate) current_grade: Option<String>,
    pub(crate) max_points: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct FeedbackService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl FeedbackService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
        })
    }

    /// One-shot generation; a failed call surfaces to the caller and the
    /// teacher retries by hand.
    pub(crate) async fn generate(&self, request: FeedbackRequest) -> Result<FeedbackResult> {
        let timer = Instant::now();
        let user_prompt = build_user_prompt(&request);

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": FEEDBACK_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call feedback API")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            metrics::counter!("feedback_requests_total", "outcome" => "error").increment(1);
            bail!("Feedback API error ({}): {body}", status.as_u16());
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .context("Missing feedback response content")?;

        let result = parse_feedback_content(content)?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64);
        metrics::counter!("feedback_requests_total", "outcome" => "success").increment(1);
        tracing::info!(
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used,
            model = %self.model,
            "Feedback generation completed"
        );

        Ok(result)
    }
}

fn build_user_prompt(request: &FeedbackRequest) -> String {
    let mut prompt = String::new();

    let assessment = match request.options.assessment {
        AssessmentKind::Summative => {
            "Write summative feedback: judge the finished work against the requirements."
        }
        AssessmentKind::Formative => {
            "Write formative feedback: coach the student toward improving their next attempt."
        }
    };
    prompt.push_str(assessment);
    prompt.push('\n');

    if let Some(subject) = &request.options.subject {
        prompt.push_str(&format!("Subject area: {}\n", subject.as_str()));
    }
    if request.options.use_rubric {
        prompt.push_str("Grade against the rubric included in the material below.\n");
    }
    if let Some(max_points) = request.max_points {
        prompt.push_str(&format!("Maximum points: {max_points}\n"));
    }
    if let Some(current) = request.current_grade.as_deref().filter(|grade| !grade.is_empty()) {
        prompt.push_str(&format!(
            "The teacher has currently entered a grade of {current}; treat this as a regrade \
             and explain any difference.\n"
        ));
    }
    if let Some(custom) = request.options.custom_prompt.as_deref().map(str::trim) {
        if !custom.is_empty() {
            prompt.push_str(&format!("Additional instructions from the teacher: {custom}\n"));
        }
    }

    prompt.push_str("\n--- MATERIAL ---\n");
    prompt.push_str(&request.context);
    prompt
}

/// Parses the model's JSON reply; numeric and string grades are both
/// accepted, anything else means no grade.
fn parse_feedback_content(content: &str) -> Result<FeedbackResult> {
    let value: Value =
        serde_json::from_str(content).context("Failed to parse feedback JSON")?;

    let grade = match value.get("grade") {
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    };
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .context("Feedback response missing 'feedback'")?
        .to_string();
    let grade_review = value
        .get("gradeReview")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from);

    Ok(FeedbackResult { grade, feedback, grade_review })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::feedback::Subject;

    #[test]
    fn parses_numeric_string_and_null_grades() {
        let numeric = parse_feedback_content(
            r#"{"grade": 8.5, "feedback": "Good work.", "gradeReview": "Met most criteria."}"#,
        )
        .unwrap();
        assert_eq!(numeric.grade.as_deref(), Some("8.5"));
        assert_eq!(numeric.feedback, "Good work.");
        assert_eq!(numeric.grade_review.as_deref(), Some("Met most criteria."));

        let text = parse_feedback_content(r#"{"grade": "9", "feedback": "ok"}"#).unwrap();
        assert_eq!(text.grade.as_deref(), Some("9"));
        assert!(text.grade_review.is_none());

        let null = parse_feedback_content(r#"{"grade": null, "feedback": "ok"}"#).unwrap();
        assert!(null.grade.is_none());
    }

    #[test]
    fn missing_feedback_field_is_an_error() {
        assert!(parse_feedback_content(r#"{"grade": 5}"#).is_err());
        assert!(parse_feedback_content("not json").is_err());
    }

    #[test]
    fn prompt_carries_options_and_anchor() {
        let request = FeedbackRequest {
            context: "Question: why?".to_string(),
            options: FeedbackOptions {
                use_rubric: true,
                assessment: AssessmentKind::Formative,
                subject: Some(Subject::parse("Social Studies")),
                custom_prompt: Some("Be encouraging.".to_string()),
            },
            current_grade: Some("6".to_string()),
            max_points: Some(10.0),
        };
        let prompt = build_user_prompt(&request);
        assert!(prompt.contains("formative"));
        assert!(prompt.contains("social_studies"));
        assert!(prompt.contains("rubric"));
        assert!(prompt.contains("Maximum points: 10"));
        assert!(prompt.contains("grade of 6"));
        assert!(prompt.contains("Be encouraging."));
        assert!(prompt.contains("--- MATERIAL ---"));
    }
}
