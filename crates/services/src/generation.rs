use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use cognitia_core::model::Plan;

use crate::error::GenerationError;
use crate::quiz_service::{QuestionDraft, QuizDraft};

/// Connection settings for the completion endpoint, read from
/// `COGNITIA_AI_API_KEY`, `COGNITIA_AI_BASE_URL`, and `COGNITIA_AI_MODEL`.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenerationConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("COGNITIA_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("COGNITIA_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("COGNITIA_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Chat-completion client used for lesson guides and question drafting.
///
/// Built without config the service is disabled rather than broken: callers
/// can check [`enabled`](Self::enabled) and hide generation features.
#[derive(Clone)]
pub struct GenerationService {
    client: Client,
    config: Option<GenerationConfig>,
}

impl GenerationService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GenerationConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled, the request
    /// fails, or the response is empty.
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }

    /// Draft a markdown lesson guide for a plan.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled or the request
    /// fails.
    pub async fn draft_lesson_guide(&self, plan: &Plan) -> Result<String, GenerationError> {
        let objectives = plan.objectives().join("\n- ");
        let prompt = format!(
            "Write a lesson guide in markdown for a grade {} {} lesson titled \
             \"{}\". Cover these objectives:\n- {}\n\
             Structure it as warm-up, instruction, practice, and wrap-up.",
            plan.grade_level(),
            plan.subject(),
            plan.title(),
            objectives,
        );
        self.complete(&prompt).await
    }

    /// Draft quiz questions for a subject and grade level.
    ///
    /// The model is asked for a JSON array; the reply is run through
    /// [`extract_json`] before parsing because models routinely wrap JSON in
    /// code fences or prose.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::MalformedPayload` when no parseable JSON
    /// array can be recovered from the reply.
    pub async fn draft_questions(
        &self,
        subject: &str,
        grade_level: u8,
        count: usize,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let prompt = format!(
            "Write {count} quiz questions for grade {grade_level} {subject}. \
             Reply with only a JSON array of objects with fields \"prompt\", \
             \"kind\" (one of \"multiple_choice\", \"true_false\", \
             \"short_answer\"), \"options\" (array of strings, empty for \
             short answers), and \"answer_key\"."
        );
        let raw = self.complete(&prompt).await?;
        let json = extract_json(&raw)
            .ok_or_else(|| GenerationError::MalformedPayload("no JSON found in reply".into()))?;
        serde_json::from_str(json).map_err(|e| GenerationError::MalformedPayload(e.to_string()))
    }

    /// Draft a whole quiz ready to persist through the quiz service.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`draft_questions`](Self::draft_questions).
    pub async fn draft_quiz(
        &self,
        subject: &str,
        grade_level: u8,
        count: usize,
        time_limit_minutes: u32,
    ) -> Result<QuizDraft, GenerationError> {
        let questions = self.draft_questions(subject, grade_level, count).await?;
        Ok(QuizDraft {
            title: format!("Generated {subject} quiz"),
            subject: subject.to_owned(),
            grade_level,
            time_limit_minutes,
            description: None,
            questions,
        })
    }
}

/// Recover the JSON value embedded in a model reply.
///
/// Strips markdown code fences, then trims to the outermost `{..}` or
/// `[..]` span. Returns `None` when neither delimiter pair is present.
#[must_use]
pub fn extract_json(raw: &str) -> Option<&str> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        // drop the fence line (which may carry a language tag) and the
        // closing fence
        let start = stripped.find('\n').map_or(0, |i| i + 1);
        let inner = &stripped[start..];
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    let object = span(text, '{', '}');
    let array = span(text, '[', ']');
    match (object, array) {
        (Some(o), Some(a)) => {
            if o.0 < a.0 {
                Some(&text[o.0..=o.1])
            } else {
                Some(&text[a.0..=a.1])
            }
        }
        (Some(o), None) => Some(&text[o.0..=o.1]),
        (None, Some(a)) => Some(&text[a.0..=a.1]),
        (None, None) => None,
    }
}

fn span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognitia_core::model::QuestionKind;

    #[test]
    fn disabled_without_config() {
        let service = GenerationService::new(None);
        assert!(!service.enabled());
    }

    #[test]
    fn extract_json_passes_bare_json_through() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
        assert_eq!(extract_json("[1, 2]"), Some("[1, 2]"));
    }

    #[test]
    fn extract_json_strips_code_fences() {
        let raw = "```json\n[{\"prompt\": \"Q\"}]\n```";
        assert_eq!(extract_json(raw), Some("[{\"prompt\": \"Q\"}]"));
    }

    #[test]
    fn extract_json_trims_surrounding_prose() {
        let raw = "Here are your questions:\n[{\"prompt\": \"Q\"}]\nEnjoy!";
        assert_eq!(extract_json(raw), Some("[{\"prompt\": \"Q\"}]"));
    }

    #[test]
    fn extract_json_rejects_text_without_json() {
        assert_eq!(extract_json("sorry, I cannot help with that"), None);
    }

    #[test]
    fn question_drafts_parse_from_repaired_reply() {
        let raw = "```json\n[{\"prompt\": \"2+2?\", \"kind\": \"short_answer\", \
                   \"answer_key\": \"4\"}]\n```";
        let drafts: Vec<QuestionDraft> =
            serde_json::from_str(extract_json(raw).unwrap()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, QuestionKind::ShortAnswer);
        assert!(drafts[0].options.is_empty());
    }
}
