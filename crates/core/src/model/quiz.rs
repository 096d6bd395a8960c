use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title must not be empty")]
    EmptyTitle,

    #[error("time limit must be at least one minute")]
    ZeroTimeLimit,

    #[error("question prompt must not be empty")]
    EmptyPrompt,

    #[error("question answer key must not be empty")]
    EmptyAnswerKey,

    #[error("{kind:?} question needs at least two options, got {got}")]
    TooFewOptions { kind: QuestionKind, got: usize },
}

/// A quiz as stored: metadata plus a time limit. Questions live in their own
/// rows and are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    subject: String,
    grade_level: u8,
    time_limit_minutes: u32,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Build a quiz, validating title and time limit.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` or `QuizError::ZeroTimeLimit`.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        subject: impl Into<String>,
        grade_level: u8,
        time_limit_minutes: u32,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if time_limit_minutes == 0 {
            return Err(QuizError::ZeroTimeLimit);
        }

        Ok(Self {
            id,
            title,
            subject: subject.into(),
            grade_level,
            time_limit_minutes,
            description,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn grade_level(&self) -> u8 {
        self.grade_level
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
        }
    }
}

/// One question belonging to a quiz, with its answer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    quiz_id: QuizId,
    prompt: String,
    kind: QuestionKind,
    options: Vec<String>,
    answer_key: String,
    position: u32,
}

impl Question {
    /// Build a question, validating prompt, key, and option count.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the prompt or answer key is empty, or a
    /// choice question carries fewer than two options.
    pub fn new(
        id: QuestionId,
        quiz_id: QuizId,
        prompt: impl Into<String>,
        kind: QuestionKind,
        options: Vec<String>,
        answer_key: impl Into<String>,
        position: u32,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        let answer_key = answer_key.into();
        if answer_key.trim().is_empty() {
            return Err(QuizError::EmptyAnswerKey);
        }
        if matches!(kind, QuestionKind::MultipleChoice | QuestionKind::TrueFalse)
            && options.len() < 2
        {
            return Err(QuizError::TooFewOptions {
                kind,
                got: options.len(),
            });
        }

        Ok(Self {
            id,
            quiz_id,
            prompt,
            kind,
            options,
            answer_key,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer_key(&self) -> &str {
        &self.answer_key
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Grade a submitted answer against the key.
    ///
    /// Choice questions compare exactly; short answers compare trimmed and
    /// case-insensitively so "Paris " still passes for "paris".
    #[must_use]
    pub fn grade(&self, submitted: &str) -> bool {
        match self.kind {
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse => {
                submitted == self.answer_key
            }
            QuestionKind::ShortAnswer => {
                submitted.trim().eq_ignore_ascii_case(self.answer_key.trim())
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_question(kind: QuestionKind, options: Vec<String>, key: &str) -> Question {
        Question::new(
            QuestionId::new(1),
            QuizId::new(1),
            "What is the capital of France?",
            kind,
            options,
            key,
            0,
        )
        .unwrap()
    }

    #[test]
    fn quiz_rejects_empty_title() {
        let err = Quiz::new(QuizId::new(1), "  ", "math", 5, 15, None, fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::EmptyTitle);
    }

    #[test]
    fn quiz_rejects_zero_time_limit() {
        let err =
            Quiz::new(QuizId::new(1), "Fractions", "math", 5, 0, None, fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::ZeroTimeLimit);
    }

    #[test]
    fn choice_question_requires_two_options() {
        let err = Question::new(
            QuestionId::new(1),
            QuizId::new(1),
            "Pick one",
            QuestionKind::MultipleChoice,
            vec!["only".into()],
            "only",
            0,
        )
        .unwrap_err();
        assert!(matches!(err, QuizError::TooFewOptions { got: 1, .. }));
    }

    #[test]
    fn short_answer_grading_is_lenient() {
        let q = build_question(QuestionKind::ShortAnswer, Vec::new(), "Paris");
        assert!(q.grade("  paris "));
        assert!(!q.grade("Lyon"));
    }

    #[test]
    fn choice_grading_is_exact() {
        let q = build_question(
            QuestionKind::MultipleChoice,
            vec!["Paris".into(), "Lyon".into()],
            "Paris",
        );
        assert!(q.grade("Paris"));
        assert!(!q.grade("paris"));
    }
}
