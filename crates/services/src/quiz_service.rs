use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Deserialize;

use cognitia_core::Clock;
use cognitia_core::model::{Question, QuestionId, QuestionKind, Quiz, QuizId};
use storage::repository::{NewQuestionRecord, NewQuizRecord, QuizRepository};

use crate::error::QuizServiceError;

/// Author-supplied question content, before the store assigns ids.
///
/// Also the shape the generation service parses model output into.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer_key: String,
}

/// Author-supplied quiz content.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    pub title: String,
    pub subject: String,
    pub grade_level: u8,
    pub time_limit_minutes: u32,
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

/// Quiz authoring and lookup.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Validate and persist a quiz with its questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` for invalid content (empty title,
    /// zero time limit, malformed questions) and `Storage` for store
    /// failures.
    pub async fn create(&self, draft: QuizDraft) -> Result<QuizId, QuizServiceError> {
        let created_at = self.clock.now();
        // ids are assigned by the store; construction here runs the
        // domain validation on placeholders
        let quiz = Quiz::new(
            QuizId::new(1),
            draft.title,
            draft.subject,
            draft.grade_level,
            draft.time_limit_minutes,
            draft.description,
            created_at,
        )?;

        let mut questions = Vec::with_capacity(draft.questions.len());
        for (position, q) in draft.questions.into_iter().enumerate() {
            let question = Question::new(
                QuestionId::new(1),
                quiz.id(),
                q.prompt,
                q.kind,
                q.options,
                q.answer_key,
                u32::try_from(position).unwrap_or(u32::MAX),
            )?;
            questions.push(NewQuestionRecord::from_question(&question));
        }

        let record = NewQuizRecord {
            title: quiz.title().to_owned(),
            subject: quiz.subject().to_owned(),
            grade_level: quiz.grade_level(),
            time_limit_minutes: quiz.time_limit_minutes(),
            description: quiz.description().map(ToOwned::to_owned),
            created_at: quiz.created_at(),
            questions,
        };
        Ok(self.quizzes.insert_quiz(record).await?)
    }

    /// Fetch a quiz by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on store failures.
    pub async fn get(&self, id: QuizId) -> Result<Option<Quiz>, QuizServiceError> {
        Ok(self.quizzes.get_quiz(id).await?)
    }

    /// List quizzes, newest first, optionally filtered by subject.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on store failures.
    pub async fn list(
        &self,
        subject: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes(subject, limit).await?)
    }

    /// Fetch a quiz's questions in authored order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on store failures.
    pub async fn questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, QuizServiceError> {
        Ok(self.quizzes.questions_for_quiz(quiz_id).await?)
    }

    /// Fetch a quiz's questions in a random presentation order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on store failures.
    pub async fn shuffled_questions(
        &self,
        quiz_id: QuizId,
    ) -> Result<Vec<Question>, QuizServiceError> {
        let mut questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        questions.shuffle(&mut rand::rng());
        Ok(questions)
    }
}
