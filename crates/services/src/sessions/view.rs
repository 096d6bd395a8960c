use std::sync::Arc;

use chrono::{DateTime, Utc};

use cognitia_core::model::{AttemptId, AttemptStatus, QuizId, UserId};
use storage::repository::{AttemptRepository, QuizRepository};

use crate::error::SessionError;

/// One row in a student's attempt history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score_percent: Option<u8>,
}

/// A student's attempts split by lifecycle state, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptHistory {
    pub in_progress: Vec<AttemptListItem>,
    pub completed: Vec<AttemptListItem>,
}

/// Read-side listing of a student's attempts.
///
/// Pull-based: every call re-reads the store, so a submission from another
/// device shows up on the next refresh without any cache invalidation.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { attempts, quizzes }
    }

    /// List a student's attempts with quiz titles resolved.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on store failures.
    pub async fn history(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<AttemptHistory, SessionError> {
        let attempts = self.attempts.list_for_student(student_id, limit).await?;

        let mut history = AttemptHistory::default();
        for attempt in attempts {
            let quiz_title = match self.quizzes.get_quiz(attempt.quiz_id()).await? {
                Some(quiz) => quiz.title().to_owned(),
                // quiz deleted after the attempt; keep the row readable
                None => format!("(quiz {})", attempt.quiz_id()),
            };
            let item = AttemptListItem {
                attempt_id: attempt.id(),
                quiz_id: attempt.quiz_id(),
                quiz_title,
                status: attempt.status(),
                started_at: attempt.started_at(),
                submitted_at: attempt.submitted_at(),
                score_percent: attempt.score_percent(),
            };
            match attempt.status() {
                AttemptStatus::InProgress => history.in_progress.push(item),
                AttemptStatus::Completed => history.completed.push(item),
            }
        }
        Ok(history)
    }
}
