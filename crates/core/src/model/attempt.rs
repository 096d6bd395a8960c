use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, QuizId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt is already completed")]
    AlreadyCompleted,

    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("score {0} exceeds 100 percent")]
    ScoreOutOfRange(u8),

    #[error("completed attempt is missing score or submission timestamp")]
    IncompleteCompletion,

    #[error("in-progress attempt must not carry score or submission timestamp")]
    PrematureCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

impl AttemptStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
        }
    }
}

/// One student's timed pass at one quiz.
///
/// Lifecycle: created in progress, completed exactly once with a score and
/// submission timestamp, never reopened. The store enforces that at most one
/// in-progress attempt exists per (student, quiz) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    id: AttemptId,
    student_id: UserId,
    quiz_id: QuizId,
    status: AttemptStatus,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    score_percent: Option<u8>,
}

impl Attempt {
    /// Create a fresh in-progress attempt.
    #[must_use]
    pub fn begin(
        id: AttemptId,
        student_id: UserId,
        quiz_id: QuizId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            quiz_id,
            status: AttemptStatus::InProgress,
            started_at,
            submitted_at: None,
            score_percent: None,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` when the persisted fields are inconsistent with
    /// the status (missing or premature score/submission data, a submission
    /// before the start, or a score above 100).
    pub fn from_persisted(
        id: AttemptId,
        student_id: UserId,
        quiz_id: QuizId,
        status: AttemptStatus,
        started_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
        score_percent: Option<u8>,
    ) -> Result<Self, AttemptError> {
        match status {
            AttemptStatus::Completed => {
                let submitted = submitted_at.ok_or(AttemptError::IncompleteCompletion)?;
                let score = score_percent.ok_or(AttemptError::IncompleteCompletion)?;
                if submitted < started_at {
                    return Err(AttemptError::InvalidTimeRange);
                }
                if score > 100 {
                    return Err(AttemptError::ScoreOutOfRange(score));
                }
            }
            AttemptStatus::InProgress => {
                if submitted_at.is_some() || score_percent.is_some() {
                    return Err(AttemptError::PrematureCompletion);
                }
            }
        }

        Ok(Self {
            id,
            student_id,
            quiz_id,
            status,
            started_at,
            submitted_at,
            score_percent,
        })
    }

    /// Mark the attempt completed with its final score.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyCompleted` on a second completion,
    /// `AttemptError::InvalidTimeRange` if `submitted_at` precedes the start,
    /// or `AttemptError::ScoreOutOfRange` for scores above 100.
    pub fn complete(
        &mut self,
        score_percent: u8,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        if self.status == AttemptStatus::Completed {
            return Err(AttemptError::AlreadyCompleted);
        }
        if submitted_at < self.started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if score_percent > 100 {
            return Err(AttemptError::ScoreOutOfRange(score_percent));
        }

        self.status = AttemptStatus::Completed;
        self.submitted_at = Some(submitted_at);
        self.score_percent = Some(score_percent);
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> UserId {
        self.student_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn score_percent(&self) -> Option<u8> {
        self.score_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn begin_attempt() -> Attempt {
        Attempt::begin(
            AttemptId::new(1),
            UserId::new(7),
            QuizId::new(3),
            fixed_now(),
        )
    }

    #[test]
    fn completion_sets_fields_once() {
        let mut attempt = begin_attempt();
        let at = fixed_now() + Duration::minutes(5);
        attempt.complete(60, at).unwrap();

        assert_eq!(attempt.status(), AttemptStatus::Completed);
        assert_eq!(attempt.score_percent(), Some(60));
        assert_eq!(attempt.submitted_at(), Some(at));

        let err = attempt.complete(90, at).unwrap_err();
        assert_eq!(err, AttemptError::AlreadyCompleted);
        assert_eq!(attempt.score_percent(), Some(60));
    }

    #[test]
    fn completion_rejects_time_travel() {
        let mut attempt = begin_attempt();
        let err = attempt
            .complete(50, fixed_now() - Duration::seconds(1))
            .unwrap_err();
        assert_eq!(err, AttemptError::InvalidTimeRange);
    }

    #[test]
    fn persisted_completed_attempt_needs_score_and_timestamp() {
        let err = Attempt::from_persisted(
            AttemptId::new(1),
            UserId::new(7),
            QuizId::new(3),
            AttemptStatus::Completed,
            fixed_now(),
            None,
            Some(80),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::IncompleteCompletion);
    }

    #[test]
    fn persisted_in_progress_attempt_rejects_score() {
        let err = Attempt::from_persisted(
            AttemptId::new(1),
            UserId::new(7),
            QuizId::new(3),
            AttemptStatus::InProgress,
            fixed_now(),
            None,
            Some(10),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::PrematureCompletion);
    }
}
