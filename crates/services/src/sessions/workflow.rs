use std::sync::Arc;

use cognitia_core::model::{Answer, AttemptResult, QuestionId, QuizId, UserId};
use cognitia_core::{Clock, Tick};
use storage::repository::{
    AnswerRecord, AnswerRepository, AttemptRepository, NewAttemptRecord, QuizRepository,
    StorageError,
};

use super::session::QuizSession;
use crate::error::SessionError;

/// Outcome of recording a single answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub answered_count: usize,
    /// False when the write-behind to storage failed and only the local
    /// cache holds the answer.
    pub persisted: bool,
}

/// Orchestrates the attempt lifecycle: start or resume, answer, submit.
///
/// Holds no session state of its own; callers own the [`QuizSession`] and
/// pass it back in. Starting is idempotent per (student, quiz): a second
/// start while an attempt is open resumes that attempt instead of erroring.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            answers,
        }
    }

    /// Start an attempt for `(student_id, quiz_id)`, or resume the open one.
    ///
    /// When the store rejects the insert because an open attempt already
    /// exists (e.g. a concurrent start from another device won the race),
    /// the loser re-reads and resumes that attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for nil ids or an unknown quiz,
    /// `SessionError::Storage` for store failures.
    pub async fn start(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<QuizSession, SessionError> {
        if student_id.is_nil() {
            return Err(SessionError::Validation("student id is required".into()));
        }
        if quiz_id.is_nil() {
            return Err(SessionError::Validation("quiz id is required".into()));
        }

        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| SessionError::Validation(format!("quiz {quiz_id} does not exist")))?;
        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;

        if let Some(open) = self.attempts.find_in_progress(student_id, quiz_id).await? {
            return self
                .resume_session(open, questions, quiz.time_limit_minutes())
                .await;
        }

        let record = NewAttemptRecord {
            student_id,
            quiz_id,
            started_at: self.clock.now(),
        };
        match self.attempts.insert_attempt(record).await {
            Ok(attempt) => Ok(QuizSession::begin(
                attempt,
                questions,
                quiz.time_limit_minutes(),
            )),
            // lost the race to another start; pick up the winner's attempt
            Err(StorageError::Conflict) => {
                let open = self
                    .attempts
                    .find_in_progress(student_id, quiz_id)
                    .await?
                    .ok_or(StorageError::Conflict)
                    .map_err(SessionError::Storage)?;
                self.resume_session(open, questions, quiz.time_limit_minutes())
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resume the open attempt for `(student_id, quiz_id)` without opening a
    /// new one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` when no attempt is in progress.
    pub async fn resume(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<QuizSession, SessionError> {
        let open = self
            .attempts
            .find_in_progress(student_id, quiz_id)
            .await?
            .ok_or(SessionError::NotStarted)?;
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| SessionError::Validation(format!("quiz {quiz_id} does not exist")))?;
        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        self.resume_session(open, questions, quiz.time_limit_minutes())
            .await
    }

    async fn resume_session(
        &self,
        attempt: cognitia_core::model::Attempt,
        questions: Vec<cognitia_core::model::Question>,
        time_limit_minutes: u32,
    ) -> Result<QuizSession, SessionError> {
        let recorded: Vec<Answer> = self.answers.answers_for_attempt(attempt.id()).await?;
        Ok(QuizSession::resume(
            attempt,
            questions,
            time_limit_minutes,
            recorded,
        ))
    }

    /// Grade and record an answer, replacing any earlier answer for the same
    /// question.
    ///
    /// The cache write always happens first. The storage upsert is
    /// write-behind: a failure is logged and reported via
    /// [`AnswerOutcome::persisted`], but the answer stays recorded and a
    /// later submit still scores it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for a question outside the quiz
    /// and `SessionError::AlreadySubmitted` after submission.
    pub async fn record_answer(
        &self,
        session: &mut QuizSession,
        question_id: QuestionId,
        submitted_text: &str,
        elapsed_seconds: Option<u32>,
    ) -> Result<AnswerOutcome, SessionError> {
        let attempt_id = session.attempt_id();
        let answer = session
            .record_answer(question_id, submitted_text, elapsed_seconds)?
            .clone();

        let persisted = match self
            .answers
            .upsert_answer(AnswerRecord::from_answer(attempt_id, &answer))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    attempt_id = attempt_id.value(),
                    question_id = question_id.value(),
                    error = %e,
                    "answer upsert failed; keeping cached answer"
                );
                false
            }
        };

        Ok(AnswerOutcome {
            question_id,
            is_correct: answer.is_correct,
            answered_count: session.answered_count(),
            persisted,
        })
    }

    /// Submit the attempt: score the cached answers and close the attempt in
    /// the store. The session's timer stops, so a countdown still running
    /// cannot fire afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if this session (or another
    /// holder of the same attempt) already submitted, and
    /// `SessionError::NotStarted` if the attempt vanished from the store.
    pub async fn submit(
        &self,
        session: &mut QuizSession,
    ) -> Result<AttemptResult, SessionError> {
        if session.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }

        let result = session.build_result();
        let submitted_at = self.clock.now();
        match self
            .attempts
            .complete_attempt(session.attempt_id(), result.score_percent, submitted_at)
            .await
        {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(SessionError::NotStarted),
            Err(StorageError::Conflict) => return Err(SessionError::AlreadySubmitted),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            attempt_id = session.attempt_id().value(),
            score = result.score_percent,
            answered = result.total_questions,
            "attempt submitted"
        );
        session.mark_submitted(result.clone());
        Ok(result)
    }

    /// Advance the session's countdown. The first tick that crosses the
    /// limit auto-submits; every tick after that reports `Tick::Stopped`.
    ///
    /// # Errors
    ///
    /// Propagates submission errors when the expiry tick triggers
    /// auto-submit.
    pub async fn tick(&self, session: &mut QuizSession) -> Result<Tick, SessionError> {
        let now = self.clock.now();
        let tick = session.timer_mut().tick(now);
        if tick == Tick::Expired {
            tracing::info!(
                attempt_id = session.attempt_id().value(),
                "time limit reached; auto-submitting"
            );
            // the latch is already set, so a submit failure here cannot
            // cause a second expiry
            match self.submit(session).await {
                Ok(_) | Err(SessionError::AlreadySubmitted) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(tick)
    }
}
