use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use cognitia_core::model::{Answer, Attempt, AttemptId, AttemptResult, Question, QuestionId, QuizId};
use cognitia_core::{Countdown, CountdownTimer};

use crate::error::SessionError;

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// In-memory state of one student working through one quiz attempt.
///
/// The answer cache is the session's source of truth: answers land here first
/// and are pushed to storage as writes behind it. Scoring at submission reads
/// the cache, never the store, so a failed remote write cannot lose a
/// response the student already gave.
pub struct QuizSession {
    attempt: Attempt,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, Answer>,
    timer: CountdownTimer,
    result: Option<AttemptResult>,
    resumed: bool,
}

impl QuizSession {
    pub(crate) fn begin(
        attempt: Attempt,
        questions: Vec<Question>,
        time_limit_minutes: u32,
    ) -> Self {
        let countdown = Countdown::new(attempt.started_at(), time_limit_minutes);
        Self {
            attempt,
            questions,
            answers: HashMap::new(),
            timer: CountdownTimer::new(countdown),
            result: None,
            resumed: false,
        }
    }

    /// Rebuild a session around an attempt that already exists in the store.
    ///
    /// The countdown is anchored to the persisted start timestamp, so the
    /// elapsed time before the resume still counts against the limit.
    pub(crate) fn resume(
        attempt: Attempt,
        questions: Vec<Question>,
        time_limit_minutes: u32,
        recorded: Vec<Answer>,
    ) -> Self {
        let mut session = Self::begin(attempt, questions, time_limit_minutes);
        session.resumed = true;
        session.answers = recorded
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();
        session
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt.id()
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.attempt.quiz_id()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.attempt.started_at()
    }

    /// True when this session picked up an attempt opened earlier.
    #[must_use]
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number of questions with a recorded answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    /// Whole seconds left at `now`, zero once the limit is crossed.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        self.timer.countdown().remaining_seconds(now)
    }

    pub(crate) fn timer_mut(&mut self) -> &mut CountdownTimer {
        &mut self.timer
    }

    /// Grade `submitted_text` against the question and record it in the
    /// cache, replacing any earlier answer for the same question.
    pub(crate) fn record_answer(
        &mut self,
        question_id: QuestionId,
        submitted_text: &str,
        elapsed_seconds: Option<u32>,
    ) -> Result<&Answer, SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        let question = self
            .questions
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or_else(|| {
                SessionError::Validation(format!("question {question_id} is not in this quiz"))
            })?;

        let answer = Answer {
            question_id,
            submitted_text: submitted_text.to_owned(),
            is_correct: question.grade(submitted_text),
            elapsed_seconds,
        };
        self.answers.insert(question_id, answer);
        Ok(&self.answers[&question_id])
    }

    /// Score the cached answers. The percentage is over answered questions.
    pub(crate) fn build_result(&self) -> AttemptResult {
        AttemptResult::from_answers(self.answers.values().cloned().collect())
    }

    pub(crate) fn mark_submitted(&mut self, result: AttemptResult) {
        self.timer.stop();
        self.result = Some(result);
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("attempt_id", &self.attempt.id())
            .field("quiz_id", &self.attempt.quiz_id())
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("resumed", &self.resumed)
            .field("submitted", &self.result.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
