use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cognitia_core::model::{
    Answer, Attempt, AttemptId, ClassSession, ClassSessionId, LessonGuide, Plan, PlanId, Question,
    QuestionId, QuestionKind, Quiz, QuizId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A store-level uniqueness rule rejected the write, e.g. a second
    /// in-progress attempt for the same (student, quiz) pair.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Input shape for creating a quiz; the store assigns quiz and question ids.
#[derive(Debug, Clone)]
pub struct NewQuizRecord {
    pub title: String,
    pub subject: String,
    pub grade_level: u8,
    pub time_limit_minutes: u32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<NewQuestionRecord>,
}

#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub prompt: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub answer_key: String,
    pub position: u32,
}

impl NewQuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            prompt: question.prompt().to_owned(),
            kind: question.kind(),
            options: question.options().to_vec(),
            answer_key: question.answer_key().to_owned(),
            position: question.position(),
        }
    }
}

/// Input shape for opening an attempt; the store assigns the id.
#[derive(Debug, Clone, Copy)]
pub struct NewAttemptRecord {
    pub student_id: UserId,
    pub quiz_id: QuizId,
    pub started_at: DateTime<Utc>,
}

/// Persisted shape for an answer, scoped to its attempt.
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub submitted_text: String,
    pub is_correct: bool,
    pub elapsed_seconds: Option<u32>,
}

impl AnswerRecord {
    #[must_use]
    pub fn from_answer(attempt_id: AttemptId, answer: &Answer) -> Self {
        Self {
            attempt_id,
            question_id: answer.question_id,
            submitted_text: answer.submitted_text.clone(),
            is_correct: answer.is_correct,
            elapsed_seconds: answer.elapsed_seconds,
        }
    }

    #[must_use]
    pub fn into_answer(self) -> Answer {
        Answer {
            question_id: self.question_id,
            submitted_text: self.submitted_text,
            is_correct: self.is_correct,
            elapsed_seconds: self.elapsed_seconds,
        }
    }
}

/// Input shape for creating a plan; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewPlanRecord {
    pub title: String,
    pub subject: String,
    pub grade_level: u8,
    pub objectives: Vec<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Input shape for scheduling a class session; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewClassSessionRecord {
    pub teacher_id: UserId,
    pub plan_id: Option<PlanId>,
    pub subject: String,
    pub room: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for quizzes and their questions.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist a quiz and its questions, returning the assigned quiz id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError>;

    /// Fetch a quiz by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// List quizzes, optionally filtered by subject, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn list_quizzes(
        &self,
        subject: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Quiz>, StorageError>;

    /// Fetch the questions of a quiz ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for quiz attempts.
///
/// The store, not the client, enforces the single in-progress attempt per
/// (student, quiz) invariant; `insert_attempt` reports a violation as
/// `StorageError::Conflict`.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Open a new in-progress attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when an in-progress attempt already
    /// exists for the same (student, quiz) pair.
    async fn insert_attempt(&self, record: NewAttemptRecord) -> Result<Attempt, StorageError>;

    /// Find the in-progress attempt for a (student, quiz) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn find_in_progress(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, StorageError>;

    /// Fetch an attempt by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError>;

    /// Mark an attempt completed with its final score. Sets status, score,
    /// and submission timestamp exactly once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown attempt and
    /// `StorageError::Conflict` when the attempt was already completed.
    async fn complete_attempt(
        &self,
        id: AttemptId,
        score_percent: u8,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// List a student's attempts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn list_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<Attempt>, StorageError>;
}

/// Repository contract for per-question answers.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Insert or replace the answer for (attempt, question). Uniqueness is a
    /// store-level guarantee; callers never read-then-write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_answer(&self, record: AnswerRecord) -> Result<(), StorageError>;

    /// Fetch all answers of an attempt ordered by question id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn answers_for_attempt(&self, attempt_id: AttemptId)
    -> Result<Vec<Answer>, StorageError>;
}

/// Repository contract for curriculum plans and their lesson guides.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Persist a new draft plan, returning the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be stored.
    async fn insert_plan(&self, record: NewPlanRecord) -> Result<PlanId, StorageError>;

    /// Fetch a plan by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>, StorageError>;

    /// Persist the current state of an existing plan.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown plan.
    async fn update_plan(&self, plan: &Plan) -> Result<(), StorageError>;

    /// List plans by author, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn list_by_author(
        &self,
        author_id: UserId,
        limit: u32,
    ) -> Result<Vec<Plan>, StorageError>;

    /// Attach (or replace) the generated lesson guide of a plan.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_guide(&self, guide: &LessonGuide) -> Result<(), StorageError>;

    /// Fetch the lesson guide of a plan, if one was generated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn guide_for_plan(&self, plan_id: PlanId) -> Result<Option<LessonGuide>, StorageError>;
}

/// Repository contract for scheduled class sessions.
#[async_trait]
pub trait ClassSessionRepository: Send + Sync {
    /// Persist a new class session, returning the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn insert_class_session(
        &self,
        record: NewClassSessionRecord,
    ) -> Result<ClassSessionId, StorageError>;

    /// List a teacher's sessions intersecting the given window, ordered by
    /// start time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on store failures.
    async fn sessions_for_teacher(
        &self,
        teacher_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClassSession>, StorageError>;

    /// Remove a session from the calendar.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown session.
    async fn delete_class_session(&self, id: ClassSessionId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct IdGen {
    quizzes: u64,
    questions: u64,
    attempts: u64,
    plans: u64,
    class_sessions: u64,
}

impl IdGen {
    fn next(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    ids: Arc<Mutex<IdGen>>,
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    questions: Arc<Mutex<HashMap<QuizId, Vec<Question>>>>,
    attempts: Arc<Mutex<HashMap<AttemptId, Attempt>>>,
    answers: Arc<Mutex<HashMap<(AttemptId, QuestionId), AnswerRecord>>>,
    plans: Arc<Mutex<HashMap<PlanId, Plan>>>,
    guides: Arc<Mutex<HashMap<PlanId, LessonGuide>>>,
    class_sessions: Arc<Mutex<HashMap<ClassSessionId, ClassSession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut ids = self.ids.lock().map_err(poisoned)?;
        let quiz_id = QuizId::new(IdGen::next(&mut ids.quizzes));

        let stored = Quiz::new(
            quiz_id,
            quiz.title,
            quiz.subject,
            quiz.grade_level,
            quiz.time_limit_minutes,
            quiz.description,
            quiz.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut stored_questions = Vec::with_capacity(quiz.questions.len());
        for q in quiz.questions {
            let question_id = QuestionId::new(IdGen::next(&mut ids.questions));
            let question = Question::new(
                question_id,
                quiz_id,
                q.prompt,
                q.kind,
                q.options,
                q.answer_key,
                q.position,
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
            stored_questions.push(question);
        }
        drop(ids);

        self.quizzes
            .lock()
            .map_err(poisoned)?
            .insert(quiz_id, stored);
        self.questions
            .lock()
            .map_err(poisoned)?
            .insert(quiz_id, stored_questions);
        Ok(quiz_id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.quizzes.lock().map_err(poisoned)?.get(&id).cloned())
    }

    async fn list_quizzes(
        &self,
        subject: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let mut quizzes: Vec<Quiz> = guard
            .values()
            .filter(|q| subject.is_none_or(|s| q.subject() == s))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        quizzes.truncate(limit as usize);
        Ok(quizzes)
    }

    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut questions = guard.get(&quiz_id).cloned().unwrap_or_default();
        questions.sort_by_key(Question::position);
        Ok(questions)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, record: NewAttemptRecord) -> Result<Attempt, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let open_exists = guard.values().any(|a| {
            a.student_id() == record.student_id
                && a.quiz_id() == record.quiz_id
                && a.is_in_progress()
        });
        if open_exists {
            return Err(StorageError::Conflict);
        }

        let id = AttemptId::new(IdGen::next(
            &mut self.ids.lock().map_err(poisoned)?.attempts,
        ));
        let attempt = Attempt::begin(id, record.student_id, record.quiz_id, record.started_at);
        guard.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn find_in_progress(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .find(|a| a.student_id() == student_id && a.quiz_id() == quiz_id && a.is_in_progress())
            .cloned())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError> {
        Ok(self.attempts.lock().map_err(poisoned)?.get(&id).cloned())
    }

    async fn complete_attempt(
        &self,
        id: AttemptId,
        score_percent: u8,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let attempt = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        attempt
            .complete(score_percent, submitted_at)
            .map_err(|_| StorageError::Conflict)
    }

    async fn list_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mut attempts: Vec<Attempt> = guard
            .values()
            .filter(|a| a.student_id() == student_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then(b.id().cmp(&a.id()))
        });
        attempts.truncate(limit as usize);
        Ok(attempts)
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn upsert_answer(&self, record: AnswerRecord) -> Result<(), StorageError> {
        self.answers
            .lock()
            .map_err(poisoned)?
            .insert((record.attempt_id, record.question_id), record);
        Ok(())
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<Answer>, StorageError> {
        let guard = self.answers.lock().map_err(poisoned)?;
        let mut answers: Vec<Answer> = guard
            .values()
            .filter(|r| r.attempt_id == attempt_id)
            .cloned()
            .map(AnswerRecord::into_answer)
            .collect();
        answers.sort_by_key(|a| a.question_id);
        Ok(answers)
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn insert_plan(&self, record: NewPlanRecord) -> Result<PlanId, StorageError> {
        let id = PlanId::new(IdGen::next(&mut self.ids.lock().map_err(poisoned)?.plans));
        let plan = Plan::new(
            id,
            record.title,
            record.subject,
            record.grade_level,
            record.objectives,
            record.author_id,
            record.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.plans.lock().map_err(poisoned)?.insert(id, plan);
        Ok(id)
    }

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>, StorageError> {
        Ok(self.plans.lock().map_err(poisoned)?.get(&id).cloned())
    }

    async fn update_plan(&self, plan: &Plan) -> Result<(), StorageError> {
        let mut guard = self.plans.lock().map_err(poisoned)?;
        if !guard.contains_key(&plan.id()) {
            return Err(StorageError::NotFound);
        }
        guard.insert(plan.id(), plan.clone());
        Ok(())
    }

    async fn list_by_author(
        &self,
        author_id: UserId,
        limit: u32,
    ) -> Result<Vec<Plan>, StorageError> {
        let guard = self.plans.lock().map_err(poisoned)?;
        let mut plans: Vec<Plan> = guard
            .values()
            .filter(|p| p.author_id() == author_id)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        plans.truncate(limit as usize);
        Ok(plans)
    }

    async fn save_guide(&self, guide: &LessonGuide) -> Result<(), StorageError> {
        self.guides
            .lock()
            .map_err(poisoned)?
            .insert(guide.plan_id, guide.clone());
        Ok(())
    }

    async fn guide_for_plan(&self, plan_id: PlanId) -> Result<Option<LessonGuide>, StorageError> {
        Ok(self.guides.lock().map_err(poisoned)?.get(&plan_id).cloned())
    }
}

#[async_trait]
impl ClassSessionRepository for InMemoryRepository {
    async fn insert_class_session(
        &self,
        record: NewClassSessionRecord,
    ) -> Result<ClassSessionId, StorageError> {
        let id = ClassSessionId::new(IdGen::next(
            &mut self.ids.lock().map_err(poisoned)?.class_sessions,
        ));
        let session = ClassSession::new(
            id,
            record.teacher_id,
            record.plan_id,
            record.subject,
            record.room,
            record.starts_at,
            record.ends_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.class_sessions
            .lock()
            .map_err(poisoned)?
            .insert(id, session);
        Ok(id)
    }

    async fn sessions_for_teacher(
        &self,
        teacher_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClassSession>, StorageError> {
        let guard = self.class_sessions.lock().map_err(poisoned)?;
        let mut sessions: Vec<ClassSession> = guard
            .values()
            .filter(|s| s.teacher_id() == teacher_id && s.starts_at() < until && s.ends_at() > from)
            .cloned()
            .collect();
        sessions.sort_by_key(ClassSession::starts_at);
        Ok(sessions)
    }

    async fn delete_class_session(&self, id: ClassSessionId) -> Result<(), StorageError> {
        self.class_sessions
            .lock()
            .map_err(poisoned)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub class_sessions: Arc<dyn ClassSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            quizzes: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            plans: Arc::new(repo.clone()),
            class_sessions: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognitia_core::time::fixed_now;

    fn quiz_record() -> NewQuizRecord {
        NewQuizRecord {
            title: "Fractions".into(),
            subject: "math".into(),
            grade_level: 5,
            time_limit_minutes: 15,
            description: None,
            created_at: fixed_now(),
            questions: vec![NewQuestionRecord {
                prompt: "1/2 + 1/2 = ?".into(),
                kind: QuestionKind::ShortAnswer,
                options: Vec::new(),
                answer_key: "1".into(),
                position: 0,
            }],
        }
    }

    #[tokio::test]
    async fn quiz_round_trips_with_questions() {
        let repo = InMemoryRepository::new();
        let quiz_id = repo.insert_quiz(quiz_record()).await.unwrap();

        let quiz = repo.get_quiz(quiz_id).await.unwrap().unwrap();
        assert_eq!(quiz.title(), "Fractions");

        let questions = repo.questions_for_quiz(quiz_id).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].quiz_id(), quiz_id);
    }

    #[tokio::test]
    async fn second_open_attempt_conflicts() {
        let repo = InMemoryRepository::new();
        let record = NewAttemptRecord {
            student_id: UserId::new(7),
            quiz_id: QuizId::new(1),
            started_at: fixed_now(),
        };

        let first = repo.insert_attempt(record).await.unwrap();
        let err = repo.insert_attempt(record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        // completing the first frees the slot
        repo.complete_attempt(first.id(), 80, fixed_now())
            .await
            .unwrap();
        repo.insert_attempt(record).await.unwrap();
    }

    #[tokio::test]
    async fn answer_upsert_replaces_in_place() {
        let repo = InMemoryRepository::new();
        let attempt_id = AttemptId::new(1);
        let answer = Answer {
            question_id: QuestionId::new(4),
            submitted_text: "first".into(),
            is_correct: false,
            elapsed_seconds: Some(10),
        };
        repo.upsert_answer(AnswerRecord::from_answer(attempt_id, &answer))
            .await
            .unwrap();

        let revised = Answer {
            submitted_text: "second".into(),
            is_correct: true,
            ..answer
        };
        repo.upsert_answer(AnswerRecord::from_answer(attempt_id, &revised))
            .await
            .unwrap();

        let answers = repo.answers_for_attempt(attempt_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].submitted_text, "second");
        assert!(answers[0].is_correct);
    }

    #[tokio::test]
    async fn complete_attempt_is_single_shot() {
        let repo = InMemoryRepository::new();
        let attempt = repo
            .insert_attempt(NewAttemptRecord {
                student_id: UserId::new(1),
                quiz_id: QuizId::new(1),
                started_at: fixed_now(),
            })
            .await
            .unwrap();

        repo.complete_attempt(attempt.id(), 60, fixed_now())
            .await
            .unwrap();
        let err = repo
            .complete_attempt(attempt.id(), 90, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let stored = repo.get_attempt(attempt.id()).await.unwrap().unwrap();
        assert_eq!(stored.score_percent(), Some(60));
    }
}
