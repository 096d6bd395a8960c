use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use cognitia_core::model::{
    Answer, Attempt, AttemptId, AttemptStatus, QuestionId, QuestionKind, QuizId, UserId,
};
use cognitia_core::time::{fixed_clock, fixed_now};
use services::{Clock, QuizSessionService, SessionError};
use storage::repository::{
    AnswerRecord, AnswerRepository, AttemptRepository, InMemoryRepository, NewAttemptRecord,
    NewQuestionRecord, NewQuizRecord, QuizRepository, StorageError,
};

const STUDENT: UserId = UserId::new(7);

fn question(prompt: &str, answer_key: &str) -> NewQuestionRecord {
    NewQuestionRecord {
        prompt: prompt.into(),
        kind: QuestionKind::ShortAnswer,
        options: Vec::new(),
        answer_key: answer_key.into(),
        position: 0,
    }
}

async fn seed_quiz(repo: &InMemoryRepository, keys: &[&str]) -> (QuizId, Vec<QuestionId>) {
    let questions = keys
        .iter()
        .enumerate()
        .map(|(i, key)| NewQuestionRecord {
            position: u32::try_from(i).unwrap(),
            ..question(&format!("Q{i}"), key)
        })
        .collect();
    let quiz_id = repo
        .insert_quiz(NewQuizRecord {
            title: "Flow".into(),
            subject: "math".into(),
            grade_level: 5,
            time_limit_minutes: 10,
            description: None,
            created_at: fixed_now(),
            questions,
        })
        .await
        .unwrap();
    let ids = repo
        .questions_for_quiz(quiz_id)
        .await
        .unwrap()
        .iter()
        .map(|q| q.id())
        .collect();
    (quiz_id, ids)
}

fn service(repo: &InMemoryRepository, clock: Clock) -> QuizSessionService {
    QuizSessionService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

#[tokio::test]
async fn start_then_resume_restores_answers_and_elapsed_time() {
    let repo = InMemoryRepository::new();
    let (quiz_id, questions) = seed_quiz(&repo, &["alpha", "beta"]).await;
    let svc = service(&repo, fixed_clock());

    let mut session = svc.start(STUDENT, quiz_id).await.unwrap();
    assert!(!session.resumed());
    let attempt_id = session.attempt_id();
    svc.record_answer(&mut session, questions[0], "alpha", Some(30))
        .await
        .unwrap();
    drop(session);

    // a second start picks the open attempt back up
    let resumed = svc.start(STUDENT, quiz_id).await.unwrap();
    assert!(resumed.resumed());
    assert_eq!(resumed.attempt_id(), attempt_id);
    assert_eq!(resumed.answered_count(), 1);
    assert!(resumed.answer(questions[0]).unwrap().is_correct);

    // elapsed time before the resume still counts against the limit
    let later = fixed_now() + Duration::seconds(90);
    assert_eq!(resumed.remaining_seconds(later), 10 * 60 - 90);
}

#[tokio::test]
async fn nil_ids_and_unknown_quiz_are_validation_errors() {
    let repo = InMemoryRepository::new();
    let svc = service(&repo, fixed_clock());

    let err = svc.start(UserId::new(0), QuizId::new(1)).await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));

    let err = svc.start(STUDENT, QuizId::new(0)).await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));

    let err = svc.start(STUDENT, QuizId::new(42)).await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
}

#[tokio::test]
async fn resume_without_open_attempt_is_not_started() {
    let repo = InMemoryRepository::new();
    let (quiz_id, _) = seed_quiz(&repo, &["alpha"]).await;
    let svc = service(&repo, fixed_clock());

    let err = svc.resume(STUDENT, quiz_id).await.unwrap_err();
    assert!(matches!(err, SessionError::NotStarted));
}

#[tokio::test]
async fn revised_answer_replaces_and_rescores() {
    let repo = InMemoryRepository::new();
    let (quiz_id, questions) = seed_quiz(&repo, &["alpha"]).await;
    let svc = service(&repo, fixed_clock());
    let mut session = svc.start(STUDENT, quiz_id).await.unwrap();

    let first = svc
        .record_answer(&mut session, questions[0], "wrong", None)
        .await
        .unwrap();
    assert!(!first.is_correct);

    let second = svc
        .record_answer(&mut session, questions[0], "alpha", None)
        .await
        .unwrap();
    assert!(second.is_correct);
    assert_eq!(second.answered_count, 1);

    let stored = repo.answers_for_attempt(session.attempt_id()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].submitted_text, "alpha");
}

#[tokio::test]
async fn submit_scores_answered_questions_and_closes_attempt() {
    let repo = InMemoryRepository::new();
    let (quiz_id, questions) = seed_quiz(&repo, &["a", "b", "c"]).await;
    let svc = service(&repo, fixed_clock());
    let mut session = svc.start(STUDENT, quiz_id).await.unwrap();

    svc.record_answer(&mut session, questions[0], "a", None)
        .await
        .unwrap();
    svc.record_answer(&mut session, questions[1], "a", None)
        .await
        .unwrap();
    svc.record_answer(&mut session, questions[2], "c", None)
        .await
        .unwrap();

    let result = svc.submit(&mut session).await.unwrap();
    assert_eq!(result.correct_count, 2);
    assert_eq!(result.total_questions, 3);
    assert_eq!(result.score_percent, 67);

    let stored = repo
        .get_attempt(session.attempt_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status(), AttemptStatus::Completed);
    assert_eq!(stored.score_percent(), Some(67));

    // results are final
    let err = svc.submit(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadySubmitted));
    let err = svc
        .record_answer(&mut session, questions[0], "a", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadySubmitted));
}

#[tokio::test]
async fn unanswered_attempt_submits_with_score_zero() {
    let repo = InMemoryRepository::new();
    let (quiz_id, _) = seed_quiz(&repo, &["a"]).await;
    let svc = service(&repo, fixed_clock());
    let mut session = svc.start(STUDENT, quiz_id).await.unwrap();

    let result = svc.submit(&mut session).await.unwrap();
    assert_eq!(result.score_percent, 0);
    assert_eq!(result.total_questions, 0);
}

// Wraps the shared repository but reports no open attempt on the first
// lookup, forcing the start path into the insert-then-conflict branch.
#[derive(Clone)]
struct RacyAttempts {
    inner: InMemoryRepository,
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl AttemptRepository for RacyAttempts {
    async fn insert_attempt(&self, record: NewAttemptRecord) -> Result<Attempt, StorageError> {
        self.inner.insert_attempt(record).await
    }

    async fn find_in_progress(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, StorageError> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_in_progress(student_id, quiz_id).await
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError> {
        self.inner.get_attempt(id).await
    }

    async fn complete_attempt(
        &self,
        id: AttemptId,
        score_percent: u8,
        submitted_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), StorageError> {
        self.inner
            .complete_attempt(id, score_percent, submitted_at)
            .await
    }

    async fn list_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<Attempt>, StorageError> {
        self.inner.list_for_student(student_id, limit).await
    }
}

#[tokio::test]
async fn losing_a_start_race_resumes_the_winners_attempt() {
    let repo = InMemoryRepository::new();
    let (quiz_id, _) = seed_quiz(&repo, &["a"]).await;

    // the "winner" opened an attempt from another device
    let winner = repo
        .insert_attempt(NewAttemptRecord {
            student_id: STUDENT,
            quiz_id,
            started_at: fixed_now(),
        })
        .await
        .unwrap();

    let svc = QuizSessionService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(RacyAttempts {
            inner: repo.clone(),
            lookups: Arc::new(AtomicUsize::new(0)),
        }),
        Arc::new(repo.clone()),
    );

    let session = svc.start(STUDENT, quiz_id).await.unwrap();
    assert!(session.resumed());
    assert_eq!(session.attempt_id(), winner.id());
}

// Answer store that always fails writes.
#[derive(Clone)]
struct BrokenAnswers {
    inner: InMemoryRepository,
}

#[async_trait]
impl AnswerRepository for BrokenAnswers {
    async fn upsert_answer(&self, _record: AnswerRecord) -> Result<(), StorageError> {
        Err(StorageError::Connection("wire down".into()))
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<Answer>, StorageError> {
        self.inner.answers_for_attempt(attempt_id).await
    }
}

#[tokio::test]
async fn answer_survives_failed_store_write_and_still_scores() {
    let repo = InMemoryRepository::new();
    let (quiz_id, questions) = seed_quiz(&repo, &["alpha"]).await;

    let svc = QuizSessionService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(BrokenAnswers { inner: repo.clone() }),
    );
    let mut session = svc.start(STUDENT, quiz_id).await.unwrap();

    let outcome = svc
        .record_answer(&mut session, questions[0], "alpha", None)
        .await
        .unwrap();
    assert!(!outcome.persisted);
    assert!(outcome.is_correct);

    // the cache, not the store, is what submission scores
    let result = svc.submit(&mut session).await.unwrap();
    assert_eq!(result.score_percent, 100);
}
