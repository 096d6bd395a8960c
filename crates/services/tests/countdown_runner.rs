use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use cognitia_core::model::{AttemptStatus, QuestionKind, QuizId, UserId};
use cognitia_core::time::{fixed_clock, fixed_now};
use services::{Clock, CountdownRunner, QuizSessionService, Tick};
use storage::repository::{
    AttemptRepository, InMemoryRepository, NewQuestionRecord, NewQuizRecord, QuizRepository,
};
use tokio::sync::Mutex;

async fn seed_quiz(repo: &InMemoryRepository, limit_minutes: u32) -> QuizId {
    repo.insert_quiz(NewQuizRecord {
        title: "Timed".into(),
        subject: "math".into(),
        grade_level: 5,
        time_limit_minutes: limit_minutes,
        description: None,
        created_at: fixed_now(),
        questions: vec![NewQuestionRecord {
            prompt: "2+2?".into(),
            kind: QuestionKind::ShortAnswer,
            options: Vec::new(),
            answer_key: "4".into(),
            position: 0,
        }],
    })
    .await
    .unwrap()
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
async fn expiry_tick_auto_submits_exactly_once() {
    let repo = InMemoryRepository::new();
    let quiz_id = seed_quiz(&repo, 1).await;

    // open the attempt at the fixed instant
    let opener = service(&repo, fixed_clock());
    let mut session = opener.start(UserId::new(7), quiz_id).await.unwrap();
    let attempt_id = session.attempt_id();

    // observe the same session from after the deadline
    let late = service(&repo, Clock::fixed(fixed_now() + Duration::minutes(2)));
    assert_eq!(late.tick(&mut session).await.unwrap(), Tick::Expired);

    let stored = repo.get_attempt(attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), AttemptStatus::Completed);
    assert_eq!(stored.score_percent(), Some(0));
    let submitted_at = stored.submitted_at();

    // the latch holds: further ticks neither fire nor resubmit
    assert_eq!(late.tick(&mut session).await.unwrap(), Tick::Stopped);
    let stored = repo.get_attempt(attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.submitted_at(), submitted_at);
}

#[tokio::test]
async fn runner_auto_submits_a_resumed_overdue_attempt() {
    let repo = InMemoryRepository::new();
    let quiz_id = seed_quiz(&repo, 1).await;

    let opener = service(&repo, fixed_clock());
    let session = opener.start(UserId::new(7), quiz_id).await.unwrap();
    let attempt_id = session.attempt_id();
    drop(session);

    // resume well past the limit; the first (immediate) tick should fire
    let late = service(&repo, Clock::fixed(fixed_now() + Duration::minutes(5)));
    let resumed = late.resume(UserId::new(7), quiz_id).await.unwrap();
    assert!(resumed.resumed());

    let session = Arc::new(Mutex::new(resumed));
    let runner = CountdownRunner::new(late).with_period(StdDuration::from_millis(5));
    let (ticks, handle) = runner.spawn(Arc::clone(&session));

    handle.await.unwrap().unwrap();
    assert_eq!(*ticks.borrow(), Tick::Expired);

    let stored = repo.get_attempt(attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), AttemptStatus::Completed);
    assert!(session.lock().await.is_submitted());
}

#[tokio::test]
async fn runner_stops_quietly_after_manual_submit() {
    let repo = InMemoryRepository::new();
    let quiz_id = seed_quiz(&repo, 1).await;

    let svc = service(&repo, fixed_clock());
    let mut session = svc.start(UserId::new(7), quiz_id).await.unwrap();
    svc.submit(&mut session).await.unwrap();

    let session = Arc::new(Mutex::new(session));
    let runner = CountdownRunner::new(svc).with_period(StdDuration::from_millis(5));
    let (ticks, handle) = runner.spawn(session);

    handle.await.unwrap().unwrap();
    assert_eq!(*ticks.borrow(), Tick::Stopped);
}
