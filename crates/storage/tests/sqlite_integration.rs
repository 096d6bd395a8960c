use chrono::Duration;
use cognitia_core::model::{
    Answer, AttemptStatus, PlanId, QuestionKind, QuizId, UserId,
};
use cognitia_core::time::fixed_now;
use storage::repository::{
    AnswerRecord, AnswerRepository, AttemptRepository, ClassSessionRepository,
    NewAttemptRecord, NewClassSessionRecord, NewPlanRecord, NewQuestionRecord, NewQuizRecord,
    PlanRepository, QuizRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

fn quiz_record(title: &str) -> NewQuizRecord {
    NewQuizRecord {
        title: title.into(),
        subject: "math".into(),
        grade_level: 5,
        time_limit_minutes: 15,
        description: Some("unit check".into()),
        created_at: fixed_now(),
        questions: vec![
            NewQuestionRecord {
                prompt: "1/2 + 1/4 = ?".into(),
                kind: QuestionKind::ShortAnswer,
                options: Vec::new(),
                answer_key: "3/4".into(),
                position: 0,
            },
            NewQuestionRecord {
                prompt: "Is 7 prime?".into(),
                kind: QuestionKind::TrueFalse,
                options: vec!["true".into(), "false".into()],
                answer_key: "true".into(),
                position: 1,
            },
        ],
    }
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn quiz_round_trips_with_ordered_questions() {
    let repo = connect("memdb_quiz_roundtrip").await;

    let quiz_id = repo.insert_quiz(quiz_record("Fractions")).await.unwrap();
    let quiz = repo.get_quiz(quiz_id).await.unwrap().expect("quiz stored");
    assert_eq!(quiz.title(), "Fractions");
    assert_eq!(quiz.time_limit_minutes(), 15);

    let questions = repo.questions_for_quiz(quiz_id).await.unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].position(), 0);
    assert_eq!(questions[1].kind(), QuestionKind::TrueFalse);
    assert_eq!(questions[1].options(), ["true", "false"]);

    let listed = repo.list_quizzes(Some("math"), 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    let none = repo.list_quizzes(Some("history"), 10).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn partial_index_rejects_second_open_attempt() {
    let repo = connect("memdb_attempt_unique").await;
    let quiz_id = repo.insert_quiz(quiz_record("Unique")).await.unwrap();

    let record = NewAttemptRecord {
        student_id: UserId::new(7),
        quiz_id,
        started_at: fixed_now(),
    };
    let first = repo.insert_attempt(record).await.unwrap();
    assert!(first.is_in_progress());

    let err = repo.insert_attempt(record).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // completion releases the slot
    repo.complete_attempt(first.id(), 50, fixed_now() + Duration::minutes(3))
        .await
        .unwrap();
    let second = repo.insert_attempt(record).await.unwrap();
    assert_ne!(second.id(), first.id());
}

#[tokio::test]
async fn complete_attempt_sets_fields_once() {
    let repo = connect("memdb_attempt_complete").await;
    let quiz_id = repo.insert_quiz(quiz_record("Complete")).await.unwrap();

    let attempt = repo
        .insert_attempt(NewAttemptRecord {
            student_id: UserId::new(3),
            quiz_id,
            started_at: fixed_now(),
        })
        .await
        .unwrap();

    let submitted_at = fixed_now() + Duration::minutes(5);
    repo.complete_attempt(attempt.id(), 67, submitted_at)
        .await
        .unwrap();

    let stored = repo.get_attempt(attempt.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), AttemptStatus::Completed);
    assert_eq!(stored.score_percent(), Some(67));
    assert_eq!(stored.submitted_at(), Some(submitted_at));

    let err = repo
        .complete_attempt(attempt.id(), 90, submitted_at)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let in_progress = repo
        .find_in_progress(UserId::new(3), quiz_id)
        .await
        .unwrap();
    assert!(in_progress.is_none());
}

#[tokio::test]
async fn answer_upsert_keeps_one_row_per_question() {
    let repo = connect("memdb_answer_upsert").await;
    let quiz_id = repo.insert_quiz(quiz_record("Answers")).await.unwrap();
    let attempt = repo
        .insert_attempt(NewAttemptRecord {
            student_id: UserId::new(9),
            quiz_id,
            started_at: fixed_now(),
        })
        .await
        .unwrap();
    let questions = repo.questions_for_quiz(quiz_id).await.unwrap();

    let first = Answer {
        question_id: questions[0].id(),
        submitted_text: "1/2".into(),
        is_correct: false,
        elapsed_seconds: Some(12),
    };
    repo.upsert_answer(AnswerRecord::from_answer(attempt.id(), &first))
        .await
        .unwrap();

    let revised = Answer {
        submitted_text: "3/4".into(),
        is_correct: true,
        elapsed_seconds: Some(40),
        ..first
    };
    repo.upsert_answer(AnswerRecord::from_answer(attempt.id(), &revised))
        .await
        .unwrap();

    let answers = repo.answers_for_attempt(attempt.id()).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].submitted_text, "3/4");
    assert!(answers[0].is_correct);
    assert_eq!(answers[0].elapsed_seconds, Some(40));
}

#[tokio::test]
async fn plans_and_guides_round_trip() {
    let repo = connect("memdb_plans").await;
    let author = UserId::new(2);

    let plan_id = repo
        .insert_plan(NewPlanRecord {
            title: "Fractions unit".into(),
            subject: "math".into(),
            grade_level: 5,
            objectives: vec!["add fractions".into(), "compare fractions".into()],
            author_id: author,
            created_at: fixed_now(),
        })
        .await
        .unwrap();

    let mut plan = repo.get_plan(plan_id).await.unwrap().unwrap();
    assert_eq!(plan.objectives().len(), 2);

    plan.publish().unwrap();
    repo.update_plan(&plan).await.unwrap();
    let stored = repo.get_plan(plan_id).await.unwrap().unwrap();
    assert_eq!(stored.status().as_str(), "published");

    let guide = cognitia_core::model::LessonGuide {
        plan_id,
        title: "Fractions guide".into(),
        body_markdown: "# Warm-up\nCompare 1/2 and 1/3.".into(),
        generated_at: fixed_now(),
    };
    repo.save_guide(&guide).await.unwrap();
    let fetched = repo.guide_for_plan(plan_id).await.unwrap().unwrap();
    assert_eq!(fetched.body_markdown, guide.body_markdown);

    assert!(
        repo.guide_for_plan(PlanId::new(999))
            .await
            .unwrap()
            .is_none()
    );

    let by_author = repo.list_by_author(author, 10).await.unwrap();
    assert_eq!(by_author.len(), 1);
}

#[tokio::test]
async fn class_sessions_filter_by_window() {
    let repo = connect("memdb_sessions").await;
    let teacher = UserId::new(4);
    let base = fixed_now();

    for (offset, subject) in [(0_i64, "math"), (120, "science")] {
        repo.insert_class_session(NewClassSessionRecord {
            teacher_id: teacher,
            plan_id: None,
            subject: subject.into(),
            room: Some("B-2".into()),
            starts_at: base + Duration::minutes(offset),
            ends_at: base + Duration::minutes(offset + 60),
        })
        .await
        .unwrap();
    }

    let all = repo
        .sessions_for_teacher(teacher, base, base + Duration::hours(4))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].subject(), "math");

    let first_only = repo
        .sessions_for_teacher(teacher, base, base + Duration::minutes(90))
        .await
        .unwrap();
    assert_eq!(first_only.len(), 1);

    repo.delete_class_session(all[1].id()).await.unwrap();
    let err = repo.delete_class_session(all[1].id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
