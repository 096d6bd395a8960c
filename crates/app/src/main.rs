use std::fmt;

use chrono::Duration;
use cognitia_core::model::{QuestionKind, Role, UserId, UserRef};
use services::{AppServices, Clock, QuestionDraft, QuizDraft, SessionRequest, Tick};

mod telemetry;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidStudentId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidStudentId { raw } => write!(f, "invalid --student-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- demo    [--db <sqlite_url>] [--student-id <id>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--student-id <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --student-id 100");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COGNITIA_DB_URL, COGNITIA_STUDENT_ID, COGNITIA_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Demo,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "demo" => Some(Self::Demo),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    student_id: UserId,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COGNITIA_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut student_id = std::env::var("COGNITIA_STUDENT_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(100), UserId::new);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--student-id" => {
                    let value = require_value(args, "--student-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidStudentId { raw: value.clone() })?;
                    student_id = UserId::new(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, student_id })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Demo,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Demo,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup; core/services stay path-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Seed => seed(&services).await,
        Command::Demo => demo(&services, parsed.student_id).await,
        Command::History => history(&services, parsed.student_id).await,
    }
}

async fn seed(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let teacher = UserRef::new(UserId::new(1), "Ms. Rivera", Role::Teacher);

    let quiz_id = services
        .quiz_service()
        .create(QuizDraft {
            title: "Fractions check-in".into(),
            subject: "math".into(),
            grade_level: 5,
            time_limit_minutes: 10,
            description: Some("Short practice quiz on fraction basics.".into()),
            questions: vec![
                QuestionDraft {
                    prompt: "What is 1/2 + 1/4?".into(),
                    kind: QuestionKind::ShortAnswer,
                    options: Vec::new(),
                    answer_key: "3/4".into(),
                },
                QuestionDraft {
                    prompt: "Is 2/4 equal to 1/2?".into(),
                    kind: QuestionKind::TrueFalse,
                    options: vec!["true".into(), "false".into()],
                    answer_key: "true".into(),
                },
                QuestionDraft {
                    prompt: "Which fraction is largest?".into(),
                    kind: QuestionKind::MultipleChoice,
                    options: vec!["1/3".into(), "2/5".into(), "1/2".into()],
                    answer_key: "1/2".into(),
                },
            ],
        })
        .await?;
    println!("seeded quiz {quiz_id}");

    let plan_id = services
        .plan_service()
        .create(
            &teacher,
            "Fractions unit",
            "math",
            5,
            vec![
                "add fractions with unlike denominators".into(),
                "compare fractions".into(),
            ],
        )
        .await?;
    println!("seeded plan {plan_id}");

    let now = Clock::default_clock().now();
    let session_id = services
        .schedule_service()
        .schedule(
            &teacher,
            SessionRequest {
                plan_id: Some(plan_id),
                subject: "math".into(),
                room: Some("B-2".into()),
                starts_at: now + Duration::days(1),
                ends_at: now + Duration::days(1) + Duration::minutes(45),
            },
        )
        .await?;
    println!("seeded class session {session_id}");

    Ok(())
}

async fn demo(
    services: &AppServices,
    student_id: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(quiz) = services.quiz_service().list(None, 1).await?.pop() else {
        eprintln!("no quizzes found; run `seed` first");
        return Ok(());
    };
    println!("taking \"{}\" as student {student_id}", quiz.title());

    let sessions = services.quiz_sessions();
    let mut session = sessions.start(student_id, quiz.id()).await?;
    if session.resumed() {
        println!(
            "resumed open attempt {} ({} answers already recorded)",
            session.attempt_id(),
            session.answered_count()
        );
    }

    // answer every question but the last correctly
    let questions: Vec<_> = session.questions().to_vec();
    for (i, question) in questions.iter().enumerate() {
        let text = if i + 1 == questions.len() {
            "not sure".to_owned()
        } else {
            question.answer_key().to_owned()
        };
        let outcome = sessions
            .record_answer(&mut session, question.id(), &text, None)
            .await?;
        println!(
            "  answered {:?} -> {}",
            question.prompt(),
            if outcome.is_correct { "correct" } else { "wrong" }
        );
    }

    if let Tick::Running { remaining_seconds } = sessions.tick(&mut session).await? {
        println!("{remaining_seconds}s left on the clock");
    }

    let result = sessions.submit(&mut session).await?;
    println!(
        "submitted: {}% ({}/{} correct)",
        result.score_percent, result.correct_count, result.total_questions
    );
    Ok(())
}

async fn history(
    services: &AppServices,
    student_id: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let history = services.attempt_history().history(student_id, 50).await?;

    println!("in progress:");
    for item in &history.in_progress {
        println!("  #{} {} (started {})", item.attempt_id, item.quiz_title, item.started_at);
    }
    println!("completed:");
    for item in &history.completed {
        let score = item
            .score_percent
            .map_or_else(|| "-".into(), |s| format!("{s}%"));
        println!("  #{} {} {}", item.attempt_id, item.quiz_title, score);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
