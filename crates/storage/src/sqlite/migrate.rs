use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: quizzes with questions, attempts, answers, plans
/// with lesson guides, class sessions, and indexes. The uniqueness rules the
/// services rely on live here, not in client code: one in-progress attempt
/// per (student, quiz) via a partial unique index, and one answer row per
/// (attempt, question) via the answers primary key.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    grade_level INTEGER NOT NULL CHECK (grade_level >= 0),
                    time_limit_minutes INTEGER NOT NULL CHECK (time_limit_minutes > 0),
                    description TEXT,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    prompt TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    options TEXT NOT NULL,
                    answer_key TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    id INTEGER PRIMARY KEY,
                    student_id INTEGER NOT NULL,
                    quiz_id INTEGER NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed')),
                    started_at TEXT NOT NULL,
                    submitted_at TEXT,
                    score_percent INTEGER CHECK (score_percent BETWEEN 0 AND 100),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // At most one in-progress attempt per (student, quiz).
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_attempts_one_open
                    ON attempts(student_id, quiz_id)
                    WHERE status = 'in_progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answers (
                    attempt_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    submitted_text TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    elapsed_seconds INTEGER CHECK (elapsed_seconds >= 0),
                    PRIMARY KEY (attempt_id, question_id),
                    FOREIGN KEY (attempt_id) REFERENCES attempts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS plans (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    grade_level INTEGER NOT NULL CHECK (grade_level >= 0),
                    objectives TEXT NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('draft', 'published')),
                    author_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_guides (
                    plan_id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    body_markdown TEXT NOT NULL,
                    generated_at TEXT NOT NULL,
                    FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS class_sessions (
                    id INTEGER PRIMARY KEY,
                    teacher_id INTEGER NOT NULL,
                    plan_id INTEGER,
                    subject TEXT NOT NULL,
                    room TEXT,
                    starts_at TEXT NOT NULL,
                    ends_at TEXT NOT NULL,
                    CHECK (ends_at > starts_at),
                    FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE SET NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_quiz_position
                    ON questions(quiz_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_student_started
                    ON attempts(student_id, started_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_plans_author_created
                    ON plans(author_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_class_sessions_teacher_starts
                    ON class_sessions(teacher_id, starts_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
