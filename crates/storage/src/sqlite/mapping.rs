use cognitia_core::model::{
    Answer, Attempt, AttemptId, AttemptStatus, ClassSession, ClassSessionId, Plan, PlanId,
    PlanStatus, Question, QuestionId, QuestionKind, Quiz, QuizId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors on writes; unique-constraint violations become
/// `StorageError::Conflict` so callers can tell a benign race from an outage.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn plan_id_from_i64(v: i64) -> Result<PlanId, StorageError> {
    Ok(PlanId::new(i64_to_u64("plan_id", v)?))
}

pub(crate) fn class_session_id_from_i64(v: i64) -> Result<ClassSessionId, StorageError> {
    Ok(ClassSessionId::new(i64_to_u64("class_session_id", v)?))
}

pub(crate) fn parse_question_kind(s: &str) -> Result<QuestionKind, StorageError> {
    match s {
        "multiple_choice" => Ok(QuestionKind::MultipleChoice),
        "true_false" => Ok(QuestionKind::TrueFalse),
        "short_answer" => Ok(QuestionKind::ShortAnswer),
        _ => Err(StorageError::Serialization(format!(
            "invalid question kind: {s}"
        ))),
    }
}

pub(crate) fn parse_attempt_status(s: &str) -> Result<AttemptStatus, StorageError> {
    match s {
        "in_progress" => Ok(AttemptStatus::InProgress),
        "completed" => Ok(AttemptStatus::Completed),
        _ => Err(StorageError::Serialization(format!(
            "invalid attempt status: {s}"
        ))),
    }
}

pub(crate) fn parse_plan_status(s: &str) -> Result<PlanStatus, StorageError> {
    match s {
        "draft" => Ok(PlanStatus::Draft),
        "published" => Ok(PlanStatus::Published),
        _ => Err(StorageError::Serialization(format!(
            "invalid plan status: {s}"
        ))),
    }
}

/// String lists (question options, plan objectives) are stored as JSON text.
pub(crate) fn string_list_to_json(items: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(items).map_err(ser)
}

pub(crate) fn string_list_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let grade_level_i64: i64 = row.try_get("grade_level").map_err(ser)?;
    let grade_level = u8::try_from(grade_level_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid grade_level: {grade_level_i64}")))?;
    let limit_i64: i64 = row.try_get("time_limit_minutes").map_err(ser)?;
    let time_limit_minutes = u32::try_from(limit_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid time_limit_minutes: {limit_i64}"))
    })?;

    Quiz::new(
        quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("subject").map_err(ser)?,
        grade_level,
        time_limit_minutes,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let options_raw: String = row.try_get("options").map_err(ser)?;
    let position_i64: i64 = row.try_get("position").map_err(ser)?;
    let position = u32::try_from(position_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid position: {position_i64}")))?;

    Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        parse_question_kind(&kind_str)?,
        string_list_from_json(&options_raw)?,
        row.try_get::<String, _>("answer_key").map_err(ser)?,
        position,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<Attempt, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;
    let score = row
        .try_get::<Option<i64>, _>("score_percent")
        .map_err(ser)?
        .map(|v| {
            u8::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid score_percent: {v}")))
        })
        .transpose()?;

    Attempt::from_persisted(
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        parse_attempt_status(&status_str)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("submitted_at").map_err(ser)?,
        score,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    let is_correct: i64 = row.try_get("is_correct").map_err(ser)?;
    let elapsed = row
        .try_get::<Option<i64>, _>("elapsed_seconds")
        .map_err(ser)?
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid elapsed_seconds: {v}")))
        })
        .transpose()?;

    Ok(Answer {
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        submitted_text: row.try_get("submitted_text").map_err(ser)?,
        is_correct: is_correct != 0,
        elapsed_seconds: elapsed,
    })
}

pub(crate) fn map_plan_row(row: &SqliteRow) -> Result<Plan, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;
    let objectives_raw: String = row.try_get("objectives").map_err(ser)?;
    let grade_level_i64: i64 = row.try_get("grade_level").map_err(ser)?;
    let grade_level = u8::try_from(grade_level_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid grade_level: {grade_level_i64}")))?;

    Plan::from_persisted(
        plan_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("subject").map_err(ser)?,
        grade_level,
        string_list_from_json(&objectives_raw)?,
        parse_plan_status(&status_str)?,
        user_id_from_i64(row.try_get::<i64, _>("author_id").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_class_session_row(row: &SqliteRow) -> Result<ClassSession, StorageError> {
    let plan_id = row
        .try_get::<Option<i64>, _>("plan_id")
        .map_err(ser)?
        .map(plan_id_from_i64)
        .transpose()?;

    ClassSession::new(
        class_session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("teacher_id").map_err(ser)?)?,
        plan_id,
        row.try_get::<String, _>("subject").map_err(ser)?,
        row.try_get::<Option<String>, _>("room").map_err(ser)?,
        row.try_get("starts_at").map_err(ser)?,
        row.try_get("ends_at").map_err(ser)?,
    )
    .map_err(ser)
}
