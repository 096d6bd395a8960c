use chrono::{DateTime, Utc};
use cognitia_core::model::{Attempt, AttemptId, AttemptStatus, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, id_to_i64, map_attempt_row, ser, write_err};
use crate::repository::{AttemptRepository, NewAttemptRecord, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, record: NewAttemptRecord) -> Result<Attempt, StorageError> {
        // The idx_attempts_one_open partial unique index turns a duplicate
        // open attempt into StorageError::Conflict via write_err.
        let res = sqlx::query(
            r"
            INSERT INTO attempts (student_id, quiz_id, status, started_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("student_id", record.student_id.value())?)
        .bind(id_to_i64("quiz_id", record.quiz_id.value())?)
        .bind(AttemptStatus::InProgress.as_str())
        .bind(record.started_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = attempt_id_from_i64(res.last_insert_rowid())?;
        Ok(Attempt::begin(
            id,
            record.student_id,
            record.quiz_id,
            record.started_at,
        ))
    }

    async fn find_in_progress(
        &self,
        student_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, quiz_id, status, started_at, submitted_at, score_percent
            FROM attempts
            WHERE student_id = ?1 AND quiz_id = ?2 AND status = 'in_progress'
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, quiz_id, status, started_at, submitted_at, score_percent
            FROM attempts
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn complete_attempt(
        &self,
        id: AttemptId,
        score_percent: u8,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        // Guarding on status makes completion single-shot even if two
        // submitters race: the second update matches zero rows.
        let res = sqlx::query(
            r"
            UPDATE attempts
            SET status = 'completed', score_percent = ?2, submitted_at = ?3
            WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id_to_i64("attempt_id", id.value())?)
        .bind(i64::from(score_percent))
        .bind(submitted_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM attempts WHERE id = ?1")
                .bind(id_to_i64("attempt_id", id.value())?)
                .fetch_optional(&self.pool)
                .await
                .map_err(ser)?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        Ok(())
    }

    async fn list_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<Attempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, student_id, quiz_id, status, started_at, submitted_at, score_percent
            FROM attempts
            WHERE student_id = ?1
            ORDER BY started_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_attempt_row).collect()
    }
}
