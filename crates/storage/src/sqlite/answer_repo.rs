use cognitia_core::model::{Answer, AttemptId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_answer_row, write_err};
use crate::repository::{AnswerRecord, AnswerRepository, StorageError};

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn upsert_answer(&self, record: AnswerRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO answers (attempt_id, question_id, submitted_text, is_correct, elapsed_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(attempt_id, question_id) DO UPDATE SET
                submitted_text = excluded.submitted_text,
                is_correct = excluded.is_correct,
                elapsed_seconds = excluded.elapsed_seconds
            ",
        )
        .bind(id_to_i64("attempt_id", record.attempt_id.value())?)
        .bind(id_to_i64("question_id", record.question_id.value())?)
        .bind(record.submitted_text)
        .bind(i64::from(record.is_correct))
        .bind(record.elapsed_seconds.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, submitted_text, is_correct, elapsed_seconds
            FROM answers
            WHERE attempt_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(id_to_i64("attempt_id", attempt_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_answer_row).collect()
    }
}
