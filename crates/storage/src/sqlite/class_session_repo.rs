use chrono::{DateTime, Utc};
use cognitia_core::model::{ClassSession, ClassSessionId, UserId};

use super::SqliteRepository;
use super::mapping::{class_session_id_from_i64, id_to_i64, map_class_session_row, write_err};
use crate::repository::{ClassSessionRepository, NewClassSessionRecord, StorageError};

#[async_trait::async_trait]
impl ClassSessionRepository for SqliteRepository {
    async fn insert_class_session(
        &self,
        record: NewClassSessionRecord,
    ) -> Result<ClassSessionId, StorageError> {
        let plan_id = record
            .plan_id
            .map(|p| id_to_i64("plan_id", p.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO class_sessions (teacher_id, plan_id, subject, room, starts_at, ends_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("teacher_id", record.teacher_id.value())?)
        .bind(plan_id)
        .bind(record.subject)
        .bind(record.room)
        .bind(record.starts_at)
        .bind(record.ends_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        class_session_id_from_i64(res.last_insert_rowid())
    }

    async fn sessions_for_teacher(
        &self,
        teacher_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClassSession>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, teacher_id, plan_id, subject, room, starts_at, ends_at
            FROM class_sessions
            WHERE teacher_id = ?1 AND starts_at < ?3 AND ends_at > ?2
            ORDER BY starts_at ASC
            ",
        )
        .bind(id_to_i64("teacher_id", teacher_id.value())?)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_class_session_row).collect()
    }

    async fn delete_class_session(&self, id: ClassSessionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM class_sessions WHERE id = ?1")
            .bind(id_to_i64("class_session_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
