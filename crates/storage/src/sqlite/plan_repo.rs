use cognitia_core::model::{LessonGuide, Plan, PlanId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_plan_row, plan_id_from_i64, ser, string_list_to_json, write_err};
use crate::repository::{NewPlanRecord, PlanRepository, StorageError};

#[async_trait::async_trait]
impl PlanRepository for SqliteRepository {
    async fn insert_plan(&self, record: NewPlanRecord) -> Result<PlanId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO plans (title, subject, grade_level, objectives, status, author_id, created_at)
            VALUES (?1, ?2, ?3, ?4, 'draft', ?5, ?6)
            ",
        )
        .bind(record.title)
        .bind(record.subject)
        .bind(i64::from(record.grade_level))
        .bind(string_list_to_json(&record.objectives)?)
        .bind(id_to_i64("author_id", record.author_id.value())?)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        plan_id_from_i64(res.last_insert_rowid())
    }

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, subject, grade_level, objectives, status, author_id, created_at
            FROM plans
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("plan_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_plan_row).transpose()
    }

    async fn update_plan(&self, plan: &Plan) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE plans
            SET title = ?2, objectives = ?3, status = ?4
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("plan_id", plan.id().value())?)
        .bind(plan.title())
        .bind(string_list_to_json(plan.objectives())?)
        .bind(plan.status().as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_by_author(
        &self,
        author_id: UserId,
        limit: u32,
    ) -> Result<Vec<Plan>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, subject, grade_level, objectives, status, author_id, created_at
            FROM plans
            WHERE author_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(id_to_i64("author_id", author_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_plan_row).collect()
    }

    async fn save_guide(&self, guide: &LessonGuide) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_guides (plan_id, title, body_markdown, generated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(plan_id) DO UPDATE SET
                title = excluded.title,
                body_markdown = excluded.body_markdown,
                generated_at = excluded.generated_at
            ",
        )
        .bind(id_to_i64("plan_id", guide.plan_id.value())?)
        .bind(&guide.title)
        .bind(&guide.body_markdown)
        .bind(guide.generated_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn guide_for_plan(&self, plan_id: PlanId) -> Result<Option<LessonGuide>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT plan_id, title, body_markdown, generated_at
            FROM lesson_guides
            WHERE plan_id = ?1
            ",
        )
        .bind(id_to_i64("plan_id", plan_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| {
            Ok(LessonGuide {
                plan_id: plan_id_from_i64(row.try_get::<i64, _>("plan_id").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                body_markdown: row.try_get("body_markdown").map_err(ser)?,
                generated_at: row.try_get("generated_at").map_err(ser)?,
            })
        })
        .transpose()
    }
}
