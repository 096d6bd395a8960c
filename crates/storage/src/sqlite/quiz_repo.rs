use cognitia_core::model::{Question, Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{
    id_to_i64, map_question_row, map_quiz_row, quiz_id_from_i64, string_list_to_json, write_err,
};
use crate::repository::{NewQuizRecord, QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
            INSERT INTO quizzes (title, subject, grade_level, time_limit_minutes, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(quiz.title)
        .bind(quiz.subject)
        .bind(i64::from(quiz.grade_level))
        .bind(i64::from(quiz.time_limit_minutes))
        .bind(quiz.description)
        .bind(quiz.created_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        let quiz_id = res.last_insert_rowid();

        for question in quiz.questions {
            sqlx::query(
                r"
                INSERT INTO questions (quiz_id, prompt, kind, options, answer_key, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(quiz_id)
            .bind(question.prompt)
            .bind(question.kind.as_str())
            .bind(string_list_to_json(&question.options)?)
            .bind(question.answer_key)
            .bind(i64::from(question.position))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        quiz_id_from_i64(quiz_id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, subject, grade_level, time_limit_minutes, description, created_at
            FROM quizzes
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes(
        &self,
        subject: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Quiz>, StorageError> {
        let lim = i64::from(limit);
        let rows = if let Some(subject) = subject {
            sqlx::query(
                r"
                SELECT id, title, subject, grade_level, time_limit_minutes, description, created_at
                FROM quizzes
                WHERE subject = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2
                ",
            )
            .bind(subject)
            .bind(lim)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r"
                SELECT id, title, subject, grade_level, time_limit_minutes, description, created_at
                FROM quizzes
                ORDER BY created_at DESC, id DESC
                LIMIT ?1
                ",
            )
            .bind(lim)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, quiz_id, prompt, kind, options, answer_key, position
            FROM questions
            WHERE quiz_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
