use chrono::{DateTime, Utc};
use exam_core::model::{AnswerRecord, Attempt, AttemptStatus, TestId, UserId};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{
    conn, map_attempt_row, test_id_to_i64, to_json, user_id_to_i64, usize_to_i64,
};
use crate::repository::{AttemptRepository, StorageError};

const SELECT_ATTEMPT: &str = r"
    SELECT user_id, test_id, category, selected_length, presentation_order, option_order,
           answers, current_position, finished, exam_mode, updated_at
    FROM attempts
    WHERE user_id = ?1 AND test_id = ?2
";

async fn load_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    test_id: i64,
) -> Result<Attempt, StorageError> {
    let row = sqlx::query(SELECT_ATTEMPT)
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;
    map_attempt_row(&row)
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn get_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        status: AttemptStatus,
    ) -> Result<Option<Attempt>, StorageError> {
        let row = sqlx::query(SELECT_ATTEMPT)
            .bind(user_id_to_i64(user_id)?)
            .bind(test_id_to_i64(test_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let attempt = map_attempt_row(&row)?;
                Ok(status.matches(attempt.is_finished()).then_some(attempt))
            }
            None => Ok(None),
        }
    }

    async fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO attempts (
                user_id, test_id, category, selected_length, presentation_order, option_order,
                answers, current_position, finished, exam_mode, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id, test_id) DO UPDATE SET
                category = excluded.category,
                selected_length = excluded.selected_length,
                presentation_order = excluded.presentation_order,
                option_order = excluded.option_order,
                answers = excluded.answers,
                current_position = excluded.current_position,
                finished = excluded.finished,
                exam_mode = excluded.exam_mode,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id_to_i64(attempt.user_id())?)
        .bind(test_id_to_i64(attempt.test_id())?)
        .bind(attempt.category().as_str())
        .bind(usize_to_i64("selected_length", attempt.selected_length())?)
        .bind(to_json(attempt.presentation_order())?)
        .bind(to_json(attempt.option_order())?)
        .bind(to_json(attempt.answers())?)
        .bind(usize_to_i64("current_position", attempt.current_position())?)
        .bind(i64::from(attempt.is_finished()))
        .bind(i64::from(attempt.is_exam_mode()))
        .bind(attempt.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn record_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        record: &AnswerRecord,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let user = user_id_to_i64(user_id)?;
        let test = test_id_to_i64(test_id)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut attempt = load_in_tx(&mut tx, user, test).await?;
        attempt.upsert_answer(*record);

        sqlx::query(
            "UPDATE attempts SET answers = ?1, updated_at = ?2 WHERE user_id = ?3 AND test_id = ?4",
        )
        .bind(to_json(attempt.answers())?)
        .bind(at)
        .bind(user)
        .bind(test)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn update_position(
        &self,
        user_id: UserId,
        test_id: TestId,
        position: usize,
        finished: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let user = user_id_to_i64(user_id)?;
        let test = test_id_to_i64(test_id)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut attempt = load_in_tx(&mut tx, user, test).await?;
        attempt
            .set_position(position)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
            UPDATE attempts
            SET current_position = ?1,
                finished = MAX(finished, ?2),
                updated_at = ?3
            WHERE user_id = ?4 AND test_id = ?5
            ",
        )
        .bind(usize_to_i64("current_position", attempt.current_position())?)
        .bind(i64::from(finished))
        .bind(at)
        .bind(user)
        .bind(test)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
