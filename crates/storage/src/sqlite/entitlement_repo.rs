use exam_core::model::{Entitlement, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_entitlement_row, user_id_to_i64};
use crate::repository::{EntitlementRepository, StorageError};

#[async_trait::async_trait]
impl EntitlementRepository for SqliteRepository {
    async fn get_entitlement(
        &self,
        user_id: UserId,
    ) -> Result<Option<Entitlement>, StorageError> {
        let row = sqlx::query(
            "SELECT subscribed, remaining_free_questions FROM entitlements WHERE user_id = ?1",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_entitlement_row).transpose()
    }

    async fn save_entitlement(
        &self,
        user_id: UserId,
        entitlement: &Entitlement,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO entitlements (user_id, subscribed, remaining_free_questions)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                subscribed = excluded.subscribed,
                remaining_free_questions = excluded.remaining_free_questions
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(i64::from(entitlement.is_subscribed()))
        .bind(i64::from(entitlement.remaining_free_questions()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn consume_free_question(&self, user_id: UserId) -> Result<Entitlement, StorageError> {
        let user = user_id_to_i64(user_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            UPDATE entitlements
            SET remaining_free_questions = MAX(remaining_free_questions - 1, 0)
            WHERE user_id = ?1 AND subscribed = 0
            ",
        )
        .bind(user)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            "SELECT subscribed, remaining_free_questions FROM entitlements WHERE user_id = ?1",
        )
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let entitlement = map_entitlement_row(&row)?;
        tx.commit().await.map_err(conn)?;
        Ok(entitlement)
    }
}
