use chrono::Utc;
use exam_core::model::{AccountLedger, AwardEvent, QuestionId, RewardRate, TestId, UserId};
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, question_id_to_i64, ser, test_id_to_i64, user_id_to_i64};
use crate::repository::{AwardReceipt, LedgerRepository, StorageError};

fn balance_from_columns(xp: i64, coins: i64) -> Result<AccountLedger, StorageError> {
    let xp = u64::try_from(xp)
        .map_err(|_| StorageError::Serialization(format!("invalid xp: {xp}")))?;
    let coins = u64::try_from(coins)
        .map_err(|_| StorageError::Serialization(format!("invalid coins: {coins}")))?;
    Ok(AccountLedger::from_persisted(xp, coins))
}

async fn add_to_account(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    amount: RewardRate,
) -> Result<AccountLedger, StorageError> {
    sqlx::query(
        r"
        INSERT INTO accounts (user_id, xp, coins)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(user_id) DO UPDATE SET
            xp = xp + excluded.xp,
            coins = coins + excluded.coins
        ",
    )
    .bind(user_id)
    .bind(i64::from(amount.xp))
    .bind(i64::from(amount.coins))
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    read_balance(tx, user_id).await
}

async fn read_balance(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
) -> Result<AccountLedger, StorageError> {
    let row = sqlx::query("SELECT xp, coins FROM accounts WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?;
    match row {
        Some(row) => balance_from_columns(
            row.try_get("xp").map_err(ser)?,
            row.try_get("coins").map_err(ser)?,
        ),
        None => Ok(AccountLedger::default()),
    }
}

#[async_trait::async_trait]
impl LedgerRepository for SqliteRepository {
    async fn get_account(&self, user_id: UserId) -> Result<AccountLedger, StorageError> {
        let row = sqlx::query("SELECT xp, coins FROM accounts WHERE user_id = ?1")
            .bind(user_id_to_i64(user_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        match row {
            Some(row) => balance_from_columns(
                row.try_get("xp").map_err(ser)?,
                row.try_get("coins").map_err(ser)?,
            ),
            None => Ok(AccountLedger::default()),
        }
    }

    async fn has_award(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM awards WHERE user_id = ?1 AND test_id = ?2 AND question_id = ?3",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(test_id_to_i64(test_id)?)
        .bind(question_id_to_i64(question_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn award_correct_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
        amount: RewardRate,
    ) -> Result<AwardReceipt, StorageError> {
        let user = user_id_to_i64(user_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO awards (user_id, test_id, question_id, xp, coins, awarded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, test_id, question_id) DO NOTHING
            ",
        )
        .bind(user)
        .bind(test_id_to_i64(test_id)?)
        .bind(question_id_to_i64(question_id)?)
        .bind(i64::from(amount.xp))
        .bind(i64::from(amount.coins))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected();

        let applied = inserted == 1;
        let balance = if applied {
            add_to_account(&mut tx, user, amount).await?
        } else {
            read_balance(&mut tx, user).await?
        };

        tx.commit().await.map_err(conn)?;
        Ok(AwardReceipt { applied, balance })
    }

    async fn credit(
        &self,
        user_id: UserId,
        event: &AwardEvent,
    ) -> Result<AccountLedger, StorageError> {
        let user = user_id_to_i64(user_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let balance = add_to_account(&mut tx, user, event.amount).await?;
        tx.commit().await.map_err(conn)?;
        Ok(balance)
    }
}
