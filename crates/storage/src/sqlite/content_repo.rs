use exam_core::model::{Category, Question, RewardRate, Test, TestId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, from_json, i64_to_u32, i64_to_usize, question_id_from_i64, question_id_to_i64, ser,
    test_id_to_i64, to_json, usize_to_i64,
};
use crate::repository::{ContentRepository, StorageError};

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn upsert_test(&self, test: &Test) -> Result<(), StorageError> {
        let category = test.category().as_str().to_string();
        let test_id = test_id_to_i64(test.id())?;
        let rate = test.reward_rate();

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO tests (category, id, reward_xp, reward_coins)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(category, id) DO UPDATE SET
                reward_xp = excluded.reward_xp,
                reward_coins = excluded.reward_coins
            ",
        )
        .bind(&category)
        .bind(test_id)
        .bind(i64::from(rate.xp))
        .bind(i64::from(rate.coins))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM questions WHERE category = ?1 AND test_id = ?2")
            .bind(&category)
            .bind(test_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in test.questions().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO questions (
                    category, test_id, position, id, prompt, options,
                    correct_option_index, explanation, exam_tip
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(&category)
            .bind(test_id)
            .bind(usize_to_i64("position", position)?)
            .bind(question_id_to_i64(question.id())?)
            .bind(question.prompt())
            .bind(to_json(question.options())?)
            .bind(usize_to_i64(
                "correct_option_index",
                question.correct_option_index(),
            )?)
            .bind(question.explanation())
            .bind(question.exam_tip())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_test(
        &self,
        category: &Category,
        id: TestId,
    ) -> Result<Option<Test>, StorageError> {
        let test_id = test_id_to_i64(id)?;

        let Some(row) = sqlx::query(
            "SELECT reward_xp, reward_coins FROM tests WHERE category = ?1 AND id = ?2",
        )
        .bind(category.as_str())
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let reward_rate = RewardRate::new(
            i64_to_u32("reward_xp", row.try_get::<i64, _>("reward_xp").map_err(ser)?)?,
            i64_to_u32(
                "reward_coins",
                row.try_get::<i64, _>("reward_coins").map_err(ser)?,
            )?,
        );

        let rows = sqlx::query(
            r"
            SELECT id, prompt, options, correct_option_index, explanation, exam_tip
            FROM questions
            WHERE category = ?1 AND test_id = ?2
            ORDER BY position ASC
            ",
        )
        .bind(category.as_str())
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let options: Vec<String> =
                from_json("options", &row.try_get::<String, _>("options").map_err(ser)?)?;
            let question = Question::new(
                question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                row.try_get::<String, _>("prompt").map_err(ser)?,
                options,
                i64_to_usize(
                    "correct_option_index",
                    row.try_get::<i64, _>("correct_option_index").map_err(ser)?,
                )?,
            )
            .map_err(ser)?
            .with_explanation(row.try_get::<String, _>("explanation").map_err(ser)?)
            .with_exam_tip(row.try_get::<String, _>("exam_tip").map_err(ser)?);
            questions.push(question);
        }

        Test::new(id, category.clone(), questions, reward_rate)
            .map(Some)
            .map_err(ser)
    }
}
