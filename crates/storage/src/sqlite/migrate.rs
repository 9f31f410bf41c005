use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates the content, attempt, ledger and entitlement tables.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS tests (
                    category TEXT NOT NULL,
                    id INTEGER NOT NULL,
                    reward_xp INTEGER NOT NULL CHECK (reward_xp >= 0),
                    reward_coins INTEGER NOT NULL CHECK (reward_coins >= 0),
                    PRIMARY KEY (category, id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    category TEXT NOT NULL,
                    test_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    id INTEGER NOT NULL,
                    prompt TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_option_index INTEGER NOT NULL CHECK (correct_option_index >= 0),
                    explanation TEXT NOT NULL DEFAULT '',
                    exam_tip TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (category, test_id, position),
                    UNIQUE (category, test_id, id),
                    FOREIGN KEY (category, test_id) REFERENCES tests(category, id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    user_id INTEGER NOT NULL,
                    test_id INTEGER NOT NULL,
                    category TEXT NOT NULL,
                    selected_length INTEGER NOT NULL CHECK (selected_length > 0),
                    presentation_order TEXT NOT NULL,
                    option_order TEXT NOT NULL,
                    answers TEXT NOT NULL,
                    current_position INTEGER NOT NULL CHECK (current_position >= 0),
                    finished INTEGER NOT NULL CHECK (finished IN (0, 1)),
                    exam_mode INTEGER NOT NULL CHECK (exam_mode IN (0, 1)),
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, test_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS accounts (
                    user_id INTEGER PRIMARY KEY,
                    xp INTEGER NOT NULL CHECK (xp >= 0),
                    coins INTEGER NOT NULL CHECK (coins >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS awards (
                    user_id INTEGER NOT NULL,
                    test_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    xp INTEGER NOT NULL CHECK (xp >= 0),
                    coins INTEGER NOT NULL CHECK (coins >= 0),
                    awarded_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, test_id, question_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS entitlements (
                    user_id INTEGER PRIMARY KEY,
                    subscribed INTEGER NOT NULL CHECK (subscribed IN (0, 1)),
                    remaining_free_questions INTEGER NOT NULL CHECK (remaining_free_questions >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_user_finished
                    ON attempts (user_id, finished);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
