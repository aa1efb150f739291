use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::{ports::StackStore, DomainError, NewStack, QaSet, Stack};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stacks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS qasets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        stack_id INTEGER NOT NULL,
        FOREIGN KEY (stack_id) REFERENCES stacks(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_stacks_name ON stacks(name)",
    "CREATE INDEX IF NOT EXISTS idx_stacks_description ON stacks(description)",
    "CREATE INDEX IF NOT EXISTS idx_qasets_question ON qasets(question)",
    "CREATE INDEX IF NOT EXISTS idx_qasets_answer ON qasets(answer)",
    "CREATE INDEX IF NOT EXISTS idx_qasets_stack_id ON qasets(stack_id)",
];

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::internal(format!("database error: {e}"))
}

/// Flashcard stacks in SQLite.
#[derive(Clone)]
pub struct SqliteStackStore {
    pool: SqlitePool,
}

impl SqliteStackStore {
    /// Opens (creating if missing) the database at `database_url` and applies the schema.
    pub async fn connect(database_url: &str) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error)?
            .foreign_keys(true);

        // Every connection to :memory: is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DomainError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), DomainError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        tracing::debug!("sqlite schema ready");
        Ok(())
    }

    async fn cards_for(&self, stack_id: i64) -> Result<Vec<QaSet>, DomainError> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id, question, answer FROM qasets WHERE stack_id = ? ORDER BY id",
        )
        .bind(stack_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, question, answer)| QaSet {
                id,
                question,
                answer,
            })
            .collect())
    }
}

#[async_trait]
impl StackStore for SqliteStackStore {
    async fn create(&self, stack: &NewStack) -> Result<Stack, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let stack_id = sqlx::query("INSERT INTO stacks (name, description) VALUES (?, ?)")
            .bind(&stack.name)
            .bind(&stack.description)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .last_insert_rowid();

        let mut qasets = Vec::with_capacity(stack.qasets.len());
        for card in &stack.qasets {
            let id = sqlx::query("INSERT INTO qasets (question, answer, stack_id) VALUES (?, ?, ?)")
                .bind(&card.question)
                .bind(&card.answer)
                .bind(stack_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?
                .last_insert_rowid();

            qasets.push(QaSet {
                id,
                question: card.question.clone(),
                answer: card.answer.clone(),
            });
        }

        tx.commit().await.map_err(db_error)?;

        Ok(Stack {
            id: stack_id,
            name: stack.name.clone(),
            description: stack.description.clone(),
            qasets,
        })
    }

    async fn list(&self) -> Result<Vec<Stack>, DomainError> {
        let stacks: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, description FROM stacks ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        let cards: Vec<(i64, i64, String, String)> = sqlx::query_as(
            "SELECT stack_id, id, question, answer FROM qasets ORDER BY stack_id, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut by_stack: HashMap<i64, Vec<QaSet>> = HashMap::new();
        for (stack_id, id, question, answer) in cards {
            by_stack.entry(stack_id).or_default().push(QaSet {
                id,
                question,
                answer,
            });
        }

        Ok(stacks
            .into_iter()
            .map(|(id, name, description)| Stack {
                id,
                name,
                description,
                qasets: by_stack.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Stack>, DomainError> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, description FROM stacks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        let Some((id, name, description)) = row else {
            return Ok(None);
        };

        Ok(Some(Stack {
            id,
            name,
            description,
            qasets: self.cards_for(id).await?,
        }))
    }

    async fn update(&self, stack: &Stack) -> Result<Option<Stack>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE stacks SET name = ?, description = ? WHERE id = ?")
            .bind(&stack.name)
            .bind(&stack.description)
            .bind(stack.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Ok(None);
        }

        // Cards that belong to another stack are ignored.
        for card in &stack.qasets {
            sqlx::query("UPDATE qasets SET question = ?, answer = ? WHERE id = ? AND stack_id = ?")
                .bind(&card.question)
                .bind(&card.answer)
                .bind(card.id)
                .bind(stack.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        self.get(stack.id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM stacks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        Ok(deleted > 0)
    }
}
