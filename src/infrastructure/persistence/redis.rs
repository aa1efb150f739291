use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};

use crate::domain::{ports::ConversationStore, DomainError, Message};

pub type RedisPool = Pool;

/// Idle conversations expire after a day.
const CONVERSATION_TTL_SECONDS: i64 = 24 * 60 * 60;

pub fn create_pool(redis_url: &str) -> Result<RedisPool, DomainError> {
    Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| DomainError::internal(format!("redis pool: {e}")))
}

/// Issues `PING` on a pooled connection.
pub async fn ping(pool: &RedisPool) -> Result<(), DomainError> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| DomainError::external(format!("redis pool: {e}")))?;
    deadpool_redis::redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .map(|_| ())
        .map_err(|e| DomainError::external(format!("redis: {e}")))
}

fn conversation_key(conversation: &str) -> String {
    format!("conversation:{conversation}")
}

/// Conversation buffers as Redis lists of JSON-encoded messages.
#[derive(Clone)]
pub struct RedisConversationStore {
    pool: RedisPool,
}

impl RedisConversationStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, DomainError> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::external(format!("redis pool: {e}")))
    }
}

fn redis_error(e: deadpool_redis::redis::RedisError) -> DomainError {
    DomainError::external(format!("redis: {e}"))
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn history(&self, conversation: &str) -> Result<Vec<Message>, DomainError> {
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn
            .lrange(conversation_key(conversation), 0, -1)
            .await
            .map_err(redis_error)?;

        raw.iter()
            .map(|entry| {
                serde_json::from_str(entry)
                    .map_err(|e| DomainError::internal(format!("corrupt conversation entry: {e}")))
            })
            .collect()
    }

    async fn append(
        &self,
        conversation: &str,
        messages: &[Message],
        window: usize,
    ) -> Result<(), DomainError> {
        if messages.is_empty() {
            return Ok(());
        }

        let encoded = messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let key = conversation_key(conversation);
        let mut conn = self.conn().await?;

        conn.rpush::<_, _, ()>(&key, encoded)
            .await
            .map_err(redis_error)?;
        if window > 0 {
            conn.ltrim::<_, ()>(&key, -(window as isize), -1)
                .await
                .map_err(redis_error)?;
        }
        conn.expire::<_, ()>(&key, CONVERSATION_TTL_SECONDS)
            .await
            .map_err(redis_error)?;

        tracing::debug!(conversation, appended = messages.len(), "conversation stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_key() {
        assert_eq!(conversation_key("calendar"), "conversation:calendar");
    }
}
