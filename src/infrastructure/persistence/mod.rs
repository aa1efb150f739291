mod memory;
mod redis;
mod sqlite;

pub use self::redis::{create_pool, ping, RedisConversationStore, RedisPool};
pub use memory::InMemoryConversationStore;
pub use sqlite::SqliteStackStore;
