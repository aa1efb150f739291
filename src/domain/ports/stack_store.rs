use async_trait::async_trait;

use crate::domain::{errors::DomainError, NewStack, Stack};

/// Relational storage for flashcard stacks and their cards.
#[async_trait]
pub trait StackStore: Send + Sync {
    async fn create(&self, stack: &NewStack) -> Result<Stack, DomainError>;
    async fn list(&self) -> Result<Vec<Stack>, DomainError>;
    async fn get(&self, id: i64) -> Result<Option<Stack>, DomainError>;
    /// Updates name, description and the listed cards. `None` if the stack is gone.
    async fn update(&self, stack: &Stack) -> Result<Option<Stack>, DomainError>;
    /// Deletes the stack and its cards. `false` if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
}
