use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A persisted flashcard stack with its question/answer cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub qasets: Vec<QaSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaSet {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

/// A stack that has not been stored yet, as produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStack {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub qasets: Vec<NewQaSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQaSet {
    pub question: String,
    pub answer: String,
}

impl NewStack {
    /// Parses the model's reply into a stack.
    ///
    /// The model is asked for a bare JSON object but sometimes wraps it in a
    /// markdown fence or adds a sentence around it, so only the outermost
    /// `{ ... }` span is decoded.
    pub fn from_model_output(raw: &str) -> Result<Self, DomainError> {
        let start = raw.find('{');
        let end = raw.rfind('}');
        let json = match (start, end) {
            (Some(s), Some(e)) if s < e => &raw[s..=e],
            _ => return Err(DomainError::validation("model reply contains no JSON object")),
        };

        let stack: NewStack = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("invalid flashcard JSON: {e}")))?;
        stack.validate()?;
        Ok(stack)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("stack name must not be empty"));
        }
        if self.qasets.is_empty() {
            return Err(DomainError::validation("stack must contain at least one card"));
        }
        Ok(())
    }
}
