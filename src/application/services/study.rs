use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::{ports::LlmService, DomainError};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please retry in 60 minutes.";

/// What to do with a single uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyAction {
    SummarizeParagraph,
    SummarizeBullets,
    ListConcepts,
    Quiz,
}

impl StudyAction {
    /// Unknown actions fall back to a quiz.
    pub fn parse(action: &str) -> Self {
        match action.trim() {
            "summarize-paragraph" => Self::SummarizeParagraph,
            "summarize-bullets" => Self::SummarizeBullets,
            "list-concepts" => Self::ListConcepts,
            _ => Self::Quiz,
        }
    }
}

/// Instruction text per action.
#[derive(Debug, Clone)]
pub struct StudyInstructions {
    pub summarize_paragraph: String,
    pub summarize_bullets: String,
    pub list_concepts: String,
    pub quiz: String,
}

impl StudyInstructions {
    pub fn for_action(&self, action: StudyAction) -> &str {
        match action {
            StudyAction::SummarizeParagraph => &self.summarize_paragraph,
            StudyAction::SummarizeBullets => &self.summarize_bullets,
            StudyAction::ListConcepts => &self.list_concepts,
            StudyAction::Quiz => &self.quiz,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StudyOutcome {
    Response { response: String },
    Error { error: String },
}

pub struct StudyService {
    llm: Arc<dyn LlmService>,
    instructions: StudyInstructions,
}

impl StudyService {
    pub fn new(llm: Arc<dyn LlmService>, instructions: StudyInstructions) -> Self {
        Self { llm, instructions }
    }

    pub fn build_prompt(&self, text: &str, action: StudyAction) -> String {
        format!(
            "{}\n\nUser Question: {}",
            text,
            self.instructions.for_action(action)
        )
    }

    /// Runs the action. Upstream failures are reported in the outcome rather
    /// than as errors; an upstream rate limit becomes a fixed retry message.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn run(&self, text: &str, action: StudyAction) -> StudyOutcome {
        let prompt = self.build_prompt(text, action);

        match self.llm.complete(&prompt).await {
            Ok(response) => StudyOutcome::Response { response },
            Err(DomainError::RateLimited(_)) => {
                tracing::warn!("generation rate limited");
                StudyOutcome::Response {
                    response: RATE_LIMITED_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "study action failed");
                StudyOutcome::Error {
                    error: e.to_string(),
                }
            }
        }
    }
}
