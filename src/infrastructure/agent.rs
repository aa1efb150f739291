use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::gemini;
use std::sync::Arc;
use std::time::Duration;

use crate::application::CalendarTools;
use crate::domain::{
    ports::{ConversationStore, ToolAgent},
    prompt_with_history, DomainError, Message,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::tools::calendar_toolset;

/// Single shared conversation; the calendar endpoint has no session id.
const CONVERSATION_ID: &str = "calendar";

/// Gemini agent wired with the calendar tools and a bounded conversation memory.
pub struct CalendarAgent {
    client: gemini::Client,
    model: String,
    temperature: f64,
    system_prompt: String,
    tools: Arc<CalendarTools>,
    memory: Arc<dyn ConversationStore>,
    memory_window: usize,
    max_turns: usize,
    timeout: Duration,
}

impl CalendarAgent {
    pub fn new(
        client: gemini::Client,
        tools: Arc<CalendarTools>,
        memory: Arc<dyn ConversationStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            client,
            model: config.config.llm.model.clone(),
            temperature: config.config.llm.temperature,
            system_prompt: config.prompts.agent.system.clone(),
            tools,
            memory,
            memory_window: config.config.agent.memory_window,
            max_turns: config.config.agent.max_turns,
            timeout: Duration::from_secs(config.config.llm.timeout_seconds),
        }
    }
}

#[async_trait]
impl ToolAgent for CalendarAgent {
    async fn run(&self, prompt: &str) -> Result<String, DomainError> {
        let history = self.memory.history(CONVERSATION_ID).await?;
        let full_prompt = prompt_with_history(prompt, &history);

        let (day, year, local_time, slot, schedule, delete, events) =
            calendar_toolset(self.tools.clone());
        let agent = self
            .client
            .agent(&self.model)
            .preamble(&self.system_prompt)
            .temperature(self.temperature)
            .tool(day)
            .tool(year)
            .tool(local_time)
            .tool(slot)
            .tool(schedule)
            .tool(delete)
            .tool(events)
            .build();

        tracing::debug!(
            history = history.len(),
            max_turns = self.max_turns,
            "running calendar agent"
        );

        let answer = tokio::time::timeout(
            self.timeout,
            agent.prompt(full_prompt.as_str()).multi_turn(self.max_turns),
        )
        .await
        .map_err(|_| DomainError::timeout("Agent execution timed out"))?
        .map_err(|e| DomainError::external(format!("Agent failed: {e}")))?;

        self.memory
            .append(
                CONVERSATION_ID,
                &[Message::user(prompt), Message::assistant(answer.clone())],
                self.memory_window,
            )
            .await?;

        Ok(answer)
    }
}
