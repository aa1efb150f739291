use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::application::StudyInstructions;
use crate::domain::PromptTemplate;

const BUNDLED_PROMPTS: &str = include_str!("../../config/prompts.yaml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {key}")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
    #[error("failed to read prompts from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse prompts: {0}")]
    Prompts(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub calendar: CalendarConfig,
    pub agent: AgentConfig,
    pub database_url: String,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
    pub api_base: String,
}

impl LlmConfig {
    /// The Gemini key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing {
                key: "GEMINI_API_KEY or GOOGLE_API_KEY",
            })
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub flashcard_top_k: usize,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub timezone: Tz,
    pub api_base: String,
    pub token_url: String,
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_turns: usize,
    pub memory_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 25 * 1024 * 1024,
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
            llm: LlmConfig {
                model: "gemini-2.0-flash".to_string(),
                temperature: 0.0,
                timeout_seconds: 120,
                api_key: None,
                api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            embedding: EmbeddingConfig {
                model: "text-embedding-004".to_string(),
                dimension: 768,
            },
            rag: RagConfig {
                top_k: 4,
                chunk_size: 1000,
                chunk_overlap: 200,
                flashcard_top_k: 8,
            },
            calendar: CalendarConfig {
                calendar_id: "primary".to_string(),
                timezone: chrono_tz::America::New_York,
                api_base: "https://www.googleapis.com/calendar/v3".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                access_token: None,
                client_id: None,
                client_secret: None,
                refresh_token: None,
            },
            agent: AgentConfig {
                max_turns: 5,
                memory_window: 20,
            },
            database_url: "sqlite://study_agent.db".to_string(),
            redis_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key lookup, falling back to defaults for
    /// missing or blank keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let d = Self::default();

        Ok(Self {
            server: ServerConfig {
                host: parse("SERVER_HOST", &d.server.host),
                port: parse_num(&get, "SERVER_PORT", d.server.port)?,
                max_upload_bytes: parse_num(&get, "MAX_UPLOAD_BYTES", d.server.max_upload_bytes)?,
            },
            cors: CorsConfig {
                allowed_origins: get("CORS_ALLOWED_ORIGINS")
                    .map(|v| {
                        v.split(',')
                            .map(|o| o.trim().to_string())
                            .filter(|o| !o.is_empty())
                            .collect()
                    })
                    .unwrap_or(d.cors.allowed_origins),
            },
            llm: LlmConfig {
                model: parse("LLM_MODEL", &d.llm.model),
                temperature: parse_num(&get, "LLM_TEMPERATURE", d.llm.temperature)?,
                timeout_seconds: parse_num(&get, "LLM_TIMEOUT_SECONDS", d.llm.timeout_seconds)?,
                api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
                api_base: parse("GEMINI_API_BASE", &d.llm.api_base),
            },
            embedding: EmbeddingConfig {
                model: parse("EMBEDDING_MODEL", &d.embedding.model),
                dimension: parse_num(&get, "EMBEDDING_DIMENSION", d.embedding.dimension)?,
            },
            rag: RagConfig {
                top_k: parse_num(&get, "RAG_TOP_K", d.rag.top_k)?,
                chunk_size: parse_num(&get, "CHUNK_SIZE", d.rag.chunk_size)?,
                chunk_overlap: parse_num(&get, "CHUNK_OVERLAP", d.rag.chunk_overlap)?,
                flashcard_top_k: parse_num(&get, "FLASHCARD_TOP_K", d.rag.flashcard_top_k)?,
            },
            calendar: CalendarConfig {
                calendar_id: parse("GOOGLE_CALENDAR_ID", &d.calendar.calendar_id),
                timezone: parse_num(&get, "CALENDAR_TIMEZONE", d.calendar.timezone)?,
                api_base: parse("GOOGLE_CALENDAR_API_BASE", &d.calendar.api_base),
                token_url: parse("GOOGLE_TOKEN_URL", &d.calendar.token_url),
                access_token: get("GOOGLE_ACCESS_TOKEN"),
                client_id: get("GOOGLE_CLIENT_ID"),
                client_secret: get("GOOGLE_CLIENT_SECRET"),
                refresh_token: get("GOOGLE_REFRESH_TOKEN"),
            },
            agent: AgentConfig {
                max_turns: parse_num(&get, "AGENT_MAX_TURNS", d.agent.max_turns)?,
                memory_window: parse_num(&get, "AGENT_MEMORY_WINDOW", d.agent.memory_window)?,
            },
            database_url: parse("DATABASE_URL", &d.database_url),
            redis_url: get("REDIS_URL"),
        })
    }
}

fn parse_num<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptsConfig {
    pub rag: RagPrompts,
    pub flashcards: FlashcardPrompts,
    pub agent: AgentPrompts,
    pub study: StudyPrompts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagPrompts {
    pub answer: PromptTemplate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardPrompts {
    pub generate: PromptTemplate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentPrompts {
    pub system: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudyPrompts {
    pub summarize_paragraph: String,
    pub summarize_bullets: String,
    pub list_concepts: String,
    pub quiz: String,
}

impl From<&StudyPrompts> for StudyInstructions {
    fn from(p: &StudyPrompts) -> Self {
        Self {
            summarize_paragraph: p.summarize_paragraph.clone(),
            summarize_bullets: p.summarize_bullets.clone(),
            list_concepts: p.list_concepts.clone(),
            quiz: p.quiz.clone(),
        }
    }
}

impl PromptsConfig {
    pub fn bundled() -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(BUNDLED_PROMPTS)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Environment config plus prompts from `PROMPTS_PATH`, or the bundled set.
    /// Fails when no Gemini key is configured.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::from_env()?;
        config.llm.require_api_key()?;
        let prompts = match std::env::var("PROMPTS_PATH") {
            Ok(path) if !path.trim().is_empty() => PromptsConfig::from_file(Path::new(&path))?,
            _ => PromptsConfig::bundled()?,
        };
        Ok(Self { config, prompts })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Ok(Self {
            config: Config::default(),
            prompts: PromptsConfig::bundled()?,
        })
    }
}
