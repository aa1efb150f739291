use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_agent::api::{create_router, AppState};
use study_agent::application::{
    CalendarAssistant, CalendarTools, DocumentService, FlashcardService, RagService,
    StudyInstructions, StudyService,
};
use study_agent::domain::{
    ports::{ConversationStore, LlmService, VectorStore},
    TextSplitter,
};
use study_agent::infrastructure::{
    gemini_client, persistence, AppConfig, CalendarAgent, GeminiLlm, GenerateContentClient,
    GoogleCalendarClient, InMemoryConversationStore, InMemoryVectorStore, RedisConversationStore,
    SqliteStackStore, TextEmbedding,
};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "study_agent=debug,api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app_config = AppConfig::load()?;
    let config = &app_config.config;
    let prompts = &app_config.prompts;

    let gemini = gemini_client(config.llm.require_api_key()?)?;
    let embedding = Arc::new(TextEmbedding::from_config(gemini.clone(), &config.embedding));
    let llm: Arc<dyn LlmService> = Arc::new(GeminiLlm::from_config(gemini.clone(), &config.llm));
    let splitter = TextSplitter::new(config.rag.chunk_size, config.rag.chunk_overlap);
    info!(
        chunk_size = splitter.chunk_size(),
        chunk_overlap = splitter.chunk_overlap(),
        "text splitter configured"
    );

    let rag = Arc::new(
        RagService::new(
            embedding.clone(),
            Arc::new(InMemoryVectorStore::new()),
            llm.clone(),
            config.rag.top_k,
        )
        .with_template(prompts.rag.answer.clone()),
    );
    let documents = Arc::new(DocumentService::new(rag.clone(), splitter.clone()));

    let stack_store = SqliteStackStore::connect(&config.database_url).await?;
    let db = stack_store.pool().clone();
    info!(database = %config.database_url, "SQLite ready");

    let flashcards = Arc::new(FlashcardService::new(
        embedding,
        llm,
        Arc::new(stack_store),
        || Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>,
        splitter,
        config.rag.flashcard_top_k,
        prompts.flashcards.generate.clone(),
    ));

    let study = Arc::new(StudyService::new(
        Arc::new(GenerateContentClient::from_config(&config.llm)?),
        StudyInstructions::from(&prompts.study),
    ));

    let redis_pool = match &config.redis_url {
        Some(url) => {
            let pool = persistence::create_pool(url)?;
            info!("Redis pool initialized");
            Some(pool)
        }
        None => None,
    };
    let memory: Arc<dyn ConversationStore> = match &redis_pool {
        Some(pool) => Arc::new(RedisConversationStore::new(pool.clone())),
        None => Arc::new(InMemoryConversationStore::new()),
    };

    let timezone = config.calendar.timezone;
    let calendar_tools = Arc::new(CalendarTools::new(
        Arc::new(GoogleCalendarClient::from_config(&config.calendar)),
        timezone,
    ));
    let agent = CalendarAgent::new(gemini, calendar_tools, memory, &app_config);
    let calendar = Arc::new(CalendarAssistant::new(Arc::new(agent), timezone));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(app_config),
        documents,
        rag,
        flashcards,
        study,
        calendar,
        db,
        redis_pool,
    };
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
