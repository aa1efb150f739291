//! Router-level tests: real handlers, SQLite in memory, hosted models mocked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use study_agent::api::{create_router, AppState};
use study_agent::application::{
    CalendarAssistant, DocumentService, FlashcardService, RagService, StudyInstructions,
    StudyService,
};
use study_agent::domain::{
    ports::{EmbeddingService, LlmService, ToolAgent, VectorStore},
    DomainError, Embedding, TextSplitter,
};
use study_agent::infrastructure::{AppConfig, InMemoryVectorStore, SqliteStackStore};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct VowelEmbedding;

#[async_trait]
impl EmbeddingService for VowelEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let lower = text.to_lowercase();
        let counts = "aeiou"
            .chars()
            .map(|v| lower.matches(v).count() as f32 + 0.1)
            .collect();
        Ok(Embedding::new(counts))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        5
    }
}

enum Reply {
    Echo,
    Fixed(String),
    RateLimited,
}

struct FakeLlm {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmService for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Echo => Ok(prompt.to_string()),
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::RateLimited => Err(DomainError::rate_limited("429")),
        }
    }
}

struct FakeAgent {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolAgent for FakeAgent {
    async fn run(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            Err(DomainError::external("calendar unavailable"))
        } else {
            Ok("Your first meeting is with Jen.".to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    router: axum::Router,
    llm: Arc<FakeLlm>,
    agent: Arc<FakeAgent>,
}

async fn setup(reply: Reply, agent_fails: bool) -> Harness {
    let app_config = AppConfig::with_defaults().unwrap();
    let llm = FakeLlm::new(reply);
    let embedding: Arc<dyn EmbeddingService> = Arc::new(VowelEmbedding);
    let splitter = TextSplitter::new(200, 40);

    let rag = Arc::new(
        RagService::new(
            embedding.clone(),
            Arc::new(InMemoryVectorStore::new()),
            llm.clone(),
            2,
        )
        .with_template(app_config.prompts.rag.answer.clone()),
    );
    let documents = Arc::new(DocumentService::new(rag.clone(), splitter.clone()));

    let store = SqliteStackStore::in_memory().await.unwrap();
    let db = store.pool().clone();
    let flashcards = Arc::new(FlashcardService::new(
        embedding,
        llm.clone(),
        Arc::new(store),
        || Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>,
        splitter,
        4,
        app_config.prompts.flashcards.generate.clone(),
    ));
    let study = Arc::new(StudyService::new(
        llm.clone(),
        StudyInstructions::from(&app_config.prompts.study),
    ));

    let agent = Arc::new(FakeAgent {
        fail: agent_fails,
        prompts: Mutex::new(Vec::new()),
    });
    let calendar = Arc::new(CalendarAssistant::new(
        agent.clone(),
        app_config.config.calendar.timezone,
    ));

    let state = AppState {
        config: Arc::new(app_config),
        documents,
        rag,
        flashcards,
        study,
        calendar,
        db,
        redis_pool: None,
    };

    Harness {
        router: create_router(state),
        llm,
        agent,
    }
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const BOUNDARY: &str = "study-agent-test-boundary";

/// `files` are (field, file name, content type, contents); `fields` are plain text parts.
fn multipart_request(
    uri: &str,
    files: &[(&str, &str, &str, &str)],
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = String::new();
    for (field, name, content_type, contents) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n{contents}\r\n"
        ));
    }
    for (field, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, body)
}

const STACK_REPLY: &str = r#"```json
{"name": "Cell Biology", "description": "Organelles and their jobs",
 "qasets": [{"question": "What makes ATP?", "answer": "Mitochondria"},
            {"question": "Where is DNA stored?", "answer": "Nucleus"}]}
```"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_and_readiness() {
    let h = setup(Reply::Echo, false).await;

    let (status, body) = send(&h.router, json_request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&h.router, json_request(Method::GET, "/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
    assert_eq!(body["redis"], "disabled");
}

#[tokio::test]
async fn upload_then_ask() {
    let h = setup(Reply::Echo, false).await;

    let request = multipart_request(
        "/upload",
        &[
            ("files", "bio.txt", "text/plain", "Mitochondria produce ATP for the cell."),
            ("files", "geo.txt", "text/plain", "Rivers erode valleys over time."),
        ],
        &[],
    );
    let (status, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["message"],
        json!([
            "Loaded 1 document chunks from bio.txt",
            "Loaded 1 document chunks from geo.txt"
        ])
    );

    let (status, body) = send(
        &h.router,
        json_request(
            Method::POST,
            "/upload/ask",
            Some(json!({"question": "What produces ATP?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("Mitochondria produce ATP"));
    assert!(answer.contains("Question: What produces ATP?"));
}

#[tokio::test]
async fn upload_requires_a_file() {
    let h = setup(Reply::Echo, false).await;

    let (status, body) = send(&h.router, multipart_request("/upload", &[], &[("note", "x")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn flashcard_lifecycle() {
    let h = setup(Reply::Fixed(STACK_REPLY.to_string()), false).await;

    let request = multipart_request(
        "/create-flash-cards",
        &[("file", "cells.txt", "text/plain", "Mitochondria make ATP. The nucleus stores DNA.")],
        &[],
    );
    let (status, created) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Cell Biology");
    assert_eq!(created["qasets"].as_array().unwrap().len(), 2);
    let id = created["id"].as_i64().unwrap();

    let prompt = h.llm.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Mitochondria make ATP"));

    let (status, listed) =
        send(&h.router, json_request(Method::GET, "/get-flash-cards", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created.clone()]));

    let mut edited = created.clone();
    edited["name"] = json!("Cells");
    edited["qasets"][0]["answer"] = json!("The mitochondrion");
    let (status, updated) = send(
        &h.router,
        json_request(Method::PATCH, "/edit-flash-cards", Some(edited)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Cells");
    assert_eq!(updated["qasets"][0]["answer"], "The mitochondrion");
    assert_eq!(updated["qasets"][1]["answer"], "Nucleus");

    let uri = format!("/get-flash-cards/{id}");
    let (status, fetched) = send(&h.router, json_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (status, body) = send(
        &h.router,
        json_request(Method::DELETE, &format!("/delete-flash-cards/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Stack {id} deleted"));

    let (status, _) = send(&h.router, json_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &h.router,
        json_request(Method::DELETE, &format!("/delete-flash-cards/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn flashcards_reject_unusable_reply() {
    let h = setup(Reply::Fixed("I cannot help with that.".to_string()), false).await;

    let request = multipart_request(
        "/create-flash-cards",
        &[("file", "a.txt", "text/plain", "Some study text.")],
        &[],
    );
    let (status, _) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send(&h.router, json_request(Method::GET, "/get-flash-cards", None)).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn edit_missing_stack_is_not_found() {
    let h = setup(Reply::Echo, false).await;

    let (status, _) = send(
        &h.router,
        json_request(
            Method::PATCH,
            "/edit-flash-cards",
            Some(json!({"id": 7, "name": "Ghost", "description": "", "qasets": []})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn calendar_question_is_augmented() {
    let h = setup(Reply::Echo, false).await;

    let (status, body) = send(
        &h.router,
        json_request(
            Method::POST,
            "/calendar",
            Some(json!({"question": "Who is my first meeting with tomorrow?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Your first meeting is with Jen.");

    let prompt = h.agent.prompts.lock().unwrap()[0].clone();
    assert!(prompt.starts_with(
        "Question: Who is my first meeting with tomorrow?. Additional information: \
         timezone: America/New_York, the current date: "
    ));
}

#[tokio::test]
async fn calendar_failure_is_reported_in_body() {
    let h = setup(Reply::Echo, true).await;

    let (status, body) = send(
        &h.router,
        json_request(Method::POST, "/calendar", Some(json!({"question": "Am I free at 3pm?"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "External service error: calendar unavailable");
}

#[tokio::test]
async fn study_action_builds_prompt() {
    let h = setup(Reply::Echo, false).await;

    let request = multipart_request(
        "/chat",
        &[("file", "notes.txt", "text/plain", "Photosynthesis converts light.")],
        &[("action", "summarize-paragraph")],
    );
    let (status, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "Photosynthesis converts light.\n\nUser Question: Summarize the text as a paragraph."
    );
}

#[tokio::test]
async fn study_action_rate_limit_message() {
    let h = setup(Reply::RateLimited, false).await;

    let request = multipart_request(
        "/chat",
        &[("file", "notes.txt", "text/plain", "Anything.")],
        &[("action", "quiz")],
    );
    let (status, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "Too many requests. Please retry in 60 minutes."
    );
}
