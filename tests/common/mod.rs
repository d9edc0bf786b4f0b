#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use bytes::Bytes;
use jsonwebtoken::{encode, EncodingKey, Header};
use pdf_quiz_backend::{
    config::{Config, LogFormat, StorageBackend},
    error::{Error, Result},
    middleware::auth::Claims,
    routes,
    services::{ai_service::ContentGenerator, storage_service::ObjectStorage},
    AppState,
};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "test_secret_key";
pub const BOUNDARY: &str = "quiz-test-boundary";

pub fn test_config(state_dir: &TempDir) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        gemini_api_key: "test-key".into(),
        gemini_model: "gemini-1.5-pro".into(),
        gemini_base_url: "http://localhost:9".into(),
        generation_timeout_secs: 5,
        auth_jwt_secret: JWT_SECRET.into(),
        storage_backend: StorageBackend::Local,
        storage_bucket: "talktopdf".into(),
        supabase_url: None,
        supabase_service_key: None,
        uploads_dir: state_dir.path().join("uploads"),
        public_base_url: "http://localhost:8080".into(),
        state_dir: state_dir.path().join("state"),
        public_rps: 1000,
        max_upload_bytes: 10 * 1024 * 1024,
        log_format: LogFormat::Text,
    }
}

/// Returns a canned reply for every prompt and records the prompts.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    pub reply: Arc<Mutex<String>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: impl Into<String>) -> Self {
        let generator = Self::default();
        *generator.reply.lock().unwrap() = reply.into();
        generator
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate_content(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.lock().unwrap().clone())
    }
}

/// Keeps uploads in memory; can be told to fail.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    pub objects: Arc<Mutex<Vec<(String, Bytes, String)>>>,
    pub fail_with: Option<String>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        if let Some(msg) = &self.fail_with {
            return Err(Error::Storage(msg.clone()));
        }
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://storage.test/public/{}", key)
    }
}

pub fn build_app(config: &Config, generator: ScriptedGenerator, storage: MemoryStorage) -> (Router, AppState) {
    let state = AppState::from_parts(config, Arc::new(generator), Arc::new(storage));
    (routes::api_router(state.clone(), config.public_rps), state)
}

pub fn bearer(user_id: &str) -> String {
    let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp,
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    if !content_type.is_empty() {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(auth: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/quiz/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn quiz_json(count: usize) -> String {
    let questions: Vec<serde_json::Value> = (0..count)
        .map(|i| match i % 3 {
            0 => serde_json::json!({
                "type": "mcq",
                "question": format!("Question {}", i),
                "options": ["Paris", "Rome", "Berlin"],
                "correctAnswer": "Paris",
                "explanation": "Paris is the capital of France."
            }),
            1 => serde_json::json!({
                "type": "tf",
                "question": format!("Question {}", i),
                "correctAnswer": "true",
                "explanation": "It is true."
            }),
            _ => serde_json::json!({
                "type": "fib",
                "question": format!("Question {} ___", i),
                "correctAnswer": "blank",
                "explanation": "Fill the blank."
            }),
        })
        .collect();
    serde_json::json!({ "questions": questions }).to_string()
}
