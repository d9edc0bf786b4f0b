pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::database::local_state::{LocalStateFile, QUIZ_STATE_KEY};
use crate::error::Result;
use crate::services::{
    ai_service::{AIService, ContentGenerator},
    gemini_service::GeminiService,
    quiz_store::QuizStore,
    storage_service::{storage_from_config, ObjectStorage},
    upload_service::UploadService,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub quiz_store: QuizStore,
    pub upload_service: UploadService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Production wiring: Gemini for generation, storage per configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs + 30))
            .build()?;

        let generator = Arc::new(GeminiService::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            http_client.clone(),
        ));
        let storage = storage_from_config(config, http_client)?;

        Ok(Self::from_parts(config, generator, storage))
    }

    /// Wires the state around the given external collaborators.
    pub fn from_parts(
        config: &Config,
        generator: Arc<dyn ContentGenerator>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let quiz_store = QuizStore::load(LocalStateFile::new(&config.state_dir, QUIZ_STATE_KEY));
        let ai_service = AIService::new(
            generator,
            Duration::from_secs(config.generation_timeout_secs),
        );
        let upload_service = UploadService::new(storage, ai_service, quiz_store.clone());

        Self {
            quiz_store,
            upload_service,
            jwt_secret: Arc::from(config.auth_jwt_secret.as_str()),
        }
    }
}
