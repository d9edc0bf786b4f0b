use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Supabase Storage REST API.
    Supabase,
    /// Files written under `uploads_dir` and served by this process.
    Local,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "local" => Ok(StorageBackend::Local),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout_secs: u64,
    pub auth_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub storage_bucket: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub uploads_dir: PathBuf,
    pub public_base_url: String,
    pub state_dir: PathBuf,
    pub public_rps: u32,
    pub max_upload_bytes: usize,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-1.5-pro"),
            gemini_base_url: get_env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            generation_timeout_secs: get_env_parse_or("GENERATION_TIMEOUT_SECS", 120)?,
            auth_jwt_secret: get_env("AUTH_JWT_SECRET")?,
            storage_backend: get_env_parse_or("STORAGE_BACKEND", StorageBackend::Local)?,
            storage_bucket: get_env_or("STORAGE_BUCKET", "talktopdf"),
            supabase_url: env::var("SUPABASE_URL").ok(),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY").ok(),
            uploads_dir: PathBuf::from(get_env_or("UPLOADS_DIR", "./uploads")),
            public_base_url: get_env_or("PUBLIC_BASE_URL", "http://localhost:8080"),
            state_dir: PathBuf::from(get_env_or("STATE_DIR", "./state")),
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Text)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that parsing alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.generation_timeout_secs == 0 {
            return Err(Error::Config(
                "GENERATION_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.storage_backend == StorageBackend::Supabase
            && (self.supabase_url.is_none() || self.supabase_service_key.is_none())
        {
            return Err(Error::Config(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY are required for the supabase storage backend"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
