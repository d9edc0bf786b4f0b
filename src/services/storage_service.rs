use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::fs;
use url::Url;

use crate::config::{Config, StorageBackend};
use crate::error::{Error, Result};

/// Object storage holding uploaded documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// Durable, publicly fetchable URL of an uploaded object.
    fn public_url(&self, key: &str) -> String;
}

pub fn storage_from_config(config: &Config, client: Client) -> Result<Arc<dyn ObjectStorage>> {
    match config.storage_backend {
        StorageBackend::Supabase => {
            let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_service_key) else {
                return Err(Error::Config(
                    "supabase storage requires SUPABASE_URL and SUPABASE_SERVICE_KEY".to_string(),
                ));
            };
            Ok(Arc::new(SupabaseStorage::new(
                url,
                key.clone(),
                config.storage_bucket.clone(),
                client,
            )?))
        }
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(
            config.uploads_dir.clone(),
            &config.public_base_url,
            config.storage_bucket.clone(),
        )?)),
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("Invalid URL {}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("URL {} cannot be used as a base", raw)));
    }
    Ok(url)
}

/// Appends `segments` and every `/`-separated part of `key` to `base`,
/// percent-encoding each one.
fn join_key(base: &Url, segments: &[&str], key: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments.iter().copied());
        path.extend(key.split('/'));
    }
    url.to_string()
}

#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: String, bucket: String, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            service_key,
            bucket,
        })
    }

    fn object_url(&self, key: &str) -> String {
        join_key(&self.base_url, &["storage", "v1", "object", &self.bucket], key)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let res = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("{} {}", status, text));
            return Err(Error::Storage(message));
        }

        tracing::debug!(key, bucket = %self.bucket, "object uploaded to supabase");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_key(
            &self.base_url,
            &["storage", "v1", "object", "public", &self.bucket],
            key,
        )
    }
}

/// Stores objects under `root/<bucket>/<key>`; the router serves `root`
/// at `/uploads`.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: Url,
    bucket: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_base_url: &str, bucket: String) -> Result<Self> {
        Ok(Self {
            root,
            public_base: parse_base_url(public_base_url)?,
            bucket,
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || key.is_empty() {
            return Err(Error::Storage(format!("Invalid object key: {}", key)));
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::Storage("The resource already exists".to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }
        fs::write(&path, &bytes).await.map_err(|e| {
            tracing::error!("Failed to write upload {}: {}", path.display(), e);
            Error::Storage(format!("Failed to save file: {}", e))
        })?;
        tracing::debug!(key, path = %path.display(), "object stored locally");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_key(&self.public_base, &["uploads", &self.bucket], key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supabase_urls_are_encoded() {
        let storage = SupabaseStorage::new(
            "https://proj.supabase.co",
            "service".into(),
            "talktopdf".into(),
            Client::new(),
        )
        .unwrap();

        assert_eq!(
            storage.object_url("user_1/17-my notes.pdf"),
            "https://proj.supabase.co/storage/v1/object/talktopdf/user_1/17-my%20notes.pdf"
        );
        assert_eq!(
            storage.public_url("user_1/17-my notes.pdf"),
            "https://proj.supabase.co/storage/v1/object/public/talktopdf/user_1/17-my%20notes.pdf"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            LocalStorage::new("./uploads".into(), "mailto:me@example.com", "b".into()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn local_storage_writes_under_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(
            dir.path().to_path_buf(),
            "http://localhost:8080/",
            "talktopdf".into(),
        )
        .unwrap();

        storage
            .upload("user_1/1-doc.pdf", Bytes::from_static(b"%PDF-1.4"), "application/pdf")
            .await
            .unwrap();

        let stored = std::fs::read(dir.path().join("talktopdf/user_1/1-doc.pdf")).unwrap();
        assert_eq!(stored, b"%PDF-1.4");
        assert_eq!(
            storage.public_url("user_1/1-doc.pdf"),
            "http://localhost:8080/uploads/talktopdf/user_1/1-doc.pdf"
        );
    }

    #[tokio::test]
    async fn local_storage_refuses_traversal_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            LocalStorage::new(dir.path().to_path_buf(), "http://localhost:8080", "b".into()).unwrap();

        let err = storage
            .upload("../escape.pdf", Bytes::new(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        storage.upload("u/a.pdf", Bytes::new(), "application/pdf").await.unwrap();
        let err = storage
            .upload("u/a.pdf", Bytes::new(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
