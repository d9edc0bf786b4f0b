use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Namespace the quiz progress is persisted under.
pub const QUIZ_STATE_KEY: &str = "quiz-storage";

const STATE_VERSION: u32 = 0;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Durable key/value slot backed by one JSON file per key.
#[derive(Debug, Clone)]
pub struct LocalStateFile {
    path: PathBuf,
}

impl LocalStateFile {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope<T> = serde_json::from_slice(&raw)?;
        if envelope.version != STATE_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                version = envelope.version,
                "persisted state has an unexpected version"
            );
        }
        Ok(Some(envelope.state))
    }

    /// Writes to a sibling temp file and renames it into place.
    pub fn save<T: Serialize>(&self, state: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&Envelope {
            state,
            version: STATE_VERSION,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
