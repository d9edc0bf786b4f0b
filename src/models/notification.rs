use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// User-facing toast emitted at the end of an upload cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            description: description.into(),
            variant: NotificationVariant::Default,
            created_at: crate::utils::time::now(),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
            created_at: crate::utils::time::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.variant == NotificationVariant::Destructive
    }
}
