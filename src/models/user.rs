use serde::{Deserialize, Serialize};

/// What the core observes of the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Identity {
    SignedIn { user_id: String },
    SignedOut,
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::SignedIn { user_id } => Some(user_id),
            Identity::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id().is_some()
    }
}
