//! User Identity
//!
//! Supplies the `userId` sent with every chat request. The backend keys its
//! conversation memory and file prefixes on it, so it must stay stable for
//! the lifetime of a session.

use chrono::Utc;

/// Source of the per-session user identifier.
pub trait UserIdentity: Send + Sync {
    fn user_id(&self) -> &str;
}

/// Identity generated once per process: `user_<unix-millis>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    user_id: String,
}

impl SessionIdentity {
    pub fn generate() -> Self {
        Self {
            user_id: format!("user_{}", Utc::now().timestamp_millis()),
        }
    }

    /// Use an identifier supplied by an external auth provider.
    pub fn fixed(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl UserIdentity for SessionIdentity {
    fn user_id(&self) -> &str {
        &self.user_id
    }
}
