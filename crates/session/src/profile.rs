use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated or synthetic player identity.
///
/// Online profiles come back from the session service; offline profiles are
/// derived deterministically from the declared username so a player keeps
/// the same id across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Build the synthetic identity used for offline-mode logins.
    pub fn offline(name: &str) -> Self {
        let id = Uuid::new_v3(
            &Uuid::NAMESPACE_OID,
            format!("OfflinePlayer:{}", name).as_bytes(),
        );
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
