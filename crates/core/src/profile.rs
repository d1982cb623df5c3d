//! User profile model.

use serde::{Deserialize, Serialize};
use crate::id::UserId;
use crate::Time;

/// A user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier
    pub id: UserId,

    /// Name shown in the UI and in reports
    pub display_name: String,

    /// Contact email
    #[serde(default)]
    pub email: Option<String>,

    /// Creation timestamp
    pub created_at: Time,
}

impl Profile {
    /// Create a new profile.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            display_name: display_name.into(),
            email: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Condensed form embedded in report snapshots.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

/// Profile fields copied into report snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// User id
    pub id: UserId,

    /// Display name at capture time
    pub display_name: String,
}
