//! Unique identifiers for Taskboard entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            #[doc = concat!("Generate a new ", stringify!($name))]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

define_id!(
    /// Unique identifier for a Board
    BoardId
);
define_id!(
    /// Unique identifier for a list (column) on a board
    ListId
);
define_id!(
    /// Unique identifier for a Card
    CardId
);
define_id!(
    /// Unique identifier for a Checklist
    ChecklistId
);
define_id!(
    /// Unique identifier for a checklist item
    ChecklistItemId
);
define_id!(
    /// Unique identifier for a Comment
    CommentId
);
define_id!(
    /// Unique identifier for a time log entry
    TimeLogId
);
define_id!(
    /// Unique identifier for a user (profile)
    UserId
);
define_id!(
    /// Unique identifier for a WeeklyReport
    ReportId
);
