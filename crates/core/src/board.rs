//! Board model - a kanban board and its lists.

use serde::{Deserialize, Serialize};
use crate::id::{BoardId, ListId, UserId};
use crate::Time;

/// Titles that mark a list as the board's "done" column.
pub const DEFAULT_DONE_LIST_TITLES: &[&str] = &["Done", "완료"];

/// A kanban board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Unique identifier
    pub id: BoardId,

    /// Board title
    pub title: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Who created the board
    pub owner: UserId,

    /// Creation timestamp
    pub created_at: Time,
}

impl Board {
    /// Create a new board.
    pub fn new(title: impl Into<String>, owner: UserId) -> Self {
        Self {
            id: BoardId::new(),
            title: title.into(),
            description: String::new(),
            owner,
            created_at: chrono::Utc::now(),
        }
    }
}

/// A list (column) on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    /// Unique identifier
    pub id: ListId,

    /// Owning board
    pub board_id: BoardId,

    /// List title
    pub title: String,

    /// Ordering on the board
    pub position: u32,

    /// Creation timestamp
    pub created_at: Time,
}

impl BoardList {
    /// Create a new list on a board.
    pub fn new(board_id: BoardId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id: ListId::new(),
            board_id,
            title: title.into(),
            position,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether this list is a "done" column, matched case-insensitively
    /// against `done_titles`.
    pub fn is_done<S: AsRef<str>>(&self, done_titles: &[S]) -> bool {
        let title = self.title.trim();
        done_titles
            .iter()
            .any(|t| t.as_ref().trim().to_lowercase() == title.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_list_matching() {
        let board = Board::new("Team", UserId::new());
        let done = BoardList::new(board.id, "  done ", 2);
        let korean = BoardList::new(board.id, "완료", 3);
        let doing = BoardList::new(board.id, "Doing", 1);

        assert!(done.is_done(DEFAULT_DONE_LIST_TITLES));
        assert!(korean.is_done(DEFAULT_DONE_LIST_TITLES));
        assert!(!doing.is_done(DEFAULT_DONE_LIST_TITLES));
    }
}
