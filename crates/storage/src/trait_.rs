//! Storage trait abstraction.

use std::collections::HashMap;
use async_trait::async_trait;
use chrono::NaiveDate;
use taskboard_core::{
    Board, BoardId, BoardList, Card, CardFilter, CardId, Checklist, ChecklistId, Comment,
    ListId, Profile, ReportId, TimeLog, TimeLogFilter, UserId, WeeklyReport,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for Taskboard data.
///
/// Reads take `&self` so independent queries can run concurrently; writes
/// take `&mut self`. Listing methods return rows in a stable order:
/// lists by position, cards by position then creation, time logs by logged
/// date then creation, reports by week (newest first).
#[async_trait]
pub trait Storage: Send + Sync {
    // === Profile operations ===

    /// Save a profile (create or update).
    async fn save_profile(&mut self, profile: &Profile) -> Result<()>;

    /// Load the profiles with the given ids. Unknown ids are skipped.
    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>>;

    // === Board operations ===

    /// Save a board (create or update).
    async fn save_board(&mut self, board: &Board) -> Result<()>;

    /// Load a board by ID.
    async fn load_board(&self, id: BoardId) -> Result<Option<Board>>;

    /// List all boards.
    async fn list_boards(&self) -> Result<Vec<Board>>;

    // === List operations ===

    /// Save a list (create or update).
    async fn save_list(&mut self, list: &BoardList) -> Result<()>;

    /// Load a list by ID.
    async fn load_list(&self, id: ListId) -> Result<Option<BoardList>>;

    /// Lists of a board, ordered by position.
    async fn list_lists(&self, board_id: BoardId) -> Result<Vec<BoardList>>;

    // === Card operations ===

    /// Save a card (create or update).
    async fn save_card(&mut self, card: &Card) -> Result<()>;

    /// Load a card by ID.
    async fn load_card(&self, id: CardId) -> Result<Option<Card>>;

    /// List cards matching the filter.
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>>;

    /// Delete a card.
    async fn delete_card(&mut self, id: CardId) -> Result<()>;

    // === Checklist operations ===

    /// Save a checklist with its items.
    async fn save_checklist(&mut self, checklist: &Checklist) -> Result<()>;

    /// Load a checklist by ID.
    async fn load_checklist(&self, id: ChecklistId) -> Result<Option<Checklist>>;

    /// All checklists of the given cards, in one query.
    async fn list_checklists(&self, card_ids: &[CardId]) -> Result<Vec<Checklist>>;

    // === Comment operations ===

    /// Save a comment.
    async fn save_comment(&mut self, comment: &Comment) -> Result<()>;

    /// Comment counts of the given cards, in one query. Cards without
    /// comments may be absent from the map.
    async fn count_comments(&self, card_ids: &[CardId]) -> Result<HashMap<CardId, usize>>;

    // === Time log operations ===

    /// Save a time log entry.
    async fn save_time_log(&mut self, log: &TimeLog) -> Result<()>;

    /// List time log entries matching the filter.
    async fn list_time_logs(&self, filter: &TimeLogFilter) -> Result<Vec<TimeLog>>;

    // === Weekly report operations ===

    /// Insert a new report. Fails with [`StorageError::Conflict`] when a
    /// report already exists for the same board, author and week.
    async fn create_report(&mut self, report: &WeeklyReport) -> Result<()>;

    /// Load a report by ID.
    async fn load_report(&self, id: ReportId) -> Result<Option<WeeklyReport>>;

    /// Find the report for a board, author and week.
    async fn find_report(
        &self,
        board_id: BoardId,
        author_id: UserId,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReport>>;

    /// Reports of a board, newest week first.
    async fn list_reports(&self, board_id: BoardId) -> Result<Vec<WeeklyReport>>;

    /// Replace an existing report. Fails with [`StorageError::NotFound`]
    /// when the report does not exist.
    async fn update_report(&mut self, report: &WeeklyReport) -> Result<()>;
}

/// Key that identifies a report slot.
pub(crate) fn report_key(board_id: BoardId, author_id: UserId, week_start: NaiveDate) -> String {
    format!("{}_{}_{}", board_id, author_id, week_start)
}

pub(crate) fn sort_lists(lists: &mut [BoardList]) {
    lists.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_cards(cards: &mut [Card]) {
    cards.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_checklists(checklists: &mut [Checklist]) {
    checklists.sort_by(|a, b| {
        a.card_id
            .cmp(&b.card_id)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_time_logs(logs: &mut [TimeLog]) {
    logs.sort_by(|a, b| {
        a.logged_date
            .cmp(&b.logged_date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_reports(reports: &mut [WeeklyReport]) {
    reports.sort_by(|a, b| {
        b.week_start_date
            .cmp(&a.week_start_date)
            .then(a.created_at.cmp(&b.created_at))
    });
}
