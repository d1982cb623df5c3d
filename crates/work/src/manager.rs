//! Board management service.

use chrono::NaiveDate;
use taskboard_core::{
    Board, BoardId, BoardList, Card, CardFilter, CardId, Checklist, ChecklistId,
    ChecklistItem, ChecklistItemId, Comment, ListId, Profile, TimeLog, UserId,
    CHECKLIST_LOG_MARKER,
};
use taskboard_storage::Storage;
use tracing::{debug, info};

use crate::error::{Result, WorkError};

/// Configuration for the board manager.
#[derive(Debug, Clone)]
pub struct WorkConfig {
    /// Lists created with every new board
    pub default_lists: Vec<String>,
    /// Prefix written on time logs that record checklist completion
    pub checklist_marker: String,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            default_lists: vec![
                "To Do".to_string(),
                "In Progress".to_string(),
                "Done".to_string(),
            ],
            checklist_marker: CHECKLIST_LOG_MARKER.to_string(),
        }
    }
}

/// Editable card fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New due date; `Some(None)` clears it
    pub due_date: Option<Option<NaiveDate>>,
}

/// A board with its lists and their cards.
#[derive(Debug, Clone)]
pub struct BoardOverview {
    /// The board
    pub board: Board,
    /// Lists in position order, each with its cards
    pub lists: Vec<(BoardList, Vec<Card>)>,
}

/// Board CRUD orchestration on top of a [`Storage`] backend.
pub struct BoardManager<S: Storage> {
    storage: S,
    config: WorkConfig,
}

impl<S: Storage> BoardManager<S> {
    /// Create a new board manager.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: WorkConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: WorkConfig) -> Self {
        self.config = config;
        self
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give back the storage.
    pub fn into_inner(self) -> S {
        self.storage
    }

    // === Profiles ===

    /// Register a user profile.
    pub async fn add_profile(&mut self, display_name: &str, email: Option<String>) -> Result<Profile> {
        let display_name = non_empty(display_name, "display name")?;
        let mut profile = Profile::new(display_name);
        profile.email = email;
        self.storage.save_profile(&profile).await?;
        info!("Added profile {} ({})", profile.display_name, profile.id);
        Ok(profile)
    }

    // === Boards and lists ===

    /// Create a board with the configured default lists.
    pub async fn create_board(&mut self, owner: UserId, title: &str) -> Result<Board> {
        let board = Board::new(non_empty(title, "board title")?, owner);
        self.storage.save_board(&board).await?;

        for (position, list_title) in self.config.default_lists.iter().enumerate() {
            let list = BoardList::new(board.id, list_title.clone(), position as u32);
            self.storage.save_list(&list).await?;
        }

        info!("Created board '{}' ({})", board.title, board.id);
        Ok(board)
    }

    /// Load a board with its lists and cards.
    pub async fn board_overview(&self, board_id: BoardId) -> Result<BoardOverview> {
        let board = self.board(board_id).await?;
        let lists = self.storage.list_lists(board_id).await?;

        let mut overview = Vec::with_capacity(lists.len());
        for list in lists {
            let cards = self
                .storage
                .list_cards(&CardFilter::in_lists(vec![list.id]))
                .await?;
            overview.push((list, cards));
        }

        Ok(BoardOverview { board, lists: overview })
    }

    /// Append a list to a board.
    pub async fn add_list(&mut self, board_id: BoardId, title: &str) -> Result<BoardList> {
        self.board(board_id).await?;
        let position = self.storage.list_lists(board_id).await?.len() as u32;

        let list = BoardList::new(board_id, non_empty(title, "list title")?, position);
        self.storage.save_list(&list).await?;
        debug!("Added list '{}' to board {}", list.title, board_id);
        Ok(list)
    }

    // === Cards ===

    /// Append a card to a list.
    pub async fn add_card(
        &mut self,
        list_id: ListId,
        actor: UserId,
        title: &str,
        description: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<Card> {
        self.list(list_id).await?;
        let position = self.cards_in(list_id).await?;

        let mut card = Card::new(list_id, non_empty(title, "card title")?, actor);
        card.description = description.to_string();
        card.due_date = due_date;
        card.position = position;

        self.storage.save_card(&card).await?;
        info!("Added card '{}' ({})", card.title, card.id);
        Ok(card)
    }

    /// Edit card fields.
    pub async fn update_card(&mut self, card_id: CardId, update: CardUpdate) -> Result<Card> {
        let mut card = self.card(card_id).await?;

        if let Some(title) = update.title {
            card.title = non_empty(&title, "card title")?;
        }
        if let Some(description) = update.description {
            card.description = description;
        }
        if let Some(due_date) = update.due_date {
            card.due_date = due_date;
        }
        card.updated_at = chrono::Utc::now();

        self.storage.save_card(&card).await?;
        Ok(card)
    }

    /// Move a card to the end of another list on the same board.
    pub async fn move_card(&mut self, card_id: CardId, to: ListId) -> Result<Card> {
        let mut card = self.card(card_id).await?;
        let from = self.list(card.list_id).await?;
        let target = self.list(to).await?;
        if from.board_id != target.board_id {
            return Err(WorkError::Invalid(format!(
                "list {} belongs to another board",
                to
            )));
        }
        if card.list_id == to {
            return Ok(card);
        }

        card.position = self.cards_in(to).await?;
        card.list_id = to;
        card.updated_at = chrono::Utc::now();

        self.storage.save_card(&card).await?;
        info!("Moved card {} from '{}' to '{}'", card.id, from.title, target.title);
        Ok(card)
    }

    /// Mark a card completed.
    pub async fn complete_card(&mut self, card_id: CardId, actor: UserId) -> Result<Card> {
        let mut card = self.card(card_id).await?;
        if card.is_completed {
            return Ok(card);
        }

        card.complete(actor, chrono::Utc::now());
        self.storage.save_card(&card).await?;
        info!("Completed card '{}' ({})", card.title, card.id);
        Ok(card)
    }

    /// Clear a card's completion.
    pub async fn reopen_card(&mut self, card_id: CardId) -> Result<Card> {
        let mut card = self.card(card_id).await?;
        if !card.is_completed {
            return Ok(card);
        }

        card.reopen(chrono::Utc::now());
        self.storage.save_card(&card).await?;
        info!("Reopened card '{}' ({})", card.title, card.id);
        Ok(card)
    }

    /// Delete a card.
    pub async fn delete_card(&mut self, card_id: CardId) -> Result<()> {
        self.card(card_id).await?;
        self.storage.delete_card(card_id).await?;
        info!("Deleted card {}", card_id);
        Ok(())
    }

    // === Checklists ===

    /// Attach an empty checklist to a card.
    pub async fn add_checklist(&mut self, card_id: CardId, title: &str) -> Result<Checklist> {
        self.card(card_id).await?;
        let checklist = Checklist::new(card_id, non_empty(title, "checklist title")?);
        self.storage.save_checklist(&checklist).await?;
        Ok(checklist)
    }

    /// Append an item to a checklist.
    pub async fn add_checklist_item(
        &mut self,
        checklist_id: ChecklistId,
        content: &str,
    ) -> Result<ChecklistItem> {
        let mut checklist = self.checklist(checklist_id).await?;
        let item = ChecklistItem::new(
            non_empty(content, "checklist item")?,
            checklist.items.len() as u32,
        );
        checklist.items.push(item.clone());
        self.storage.save_checklist(&checklist).await?;
        Ok(item)
    }

    /// Check or uncheck an item.
    ///
    /// Checking an item records a tagged time log with `hours` (zero when
    /// not given) so the completion shows up in the weekly activity feed.
    pub async fn set_item_checked(
        &mut self,
        checklist_id: ChecklistId,
        item_id: ChecklistItemId,
        checked: bool,
        actor: UserId,
        hours: Option<f64>,
        logged_date: NaiveDate,
    ) -> Result<Checklist> {
        let mut checklist = self.checklist(checklist_id).await?;
        let Some(item) = checklist.items.iter_mut().find(|i| i.id == item_id) else {
            return Err(WorkError::NotFound(format!("checklist item {}", item_id)));
        };
        if item.is_checked == checked {
            return Ok(checklist);
        }
        item.is_checked = checked;
        let content = item.content.clone();

        if checked {
            let hours = validate_hours(hours.unwrap_or(0.0), true)?;
            let log = TimeLog::new(checklist.card_id, actor, hours, logged_date).with_description(
                TimeLog::checklist_description(&self.config.checklist_marker, &content),
            );
            self.storage.save_time_log(&log).await?;
        }

        self.storage.save_checklist(&checklist).await?;
        debug!("Checklist item '{}' checked={}", content, checked);
        Ok(checklist)
    }

    // === Comments and time ===

    /// Comment on a card.
    pub async fn add_comment(&mut self, card_id: CardId, actor: UserId, content: &str) -> Result<Comment> {
        self.card(card_id).await?;
        let comment = Comment::new(card_id, actor, non_empty(content, "comment")?);
        self.storage.save_comment(&comment).await?;
        Ok(comment)
    }

    /// Log hours against a card.
    pub async fn log_time(
        &mut self,
        card_id: CardId,
        actor: UserId,
        hours: f64,
        logged_date: NaiveDate,
        description: &str,
    ) -> Result<TimeLog> {
        self.card(card_id).await?;
        let log = TimeLog::new(card_id, actor, validate_hours(hours, false)?, logged_date)
            .with_description(description);
        self.storage.save_time_log(&log).await?;
        info!("Logged {}h on card {} for {}", log.hours, card_id, logged_date);
        Ok(log)
    }

    // === Lookups ===

    async fn board(&self, id: BoardId) -> Result<Board> {
        self.storage
            .load_board(id)
            .await?
            .ok_or_else(|| WorkError::NotFound(format!("board {}", id)))
    }

    async fn list(&self, id: ListId) -> Result<BoardList> {
        self.storage
            .load_list(id)
            .await?
            .ok_or_else(|| WorkError::NotFound(format!("list {}", id)))
    }

    async fn card(&self, id: CardId) -> Result<Card> {
        self.storage
            .load_card(id)
            .await?
            .ok_or_else(|| WorkError::NotFound(format!("card {}", id)))
    }

    async fn checklist(&self, id: ChecklistId) -> Result<Checklist> {
        self.storage
            .load_checklist(id)
            .await?
            .ok_or_else(|| WorkError::NotFound(format!("checklist {}", id)))
    }

    async fn cards_in(&self, list_id: ListId) -> Result<u32> {
        let cards = self
            .storage
            .list_cards(&CardFilter::in_lists(vec![list_id]))
            .await?;
        Ok(cards.len() as u32)
    }
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkError::Invalid(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn validate_hours(hours: f64, allow_zero: bool) -> Result<f64> {
    let valid = hours.is_finite() && (hours > 0.0 || (allow_zero && hours == 0.0));
    if !valid {
        return Err(WorkError::Invalid(format!("invalid hours: {}", hours)));
    }
    Ok(hours)
}
