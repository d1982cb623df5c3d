//! Card model - the unit of work on a board.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{CardId, ChecklistId, ChecklistItemId, CommentId, ListId, UserId};
use crate::Time;

/// A card lives in exactly one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier
    pub id: CardId,

    /// Owning list
    pub list_id: ListId,

    /// Card title
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: String,

    /// Ordering inside the list
    pub position: u32,

    /// Due date, if any
    pub due_date: Option<NaiveDate>,

    /// Completion flag
    pub is_completed: bool,

    /// When the card was completed
    pub completed_at: Option<Time>,

    /// Who completed the card
    pub completed_by: Option<UserId>,

    /// Who created the card
    pub created_by: UserId,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

impl Card {
    /// Create a new card.
    pub fn new(list_id: ListId, title: impl Into<String>, created_by: UserId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: CardId::new(),
            list_id,
            title: title.into(),
            description: String::new(),
            position: 0,
            due_date: None,
            is_completed: false,
            completed_at: None,
            completed_by: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the card completed by `user` at `at`.
    pub fn complete(&mut self, user: UserId, at: Time) {
        self.is_completed = true;
        self.completed_at = Some(at);
        self.completed_by = Some(user);
        self.updated_at = at;
    }

    /// Clear the completion flag.
    pub fn reopen(&mut self, at: Time) {
        self.is_completed = false;
        self.completed_at = None;
        self.completed_by = None;
        self.updated_at = at;
    }
}

/// Filter for listing cards.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    /// Restrict to these lists (None = all lists)
    pub list_ids: Option<Vec<ListId>>,

    /// Restrict by completion flag
    pub completed: Option<bool>,
}

impl CardFilter {
    /// Cards in the given lists.
    pub fn in_lists(list_ids: Vec<ListId>) -> Self {
        Self {
            list_ids: Some(list_ids),
            completed: None,
        }
    }

    /// Restrict by completion flag.
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Whether a card passes this filter.
    pub fn matches(&self, card: &Card) -> bool {
        if let Some(lists) = &self.list_ids {
            if !lists.contains(&card.list_id) {
                return false;
            }
        }
        match self.completed {
            Some(flag) => card.is_completed == flag,
            None => true,
        }
    }
}

/// A checklist attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    /// Unique identifier
    pub id: ChecklistId,

    /// Owning card
    pub card_id: CardId,

    /// Checklist title
    pub title: String,

    /// Items, ordered by position
    pub items: Vec<ChecklistItem>,

    /// Creation timestamp
    pub created_at: Time,
}

impl Checklist {
    /// Create an empty checklist.
    pub fn new(card_id: CardId, title: impl Into<String>) -> Self {
        Self {
            id: ChecklistId::new(),
            card_id,
            title: title.into(),
            items: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Number of checked items.
    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_checked).count()
    }

    /// Completion percentage, rounded. An empty checklist is 0%.
    pub fn progress(&self) -> u32 {
        percentage(self.checked_count(), self.items.len())
    }
}

/// Overall progress across several checklists.
pub fn checklist_progress<'a>(checklists: impl IntoIterator<Item = &'a Checklist>) -> u32 {
    let (checked, total) = checklists
        .into_iter()
        .fold((0, 0), |(c, t), cl| (c + cl.checked_count(), t + cl.items.len()));
    percentage(checked, total)
}

fn percentage(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

/// A single item in a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Unique identifier
    pub id: ChecklistItemId,

    /// Item text
    pub content: String,

    /// Checked flag
    pub is_checked: bool,

    /// Ordering inside the checklist
    pub position: u32,
}

impl ChecklistItem {
    /// Create an unchecked item.
    pub fn new(content: impl Into<String>, position: u32) -> Self {
        Self {
            id: ChecklistItemId::new(),
            content: content.into(),
            is_checked: false,
            position,
        }
    }
}

/// A comment on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: CommentId,

    /// Owning card
    pub card_id: CardId,

    /// Author
    pub author: UserId,

    /// Comment body
    pub content: String,

    /// Creation timestamp
    pub created_at: Time,
}

impl Comment {
    /// Create a new comment.
    pub fn new(card_id: CardId, author: UserId, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            card_id,
            author,
            content: content.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checklist(checked: &[bool]) -> Checklist {
        let mut cl = Checklist::new(CardId::new(), "Steps");
        for (i, c) in checked.iter().enumerate() {
            let mut item = ChecklistItem::new(format!("item {}", i), i as u32);
            item.is_checked = *c;
            cl.items.push(item);
        }
        cl
    }

    #[test]
    fn test_checklist_progress() {
        assert_eq!(checklist(&[]).progress(), 0);
        assert_eq!(checklist(&[true, false]).progress(), 50);
        assert_eq!(checklist(&[true, true]).progress(), 100);
        assert_eq!(checklist(&[true, false, false]).progress(), 33);
    }

    #[test]
    fn test_overall_progress_weights_items() {
        let a = checklist(&[true, true, true]);
        let b = checklist(&[false]);
        assert_eq!(checklist_progress([&a, &b]), 75);
        assert_eq!(checklist_progress(std::iter::empty()), 0);
    }

    #[test]
    fn test_complete_and_reopen() {
        let user = UserId::new();
        let mut card = Card::new(ListId::new(), "Ship it", user);
        let now = chrono::Utc::now();

        card.complete(user, now);
        assert!(card.is_completed);
        assert_eq!(card.completed_at, Some(now));

        card.reopen(now);
        assert!(!card.is_completed);
        assert!(card.completed_at.is_none());
        assert!(card.completed_by.is_none());
    }

    #[test]
    fn test_card_filter() {
        let list = ListId::new();
        let mut card = Card::new(list, "A", UserId::new());

        assert!(CardFilter::default().matches(&card));
        assert!(CardFilter::in_lists(vec![list]).completed(false).matches(&card));
        assert!(!CardFilter::in_lists(vec![ListId::new()]).matches(&card));

        card.complete(UserId::new(), chrono::Utc::now());
        assert!(!CardFilter::default().completed(false).matches(&card));
    }
}
