//! Weekly report model - per-user, per-board summary of a week's work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::card::Checklist;
use crate::id::{BoardId, CardId, ChecklistId, ListId, ReportId, UserId};
use crate::profile::ProfileSummary;
use crate::week::{week_window, WeekWindow};
use crate::Time;

/// Lifecycle of a weekly report. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Still editable and refreshable
    Draft,
    /// Frozen
    Submitted,
}

impl ReportStatus {
    /// String form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's report for one board and one week.
///
/// Unique per `(board_id, author_id, week_start_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    /// Unique identifier
    pub id: ReportId,

    /// Board the report covers
    pub board_id: BoardId,

    /// Report author
    pub author_id: UserId,

    /// Monday of the reported week
    pub week_start_date: NaiveDate,

    /// Sunday of the reported week
    pub week_end_date: NaiveDate,

    /// Lifecycle status
    pub status: ReportStatus,

    /// Cards completed during the week
    pub completed_cards: Vec<CompletedCardSnapshot>,

    /// Cards still open, with the author's annotations
    pub in_progress_cards: Vec<InProgressCardSnapshot>,

    /// Chronological activity feed for the week
    pub card_activities: Vec<ActivityEvent>,

    /// Cached hour total, see [`WeeklyReport::compute_total_hours`]
    pub total_hours: f64,

    /// Free-form notes owned by the author
    #[serde(default)]
    pub notes: String,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,

    /// When the report was submitted
    pub submitted_at: Option<Time>,
}

impl WeeklyReport {
    /// Create an empty draft for `week`.
    pub fn new_draft(board_id: BoardId, author_id: UserId, week: &WeekWindow) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ReportId::new(),
            board_id,
            author_id,
            week_start_date: week.start_date(),
            week_end_date: week.end_date(),
            status: ReportStatus::Draft,
            completed_cards: Vec::new(),
            in_progress_cards: Vec::new(),
            card_activities: Vec::new(),
            total_hours: 0.0,
            notes: String::new(),
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    /// The reported week.
    pub fn week(&self) -> WeekWindow {
        week_window(self.week_start_date)
    }

    /// Whether the report may still be refreshed or edited.
    pub fn is_draft(&self) -> bool {
        self.status == ReportStatus::Draft
    }

    /// Completed hours plus the effective hours of every in-progress card.
    pub fn compute_total_hours(&self) -> f64 {
        let completed: f64 = self.completed_cards.iter().map(|c| c.weekly_hours).sum();
        let in_progress: f64 = self
            .in_progress_cards
            .iter()
            .map(InProgressCardSnapshot::effective_hours)
            .sum();
        completed + in_progress
    }

    /// Refresh the cached `total_hours`.
    pub fn recompute_totals(&mut self) {
        self.total_hours = self.compute_total_hours();
    }
}

/// Checklist state captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSnapshot {
    /// Source checklist
    pub id: ChecklistId,

    /// Checklist title
    pub title: String,

    /// Items at capture time
    pub items: Vec<ChecklistItemSnapshot>,

    /// Completion percentage
    pub progress: u32,
}

/// A checklist item captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItemSnapshot {
    /// Item text
    pub content: String,

    /// Checked flag
    pub is_checked: bool,
}

impl From<&Checklist> for ChecklistSnapshot {
    fn from(checklist: &Checklist) -> Self {
        let mut items: Vec<_> = checklist.items.iter().collect();
        items.sort_by_key(|i| i.position);
        Self {
            id: checklist.id,
            title: checklist.title.clone(),
            items: items
                .into_iter()
                .map(|i| ChecklistItemSnapshot {
                    content: i.content.clone(),
                    is_checked: i.is_checked,
                })
                .collect(),
            progress: checklist.progress(),
        }
    }
}

/// Point-in-time copy of a completed card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedCardSnapshot {
    /// Source card
    pub card_id: CardId,

    /// List the card sat in
    pub list_id: ListId,

    /// Title of that list
    pub list_title: String,

    /// Card title
    pub title: String,

    /// Card description
    pub description: String,

    /// Due date
    pub due_date: Option<NaiveDate>,

    /// When it was completed
    pub completed_at: Option<Time>,

    /// Who completed it, when the profile could be resolved
    pub completed_by: Option<ProfileSummary>,

    /// Checklists with per-checklist progress
    pub checklists: Vec<ChecklistSnapshot>,

    /// Progress across all checklist items
    pub checklist_progress: u32,

    /// Hours logged against the card during the reported week
    pub weekly_hours: f64,
}

/// Server-computed facts about an in-progress card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCollected {
    /// Progress across all checklist items
    pub checklist_progress: u32,

    /// Number of comments on the card
    pub comment_count: usize,

    /// Hours logged against the card during the week
    pub weekly_hours: f64,
}

/// The author-editable part of an in-progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    /// Free-text status label
    pub status: String,

    /// Manual progress override; `None` follows checklist progress
    pub progress: Option<u32>,

    /// Description shown in the report
    pub description: String,

    /// Blockers and issues
    #[serde(default)]
    pub issues: String,

    /// Expected completion date
    pub expected_completion_date: Option<NaiveDate>,

    /// Hours spent this week
    pub hours_spent: f64,
}

/// Point-in-time copy of an open card plus the author's annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgressCardSnapshot {
    /// Source card
    pub card_id: CardId,

    /// List the card sits in
    pub list_id: ListId,

    /// Title of that list
    pub list_title: String,

    /// Card title
    pub title: String,

    /// Card description
    pub description: String,

    /// Due date
    pub due_date: Option<NaiveDate>,

    /// Card creation timestamp
    pub created_at: Time,

    /// Card update timestamp
    pub updated_at: Time,

    /// Collected metadata
    pub auto_collected: AutoCollected,

    /// Author annotations
    pub user_input: UserInput,
}

impl InProgressCardSnapshot {
    /// Hours counted towards the report total.
    pub fn effective_hours(&self) -> f64 {
        let hours = self.user_input.hours_spent;
        if hours.is_finite() && hours >= 0.0 {
            hours
        } else {
            self.auto_collected.weekly_hours
        }
    }

    /// Progress shown in the report.
    pub fn effective_progress(&self) -> u32 {
        self.user_input
            .progress
            .unwrap_or(self.auto_collected.checklist_progress)
    }
}

/// Something that happened to a card during the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// Card was created
    Created {
        /// Card
        card_id: CardId,
        /// Card title
        card_title: String,
        /// List title
        list_title: String,
        /// When
        at: Time,
    },
    /// Card was edited
    Updated {
        /// Card
        card_id: CardId,
        /// Card title
        card_title: String,
        /// List title
        list_title: String,
        /// When
        at: Time,
    },
    /// Card was completed
    Completed {
        /// Card
        card_id: CardId,
        /// Card title
        card_title: String,
        /// List title
        list_title: String,
        /// When
        at: Time,
        /// Completer
        completed_by: Option<UserId>,
    },
    /// A checklist item was ticked off with hours logged
    ChecklistItemCompleted {
        /// Card
        card_id: CardId,
        /// Card title
        card_title: String,
        /// List title
        list_title: String,
        /// When the entry was recorded
        at: Time,
        /// Checklist item text
        item_content: String,
        /// Hours logged with the item
        hours: f64,
        /// Who logged it
        user_id: UserId,
    },
}

impl ActivityEvent {
    /// Event timestamp.
    pub fn at(&self) -> Time {
        match self {
            ActivityEvent::Created { at, .. }
            | ActivityEvent::Updated { at, .. }
            | ActivityEvent::Completed { at, .. }
            | ActivityEvent::ChecklistItemCompleted { at, .. } => *at,
        }
    }

    /// Card the event concerns.
    pub fn card_id(&self) -> CardId {
        match self {
            ActivityEvent::Created { card_id, .. }
            | ActivityEvent::Updated { card_id, .. }
            | ActivityEvent::Completed { card_id, .. }
            | ActivityEvent::ChecklistItemCompleted { card_id, .. } => *card_id,
        }
    }

    /// Short label for the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::Created { .. } => "created",
            ActivityEvent::Updated { .. } => "updated",
            ActivityEvent::Completed { .. } => "completed",
            ActivityEvent::ChecklistItemCompleted { .. } => "checklist_item_completed",
        }
    }
}

/// Caller-supplied fields for a manual draft save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPatch {
    /// Replacement in-progress cards
    pub in_progress_cards: Option<Vec<InProgressCardSnapshot>>,

    /// Replacement notes
    pub notes: Option<String>,

    /// New status
    pub status: Option<ReportStatus>,
}
