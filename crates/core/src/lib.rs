//! Taskboard core data models.
//!
//! This crate defines the kanban entities (boards, lists, cards, checklists,
//! comments, time logs) and the weekly report built on top of them.

#![warn(missing_docs)]

// Core identities
mod id;

// Board structure
mod board;
mod card;
mod time_log;
mod profile;

// Weekly reporting
mod report;
pub mod week;

// Re-exports
pub use id::*;

// Board & Card
pub use board::{Board, BoardList, DEFAULT_DONE_LIST_TITLES};
pub use card::{checklist_progress, Card, CardFilter, Checklist, ChecklistItem, Comment};
pub use time_log::{total_hours, TimeLog, TimeLogFilter, CHECKLIST_LOG_MARKER};
pub use profile::{Profile, ProfileSummary};

// Reports
pub use report::{
    ActivityEvent, AutoCollected, ChecklistItemSnapshot, ChecklistSnapshot,
    CompletedCardSnapshot, InProgressCardSnapshot, ReportPatch, ReportStatus,
    UserInput, WeeklyReport,
};
pub use week::{week_window, DateRange, Period, WeekWindow};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
