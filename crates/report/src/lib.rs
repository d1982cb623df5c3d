//! Weekly Reports
//!
//! Collects a board's completed work, open work and activity for one week,
//! and reconciles repeated refreshes with the author's own edits.

#![warn(missing_docs)]

pub mod activity;
pub mod completed;
pub mod config;
pub mod error;
mod hours;
pub mod in_progress;
pub mod reconciler;

pub use activity::collect_activities;
pub use completed::collect_completed;
pub use config::{ReportConfig, DEFAULT_IN_PROGRESS_STATUS};
pub use error::{ReportError, Result};
pub use in_progress::collect_in_progress;
pub use reconciler::{merge_in_progress, merge_user_input, ReportService};
