//! Report pipeline configuration.

use taskboard_core::{CHECKLIST_LOG_MARKER, DEFAULT_DONE_LIST_TITLES};

/// Status label seeded into new in-progress entries.
pub const DEFAULT_IN_PROGRESS_STATUS: &str = "진행중";

/// Configuration for report collection.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Status seeded into `user_input.status`
    pub default_status: String,
    /// Prefix that tags checklist-completion time logs
    pub checklist_marker: String,
    /// List titles treated as "done" columns
    pub done_list_titles: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_status: DEFAULT_IN_PROGRESS_STATUS.to_string(),
            checklist_marker: CHECKLIST_LOG_MARKER.to_string(),
            done_list_titles: DEFAULT_DONE_LIST_TITLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}
