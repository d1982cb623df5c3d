//! Time log model - hours logged against a card.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{CardId, TimeLogId, UserId};
use crate::Time;

/// Prefix that tags a time log as a checklist-item completion.
pub const CHECKLIST_LOG_MARKER: &str = "[checklist]";

/// Hours logged by a user against a card on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLog {
    /// Unique identifier
    pub id: TimeLogId,

    /// Card the hours belong to
    pub card_id: CardId,

    /// Who logged the hours
    pub user_id: UserId,

    /// Hours spent
    pub hours: f64,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Day the work happened
    pub logged_date: NaiveDate,

    /// When the entry was recorded
    pub created_at: Time,
}

impl TimeLog {
    /// Create a new time log entry.
    pub fn new(card_id: CardId, user_id: UserId, hours: f64, logged_date: NaiveDate) -> Self {
        Self {
            id: TimeLogId::new(),
            card_id,
            user_id,
            hours,
            description: String::new(),
            logged_date,
            created_at: chrono::Utc::now(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Description for a log recording completion of a checklist item.
    pub fn checklist_description(marker: &str, item_content: &str) -> String {
        format!("{} {}", marker, item_content)
    }

    /// If this entry is tagged with `marker`, the checklist item content.
    pub fn checklist_item<'a>(&'a self, marker: &str) -> Option<&'a str> {
        self.description
            .trim_start()
            .strip_prefix(marker)
            .map(str::trim)
    }
}

/// Filter for listing time logs. Date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TimeLogFilter {
    /// Restrict to these cards (None = all cards)
    pub card_ids: Option<Vec<CardId>>,

    /// Earliest logged date
    pub from: Option<NaiveDate>,

    /// Latest logged date
    pub to: Option<NaiveDate>,

    /// Only entries whose description starts with this marker
    pub description_prefix: Option<String>,
}

impl TimeLogFilter {
    /// Entries for one card.
    pub fn for_card(card_id: CardId) -> Self {
        Self {
            card_ids: Some(vec![card_id]),
            ..Default::default()
        }
    }

    /// Entries for several cards.
    pub fn for_cards(card_ids: Vec<CardId>) -> Self {
        Self {
            card_ids: Some(card_ids),
            ..Default::default()
        }
    }

    /// Restrict to an inclusive date range.
    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Restrict to entries tagged with `prefix`.
    pub fn tagged(mut self, prefix: impl Into<String>) -> Self {
        self.description_prefix = Some(prefix.into());
        self
    }

    /// Whether an entry passes this filter.
    pub fn matches(&self, log: &TimeLog) -> bool {
        if let Some(cards) = &self.card_ids {
            if !cards.contains(&log.card_id) {
                return false;
            }
        }
        if self.from.is_some_and(|from| log.logged_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| log.logged_date > to) {
            return false;
        }
        match &self.description_prefix {
            Some(prefix) => log.description.trim_start().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

/// Sum of hours across entries.
pub fn total_hours<'a>(logs: impl IntoIterator<Item = &'a TimeLog>) -> f64 {
    logs.into_iter().map(|l| l.hours).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_checklist_item_extraction() {
        let card = CardId::new();
        let tagged = TimeLog::new(card, UserId::new(), 1.5, date(2024, 3, 5))
            .with_description(TimeLog::checklist_description(CHECKLIST_LOG_MARKER, "Write tests"));
        let plain = TimeLog::new(card, UserId::new(), 1.0, date(2024, 3, 5))
            .with_description("pairing");

        assert_eq!(tagged.checklist_item(CHECKLIST_LOG_MARKER), Some("Write tests"));
        assert_eq!(plain.checklist_item(CHECKLIST_LOG_MARKER), None);
    }

    #[test]
    fn test_filter_date_bounds_inclusive() {
        let card = CardId::new();
        let filter = TimeLogFilter::for_card(card).between(date(2024, 3, 4), date(2024, 3, 10));

        let monday = TimeLog::new(card, UserId::new(), 1.0, date(2024, 3, 4));
        let sunday = TimeLog::new(card, UserId::new(), 1.0, date(2024, 3, 10));
        let next = TimeLog::new(card, UserId::new(), 1.0, date(2024, 3, 11));
        let other = TimeLog::new(CardId::new(), UserId::new(), 1.0, date(2024, 3, 5));

        assert!(filter.matches(&monday));
        assert!(filter.matches(&sunday));
        assert!(!filter.matches(&next));
        assert!(!filter.matches(&other));
        assert_eq!(total_hours([&monday, &sunday]), 2.0);
    }

    #[test]
    fn test_filter_tagged() {
        let card = CardId::new();
        let filter = TimeLogFilter::default().tagged(CHECKLIST_LOG_MARKER);
        let tagged = TimeLog::new(card, UserId::new(), 0.5, date(2024, 3, 5))
            .with_description("[checklist] Deploy");
        let plain = TimeLog::new(card, UserId::new(), 0.5, date(2024, 3, 5));

        assert!(filter.matches(&tagged));
        assert!(!filter.matches(&plain));
    }
}
