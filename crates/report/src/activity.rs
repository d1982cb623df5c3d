//! Weekly activity feed.

use std::collections::HashMap;
use taskboard_core::{ActivityEvent, BoardId, Card, CardFilter, TimeLogFilter, WeekWindow};
use taskboard_storage::{Result, Storage};
use tracing::{debug, error};

use crate::config::ReportConfig;

/// Card lifecycle events and checklist completions of a board that fall
/// inside `week`, oldest first.
///
/// Storage failures are logged and yield an empty feed.
pub async fn collect_activities<S: Storage + ?Sized>(
    storage: &S,
    config: &ReportConfig,
    board_id: BoardId,
    week: &WeekWindow,
) -> Vec<ActivityEvent> {
    match try_collect_activities(storage, config, board_id, week).await {
        Ok(events) => {
            debug!(board = %board_id, count = events.len(), "Collected card activities");
            events
        }
        Err(e) => {
            error!(board = %board_id, "Failed to collect card activities: {}", e);
            Vec::new()
        }
    }
}

async fn try_collect_activities<S: Storage + ?Sized>(
    storage: &S,
    config: &ReportConfig,
    board_id: BoardId,
    week: &WeekWindow,
) -> Result<Vec<ActivityEvent>> {
    let lists = storage.list_lists(board_id).await?;
    if lists.is_empty() {
        return Ok(Vec::new());
    }
    let list_titles: HashMap<_, _> = lists.iter().map(|l| (l.id, l.title.clone())).collect();

    let cards = storage
        .list_cards(&CardFilter::in_lists(lists.iter().map(|l| l.id).collect()))
        .await?;
    if cards.is_empty() {
        return Ok(Vec::new());
    }

    let list_title = |card: &Card| list_titles.get(&card.list_id).cloned().unwrap_or_default();
    let mut events = Vec::new();

    for card in &cards {
        if week.contains(card.created_at) {
            events.push(ActivityEvent::Created {
                card_id: card.id,
                card_title: card.title.clone(),
                list_title: list_title(card),
                at: card.created_at,
            });
        }

        if card.updated_at != card.created_at && week.contains(card.updated_at) {
            events.push(ActivityEvent::Updated {
                card_id: card.id,
                card_title: card.title.clone(),
                list_title: list_title(card),
                at: card.updated_at,
            });
        }

        if let (true, Some(at)) = (card.is_completed, card.completed_at) {
            if week.contains(at) {
                events.push(ActivityEvent::Completed {
                    card_id: card.id,
                    card_title: card.title.clone(),
                    list_title: list_title(card),
                    at,
                    completed_by: card.completed_by,
                });
            }
        }
    }

    let by_id: HashMap<_, _> = cards.iter().map(|c| (c.id, c)).collect();
    let filter = TimeLogFilter::for_cards(cards.iter().map(|c| c.id).collect())
        .between(week.start_date(), week.end_date())
        .tagged(config.checklist_marker.clone());

    for log in storage.list_time_logs(&filter).await? {
        let Some(&card) = by_id.get(&log.card_id) else {
            continue;
        };
        events.push(ActivityEvent::ChecklistItemCompleted {
            card_id: card.id,
            card_title: card.title.clone(),
            list_title: list_title(card),
            at: log.created_at,
            item_content: log
                .checklist_item(&config.checklist_marker)
                .unwrap_or_default()
                .to_string(),
            hours: log.hours,
            user_id: log.user_id,
        });
    }

    events.sort_by_key(ActivityEvent::at);
    Ok(events)
}
