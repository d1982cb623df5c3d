//! In-progress work collection.

use std::collections::HashMap;
use taskboard_core::{
    checklist_progress, AutoCollected, BoardId, CardFilter, CardId, InProgressCardSnapshot,
    UserInput, WeekWindow,
};
use taskboard_storage::{Result, Storage};
use tracing::{debug, error};

use crate::completed::group_by_card;
use crate::config::ReportConfig;
use crate::hours::weekly_hours;

/// Every open card in every non-done list of a board, with collected
/// metadata and a freshly seeded `user_input`.
///
/// Ordered by list position, then card position. Storage failures are
/// logged and yield an empty list.
pub async fn collect_in_progress<S: Storage + ?Sized>(
    storage: &S,
    config: &ReportConfig,
    board_id: BoardId,
    week: &WeekWindow,
) -> Vec<InProgressCardSnapshot> {
    match try_collect_in_progress(storage, config, board_id, week).await {
        Ok(cards) => {
            debug!(board = %board_id, count = cards.len(), "Collected in-progress cards");
            cards
        }
        Err(e) => {
            error!(board = %board_id, "Failed to collect in-progress cards: {}", e);
            Vec::new()
        }
    }
}

async fn try_collect_in_progress<S: Storage + ?Sized>(
    storage: &S,
    config: &ReportConfig,
    board_id: BoardId,
    week: &WeekWindow,
) -> Result<Vec<InProgressCardSnapshot>> {
    let lists: Vec<_> = storage
        .list_lists(board_id)
        .await?
        .into_iter()
        .filter(|l| !l.is_done(&config.done_list_titles))
        .collect();
    if lists.is_empty() {
        return Ok(Vec::new());
    }
    // list id -> (order on board, title)
    let list_info: HashMap<_, _> = lists
        .iter()
        .enumerate()
        .map(|(order, l)| (l.id, (order, l.title.as_str())))
        .collect();

    let filter = CardFilter::in_lists(lists.iter().map(|l| l.id).collect()).completed(false);
    let mut cards = storage.list_cards(&filter).await?;
    if cards.is_empty() {
        return Ok(Vec::new());
    }
    cards.sort_by_key(|c| {
        let order = list_info.get(&c.list_id).map(|(o, _)| *o).unwrap_or(usize::MAX);
        (order, c.position, c.created_at, c.id)
    });

    let card_ids: Vec<CardId> = cards.iter().map(|c| c.id).collect();
    let (checklists, comments, hours) = tokio::join!(
        storage.list_checklists(&card_ids),
        storage.count_comments(&card_ids),
        weekly_hours(storage, &card_ids, week),
    );
    let checklists = group_by_card(checklists?);
    let comments = comments?;
    let hours = hours?;

    Ok(cards
        .into_iter()
        .zip(hours)
        .map(|(card, weekly_hours)| {
            let progress = checklist_progress(checklists.get(&card.id).into_iter().flatten());
            let auto_collected = AutoCollected {
                checklist_progress: progress,
                comment_count: comments.get(&card.id).copied().unwrap_or(0),
                weekly_hours,
            };
            let user_input = UserInput {
                status: config.default_status.clone(),
                progress: None,
                description: card.description.clone(),
                issues: String::new(),
                expected_completion_date: card.due_date,
                hours_spent: weekly_hours,
            };
            InProgressCardSnapshot {
                card_id: card.id,
                list_id: card.list_id,
                list_title: list_info
                    .get(&card.list_id)
                    .map(|(_, title)| title.to_string())
                    .unwrap_or_default(),
                title: card.title,
                description: card.description,
                due_date: card.due_date,
                created_at: card.created_at,
                updated_at: card.updated_at,
                auto_collected,
                user_input,
            }
        })
        .collect())
}
