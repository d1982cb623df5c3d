//! Completed-work collection.

use std::collections::{HashMap, HashSet};
use taskboard_core::{
    checklist_progress, BoardId, CardFilter, CardId, Checklist, ChecklistSnapshot,
    CompletedCardSnapshot, DateRange, ProfileSummary, UserId, WeekWindow,
};
use taskboard_storage::{Result, Storage};
use tracing::{debug, error, warn};

use crate::hours::weekly_hours;

/// Completed cards of a board whose completion falls in `range` (every
/// completed card when `None`), with hours counted over `hours_week`.
///
/// Newest completion first. Storage failures are logged and yield an
/// empty list.
pub async fn collect_completed<S: Storage + ?Sized>(
    storage: &S,
    board_id: BoardId,
    range: Option<DateRange>,
    hours_week: &WeekWindow,
) -> Vec<CompletedCardSnapshot> {
    match try_collect_completed(storage, board_id, range, hours_week).await {
        Ok(cards) => {
            debug!(board = %board_id, count = cards.len(), "Collected completed cards");
            cards
        }
        Err(e) => {
            error!(board = %board_id, "Failed to collect completed cards: {}", e);
            Vec::new()
        }
    }
}

async fn try_collect_completed<S: Storage + ?Sized>(
    storage: &S,
    board_id: BoardId,
    range: Option<DateRange>,
    hours_week: &WeekWindow,
) -> Result<Vec<CompletedCardSnapshot>> {
    let lists = storage.list_lists(board_id).await?;
    if lists.is_empty() {
        return Ok(Vec::new());
    }
    let list_titles: HashMap<_, _> = lists.iter().map(|l| (l.id, l.title.as_str())).collect();

    let filter = CardFilter::in_lists(lists.iter().map(|l| l.id).collect()).completed(true);
    let cards: Vec<_> = storage
        .list_cards(&filter)
        .await?
        .into_iter()
        .filter(|c| match (&range, c.completed_at) {
            (None, _) => true,
            (Some(range), Some(at)) => range.contains(at),
            (Some(_), None) => false,
        })
        .collect();
    if cards.is_empty() {
        return Ok(Vec::new());
    }

    let card_ids: Vec<CardId> = cards.iter().map(|c| c.id).collect();
    let completer_ids: Vec<UserId> = cards
        .iter()
        .filter_map(|c| c.completed_by)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let (profiles, checklists, hours) = tokio::join!(
        storage.load_profiles(&completer_ids),
        storage.list_checklists(&card_ids),
        weekly_hours(storage, &card_ids, hours_week),
    );

    let profiles: HashMap<UserId, ProfileSummary> = match profiles {
        Ok(profiles) => profiles.iter().map(|p| (p.id, p.summary())).collect(),
        Err(e) => {
            warn!(board = %board_id, "Profile lookup failed, omitting completers: {}", e);
            HashMap::new()
        }
    };
    let checklists = group_by_card(checklists?);
    let hours = hours?;

    let mut snapshots: Vec<CompletedCardSnapshot> = cards
        .into_iter()
        .zip(hours)
        .map(|(card, weekly_hours)| {
            let card_checklists = checklists.get(&card.id).map(Vec::as_slice).unwrap_or(&[]);
            CompletedCardSnapshot {
                card_id: card.id,
                list_id: card.list_id,
                list_title: list_titles.get(&card.list_id).copied().unwrap_or_default().to_string(),
                title: card.title,
                description: card.description,
                due_date: card.due_date,
                completed_at: card.completed_at,
                completed_by: card.completed_by.and_then(|id| profiles.get(&id).cloned()),
                checklists: card_checklists.iter().map(ChecklistSnapshot::from).collect(),
                checklist_progress: checklist_progress(card_checklists),
                weekly_hours,
            }
        })
        .collect();

    snapshots.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.card_id.cmp(&b.card_id)));
    Ok(snapshots)
}

pub(crate) fn group_by_card(checklists: Vec<Checklist>) -> HashMap<CardId, Vec<Checklist>> {
    let mut grouped: HashMap<CardId, Vec<Checklist>> = HashMap::new();
    for checklist in checklists {
        grouped.entry(checklist.card_id).or_default().push(checklist);
    }
    grouped
}
