//! Per-card weekly hour lookups.

use futures::future::join_all;
use taskboard_core::{total_hours, CardId, TimeLogFilter, WeekWindow};
use taskboard_storage::{Result, Storage};

/// Hours logged against each card during `week`, in the order of
/// `card_ids`. One lookup per card, all in flight at once.
pub(crate) async fn weekly_hours<S: Storage + ?Sized>(
    storage: &S,
    card_ids: &[CardId],
    week: &WeekWindow,
) -> Result<Vec<f64>> {
    let lookups = card_ids.iter().map(|id| {
        let filter = TimeLogFilter::for_card(*id).between(week.start_date(), week.end_date());
        async move { storage.list_time_logs(&filter).await }
    });

    join_all(lookups)
        .await
        .into_iter()
        .map(|logs| logs.map(|logs| total_hours(&logs)))
        .collect()
}
