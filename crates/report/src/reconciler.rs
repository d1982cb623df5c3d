//! Weekly report lifecycle: create, refresh, edit and submit.
//!
//! ```text
//! open/refresh → collect (completed | in-progress | activities) → merge → totals → persist
//! ```

use std::collections::{HashMap, HashSet};
use chrono::NaiveDate;
use taskboard_core::{
    week_window, ActivityEvent, BoardId, CompletedCardSnapshot, InProgressCardSnapshot, Period,
    ReportId, ReportPatch, ReportStatus, UserId, UserInput, WeekWindow, WeeklyReport,
};
use taskboard_storage::{Storage, StorageError};
use tracing::{info, warn};

use crate::activity::collect_activities;
use crate::completed::collect_completed;
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::in_progress::collect_in_progress;

/// Output of one collection pass.
#[derive(Debug, Clone)]
struct Collected {
    completed: Vec<CompletedCardSnapshot>,
    in_progress: Vec<InProgressCardSnapshot>,
    activities: Vec<ActivityEvent>,
}

/// Weekly report service.
pub struct ReportService<S: Storage> {
    storage: S,
    config: ReportConfig,
}

impl<S: Storage> ReportService<S> {
    /// Create a new report service.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: ReportConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the underlying storage.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Give back the storage.
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Create the actor's report for the week containing `reference`.
    ///
    /// Fails with [`ReportError::Conflict`] if one already exists.
    pub async fn create(
        &mut self,
        actor: Option<UserId>,
        board_id: BoardId,
        reference: NaiveDate,
    ) -> Result<WeeklyReport> {
        let author = authenticate(actor)?;
        self.ensure_board(board_id).await?;
        let week = week_window(reference);

        if self
            .storage
            .find_report(board_id, author, week.start_date())
            .await?
            .is_some()
        {
            return Err(conflict(board_id, &week));
        }

        let collected = self.collect(board_id, &week).await;

        let mut report = WeeklyReport::new_draft(board_id, author, &week);
        report.completed_cards = collected.completed;
        report.in_progress_cards = without_completed(collected.in_progress, &report.completed_cards);
        report.card_activities = collected.activities;
        report.recompute_totals();

        match self.storage.create_report(&report).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => return Err(conflict(board_id, &week)),
            Err(e) => return Err(e.into()),
        }

        info!(
            report = %report.id,
            board = %board_id,
            week = %report.week_start_date,
            "Created weekly report ({} completed, {} in progress, {:.1}h)",
            report.completed_cards.len(),
            report.in_progress_cards.len(),
            report.total_hours
        );
        Ok(report)
    }

    /// Re-collect a draft report and merge it with the author's edits.
    pub async fn refresh(&mut self, actor: Option<UserId>, report_id: ReportId) -> Result<WeeklyReport> {
        let author = authenticate(actor)?;
        let mut report = self.load(report_id).await?;
        ensure_editable(&report, author)?;

        let week = report.week();
        let collected = self.collect(report.board_id, &week).await;

        let merged = merge_in_progress(collected.in_progress, &report.in_progress_cards);
        report.completed_cards = collected.completed;
        report.in_progress_cards = without_completed(merged, &report.completed_cards);
        report.card_activities = collected.activities;
        report.recompute_totals();
        report.updated_at = chrono::Utc::now();

        self.storage.update_report(&report).await?;
        info!(
            report = %report.id,
            "Refreshed weekly report ({} completed, {} in progress, {:.1}h)",
            report.completed_cards.len(),
            report.in_progress_cards.len(),
            report.total_hours
        );
        Ok(report)
    }

    /// Save caller-supplied fields on a draft. Totals are recomputed.
    pub async fn update(
        &mut self,
        actor: Option<UserId>,
        report_id: ReportId,
        patch: ReportPatch,
    ) -> Result<WeeklyReport> {
        let author = authenticate(actor)?;
        let mut report = self.load(report_id).await?;
        ensure_editable(&report, author)?;

        let now = chrono::Utc::now();
        if let Some(cards) = patch.in_progress_cards {
            report.in_progress_cards = cards;
        }
        if let Some(notes) = patch.notes {
            report.notes = notes;
        }
        if let Some(status) = patch.status {
            if status == ReportStatus::Submitted {
                report.submitted_at = Some(now);
            }
            report.status = status;
        }
        report.recompute_totals();
        report.updated_at = now;

        self.storage.update_report(&report).await?;
        info!(report = %report.id, status = %report.status, "Updated weekly report");
        Ok(report)
    }

    /// Submit a draft. The report is frozen afterwards.
    pub async fn submit(&mut self, actor: Option<UserId>, report_id: ReportId) -> Result<WeeklyReport> {
        let patch = ReportPatch {
            status: Some(ReportStatus::Submitted),
            ..Default::default()
        };
        self.update(actor, report_id, patch).await
    }

    /// The "open report" action: the actor's report for the week containing
    /// `reference`, refreshed if still a draft, created if missing.
    pub async fn open(
        &mut self,
        actor: Option<UserId>,
        board_id: BoardId,
        reference: NaiveDate,
    ) -> Result<WeeklyReport> {
        let author = authenticate(actor)?;
        let week = week_window(reference);

        let existing = self
            .storage
            .find_report(board_id, author, week.start_date())
            .await?;
        match existing {
            Some(report) if report.is_draft() => self.refresh(actor, report.id).await,
            Some(report) => Ok(report),
            None => match self.create(actor, board_id, reference).await {
                Err(ReportError::Conflict(msg)) => {
                    // Lost a creation race; use the winner's report.
                    warn!(board = %board_id, "{}", msg);
                    self.storage
                        .find_report(board_id, author, week.start_date())
                        .await?
                        .ok_or(ReportError::Conflict(msg))
                }
                other => other,
            },
        }
    }

    /// Load a report.
    pub async fn get(&self, actor: Option<UserId>, report_id: ReportId) -> Result<WeeklyReport> {
        authenticate(actor)?;
        self.load(report_id).await
    }

    /// Reports of a board, newest week first.
    pub async fn list(&self, actor: Option<UserId>, board_id: BoardId) -> Result<Vec<WeeklyReport>> {
        authenticate(actor)?;
        Ok(self.storage.list_reports(board_id).await?)
    }

    /// Completed cards of a board for a period around `reference`, with
    /// hours counted over the week containing `reference`.
    pub async fn completed_cards(
        &self,
        actor: Option<UserId>,
        board_id: BoardId,
        period: Period,
        reference: NaiveDate,
    ) -> Result<Vec<CompletedCardSnapshot>> {
        authenticate(actor)?;
        self.ensure_board(board_id).await?;
        let week = week_window(reference);
        Ok(collect_completed(&self.storage, board_id, period.resolve(reference), &week).await)
    }

    async fn collect(&self, board_id: BoardId, week: &WeekWindow) -> Collected {
        let (completed, in_progress, activities) = tokio::join!(
            collect_completed(&self.storage, board_id, Some(week.range()), week),
            collect_in_progress(&self.storage, &self.config, board_id, week),
            collect_activities(&self.storage, &self.config, board_id, week),
        );
        Collected {
            completed,
            in_progress,
            activities,
        }
    }

    async fn load(&self, report_id: ReportId) -> Result<WeeklyReport> {
        self.storage
            .load_report(report_id)
            .await?
            .ok_or_else(|| ReportError::NotFound(format!("weekly report {}", report_id)))
    }

    async fn ensure_board(&self, board_id: BoardId) -> Result<()> {
        match self.storage.load_board(board_id).await? {
            Some(_) => Ok(()),
            None => Err(ReportError::NotFound(format!("board {}", board_id))),
        }
    }
}

fn authenticate(actor: Option<UserId>) -> Result<UserId> {
    actor.ok_or(ReportError::NotAuthenticated)
}

fn ensure_editable(report: &WeeklyReport, actor: UserId) -> Result<()> {
    if report.author_id != actor {
        return Err(ReportError::Forbidden(format!(
            "weekly report {} belongs to another user",
            report.id
        )));
    }
    if !report.is_draft() {
        return Err(ReportError::Forbidden(format!(
            "weekly report {} has already been submitted",
            report.id
        )));
    }
    Ok(())
}

fn conflict(board_id: BoardId, week: &WeekWindow) -> ReportError {
    ReportError::Conflict(format!(
        "a weekly report for board {} and the week of {} already exists",
        board_id,
        week.start_date()
    ))
}

fn without_completed(
    mut in_progress: Vec<InProgressCardSnapshot>,
    completed: &[CompletedCardSnapshot],
) -> Vec<InProgressCardSnapshot> {
    let done: HashSet<_> = completed.iter().map(|c| c.card_id).collect();
    in_progress.retain(|c| !done.contains(&c.card_id));
    in_progress
}

/// Carry the author's edits from `prior` over to a fresh collection.
///
/// Cards absent from `fresh` are dropped; cards new in `fresh` keep their
/// seeded input.
pub fn merge_in_progress(
    fresh: Vec<InProgressCardSnapshot>,
    prior: &[InProgressCardSnapshot],
) -> Vec<InProgressCardSnapshot> {
    let prior: HashMap<_, _> = prior.iter().map(|c| (c.card_id, &c.user_input)).collect();

    fresh
        .into_iter()
        .map(|mut card| {
            if let Some(previous) = prior.get(&card.card_id) {
                card.user_input =
                    merge_user_input(previous, &card.user_input, card.auto_collected.weekly_hours);
            }
            card
        })
        .collect()
}

/// Merge one card's input: larger hours win, non-empty text and set
/// fields from `prior` are kept, everything else comes from `fresh`.
pub fn merge_user_input(prior: &UserInput, fresh: &UserInput, fresh_hours: f64) -> UserInput {
    UserInput {
        status: keep_text(&prior.status, &fresh.status),
        progress: prior.progress.or(fresh.progress),
        description: keep_text(&prior.description, &fresh.description),
        issues: keep_text(&prior.issues, &fresh.issues),
        expected_completion_date: prior.expected_completion_date.or(fresh.expected_completion_date),
        hours_spent: if prior.hours_spent > fresh_hours {
            prior.hours_spent
        } else {
            fresh_hours
        },
    }
}

fn keep_text(prior: &str, fresh: &str) -> String {
    if prior.trim().is_empty() {
        fresh.to_string()
    } else {
        prior.to_string()
    }
}
