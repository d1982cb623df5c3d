use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use taskboard_core::*;
use taskboard_report::{ReportService, DEFAULT_IN_PROGRESS_STATUS};
use taskboard_storage::{JsonStorage, Result, Storage, StorageError};
use taskboard_work::BoardManager;

/// Which reads should fail.
#[derive(Default, Clone, Copy)]
struct Faults {
    profiles: bool,
    comments: bool,
    time_logs: bool,
}

/// JSON storage with injectable read failures.
struct FlakyStorage {
    inner: JsonStorage,
    faults: Faults,
}

fn unavailable(what: &str) -> StorageError {
    StorageError::Other(format!("{} unavailable", what))
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn save_profile(&mut self, profile: &Profile) -> Result<()> {
        self.inner.save_profile(profile).await
    }

    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        if self.faults.profiles {
            return Err(unavailable("profiles"));
        }
        self.inner.load_profiles(ids).await
    }

    async fn save_board(&mut self, board: &Board) -> Result<()> {
        self.inner.save_board(board).await
    }

    async fn load_board(&self, id: BoardId) -> Result<Option<Board>> {
        self.inner.load_board(id).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.inner.list_boards().await
    }

    async fn save_list(&mut self, list: &BoardList) -> Result<()> {
        self.inner.save_list(list).await
    }

    async fn load_list(&self, id: ListId) -> Result<Option<BoardList>> {
        self.inner.load_list(id).await
    }

    async fn list_lists(&self, board_id: BoardId) -> Result<Vec<BoardList>> {
        self.inner.list_lists(board_id).await
    }

    async fn save_card(&mut self, card: &Card) -> Result<()> {
        self.inner.save_card(card).await
    }

    async fn load_card(&self, id: CardId) -> Result<Option<Card>> {
        self.inner.load_card(id).await
    }

    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        self.inner.list_cards(filter).await
    }

    async fn delete_card(&mut self, id: CardId) -> Result<()> {
        self.inner.delete_card(id).await
    }

    async fn save_checklist(&mut self, checklist: &Checklist) -> Result<()> {
        self.inner.save_checklist(checklist).await
    }

    async fn load_checklist(&self, id: ChecklistId) -> Result<Option<Checklist>> {
        self.inner.load_checklist(id).await
    }

    async fn list_checklists(&self, card_ids: &[CardId]) -> Result<Vec<Checklist>> {
        self.inner.list_checklists(card_ids).await
    }

    async fn save_comment(&mut self, comment: &Comment) -> Result<()> {
        self.inner.save_comment(comment).await
    }

    async fn count_comments(&self, card_ids: &[CardId]) -> Result<HashMap<CardId, usize>> {
        if self.faults.comments {
            return Err(unavailable("comments"));
        }
        self.inner.count_comments(card_ids).await
    }

    async fn save_time_log(&mut self, log: &TimeLog) -> Result<()> {
        self.inner.save_time_log(log).await
    }

    async fn list_time_logs(&self, filter: &TimeLogFilter) -> Result<Vec<TimeLog>> {
        if self.faults.time_logs {
            return Err(unavailable("time logs"));
        }
        self.inner.list_time_logs(filter).await
    }

    async fn create_report(&mut self, report: &WeeklyReport) -> Result<()> {
        self.inner.create_report(report).await
    }

    async fn load_report(&self, id: ReportId) -> Result<Option<WeeklyReport>> {
        self.inner.load_report(id).await
    }

    async fn find_report(
        &self,
        board_id: BoardId,
        author_id: UserId,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReport>> {
        self.inner.find_report(board_id, author_id, week_start).await
    }

    async fn list_reports(&self, board_id: BoardId) -> Result<Vec<WeeklyReport>> {
        self.inner.list_reports(board_id).await
    }

    async fn update_report(&mut self, report: &WeeklyReport) -> Result<()> {
        self.inner.update_report(report).await
    }
}

struct Seeded {
    storage: JsonStorage,
    user: UserId,
    board: BoardId,
    done_card: CardId,
    open_card: CardId,
}

/// Build a board through the manager: one completed card with a checked
/// item worth 2 hours, one open card with a comment and a 1.5 hour log.
async fn seed(dir: &std::path::Path, today: NaiveDate) -> Seeded {
    let storage = JsonStorage::new(dir).await.unwrap();
    let mut manager = BoardManager::new(storage);

    let user = manager.add_profile("Lee Jiho", None).await.unwrap();
    let board = manager.create_board(user.id, "Ops").await.unwrap();
    let overview = manager.board_overview(board.id).await.unwrap();
    let todo = overview.lists[0].0.id;

    let shipped = manager.add_card(todo, user.id, "Ship", "", None).await.unwrap();
    let checklist = manager.add_checklist(shipped.id, "Release").await.unwrap();
    let item = manager.add_checklist_item(checklist.id, "tag release").await.unwrap();
    manager
        .set_item_checked(checklist.id, item.id, true, user.id, Some(2.0), today)
        .await
        .unwrap();
    manager.complete_card(shipped.id, user.id).await.unwrap();

    let open = manager
        .add_card(todo, user.id, "Migrate", "move the queue", Some(today))
        .await
        .unwrap();
    manager.add_comment(open.id, user.id, "blocked on infra").await.unwrap();
    manager.log_time(open.id, user.id, 1.5, today, "").await.unwrap();

    Seeded {
        storage: manager.into_inner(),
        user: user.id,
        board: board.id,
        done_card: shipped.id,
        open_card: open.id,
    }
}

#[tokio::test]
async fn test_board_built_through_manager() {
    let dir = tempfile::tempdir().unwrap();
    let today = Utc::now().date_naive();
    let seeded = seed(dir.path(), today).await;

    let mut service = ReportService::new(seeded.storage);
    let report = service.create(Some(seeded.user), seeded.board, today).await.unwrap();

    assert_eq!(report.completed_cards.len(), 1);
    let done = &report.completed_cards[0];
    assert_eq!(done.card_id, seeded.done_card);
    assert_eq!(done.weekly_hours, 2.0);
    assert_eq!(done.checklist_progress, 100);
    assert_eq!(done.checklists[0].items[0].content, "tag release");

    assert_eq!(report.in_progress_cards.len(), 1);
    let open = &report.in_progress_cards[0];
    assert_eq!(open.card_id, seeded.open_card);
    assert_eq!(open.auto_collected.comment_count, 1);
    assert_eq!(open.auto_collected.weekly_hours, 1.5);
    assert_eq!(open.user_input.status, DEFAULT_IN_PROGRESS_STATUS);
    assert_eq!(open.user_input.description, "move the queue");
    assert_eq!(open.user_input.expected_completion_date, Some(today));
    assert_eq!(open.user_input.progress, None);

    assert_eq!(report.total_hours, 3.5);
    assert!(report
        .card_activities
        .iter()
        .any(|e| matches!(e, ActivityEvent::ChecklistItemCompleted { item_content, .. } if item_content == "tag release")));
}

#[tokio::test]
async fn test_comment_failure_only_empties_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let today = Utc::now().date_naive();
    let seeded = seed(dir.path(), today).await;

    let storage = FlakyStorage {
        inner: seeded.storage,
        faults: Faults {
            comments: true,
            ..Default::default()
        },
    };
    let mut service = ReportService::new(storage);
    let report = service.create(Some(seeded.user), seeded.board, today).await.unwrap();

    assert!(report.in_progress_cards.is_empty());
    assert_eq!(report.completed_cards.len(), 1);
    assert!(!report.card_activities.is_empty());
    assert_eq!(report.total_hours, 2.0);
}

#[tokio::test]
async fn test_time_log_failure_degrades_every_collector() {
    let dir = tempfile::tempdir().unwrap();
    let today = Utc::now().date_naive();
    let seeded = seed(dir.path(), today).await;

    let storage = FlakyStorage {
        inner: seeded.storage,
        faults: Faults {
            time_logs: true,
            ..Default::default()
        },
    };
    let mut service = ReportService::new(storage);
    let report = service.create(Some(seeded.user), seeded.board, today).await.unwrap();

    assert!(report.completed_cards.is_empty());
    assert!(report.in_progress_cards.is_empty());
    assert!(report.card_activities.is_empty());
    assert_eq!(report.total_hours, 0.0);
    // The draft still exists and can be refreshed once storage recovers.
    assert!(service
        .storage()
        .find_report(seeded.board, seeded.user, report.week_start_date)
        .await
        .unwrap()
        .is_some());

    service.storage_mut().faults = Faults::default();
    let refreshed = service.refresh(Some(seeded.user), report.id).await.unwrap();
    assert_eq!(refreshed.total_hours, 3.5);
}

#[tokio::test]
async fn test_profile_failure_keeps_completed_cards() {
    let dir = tempfile::tempdir().unwrap();
    let today = Utc::now().date_naive();
    let seeded = seed(dir.path(), today).await;

    let storage = FlakyStorage {
        inner: seeded.storage,
        faults: Faults {
            profiles: true,
            ..Default::default()
        },
    };
    let service = ReportService::new(storage);
    let completed = service
        .completed_cards(Some(seeded.user), seeded.board, Period::All, today)
        .await
        .unwrap();

    assert_eq!(completed.len(), 1);
    assert!(completed[0].completed_by.is_none());
}
