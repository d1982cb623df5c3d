//! Report lifecycle against the SQLite backend.

use chrono::{NaiveDate, TimeZone, Utc};
use taskboard_core::{
    Board, BoardId, BoardList, Card, Checklist, ChecklistItem, Profile, ReportPatch, Time,
    TimeLog, UserId, WeeklyReport,
};
use taskboard_report::{ReportError, ReportService};
use taskboard_storage::{SqliteStorage, Storage, StorageError};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn at(d: u32, h: u32) -> Time {
    Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
}

struct Seeded {
    service: ReportService<SqliteStorage>,
    user: UserId,
    board: BoardId,
    open: Card,
}

/// One card completed on Tuesday with 3 hours, one open card at 1/2.
async fn seeded() -> Seeded {
    let mut storage = SqliteStorage::in_memory().await.unwrap();

    let profile = Profile::new("Park Seoyeon");
    storage.save_profile(&profile).await.unwrap();
    let board = Board::new("Payments", profile.id);
    storage.save_board(&board).await.unwrap();
    let doing = BoardList::new(board.id, "In Progress", 0);
    let done = BoardList::new(board.id, "Done", 1);
    storage.save_list(&doing).await.unwrap();
    storage.save_list(&done).await.unwrap();

    let mut finished = Card::new(done.id, "Settle refunds", profile.id);
    finished.created_at = at(4, 9);
    finished.complete(profile.id, at(5, 16));
    storage.save_card(&finished).await.unwrap();
    storage
        .save_time_log(&TimeLog::new(finished.id, profile.id, 3.0, day(5)))
        .await
        .unwrap();

    let mut open = Card::new(doing.id, "Chargeback webhook", profile.id);
    open.created_at = at(4, 10);
    open.updated_at = at(4, 10);
    storage.save_card(&open).await.unwrap();
    let mut checklist = Checklist::new(open.id, "Steps");
    let mut first = ChecklistItem::new("schema", 0);
    first.is_checked = true;
    checklist.items.push(first);
    checklist.items.push(ChecklistItem::new("handler", 1));
    storage.save_checklist(&checklist).await.unwrap();

    Seeded {
        service: ReportService::new(storage),
        user: profile.id,
        board: board.id,
        open,
    }
}

#[tokio::test]
async fn test_duplicate_week_conflicts() {
    let mut s = seeded().await;
    let report = s.service.create(Some(s.user), s.board, day(6)).await.unwrap();
    assert_eq!(report.total_hours, 3.0);

    let err = s.service.create(Some(s.user), s.board, day(8)).await.unwrap_err();
    assert!(matches!(err, ReportError::Conflict(_)));

    // An insert that slips past the lookup hits the unique index.
    let racing = WeeklyReport::new_draft(s.board, s.user, &report.week());
    let err = s.service.storage_mut().create_report(&racing).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(s.service.list(Some(s.user), s.board).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_is_idempotent_and_persisted() {
    let mut s = seeded().await;
    let report = s.service.create(Some(s.user), s.board, day(6)).await.unwrap();
    assert_eq!(report.in_progress_cards[0].auto_collected.checklist_progress, 50);

    let mut edited = report.in_progress_cards.clone();
    edited[0].user_input.status = "대기".to_string();
    edited[0].user_input.hours_spent = 4.0;
    s.service
        .update(Some(s.user), report.id, ReportPatch {
            in_progress_cards: Some(edited),
            ..Default::default()
        })
        .await
        .unwrap();
    s.service
        .storage_mut()
        .save_time_log(&TimeLog::new(s.open.id, s.user, 2.0, day(6)))
        .await
        .unwrap();

    let first = s.service.refresh(Some(s.user), report.id).await.unwrap();
    let second = s.service.refresh(Some(s.user), report.id).await.unwrap();
    assert_eq!(first.completed_cards, second.completed_cards);
    assert_eq!(first.in_progress_cards, second.in_progress_cards);
    assert_eq!(first.card_activities, second.card_activities);
    assert_eq!(second.total_hours, 7.0);

    let stored = s.service.get(Some(s.user), report.id).await.unwrap();
    assert_eq!(stored.in_progress_cards[0].user_input.status, "대기");
    assert_eq!(stored.in_progress_cards[0].user_input.hours_spent, 4.0);
    assert_eq!(stored.total_hours, 7.0);
}

#[tokio::test]
async fn test_submitted_report_rejects_refresh() {
    let mut s = seeded().await;
    let report = s.service.open(Some(s.user), s.board, day(6)).await.unwrap();
    let submitted = s.service.submit(Some(s.user), report.id).await.unwrap();

    let err = s.service.refresh(Some(s.user), report.id).await.unwrap_err();
    assert!(matches!(err, ReportError::Forbidden(_)));
    assert_eq!(s.service.get(Some(s.user), report.id).await.unwrap(), submitted);
}
