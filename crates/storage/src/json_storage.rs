//! JSON file storage implementation.
//!
//! Stores each entity as a JSON file under a data directory, one
//! subdirectory per kind. Weekly reports additionally get a key file named
//! after their `(board, author, week)` slot, created with `create_new` so a
//! second report for the same slot is rejected even across processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use taskboard_core::{
    Board, BoardId, BoardList, Card, CardFilter, CardId, Checklist, ChecklistId, Comment,
    ListId, Profile, ReportId, TimeLog, TimeLogFilter, UserId, WeeklyReport,
};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::trait_::{
    report_key, sort_cards, sort_checklists, sort_lists, sort_reports, sort_time_logs,
};
use super::{Result, Storage, StorageError};

const KINDS: &[&str] = &[
    "profiles",
    "boards",
    "lists",
    "cards",
    "checklists",
    "comments",
    "time_logs",
    "reports",
    "report_keys",
];

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the per-kind
    /// subdirectories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in KINDS {
            fs::create_dir_all(root.join(kind)).await?;
        }

        Ok(Self { root })
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: &str, id: impl std::fmt::Display) -> PathBuf {
        self.root.join(kind).join(format!("{}.json", id))
    }

    fn dir(&self, kind: &str) -> PathBuf {
        self.root.join(kind)
    }

    async fn write<T: serde::Serialize>(&self, kind: &str, id: impl std::fmt::Display, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(kind, id), json.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_profile(&mut self, profile: &Profile) -> Result<()> {
        self.write("profiles", profile.id, profile).await
    }

    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(profile) = read_json(&self.path("profiles", id)).await? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    async fn save_board(&mut self, board: &Board) -> Result<()> {
        self.write("boards", board.id, board).await
    }

    async fn load_board(&self, id: BoardId) -> Result<Option<Board>> {
        read_json(&self.path("boards", id)).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let mut boards: Vec<Board> = list_dir(&self.dir("boards")).await?;
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(boards)
    }

    async fn save_list(&mut self, list: &BoardList) -> Result<()> {
        self.write("lists", list.id, list).await
    }

    async fn load_list(&self, id: ListId) -> Result<Option<BoardList>> {
        read_json(&self.path("lists", id)).await
    }

    async fn list_lists(&self, board_id: BoardId) -> Result<Vec<BoardList>> {
        let mut lists: Vec<BoardList> = list_dir(&self.dir("lists"))
            .await?
            .into_iter()
            .filter(|l: &BoardList| l.board_id == board_id)
            .collect();
        sort_lists(&mut lists);
        Ok(lists)
    }

    async fn save_card(&mut self, card: &Card) -> Result<()> {
        self.write("cards", card.id, card).await
    }

    async fn load_card(&self, id: CardId) -> Result<Option<Card>> {
        read_json(&self.path("cards", id)).await
    }

    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let mut cards: Vec<Card> = list_dir(&self.dir("cards"))
            .await?
            .into_iter()
            .filter(|c: &Card| filter.matches(c))
            .collect();
        sort_cards(&mut cards);
        Ok(cards)
    }

    async fn delete_card(&mut self, id: CardId) -> Result<()> {
        fs::remove_file(self.path("cards", id)).await.or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
        })?;
        Ok(())
    }

    async fn save_checklist(&mut self, checklist: &Checklist) -> Result<()> {
        self.write("checklists", checklist.id, checklist).await
    }

    async fn load_checklist(&self, id: ChecklistId) -> Result<Option<Checklist>> {
        read_json(&self.path("checklists", id)).await
    }

    async fn list_checklists(&self, card_ids: &[CardId]) -> Result<Vec<Checklist>> {
        let mut checklists: Vec<Checklist> = list_dir(&self.dir("checklists"))
            .await?
            .into_iter()
            .filter(|c: &Checklist| card_ids.contains(&c.card_id))
            .collect();
        sort_checklists(&mut checklists);
        Ok(checklists)
    }

    async fn save_comment(&mut self, comment: &Comment) -> Result<()> {
        self.write("comments", comment.id, comment).await
    }

    async fn count_comments(&self, card_ids: &[CardId]) -> Result<HashMap<CardId, usize>> {
        let comments: Vec<Comment> = list_dir(&self.dir("comments")).await?;
        let mut counts = HashMap::new();
        for comment in comments.iter().filter(|c| card_ids.contains(&c.card_id)) {
            *counts.entry(comment.card_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn save_time_log(&mut self, log: &TimeLog) -> Result<()> {
        self.write("time_logs", log.id, log).await
    }

    async fn list_time_logs(&self, filter: &TimeLogFilter) -> Result<Vec<TimeLog>> {
        let mut logs: Vec<TimeLog> = list_dir(&self.dir("time_logs"))
            .await?
            .into_iter()
            .filter(|l: &TimeLog| filter.matches(l))
            .collect();
        sort_time_logs(&mut logs);
        Ok(logs)
    }

    async fn create_report(&mut self, report: &WeeklyReport) -> Result<()> {
        let key = report_key(report.board_id, report.author_id, report.week_start_date);

        // Body first, slot second: a key naming an id always has its body.
        self.write("reports", report.id, report).await?;
        if let Err(e) = self.claim_report_key(&key, report.id).await {
            remove_quietly(&self.path("reports", report.id)).await;
            return Err(e);
        }
        Ok(())
    }

    async fn load_report(&self, id: ReportId) -> Result<Option<WeeklyReport>> {
        read_json(&self.path("reports", id)).await
    }

    async fn find_report(
        &self,
        board_id: BoardId,
        author_id: UserId,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReport>> {
        let key = report_key(board_id, author_id, week_start);
        let Some(id) = read_report_key(&self.path("report_keys", key)).await? else {
            return Ok(None);
        };
        self.load_report(id).await
    }

    async fn list_reports(&self, board_id: BoardId) -> Result<Vec<WeeklyReport>> {
        let mut reports: Vec<WeeklyReport> = list_dir(&self.dir("reports"))
            .await?
            .into_iter()
            .filter(|r: &WeeklyReport| r.board_id == board_id)
            .collect();
        sort_reports(&mut reports);
        Ok(reports)
    }

    async fn update_report(&mut self, report: &WeeklyReport) -> Result<()> {
        if !fs::try_exists(self.path("reports", report.id)).await? {
            return Err(StorageError::NotFound(format!("weekly report {}", report.id)));
        }
        self.write("reports", report.id, report).await
    }
}

impl JsonStorage {
    /// Claim the `(board, author, week)` slot for `id`.
    ///
    /// A key whose report body is gone is a leftover and is taken over. An
    /// empty key belongs to a creation in flight and counts as taken.
    async fn claim_report_key(&self, key: &str, id: ReportId) -> Result<()> {
        let key_path = self.path("report_keys", key);
        let contents = serde_json::to_string(&id)?;

        let mut file = match create_new(&key_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let stale = match read_report_key(&key_path).await {
                    Ok(Some(owner)) => !fs::try_exists(self.path("reports", owner)).await?,
                    _ => false,
                };
                if !stale {
                    return Err(slot_taken(key));
                }
                warn!("Replacing report key {} left by a failed creation", key);
                remove_quietly(&key_path).await;
                match create_new(&key_path).await {
                    Ok(file) => file,
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        return Err(slot_taken(key));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let written: std::io::Result<()> = async {
            file.write_all(contents.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            remove_quietly(&key_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn create_new(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path).await
}

fn slot_taken(key: &str) -> StorageError {
    StorageError::Conflict(format!("weekly report already exists for {}", key))
}

/// Report id recorded in a key file. Missing and still-empty keys read as
/// `None`.
async fn read_report_key(path: &Path) -> Result<Option<ReportId>> {
    match fs::read_to_string(path).await {
        Ok(json) if json.trim().is_empty() => Ok(None),
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable {}: {}", entry.path().display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::{week_window, ChecklistItem};

    async fn storage() -> (tempfile::TempDir, JsonStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_board_and_lists() {
        let (_dir, mut storage) = storage().await;
        let owner = UserId::new();
        let board = Board::new("Team", owner);
        storage.save_board(&board).await.unwrap();

        let done = BoardList::new(board.id, "Done", 2);
        let todo = BoardList::new(board.id, "Todo", 0);
        let other = BoardList::new(BoardId::new(), "Elsewhere", 0);
        for list in [&done, &todo, &other] {
            storage.save_list(list).await.unwrap();
        }

        let loaded = storage.load_board(board.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Team");

        let lists = storage.list_lists(board.id).await.unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].title, "Todo");
        assert_eq!(lists[1].title, "Done");
    }

    #[tokio::test]
    async fn test_card_filter_and_delete() {
        let (_dir, mut storage) = storage().await;
        let user = UserId::new();
        let list = ListId::new();

        let open = Card::new(list, "Open", user);
        let mut done = Card::new(list, "Done", user);
        done.complete(user, chrono::Utc::now());
        storage.save_card(&open).await.unwrap();
        storage.save_card(&done).await.unwrap();

        let completed = storage
            .list_cards(&CardFilter::in_lists(vec![list]).completed(true))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        storage.delete_card(done.id).await.unwrap();
        storage.delete_card(done.id).await.unwrap();
        assert!(storage.load_card(done.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batched_lookups() {
        let (_dir, mut storage) = storage().await;
        let user = UserId::new();
        let a = CardId::new();
        let b = CardId::new();

        let mut checklist = Checklist::new(a, "Steps");
        checklist.items.push(ChecklistItem::new("one", 0));
        storage.save_checklist(&checklist).await.unwrap();
        storage.save_checklist(&Checklist::new(CardId::new(), "Other")).await.unwrap();

        storage.save_comment(&Comment::new(a, user, "hi")).await.unwrap();
        storage.save_comment(&Comment::new(a, user, "again")).await.unwrap();
        storage.save_comment(&Comment::new(b, user, "hello")).await.unwrap();

        let checklists = storage.list_checklists(&[a, b]).await.unwrap();
        assert_eq!(checklists.len(), 1);
        assert_eq!(checklists[0].items.len(), 1);

        let counts = storage.count_comments(&[a, b]).await.unwrap();
        assert_eq!(counts.get(&a), Some(&2));
        assert_eq!(counts.get(&b), Some(&1));

        let mut profile = Profile::new("Kim");
        profile.id = user;
        storage.save_profile(&profile).await.unwrap();
        let profiles = storage.load_profiles(&[user, UserId::new()]).await.unwrap();
        assert_eq!(profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_time_log_filter() {
        let (_dir, mut storage) = storage().await;
        let card = CardId::new();
        let user = UserId::new();

        storage.save_time_log(&TimeLog::new(card, user, 2.0, date(2024, 3, 5))).await.unwrap();
        storage.save_time_log(&TimeLog::new(card, user, 1.0, date(2024, 3, 12))).await.unwrap();

        let logs = storage
            .list_time_logs(&TimeLogFilter::for_card(card).between(date(2024, 3, 4), date(2024, 3, 10)))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].hours, 2.0);
    }

    #[tokio::test]
    async fn test_report_uniqueness() {
        let (_dir, mut storage) = storage().await;
        let board = BoardId::new();
        let author = UserId::new();
        let week = week_window(date(2024, 3, 6));

        let report = WeeklyReport::new_draft(board, author, &week);
        storage.create_report(&report).await.unwrap();

        let duplicate = WeeklyReport::new_draft(board, author, &week);
        let err = storage.create_report(&duplicate).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let found = storage
            .find_report(board, author, week.start_date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, report.id);
        assert_eq!(storage.list_reports(board).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_report() {
        let (_dir, mut storage) = storage().await;
        let week = week_window(date(2024, 3, 6));
        let report = WeeklyReport::new_draft(BoardId::new(), UserId::new(), &week);

        let err = storage.update_report(&report).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        storage.create_report(&report).await.unwrap();
        let mut edited = report.clone();
        edited.notes = "shipped".to_string();
        storage.update_report(&edited).await.unwrap();
        let loaded = storage.load_report(report.id).await.unwrap().unwrap();
        assert_eq!(loaded.notes, "shipped");
    }

    #[tokio::test]
    async fn test_failed_body_write_leaves_slot_free() {
        let (dir, mut storage) = storage().await;
        let board = BoardId::new();
        let author = UserId::new();
        let week = week_window(date(2024, 3, 6));
        let report = WeeklyReport::new_draft(board, author, &week);

        // A directory where the report body should go makes the write fail.
        let body = dir.path().join("reports").join(format!("{}.json", report.id));
        fs::create_dir(&body).await.unwrap();
        assert!(storage.create_report(&report).await.is_err());

        let key = report_key(board, author, week.start_date());
        let key_path = dir.path().join("report_keys").join(format!("{}.json", key));
        assert!(!fs::try_exists(&key_path).await.unwrap());
        assert!(storage.find_report(board, author, week.start_date()).await.unwrap().is_none());

        fs::remove_dir(&body).await.unwrap();
        storage.create_report(&report).await.unwrap();
        let found = storage.find_report(board, author, week.start_date()).await.unwrap().unwrap();
        assert_eq!(found.id, report.id);
    }

    #[tokio::test]
    async fn test_dangling_report_key_is_reclaimed() {
        let (dir, mut storage) = storage().await;
        let board = BoardId::new();
        let author = UserId::new();
        let week = week_window(date(2024, 3, 6));

        let key = report_key(board, author, week.start_date());
        let key_path = dir.path().join("report_keys").join(format!("{}.json", key));
        fs::write(&key_path, serde_json::to_string(&ReportId::new()).unwrap())
            .await
            .unwrap();
        assert!(storage.find_report(board, author, week.start_date()).await.unwrap().is_none());

        let report = WeeklyReport::new_draft(board, author, &week);
        storage.create_report(&report).await.unwrap();
        let found = storage.find_report(board, author, week.start_date()).await.unwrap().unwrap();
        assert_eq!(found.id, report.id);

        let duplicate = WeeklyReport::new_draft(board, author, &week);
        let err = storage.create_report(&duplicate).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(storage.load_report(duplicate.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_report_key_reads_as_pending() {
        let (dir, mut storage) = storage().await;
        let board = BoardId::new();
        let author = UserId::new();
        let week = week_window(date(2024, 3, 6));

        let key = report_key(board, author, week.start_date());
        let key_path = dir.path().join("report_keys").join(format!("{}.json", key));
        fs::write(&key_path, "").await.unwrap();

        assert!(storage.find_report(board, author, week.start_date()).await.unwrap().is_none());

        let report = WeeklyReport::new_draft(board, author, &week);
        let err = storage.create_report(&report).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(storage.list_reports(board).await.unwrap().is_empty());
    }
}
