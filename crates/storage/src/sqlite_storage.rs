//! SQLite storage backend for Taskboard.
//!
//! Kanban entities are stored as JSON documents in a single `entities` table
//! keyed by kind and parent id. Weekly reports live in their own table with
//! a UNIQUE index on `(board_id, author_id, week_start)`, so duplicate
//! creation is rejected by the database itself.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use taskboard_core::{
    Board, BoardId, BoardList, Card, CardFilter, CardId, Checklist, ChecklistId, Comment,
    ListId, Profile, ReportId, TimeLog, TimeLogFilter, UserId, WeeklyReport,
};
use tracing::warn;

use super::trait_::{
    sort_cards, sort_checklists, sort_lists, sort_reports, sort_time_logs, Result, Storage,
    StorageError,
};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

impl SqliteStorage {
    /// Open (creating if missing) the database at `db_path`.
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_path)
            .map_err(db_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Open the database at a filesystem path.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let Some(path) = path.to_str() else {
            return Err(StorageError::Other(format!(
                "database path is not valid UTF-8: {}",
                path.display()
            )));
        };
        Self::new(&format!("sqlite://{}", path)).await
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        // A single connection, since every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                parent_id TEXT,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entities_parent ON entities(entity_type, parent_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS weekly_reports (
                id TEXT PRIMARY KEY,
                board_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                week_start TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (board_id, author_id, week_start)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn save_entity<T: serde::Serialize + Sync>(
        &self,
        kind: &str,
        id: String,
        parent_id: Option<String>,
        value: &T,
    ) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO entities (id, entity_type, parent_id, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET parent_id = excluded.parent_id,
                data = excluded.data, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(kind)
        .bind(parent_id)
        .bind(data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn load_entity<T: serde::de::DeserializeOwned>(&self, kind: &str, id: String) -> Result<Option<T>> {
        let row = sqlx::query("SELECT data FROM entities WHERE id = ? AND entity_type = ?")
            .bind(id)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| decode(&row)).transpose()
    }

    /// Entities of `kind`, optionally restricted to the given parents.
    async fn list_entities<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        parents: Option<&[String]>,
    ) -> Result<Vec<T>> {
        let rows = match parents {
            Some([]) => return Ok(Vec::new()),
            Some(parents) => {
                let sql = format!(
                    "SELECT data FROM entities WHERE entity_type = ? AND parent_id IN ({})",
                    placeholders(parents.len())
                );
                let mut query = sqlx::query(&sql).bind(kind);
                for parent in parents {
                    query = query.bind(parent);
                }
                query.fetch_all(&self.pool).await
            }
            None => {
                sqlx::query("SELECT data FROM entities WHERE entity_type = ?")
                    .bind(kind)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(decode).collect()
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn decode<T: serde::de::DeserializeOwned>(row: &SqliteRow) -> Result<T> {
    let data: String = row.try_get("data").map_err(db_err)?;
    Ok(serde_json::from_str(&data)?)
}

fn ids<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Profile operations ===

    async fn save_profile(&mut self, profile: &Profile) -> Result<()> {
        self.save_entity("profile", profile.id.to_string(), None, profile).await
    }

    async fn load_profiles(&self, user_ids: &[UserId]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT data FROM entities WHERE entity_type = 'profile' AND id IN ({})",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids(user_ids) {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(decode).collect()
    }

    // === Board operations ===

    async fn save_board(&mut self, board: &Board) -> Result<()> {
        self.save_entity("board", board.id.to_string(), None, board).await
    }

    async fn load_board(&self, id: BoardId) -> Result<Option<Board>> {
        self.load_entity("board", id.to_string()).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let mut boards: Vec<Board> = self.list_entities("board", None).await?;
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(boards)
    }

    // === List operations ===

    async fn save_list(&mut self, list: &BoardList) -> Result<()> {
        self.save_entity("list", list.id.to_string(), Some(list.board_id.to_string()), list)
            .await
    }

    async fn load_list(&self, id: ListId) -> Result<Option<BoardList>> {
        self.load_entity("list", id.to_string()).await
    }

    async fn list_lists(&self, board_id: BoardId) -> Result<Vec<BoardList>> {
        let mut lists: Vec<BoardList> = self
            .list_entities("list", Some([board_id.to_string()].as_slice()))
            .await?;
        sort_lists(&mut lists);
        Ok(lists)
    }

    // === Card operations ===

    async fn save_card(&mut self, card: &Card) -> Result<()> {
        self.save_entity("card", card.id.to_string(), Some(card.list_id.to_string()), card)
            .await
    }

    async fn load_card(&self, id: CardId) -> Result<Option<Card>> {
        self.load_entity("card", id.to_string()).await
    }

    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let parents = filter.list_ids.as_deref().map(ids);
        let mut cards: Vec<Card> = self
            .list_entities::<Card>("card", parents.as_deref())
            .await?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        sort_cards(&mut cards);
        Ok(cards)
    }

    async fn delete_card(&mut self, id: CardId) -> Result<()> {
        sqlx::query("DELETE FROM entities WHERE id = ? AND entity_type = 'card'")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // === Checklist operations ===

    async fn save_checklist(&mut self, checklist: &Checklist) -> Result<()> {
        self.save_entity(
            "checklist",
            checklist.id.to_string(),
            Some(checklist.card_id.to_string()),
            checklist,
        )
        .await
    }

    async fn load_checklist(&self, id: ChecklistId) -> Result<Option<Checklist>> {
        self.load_entity("checklist", id.to_string()).await
    }

    async fn list_checklists(&self, card_ids: &[CardId]) -> Result<Vec<Checklist>> {
        let mut checklists: Vec<Checklist> = self
            .list_entities("checklist", Some(ids(card_ids).as_slice()))
            .await?;
        sort_checklists(&mut checklists);
        Ok(checklists)
    }

    // === Comment operations ===

    async fn save_comment(&mut self, comment: &Comment) -> Result<()> {
        self.save_entity(
            "comment",
            comment.id.to_string(),
            Some(comment.card_id.to_string()),
            comment,
        )
        .await
    }

    async fn count_comments(&self, card_ids: &[CardId]) -> Result<HashMap<CardId, usize>> {
        if card_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT parent_id, COUNT(*) AS n FROM entities
            WHERE entity_type = 'comment' AND parent_id IN ({})
            GROUP BY parent_id",
            placeholders(card_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids(card_ids) {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut counts = HashMap::new();
        for row in rows {
            let parent: String = row.try_get("parent_id").map_err(db_err)?;
            let n: i64 = row.try_get("n").map_err(db_err)?;
            match parent.parse::<CardId>() {
                Ok(card_id) => {
                    counts.insert(card_id, n as usize);
                }
                Err(e) => warn!("Ignoring comments with malformed card id {}: {}", parent, e),
            }
        }
        Ok(counts)
    }

    // === Time log operations ===

    async fn save_time_log(&mut self, log: &TimeLog) -> Result<()> {
        self.save_entity("time_log", log.id.to_string(), Some(log.card_id.to_string()), log)
            .await
    }

    async fn list_time_logs(&self, filter: &TimeLogFilter) -> Result<Vec<TimeLog>> {
        let parents = filter.card_ids.as_deref().map(ids);
        let mut logs: Vec<TimeLog> = self
            .list_entities::<TimeLog>("time_log", parents.as_deref())
            .await?
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect();
        sort_time_logs(&mut logs);
        Ok(logs)
    }

    // === Weekly report operations ===

    async fn create_report(&mut self, report: &WeeklyReport) -> Result<()> {
        let data = serde_json::to_string(report)?;

        let result = sqlx::query(
            "INSERT INTO weekly_reports (id, board_id, author_id, week_start, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(report.id.to_string())
        .bind(report.board_id.to_string())
        .bind(report.author_id.to_string())
        .bind(report.week_start_date.to_string())
        .bind(data)
        .bind(report.created_at.to_rfc3339())
        .bind(report.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StorageError::Conflict(format!(
                    "weekly report already exists for board {} / author {} / week {}",
                    report.board_id, report.author_id, report.week_start_date
                )))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn load_report(&self, id: ReportId) -> Result<Option<WeeklyReport>> {
        let row = sqlx::query("SELECT data FROM weekly_reports WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| decode(&row)).transpose()
    }

    async fn find_report(
        &self,
        board_id: BoardId,
        author_id: UserId,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReport>> {
        let row = sqlx::query(
            "SELECT data FROM weekly_reports WHERE board_id = ? AND author_id = ? AND week_start = ?",
        )
        .bind(board_id.to_string())
        .bind(author_id.to_string())
        .bind(week_start.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| decode(&row)).transpose()
    }

    async fn list_reports(&self, board_id: BoardId) -> Result<Vec<WeeklyReport>> {
        let rows = sqlx::query("SELECT data FROM weekly_reports WHERE board_id = ?")
            .bind(board_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut reports = rows.iter().map(decode).collect::<Result<Vec<WeeklyReport>>>()?;
        sort_reports(&mut reports);
        Ok(reports)
    }

    async fn update_report(&mut self, report: &WeeklyReport) -> Result<()> {
        let data = serde_json::to_string(report)?;

        let result = sqlx::query("UPDATE weekly_reports SET data = ?, updated_at = ? WHERE id = ?")
            .bind(data)
            .bind(report.updated_at.to_rfc3339())
            .bind(report.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("weekly report {}", report.id)));
        }
        Ok(())
    }
}
