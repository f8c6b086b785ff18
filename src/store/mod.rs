//! Snapshot store over SQLite.
//!
//! Owns the per-run persistence sequence: the current snapshot of a
//! ranking is replaced wholesale (delete + reinsert) and the computed
//! diff is appended to `ranking_history`. Replace, history append and
//! the `last_updated` touch run inside one transaction, so readers
//! always see a complete snapshot even if the process dies mid-run.

mod schema;

pub use schema::SCHEMA_SQL;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::compare::{Ranked, RankingChange};
use crate::error::Result;
use crate::ingest::types::FetchedItem;

/// A tracked ranking source. Read-only at runtime.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub provider_type: String,
    pub source_url: String,
    /// Polling interval in seconds.
    pub update_frequency: i64,
    pub last_updated: Option<String>,
}

/// One row of a ranking's current snapshot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub id: String,
    pub ranking_id: String,
    pub position: i64,
    pub item_id: String,
    pub item_name: String,
    pub item_image: Option<String>,
    pub score: Option<f64>,
    pub metadata: Option<String>,
    pub timestamp: String,
}

impl Ranked for ItemRow {
    fn item_id(&self) -> &str {
        &self.item_id
    }
    fn item_name(&self) -> &str {
        &self.item_name
    }
    fn position(&self) -> i64 {
        self.position
    }
}

/// One appended history record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub id: String,
    pub ranking_id: String,
    pub item_id: String,
    pub item_name: String,
    pub old_position: Option<i64>,
    pub new_position: i64,
    pub change_type: String,
    pub change_amount: Option<i64>,
    pub timestamp: String,
}

// History accumulates forever, so its row ids must stay unique even
// when two runs of the same ranking land on the same timestamp (an
// on-demand update racing a scheduler tick). A process-wide run
// sequence disambiguates them; snapshot rows need none, their old set
// is deleted in the same transaction.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file and prepare the pool.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Ephemeral in-memory store. One connection only; a second
    /// connection would see a different database.
    pub async fn memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<()> {
        info!("initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    // ===== Rankings =====

    pub async fn insert_ranking(&self, ranking: &Ranking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rankings (id, name, type, source_url, update_frequency, last_updated)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ranking.id)
        .bind(&ranking.name)
        .bind(&ranking.provider_type)
        .bind(&ranking.source_url)
        .bind(ranking.update_frequency)
        .bind(&ranking.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn ranking(&self, id: &str) -> Result<Option<Ranking>> {
        let ranking = sqlx::query_as::<_, Ranking>("SELECT * FROM rankings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ranking)
    }

    /// Rankings whose snapshot is older than their polling interval
    /// (or never captured).
    pub async fn due_rankings(&self) -> Result<Vec<Ranking>> {
        let rankings = sqlx::query_as::<_, Ranking>(
            r#"
            SELECT * FROM rankings
            WHERE last_updated IS NULL
               OR datetime(last_updated) < datetime('now', '-' || update_frequency || ' seconds')
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rankings)
    }

    // ===== Snapshot =====

    /// Current snapshot in rank order; the "old" input to the diff.
    pub async fn current_items(&self, ranking_id: &str) -> Result<Vec<ItemRow>> {
        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT * FROM ranking_items WHERE ranking_id = ? ORDER BY position ASC",
        )
        .bind(ranking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Read-endpoint ordering: score first, rank as tie-break.
    pub async fn items_by_score(&self, ranking_id: &str) -> Result<Vec<ItemRow>> {
        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT * FROM ranking_items WHERE ranking_id = ? ORDER BY score DESC, position ASC",
        )
        .bind(ranking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Persist one completed run atomically: replace the snapshot,
    /// append every change to history, bump `last_updated`.
    pub async fn apply_run(
        &self,
        ranking_id: &str,
        items: &[FetchedItem],
        changes: &[RankingChange],
        captured_at: DateTime<Utc>,
    ) -> Result<()> {
        let ts = captured_at.to_rfc3339();
        let millis = captured_at.timestamp_millis();
        let run_seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ranking_items WHERE ranking_id = ?")
            .bind(ranking_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO ranking_items
                    (id, ranking_id, position, item_id, item_name, item_image, score, metadata, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(format!("{ranking_id}-{}-{millis}", item.item_id))
            .bind(ranking_id)
            .bind(item.position)
            .bind(&item.item_id)
            .bind(&item.item_name)
            .bind(&item.item_image)
            .bind(item.score)
            .bind(item.metadata.as_ref().map(|m| m.to_string()))
            .bind(&ts)
            .execute(&mut *tx)
            .await?;
        }

        for change in changes {
            sqlx::query(
                r#"
                INSERT INTO ranking_history
                    (id, ranking_id, item_id, item_name, old_position, new_position, change_type, change_amount, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(format!("{ranking_id}-{}-{millis}-{run_seq}", change.item_id))
            .bind(ranking_id)
            .bind(&change.item_id)
            .bind(&change.item_name)
            .bind(change.old_position)
            .bind(change.new_position)
            .bind(change.kind.to_string())
            .bind(change.change_amount)
            .bind(&ts)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE rankings SET last_updated = ? WHERE id = ?")
            .bind(&ts)
            .bind(ranking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Most recent history records, newest first.
    pub async fn recent_history(&self, ranking_id: &str, limit: i64) -> Result<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM ranking_history WHERE ranking_id = ? ORDER BY timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(ranking_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ===== Subscriptions =====

    /// Distinct push targets of users with an active change-notifying
    /// subscription to this ranking.
    pub async fn player_ids_for(&self, ranking_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ud.onesignal_player_id
            FROM subscriptions s
            JOIN user_devices ud ON s.user_id = ud.user_id
            WHERE s.ranking_id = ? AND s.notify_on_change = 1
            "#,
        )
        .bind(ranking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn subscribe(&self, ranking_id: &str, user_id: &str, player_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO user_devices (user_id, onesignal_player_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT OR REPLACE INTO subscriptions (user_id, ranking_id, notify_on_change) VALUES (?, ?, 1)",
        )
        .bind(user_id)
        .bind(ranking_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn unsubscribe(&self, ranking_id: &str, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND ranking_id = ?")
            .bind(user_id)
            .bind(ranking_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare;

    fn item(id: &str, pos: i64, score: f64) -> FetchedItem {
        FetchedItem {
            position: pos,
            item_id: id.to_string(),
            item_name: format!("Item {id}"),
            item_image: None,
            score: Some(score),
            metadata: None,
            fetched_at: Utc::now(),
        }
    }

    async fn store_with_ranking() -> Store {
        let store = Store::memory().await.unwrap();
        store.init_schema().await.unwrap();
        store
            .insert_ranking(&Ranking {
                id: "vieon-atsh".into(),
                name: "Anh Trai Say Hi".into(),
                provider_type: "vieon".into(),
                source_url: "https://vote.test/ranking".into(),
                update_frequency: 300,
                last_updated: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn apply_run_replaces_snapshot_wholesale() {
        let store = store_with_ranking().await;
        let now = Utc::now();

        let first = vec![item("a", 1, 30.0), item("b", 2, 20.0)];
        store.apply_run("vieon-atsh", &first, &[], now).await.unwrap();

        let second = vec![item("b", 1, 40.0), item("c", 2, 25.0)];
        store.apply_run("vieon-atsh", &second, &[], now).await.unwrap();

        let current = store.current_items("vieon-atsh").await.unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].item_id, "b");
        assert_eq!(current[1].item_id, "c");
    }

    #[tokio::test]
    async fn apply_run_appends_history_and_touches_last_updated() {
        let store = store_with_ranking().await;
        let now = Utc::now();

        let old: Vec<ItemRow> = vec![];
        let new = vec![item("a", 1, 10.0)];
        let changes = compare::compare(&old, &new);
        store
            .apply_run("vieon-atsh", &new, &changes, now)
            .await
            .unwrap();

        let history = store.recent_history("vieon-atsh", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, "new");

        let ranking = store.ranking("vieon-atsh").await.unwrap().unwrap();
        assert_eq!(ranking.last_updated, Some(now.to_rfc3339()));
    }

    #[tokio::test]
    async fn history_ids_stay_unique_when_runs_share_a_timestamp() {
        let store = store_with_ranking().await;
        let now = Utc::now();

        // same item changes in two back-to-back runs stamped with the
        // same capture time
        let first = vec![item("a", 2, 10.0), item("b", 1, 20.0)];
        let run1 = compare::compare(&Vec::<ItemRow>::new(), &first);
        store
            .apply_run("vieon-atsh", &first, &run1, now)
            .await
            .unwrap();

        let second = vec![item("a", 1, 30.0), item("b", 2, 20.0)];
        let old = store.current_items("vieon-atsh").await.unwrap();
        let run2 = compare::compare(&old, &second);
        assert!(!run2.is_empty());
        store
            .apply_run("vieon-atsh", &second, &run2, now)
            .await
            .unwrap();

        let history = store.recent_history("vieon-atsh", 50).await.unwrap();
        assert_eq!(history.len(), run1.len() + run2.len());
    }

    #[tokio::test]
    async fn items_by_score_orders_desc_then_position() {
        let store = store_with_ranking().await;
        let items = vec![item("a", 1, 10.0), item("b", 2, 50.0), item("c", 3, 50.0)];
        store
            .apply_run("vieon-atsh", &items, &[], Utc::now())
            .await
            .unwrap();

        let by_score = store.items_by_score("vieon-atsh").await.unwrap();
        let ids: Vec<&str> = by_score.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn due_rankings_ignores_recently_updated() {
        let store = store_with_ranking().await;
        let due = store.due_rankings().await.unwrap();
        assert_eq!(due.len(), 1, "never-updated ranking is due");

        store
            .apply_run("vieon-atsh", &[item("a", 1, 1.0)], &[], Utc::now())
            .await
            .unwrap();
        let due = store.due_rankings().await.unwrap();
        assert!(due.is_empty(), "freshly updated ranking is not due");
    }

    #[tokio::test]
    async fn player_ids_join_is_distinct_and_respects_flag() {
        let store = store_with_ranking().await;
        store.subscribe("vieon-atsh", "u1", "player-1").await.unwrap();
        store.subscribe("vieon-atsh", "u1", "player-2").await.unwrap();
        store.subscribe("vieon-atsh", "u2", "player-3").await.unwrap();

        let mut ids = store.player_ids_for("vieon-atsh").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["player-1", "player-2", "player-3"]);

        store.unsubscribe("vieon-atsh", "u1").await.unwrap();
        let ids = store.player_ids_for("vieon-atsh").await.unwrap();
        assert_eq!(ids, vec!["player-3"]);
    }
}
