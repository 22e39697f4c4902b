//! SQLite-backed `GraphStore`, with schema split into two tables (`span`,
//! `has_child`) standing in for a property-graph store.
//!
//! `rusqlite::Connection` is blocking, so every operation runs inside
//! `spawn_blocking` to keep the async ingestion/analysis pipeline from
//! stalling on file I/O.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use super::GraphStore;
use crate::error::GraphError;
use crate::span::{Span, SpanPath};

pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraphStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, GraphError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, GraphError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, GraphError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            f(&conn)
        })
        .await
        .map_err(|e| GraphError::Storage(format!("blocking task panicked: {e}")))?
    }

    /// Builds the `MATCH`-equivalent self-join for a chain of `n` spans
    /// named `path[0..n]`, aliased `s1..sn`. Only alias indices (trusted,
    /// loop-bound integers) are interpolated into SQL text; every span name
    /// and timestamp bound is passed as a bound parameter.
    fn chain_join_sql(n: usize) -> String {
        let mut sql = String::from("span s1");
        for i in 2..=n {
            sql.push_str(&format!(
                " JOIN has_child hc{prev} ON hc{prev}.parent_id = s{prev}.id \
                  JOIN span s{i} ON s{i}.id = hc{prev}.child_id",
                prev = i - 1,
                i = i
            ));
        }
        sql
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn create_schema(&self) -> Result<(), GraphError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS span (
                    id           TEXT PRIMARY KEY,
                    trace_id     TEXT,
                    name         TEXT,
                    timestamp_us INTEGER,
                    duration_us  INTEGER
                );
                CREATE TABLE IF NOT EXISTS has_child (
                    parent_id TEXT NOT NULL,
                    child_id  TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS has_child_parent_idx ON has_child(parent_id);
                CREATE INDEX IF NOT EXISTS span_name_idx ON span(name);",
            )?;
            Ok(())
        })
        .await
    }

    async fn is_populated(&self) -> Result<bool, GraphError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM span", [], |row| row.get(0))
                .optional()?
                .unwrap_or(0);
            Ok(count > 0)
        })
        .await
    }

    async fn upsert_span(&self, span: &Span) -> Result<(), GraphError> {
        let span = span.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO span (id, trace_id, name, timestamp_us, duration_us)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                   trace_id = excluded.trace_id,
                   name = excluded.name,
                   timestamp_us = excluded.timestamp_us,
                   duration_us = excluded.duration_us",
                rusqlite::params![span.id, span.trace_id, span.name, span.timestamp_us, span.duration_us],
            )?;
            Ok(())
        })
        .await
    }

    async fn ensure_span_placeholder(&self, id: &str) -> Result<(), GraphError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO span (id) VALUES (?1) ON CONFLICT(id) DO NOTHING",
                rusqlite::params![id],
            )?;
            Ok(())
        })
        .await
    }

    async fn add_child_edge(&self, parent_id: &str, child_id: &str) -> Result<(), GraphError> {
        let parent_id = parent_id.to_string();
        let child_id = child_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO has_child (parent_id, child_id) VALUES (?1, ?2)",
                rusqlite::params![parent_id, child_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn distinct_child_names(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<BTreeSet<String>, GraphError> {
        let names = path.names().to_vec();
        let n = names.len();
        self.with_conn(move |conn| {
            let join = Self::chain_join_sql(n + 1);
            let where_names: Vec<String> = (1..=n).map(|i| format!("s{i}.name = ?{i}")).collect();
            let sql = format!(
                "SELECT DISTINCT s{last}.name FROM {join} \
                 WHERE {where_clause} AND s{last}.timestamp_us >= ?{start_idx} AND s{last}.timestamp_us <= ?{end_idx}",
                last = n + 1,
                join = join,
                where_clause = where_names.join(" AND "),
                start_idx = n + 1,
                end_idx = n + 2,
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut bind: Vec<Box<dyn rusqlite::ToSql>> =
                names.iter().map(|n| Box::new(n.clone()) as Box<dyn rusqlite::ToSql>).collect();
            bind.push(Box::new(t_start_us));
            bind.push(Box::new(t_end_us));

            let rows = stmt.query_map(params_from_iter(bind.iter().map(|b| b.as_ref())), |row| {
                row.get::<_, Option<String>>(0)
            })?;

            let mut out = BTreeSet::new();
            for row in rows {
                if let Some(name) = row? {
                    out.insert(name);
                }
            }
            Ok(out)
        })
        .await
    }

    async fn durations(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<Vec<i64>, GraphError> {
        let names = path.names().to_vec();
        let n = names.len();
        self.with_conn(move |conn| {
            let join = Self::chain_join_sql(n);
            let where_names: Vec<String> = (1..=n).map(|i| format!("s{i}.name = ?{i}")).collect();
            let sql = format!(
                "SELECT s{last}.duration_us FROM {join} \
                 WHERE {where_clause} AND s{last}.timestamp_us >= ?{start_idx} AND s{last}.timestamp_us <= ?{end_idx}",
                last = n,
                join = join,
                where_clause = where_names.join(" AND "),
                start_idx = n + 1,
                end_idx = n + 2,
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut bind: Vec<Box<dyn rusqlite::ToSql>> =
                names.iter().map(|n| Box::new(n.clone()) as Box<dyn rusqlite::ToSql>).collect();
            bind.push(Box::new(t_start_us));
            bind.push(Box::new(t_end_us));

            let rows = stmt.query_map(params_from_iter(bind.iter().map(|b| b.as_ref())), |row| {
                row.get::<_, Option<i64>>(0)
            })?;

            let mut out = Vec::new();
            for row in rows {
                if let Some(dur) = row? {
                    out.push(dur);
                }
            }
            Ok(out)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, name: &str, ts: i64, dur: i64) -> Span {
        Span {
            id: id.to_string(),
            trace_id: Some("t1".to_string()),
            name: Some(name.to_string()),
            timestamp_us: Some(ts),
            duration_us: Some(dur),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_identical_documents() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_schema().await.unwrap();
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();

        let durations = store.durations(&SpanPath::root("root"), 0, 1000).await.unwrap();
        assert_eq!(durations, vec![10]);
    }

    #[tokio::test]
    async fn finds_durations_and_child_names_along_a_chain() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_schema().await.unwrap();
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();
        store.upsert_span(&span("2", "A", 100, 20)).await.unwrap();
        store.upsert_span(&span("3", "B", 100, 30)).await.unwrap();
        store.add_child_edge("1", "2").await.unwrap();
        store.add_child_edge("2", "3").await.unwrap();

        let path = SpanPath::root("root").child("A");
        let names = store.distinct_child_names(&path, 0, 1000).await.unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["B".to_string()]);

        let durations = store.durations(&path.child("B"), 0, 1000).await.unwrap();
        assert_eq!(durations, vec![30]);
    }

    #[tokio::test]
    async fn placeholder_parent_is_filled_in_once_its_own_document_arrives() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_schema().await.unwrap();

        // Child arrives first, parent is a placeholder.
        store.upsert_span(&Span::placeholder("1")).await.unwrap();
        store.upsert_span(&span("2", "B", 200, 20)).await.unwrap();
        store.add_child_edge("1", "2").await.unwrap();

        // Parent's own document arrives later.
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();

        let durations = store.durations(&SpanPath::root("root"), 0, 1000).await.unwrap();
        assert_eq!(durations, vec![10]);
    }

    #[tokio::test]
    async fn ensure_span_placeholder_does_not_overwrite_existing_fields() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_schema().await.unwrap();
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();

        // A later child document references "1" as a parent id; this must
        // not clobber the real data already written for it.
        store.ensure_span_placeholder("1").await.unwrap();

        let durations = store.durations(&SpanPath::root("root"), 0, 1000).await.unwrap();
        assert_eq!(durations, vec![10]);
    }

    #[tokio::test]
    async fn is_populated_reflects_store_contents() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_schema().await.unwrap();
        assert!(!store.is_populated().await.unwrap());
        store.upsert_span(&span("1", "root", 100, 10)).await.unwrap();
        assert!(store.is_populated().await.unwrap());
    }
}
