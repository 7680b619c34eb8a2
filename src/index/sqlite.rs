//! SQLite-based vector index implementation.
//!
//! Uses SQLite for storage with cosine similarity computed in Rust. Entries
//! are scanned exhaustively on every search, which is plenty for a catalog
//! of a few tens of thousands of chunks.

use super::{check_dimensions, cosine_similarity, rank_hits, IndexEntry, SearchHit, VectorIndex};
use crate::chunking::Chunk;
use crate::embedding::EmbeddingSignature;
use crate::error::{AnirecError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// File name of the index inside its directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite3";

// Rollback journal rather than WAL: a finished build is renamed into place,
// which must not leave a -wal sidecar behind.
const SCHEMA: &str = r#"
    PRAGMA journal_mode=DELETE;

    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY,
        record_index INTEGER NOT NULL,
        chunk_order INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_record ON entries(record_index, chunk_order);

    CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    read_only: bool,
}

impl SqliteVectorIndex {
    /// Create (or open for rewriting) an index file.
    #[instrument(skip_all)]
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        info!("Created SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            read_only: false,
        })
    }

    /// Open an existing index file read-only.
    ///
    /// A zero-length file or a database with no tables at all is treated as
    /// a missing index.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() || std::fs::metadata(path)?.len() == 0 {
            return Err(AnirecError::IndexNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        if table_count == 0 {
            return Err(AnirecError::IndexNotFound(path.to_path_buf()));
        }

        let has_tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('entries', 'index_meta')",
            [],
            |row| row.get(0),
        )?;
        if has_tables != 2 {
            return Err(AnirecError::VectorIndex(format!(
                "{} is not an anirec index",
                path.display()
            )));
        }

        debug!("Opened SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            read_only: true,
        })
    }

    /// Open the index stored in `dir`.
    ///
    /// A missing directory, a path that is not a directory, or a directory
    /// without an index file all count as "not found".
    pub fn open_in(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(AnirecError::IndexNotFound(dir.to_path_buf()));
        }
        let path = dir.join(INDEX_FILE_NAME);
        if !path.is_file() {
            return Err(AnirecError::IndexNotFound(dir.to_path_buf()));
        }
        Self::open(&path)
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            read_only: false,
        })
    }

    /// When the stored entries were built.
    pub fn built_at(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self.meta("built_at")?;
        Ok(value
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AnirecError::VectorIndex(format!("Failed to acquire lock: {}", e)))
    }

    fn meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(AnirecError::VectorIndex(format!(
                "Corrupt embedding blob of {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn build(&self, signature: &EmbeddingSignature, entries: &[IndexEntry]) -> Result<usize> {
        if self.read_only {
            return Err(AnirecError::VectorIndex(
                "Index was opened read-only".to_string(),
            ));
        }
        check_dimensions(signature, entries)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM index_meta", [])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (id, record_index, chunk_order, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (id, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    id as i64,
                    entry.chunk.record_index as i64,
                    entry.chunk.order as i64,
                    entry.chunk.content,
                    Self::embedding_to_bytes(&entry.embedding),
                ])?;
            }

            let mut meta = tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["embedding_model", signature.model])?;
            meta.execute(params!["embedding_dimensions", signature.dimensions.to_string()])?;
            meta.execute(params!["built_at", Utc::now().to_rfc3339()])?;
        }

        tx.commit()?;
        info!("Stored {} index entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT record_index, chunk_order, content, embedding
            FROM entries
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let record_index: i64 = row.get(0)?;
            let chunk_order: i64 = row.get(1)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok((
                Chunk {
                    record_index: record_index as usize,
                    order: chunk_order as usize,
                    content: row.get(2)?,
                },
                embedding,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (chunk, bytes) = row?;
            let embedding = Self::bytes_to_embedding(&bytes)?;
            if embedding.len() != query_embedding.len() {
                return Err(AnirecError::retrieval_failed(format!(
                    "Query has {} dimensions but the index stores {}",
                    query_embedding.len(),
                    embedding.len()
                )));
            }
            let score = cosine_similarity(query_embedding, &embedding);
            hits.push(SearchHit { chunk, score });
        }

        let hits = rank_hits(hits, limit);
        debug!("Found {} matching chunks", hits.len());
        Ok(hits)
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn signature(&self) -> Result<Option<EmbeddingSignature>> {
        let model = self.meta("embedding_model")?;
        let dimensions = self.meta("embedding_dimensions")?;

        match (model, dimensions) {
            (Some(model), Some(dimensions)) => {
                let dimensions = dimensions.parse::<usize>().map_err(|e| {
                    AnirecError::VectorIndex(format!("Corrupt dimension metadata: {}", e))
                })?;
                Ok(Some(EmbeddingSignature::new(model, dimensions)))
            }
            _ => Ok(None),
        }
    }
}
