//! SQLite document store: source of truth for documents and chunks, and the
//! store-path similarity search used when no vector index answers.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::embedding::{blob_to_vec, cosine_similarity, rank_order, vec_to_blob};
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use ragline_core::{Error, Result};

const CHUNK_COLUMNS: &str =
    "id, document_id, page, span, content, embedding, index_status, created_at";

fn db_err(e: rusqlite::Error) -> Error {
    Error::StoreFailure(e.to_string())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite store for documents, chunks, and the audit trail.
///
/// A single connection behind a mutex; every method holds it only for the
/// duration of its own statement(s).
pub struct DocumentStore {
    conn: Mutex<Connection>,
    embedding_dim: usize,
}

impl DocumentStore {
    /// Open or create the store in `db_dir` (file `ragline.db`).
    ///
    /// Fails with [`Error::Config`] if the database was created with a
    /// different embedding width.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir)?;
        let db_path = db_dir.join("ragline.db");

        let conn = Connection::open(&db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::StoreFailure(format!("Schema init failed: {}", e)))?;
        Self::pin_embedding_dim(&conn, embedding_dim)?;

        let store = Self {
            conn: Mutex::new(conn),
            embedding_dim,
        };

        let stats = store.stats()?;
        info!(
            "DocumentStore initialized: {} documents, {} chunks ({} embedded, {} indexed), dim={}, path={}",
            stats.documents,
            stats.chunks,
            stats.embedded_chunks,
            stats.indexed_chunks,
            embedding_dim,
            db_path.display()
        );
        Ok(store)
    }

    fn pin_embedding_dim(conn: &Connection, embedding_dim: usize) -> Result<()> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'embedding_dim'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('embedding_dim', ?1)",
                    params![embedding_dim.to_string()],
                )
                .map_err(db_err)?;
                Ok(())
            }
            Some(v) if v.parse::<usize>().ok() == Some(embedding_dim) => Ok(()),
            Some(v) => Err(Error::Config(format!(
                "store was created with embedding_dim={} but {} is configured",
                v, embedding_dim
            ))),
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    // ---------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------

    /// Insert the document or update it in place. Safe under concurrent calls
    /// for the same id: the conflict-resolving insert is the serialization point.
    ///
    /// A `None` title leaves an existing title unchanged.
    pub fn upsert_document(&self, id: &str, title: Option<&str>) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::InvalidRequest("document_id is required".into()));
        }
        let now = now_millis();
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO documents (id, title, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    title = COALESCE(excluded.title, documents.title),
                    updated_at = excluded.created_at",
            )
            .map_err(db_err)?;
        stmt.execute(params![id, title, now]).map_err(db_err)?;
        Ok(())
    }

    /// Get a document by id.
    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT id, title, created_at, updated_at FROM documents WHERE id = ?1")
            .map_err(db_err)?;
        stmt.query_row(params![id], |row| {
            Ok(Document {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })
        .optional()
        .map_err(db_err)
    }

    /// Delete a document and, by cascade, its chunks.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])
            .map_err(db_err)?;
        if count > 0 {
            info!("Deleted document {}", id);
        }
        Ok(count > 0)
    }

    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Chunks
    // ---------------------------------------------------------------

    /// Append chunks to a document in one transaction, in input order.
    ///
    /// Returns the store-assigned ids positionally aligned with `chunks`.
    /// The document must already exist.
    pub fn insert_chunks(&self, document_id: &str, chunks: &[NewChunk]) -> Result<Vec<i64>> {
        for chunk in chunks {
            if chunk.content.is_empty() {
                return Err(Error::InvalidRequest("chunk content must be non-empty".into()));
            }
            if let Some(v) = &chunk.embedding {
                if v.len() != self.embedding_dim {
                    return Err(Error::StoreFailure(format!(
                        "embedding width {} does not match store width {}",
                        v.len(),
                        self.embedding_dim
                    )));
                }
            }
        }

        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO chunks (document_id, page, span, content, embedding, index_status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'stored', ?6)",
                )
                .map_err(db_err)?;
            for chunk in chunks {
                let blob = chunk.embedding.as_deref().map(vec_to_blob);
                let id = stmt
                    .insert(params![
                        document_id,
                        chunk.page,
                        chunk.span,
                        chunk.content,
                        blob,
                        now
                    ])
                    .map_err(db_err)?;
                ids.push(id);
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("Inserted {} chunks for document {}", ids.len(), document_id);
        Ok(ids)
    }

    /// Fetch chunks by id, in the order of `ids`. Unknown ids are skipped.
    pub fn get_chunks_by_ids(&self, ids: &[i64]) -> Result<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM chunks WHERE id IN ({})",
            CHUNK_COLUMNS, placeholders
        );
        let mut found: Vec<Chunk> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), row_to_chunk)
                .map_err(db_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?
        };

        let mut ordered = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(pos) = found.iter().position(|c| c.id == *id) {
                ordered.push(found.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    /// All chunks of a document in insertion order.
    pub fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {} FROM chunks WHERE document_id = ?1 ORDER BY id",
                CHUNK_COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![document_id], row_to_chunk)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// The `limit` most recently inserted chunks of a document, newest first.
    pub fn recent_chunks(&self, document_id: &str, limit: usize) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {} FROM chunks WHERE document_id = ?1 ORDER BY id DESC LIMIT ?2",
                CHUNK_COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![document_id, limit as i64], row_to_chunk)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Count chunks, optionally for one document.
    pub fn count_chunks(&self, document_id: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE ?1 IS NULL OR document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Index registration status
    // ---------------------------------------------------------------

    /// Mark chunks as registered with the vector index.
    pub fn mark_indexed(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE chunks SET index_status = 'indexed' WHERE id IN ({}) AND embedding IS NOT NULL",
            placeholders
        );
        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(ids.iter()))
            .map_err(db_err)
    }

    /// Embedded chunks not yet registered with the index, oldest first.
    pub fn pending_index(&self, limit: usize) -> Result<Vec<(i64, Vec<f32>)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, embedding FROM chunks
                 WHERE index_status = 'stored' AND embedding IS NOT NULL
                 ORDER BY id LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let id: i64 = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((id, blob_to_vec(&blob)))
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Mark every chunk as not indexed. Used when the index starts empty.
    pub fn reset_index_status(&self) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE chunks SET index_status = 'stored' WHERE index_status = 'indexed'",
            [],
        )
        .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Store-path similarity
    // ---------------------------------------------------------------

    /// Cosine-ranked search over embedded chunks, optionally scoped to one document.
    ///
    /// Ordered by descending score, ties by ascending id. Returns fewer than
    /// `top_k` hits when fewer embedded chunks exist; never pads.
    pub fn similar_chunks(
        &self,
        query: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be positive".into()));
        }

        let candidates: Vec<(i64, String, String, Vec<u8>)> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, document_id, content, embedding FROM chunks
                     WHERE embedding IS NOT NULL AND (?1 IS NULL OR document_id = ?1)",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![document_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(db_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?
        };

        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .map(|(id, document_id, content, blob)| ScoredChunk {
                score: cosine_similarity(query, &blob_to_vec(&blob)),
                id,
                document_id,
                content,
            })
            .collect();
        scored.sort_by(|a, b| rank_order((a.id, a.score), (b.id, b.score)));
        scored.truncate(top_k);
        Ok(scored)
    }

    // ---------------------------------------------------------------
    // Audit + stats
    // ---------------------------------------------------------------

    pub fn record_audit(&self, entry: &AuditEntry) -> Result<i64> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO audits (endpoint, latency_ms, prompt_tokens, completion_tokens, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(db_err)?;
        stmt.insert(params![
            entry.endpoint,
            entry.latency_ms,
            entry.prompt_tokens,
            entry.completion_tokens,
            now_millis()
        ])
        .map_err(db_err)
    }

    pub fn count_audits(&self, endpoint: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM audits WHERE endpoint = ?1",
            params![endpoint],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let count = |sql: &str| -> Result<i64> {
            conn.query_row(sql, [], |row| row.get(0)).map_err(db_err)
        };
        Ok(StoreStats {
            documents: count("SELECT COUNT(*) FROM documents")?,
            chunks: count("SELECT COUNT(*) FROM chunks")?,
            embedded_chunks: count("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")?,
            indexed_chunks: count("SELECT COUNT(*) FROM chunks WHERE index_status = 'indexed'")?,
            embedding_dim: self.embedding_dim,
        })
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
    let blob: Option<Vec<u8>> = row.get("embedding")?;
    let status: String = row.get("index_status")?;
    Ok(Chunk {
        id: row.get("id")?,
        document_id: row.get("document_id")?,
        page: row.get("page")?,
        span: row.get("span")?,
        content: row.get("content")?,
        embedding: blob.map(|b| blob_to_vec(&b)),
        index_status: IndexStatus::parse(&status),
        created_at: row.get("created_at")?,
    })
}
