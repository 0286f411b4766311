//! Database schema SQL.

/// Core tables: documents, chunks, audits, store metadata.
///
/// `chunks.embedding` is a little-endian f32 blob whose width is pinned by
/// the `embedding_dim` row in `store_meta`.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    page INTEGER,
    span TEXT,
    content TEXT NOT NULL CHECK (length(content) > 0),
    embedding BLOB,
    index_status TEXT NOT NULL DEFAULT 'stored'
        CHECK (index_status IN ('stored', 'indexed')),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_chunks_index_status ON chunks(index_status);

CREATE TABLE IF NOT EXISTS audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    prompt_tokens INTEGER,
    completion_tokens INTEGER,
    created_at INTEGER NOT NULL
);
"#;
