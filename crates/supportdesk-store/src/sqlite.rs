//! SQLite-backed store for accounts, FAQs, documents, chunks, and chat history.
//!
//! FAQs and document chunks are mirrored into FTS5 tables by triggers, so
//! keyword search is always consistent with the content tables.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL, SCHEMA_SQL};
use crate::types::*;
use supportdesk_core::{Error, Result};

const FAQ_COLUMNS: &str = "f.id, f.question, f.answer, f.category, f.created_by, \
                           f.created_at, f.updated_at, u.username AS created_by_username";

const DOCUMENT_COLUMNS: &str = "d.id, d.filename, d.original_name, d.file_path, d.file_type, \
                                d.file_size, d.uploaded_by, d.status, d.chunk_count, d.error, \
                                d.created_at, d.processed_at, u.username AS uploaded_by_username";

/// SQLite store with FTS5 keyword search.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn db(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/supportdesk.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("supportdesk.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} faqs, {} documents, {} chunks, path={}",
            store.count_faqs()?,
            store.count_documents()?,
            store.count_chunks()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db)?;
        Self::register_functions(&conn)?;
        Ok(conn)
    }

    /// `fold_case(text)`: Unicode lowercase, used by the substring fallback
    /// since SQLite's built-in `LIKE` only folds ASCII.
    fn register_functions(conn: &Connection) -> Result<()> {
        conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
        )
        .map_err(db)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}\n{}", SCHEMA_SQL, FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------

    /// Insert a user. Returns the new user ID.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO users (username, email, password_hash, role, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(db)?;
        let id = stmt
            .insert(params![username, email, password_hash, role.as_str(), now_millis()])
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists(format!("user {}", email))
                } else {
                    db(e)
                }
            })?;
        Ok(id)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .prepare_cached("SELECT * FROM users WHERE id = ?1")
            .map_err(db)?
            .query_row(params![user_id], |row| Ok(Self::row_to_user(row)))
            .optional()
            .map_err(db)?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .prepare_cached("SELECT * FROM users WHERE email = ?1")
            .map_err(db)?
            .query_row(params![email], |row| Ok(Self::row_to_user(row)))
            .optional()
            .map_err(db)?;
        Ok(user)
    }

    /// Find a user matching either the email or the username.
    pub fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .prepare_cached("SELECT * FROM users WHERE email = ?1 OR username = ?2 LIMIT 1")
            .map_err(db)?
            .query_row(params![email, username], |row| Ok(Self::row_to_user(row)))
            .optional()
            .map_err(db)?;
        Ok(user)
    }

    // ---------------------------------------------------------------
    // FAQs
    // ---------------------------------------------------------------

    /// Insert an FAQ. Returns the new FAQ ID.
    pub fn create_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let now = now_millis();
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO faqs (question, answer, category, created_by, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )
            .map_err(db)?
            .insert(params![question, answer, category, created_by, now])
            .map_err(db)?;
        Ok(id)
    }

    pub fn get_faq(&self, faq_id: i64) -> Result<Option<Faq>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM faqs f LEFT JOIN users u ON u.id = f.created_by WHERE f.id = ?1",
            FAQ_COLUMNS
        );
        let faq = conn
            .prepare_cached(&sql)
            .map_err(db)?
            .query_row(params![faq_id], |row| Ok(Self::row_to_faq(row)))
            .optional()
            .map_err(db)?;
        Ok(faq)
    }

    /// List FAQs newest first, optionally filtered by category and keyword search.
    pub fn list_faqs(&self, filter: &FaqFilter) -> Result<Vec<Faq>> {
        let mut sql = format!("SELECT {} FROM faqs f LEFT JOIN users u ON u.id = f.created_by", FAQ_COLUMNS);
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let fts_query = Self::sanitize_fts_query(search);
            if fts_query.is_empty() {
                return Ok(Vec::new());
            }
            values.push(fts_query);
            conditions.push(format!(
                "f.id IN (SELECT rowid FROM faqs_fts WHERE faqs_fts MATCH ?{})",
                values.len()
            ));
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            values.push(category.to_string());
            conditions.push(format!("f.category = ?{}", values.len()));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY f.created_at DESC, f.id DESC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| Ok(Self::row_to_faq(row)))
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    /// Apply a partial update. Returns false if the FAQ does not exist.
    pub fn update_faq(&self, faq_id: i64, update: &FaqUpdate) -> Result<bool> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE faqs SET \
                   question = COALESCE(?1, question), \
                   answer = COALESCE(?2, answer), \
                   category = COALESCE(?3, category), \
                   updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    non_empty(&update.question),
                    non_empty(&update.answer),
                    non_empty(&update.category),
                    now_millis(),
                    faq_id
                ],
            )
            .map_err(db)?;
        Ok(count > 0)
    }

    pub fn delete_faq(&self, faq_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM faqs WHERE id = ?1", params![faq_id])
            .map_err(db)?;
        Ok(count > 0)
    }

    pub fn count_faqs(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM faqs", [], |row| row.get(0))
            .map_err(db)
    }

    /// Full-text search over FAQ question and answer, best match first.
    pub fn search_faqs(&self, query: &str, limit: usize) -> Result<Vec<FaqHit>> {
        let fts_query = Self::sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let sql = "SELECT f.id, f.question, f.answer, faqs_fts.rank AS bm25_score \
                   FROM faqs_fts \
                   JOIN faqs f ON f.id = faqs_fts.rowid \
                   WHERE faqs_fts MATCH ?1 \
                   ORDER BY faqs_fts.rank \
                   LIMIT ?2";
        let mut stmt = conn.prepare_cached(sql).map_err(db)?;
        let rows = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                let bm25_score: f64 = row.get("bm25_score").unwrap_or(0.0);
                Ok(FaqHit {
                    faq_id: row.get("id")?,
                    question: row.get("question")?,
                    answer: row.get("answer")?,
                    score: -bm25_score, // FTS5 rank is negative; negate for positive
                })
            })
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    /// Case-insensitive substring match: any term in question or answer.
    pub fn search_faqs_substring(&self, terms: &[&str], limit: usize) -> Result<Vec<FaqHit>> {
        let patterns = Self::like_patterns(terms);
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let clause = (1..=patterns.len())
            .map(|i| {
                format!(
                    "fold_case(f.question) LIKE ?{i} ESCAPE '\\' \
                     OR fold_case(f.answer) LIKE ?{i} ESCAPE '\\'"
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT f.id, f.question, f.answer FROM faqs f WHERE {} ORDER BY f.id LIMIT {}",
            clause, limit
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(params_from_iter(patterns.iter()), |row| {
                Ok(FaqHit {
                    faq_id: row.get("id")?,
                    question: row.get("question")?,
                    answer: row.get("answer")?,
                    score: 0.0,
                })
            })
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    // ---------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------

    /// Insert a document in `pending` state. Returns the new document ID.
    pub fn add_document(&self, doc: &NewDocument) -> Result<i64> {
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO documents (filename, original_name, file_path, file_type, file_size, \
                 uploaded_by, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
            )
            .map_err(db)?
            .insert(params![
                doc.filename,
                doc.original_name,
                doc.file_path,
                doc.file_type,
                doc.file_size,
                doc.uploaded_by,
                now_millis(),
            ])
            .map_err(db)?;
        Ok(id)
    }

    pub fn get_document(&self, doc_id: i64) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM documents d LEFT JOIN users u ON u.id = d.uploaded_by WHERE d.id = ?1",
            DOCUMENT_COLUMNS
        );
        let document = conn
            .prepare_cached(&sql)
            .map_err(db)?
            .query_row(params![doc_id], |row| Ok(Self::row_to_document(row)))
            .optional()
            .map_err(db)?;
        Ok(document)
    }

    /// All documents, newest first.
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM documents d LEFT JOIN users u ON u.id = d.uploaded_by \
             ORDER BY d.created_at DESC, d.id DESC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(db)?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_document(row)))
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(db)
    }

    /// Mark a document as being processed.
    pub fn mark_document_processing(&self, doc_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET status = 'processing', error = NULL WHERE id = ?1",
                params![doc_id],
            )
            .map_err(db)?;
        Ok(count > 0)
    }

    /// Record the outcome of processing. `note` is kept in the `error` column.
    pub fn finish_document(
        &self,
        doc_id: i64,
        status: DocumentStatus,
        chunk_count: i64,
        note: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET status = ?1, chunk_count = ?2, error = ?3, processed_at = ?4 \
                 WHERE id = ?5",
                params![status.as_str(), chunk_count, note, now_millis(), doc_id],
            )
            .map_err(db)?;
        Ok(count > 0)
    }

    /// Delete a document and its chunks (cascade).
    pub fn delete_document(&self, doc_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM documents WHERE id = ?1", params![doc_id])
            .map_err(db)?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Chunks
    // ---------------------------------------------------------------

    /// Replace all chunks of a document atomically. Returns the number stored.
    pub fn replace_document_chunks(&self, doc_id: i64, chunks: &[NewChunk]) -> Result<usize> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db)?;
        tx.execute("DELETE FROM document_chunks WHERE document_id = ?1", params![doc_id])
            .map_err(db)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO document_chunks (document_id, chunk_index, content, start_char, \
                     end_char, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db)?;
            for chunk in chunks {
                stmt.execute(params![
                    doc_id,
                    chunk.chunk_index,
                    chunk.content,
                    chunk.start_char,
                    chunk.end_char,
                    now
                ])
                .map_err(db)?;
            }
        }
        tx.commit().map_err(db)?;
        debug!("Stored {} chunks for document {}", chunks.len(), doc_id);
        Ok(chunks.len())
    }

    pub fn get_chunks_for_document(&self, doc_id: i64) -> Result<Vec<DocumentChunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM document_chunks WHERE document_id = ?1 ORDER BY chunk_index")
            .map_err(db)?;
        let rows = stmt
            .query_map(params![doc_id], |row| Ok(Self::row_to_chunk(row)))
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    pub fn count_chunks(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM document_chunks", [], |row| row.get(0))
            .map_err(db)
    }

    /// Full-text search over chunk content, best match first.
    pub fn search_chunks(&self, query: &str, limit: usize) -> Result<Vec<ChunkHit>> {
        let fts_query = Self::sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let sql = "SELECT c.id, c.document_id, c.content, d.original_name, \
                          chunks_fts.rank AS bm25_score \
                   FROM chunks_fts \
                   JOIN document_chunks c ON c.id = chunks_fts.rowid \
                   LEFT JOIN documents d ON d.id = c.document_id \
                   WHERE chunks_fts MATCH ?1 \
                   ORDER BY chunks_fts.rank \
                   LIMIT ?2";
        let mut stmt = conn.prepare_cached(sql).map_err(db)?;
        let rows = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                let bm25_score: f64 = row.get("bm25_score").unwrap_or(0.0);
                Ok(ChunkHit {
                    chunk_id: row.get("id")?,
                    document_id: row.get("document_id")?,
                    content: row.get("content")?,
                    original_name: row.get("original_name")?,
                    score: -bm25_score,
                })
            })
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    /// Case-insensitive substring match: any term in chunk content.
    pub fn search_chunks_substring(&self, terms: &[&str], limit: usize) -> Result<Vec<ChunkHit>> {
        let patterns = Self::like_patterns(terms);
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let clause = (1..=patterns.len())
            .map(|i| format!("fold_case(c.content) LIKE ?{i} ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT c.id, c.document_id, c.content, d.original_name \
             FROM document_chunks c LEFT JOIN documents d ON d.id = c.document_id \
             WHERE {} ORDER BY c.id LIMIT {}",
            clause, limit
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(params_from_iter(patterns.iter()), |row| {
                Ok(ChunkHit {
                    chunk_id: row.get("id")?,
                    document_id: row.get("document_id")?,
                    content: row.get("content")?,
                    original_name: row.get("original_name")?,
                    score: 0.0,
                })
            })
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    // ---------------------------------------------------------------
    // Chat history
    // ---------------------------------------------------------------

    /// Load one session with its turns in insertion order.
    pub fn get_chat_session(&self, user_id: i64, session_id: &str) -> Result<Option<ChatSession>> {
        let conn = self.conn.lock();
        let session = conn
            .prepare_cached("SELECT * FROM chat_sessions WHERE user_id = ?1 AND session_id = ?2")
            .map_err(db)?
            .query_row(params![user_id, session_id], |row| Ok(Self::row_to_session(row)))
            .optional()
            .map_err(db)?;

        match session {
            Some(mut s) => {
                s.messages = Self::load_turns(&conn, s.id)?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    /// Sessions of a user, most recently updated first.
    pub fn list_chat_sessions(
        &self,
        user_id: i64,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatSession>> {
        let conn = self.conn.lock();
        let mut sessions: Vec<ChatSession> = {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT * FROM chat_sessions \
                     WHERE user_id = ?1 AND (?2 IS NULL OR session_id = ?2) \
                     ORDER BY updated_at DESC, id DESC LIMIT ?3",
                )
                .map_err(db)?;
            let rows = stmt
                .query_map(params![user_id, session_id, limit as i64], |row| {
                    Ok(Self::row_to_session(row))
                })
                .map_err(db)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)?
        };

        for session in &mut sessions {
            session.messages = Self::load_turns(&conn, session.id)?;
        }
        Ok(sessions)
    }

    /// Append turns to a session, creating it on first use.
    ///
    /// Runs in one transaction: either every turn is stored or none is.
    pub fn append_turns(&self, user_id: i64, session_id: &str, turns: &[ChatTurn]) -> Result<()> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db)?;

        tx.execute(
            "INSERT INTO chat_sessions (user_id, session_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3) \
             ON CONFLICT(user_id, session_id) DO UPDATE SET updated_at = excluded.updated_at",
            params![user_id, session_id, now],
        )
        .map_err(db)?;

        let session_ref: i64 = tx
            .query_row(
                "SELECT id FROM chat_sessions WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
                |row| row.get(0),
            )
            .map_err(db)?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO chat_messages (session_ref, role, content, timestamp) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(db)?;
            for turn in turns {
                stmt.execute(params![session_ref, turn.role.as_str(), turn.content, turn.timestamp])
                    .map_err(db)?;
            }
        }

        tx.commit().map_err(db)?;
        debug!("Appended {} turns to session {} (user {})", turns.len(), session_id, user_id);
        Ok(())
    }

    fn load_turns(conn: &Connection, session_ref: i64) -> Result<Vec<ChatTurn>> {
        let mut stmt = conn
            .prepare_cached(
                "SELECT role, content, timestamp FROM chat_messages WHERE session_ref = ?1 ORDER BY id",
            )
            .map_err(db)?;
        let rows = stmt
            .query_map(params![session_ref], |row| {
                Ok(ChatTurn {
                    role: TurnRole::parse(&row.get::<_, String>(0)?),
                    content: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })
            .map_err(db)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    // ---------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------

    /// Sanitize a user query for FTS5 MATCH syntax.
    /// Wraps each token in double quotes and joins with OR.
    fn sanitize_fts_query(query: &str) -> String {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.replace('"', ""))
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t))
            .collect();
        tokens.join(" OR ")
    }

    /// Build lowercased `%term%` LIKE patterns with `\` as the escape character.
    fn like_patterns(terms: &[&str]) -> Vec<String> {
        terms
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| {
                let escaped = t
                    .to_lowercase()
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_user(row: &rusqlite::Row<'_>) -> User {
        User {
            id: row.get("id").unwrap_or(0),
            username: row.get("username").unwrap_or_default(),
            email: row.get("email").unwrap_or_default(),
            password_hash: row.get("password_hash").unwrap_or_default(),
            role: UserRole::parse(&row.get::<_, String>("role").unwrap_or_default()),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_faq(row: &rusqlite::Row<'_>) -> Faq {
        Faq {
            id: row.get("id").unwrap_or(0),
            question: row.get("question").unwrap_or_default(),
            answer: row.get("answer").unwrap_or_default(),
            category: row.get("category").unwrap_or_default(),
            created_by: row.get("created_by").ok().flatten(),
            created_by_username: row.get("created_by_username").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").unwrap_or(0),
        }
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> Document {
        Document {
            id: row.get("id").unwrap_or(0),
            filename: row.get("filename").unwrap_or_default(),
            original_name: row.get("original_name").unwrap_or_default(),
            file_path: row.get("file_path").unwrap_or_default(),
            file_type: row.get("file_type").unwrap_or_default(),
            file_size: row.get("file_size").unwrap_or(0),
            uploaded_by: row.get("uploaded_by").ok().flatten(),
            uploaded_by_username: row.get("uploaded_by_username").ok().flatten(),
            status: DocumentStatus::parse(&row.get::<_, String>("status").unwrap_or_default()),
            chunk_count: row.get("chunk_count").unwrap_or(0),
            error: row.get("error").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            processed_at: row.get("processed_at").ok().flatten(),
        }
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> DocumentChunk {
        DocumentChunk {
            id: row.get("id").unwrap_or(0),
            document_id: row.get("document_id").unwrap_or(0),
            chunk_index: row.get("chunk_index").unwrap_or(0),
            content: row.get("content").unwrap_or_default(),
            start_char: row.get("start_char").ok().flatten(),
            end_char: row.get("end_char").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> ChatSession {
        ChatSession {
            id: row.get("id").unwrap_or(0),
            user_id: row.get("user_id").unwrap_or(0),
            session_id: row.get("session_id").unwrap_or_default(),
            messages: Vec::new(),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").unwrap_or(0),
        }
    }
}
