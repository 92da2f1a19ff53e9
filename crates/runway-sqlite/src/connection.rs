//! SQLite connection implementation.
//!
//! Safe wrappers around SQLite's C API implementing the `Connection` trait
//! from runway-core.

// Casts and raw pointers in FFI code match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::result_large_err)]
#![allow(clippy::borrow_as_ptr)]
#![allow(clippy::if_not_else)]

use crate::types;
/// libsqlite3-sys blocklists `sqlite3_close_v2` from its bindings; the symbol
/// is still present in the bundled library, so declare it here.
mod ffi {
    pub use libsqlite3_sys::*;

    unsafe extern "C" {
        pub fn sqlite3_close_v2(db: *mut sqlite3) -> ::std::ffi::c_int;
    }
}

use runway_core::{
    ColumnInfo, Connection, ConnectionError, ConnectionErrorKind, Error, IsolationLevel,
    QueryError, QueryErrorKind, Row, TransactionError, TransactionErrorKind, TransactionOps, Value,
};
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Enforce foreign key constraints (`PRAGMA foreign_keys = ON`).
    pub foreign_keys: bool,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in serialized mode.
    pub full_mutex: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
            foreign_keys: false,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Turn foreign key enforcement on or off.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

struct SqliteInner {
    db: *mut ffi::sqlite3,
    in_transaction: bool,
}

// SAFETY: the handle is only touched while holding the connection's Mutex.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            } else {
                error_string(rc)
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        let conn = Self {
            inner: Mutex::new(SqliteInner {
                db,
                in_transaction: false,
            }),
            path: config.path.clone(),
        };

        if config.foreign_keys {
            conn.execute_raw("PRAGMA foreign_keys = ON")?;
        }

        tracing::debug!(path = %conn.path, "opened sqlite database");
        Ok(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (DDL, several statements).
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(inner.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg was allocated by sqlite3_exec
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            } else {
                error_string(rc)
            };

            return Err(Error::Query(QueryError {
                kind: error_code_to_kind(rc),
                sql: Some(sql.to_string()),
                message: msg,
                source: None,
            }));
        }

        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> u64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) as u64 }
    }

    /// Is a transaction currently open on this connection?
    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let inner = self.lock();
        let stmt = prepare_stmt(inner.db, sql)?;
        // SAFETY: stmt was just prepared on inner.db
        unsafe { bind_params(inner.db, stmt, sql, params)? };

        // SAFETY: stmt is valid
        let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
        let col_names = (0..col_count)
            // SAFETY: i is below col_count
            .map(|i| unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i)))
            .collect();
        let columns = Arc::new(ColumnInfo::new(col_names));

        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt) };
            match rc {
                ffi::SQLITE_ROW => {
                    let values = (0..col_count)
                        // SAFETY: we just got SQLITE_ROW
                        .map(|i| unsafe { types::read_column(stmt, i) })
                        .collect();
                    rows.push(Row::with_columns(Arc::clone(&columns), values));
                }
                ffi::SQLITE_DONE => break,
                _ => {
                    let err = step_error(inner.db, sql);
                    // SAFETY: stmt is valid
                    unsafe { ffi::sqlite3_finalize(stmt) };
                    return Err(err);
                }
            }
        }

        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };
        tracing::trace!(sql = %sql, rows = rows.len(), "sqlite query");
        Ok(rows)
    }

    fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        let inner = self.lock();
        let stmt = prepare_stmt(inner.db, sql)?;
        // SAFETY: stmt was just prepared on inner.db
        unsafe { bind_params(inner.db, stmt, sql, params)? };

        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt) };
        let result = match rc {
            ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                // SAFETY: db is valid
                Ok(unsafe { ffi::sqlite3_changes(inner.db) } as u64)
            }
            _ => Err(step_error(inner.db, sql)),
        };
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };

        if let Ok(changes) = &result {
            tracing::trace!(sql = %sql, changes, "sqlite execute");
        }
        result
    }

    fn begin_sync(&self, isolation: IsolationLevel) -> Result<(), Error> {
        if self.lock().in_transaction {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "Already in a transaction".to_string(),
            }));
        }

        // SQLite has no isolation levels; approximate with lock acquisition modes
        let begin_sql = match isolation {
            IsolationLevel::Serializable => "BEGIN EXCLUSIVE",
            IsolationLevel::RepeatableRead | IsolationLevel::ReadCommitted => "BEGIN IMMEDIATE",
            IsolationLevel::ReadUncommitted => "BEGIN DEFERRED",
        };

        self.execute_raw(begin_sql)?;
        self.lock().in_transaction = true;
        tracing::debug!(isolation = isolation.as_sql(), "sqlite transaction begin");
        Ok(())
    }

    fn finish_sync(&self, sql: &'static str) -> Result<(), Error> {
        if !self.lock().in_transaction {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                message: "Not in a transaction".to_string(),
            }));
        }

        let result = self.execute_raw(sql);
        // A failed COMMIT leaves the transaction open; a failed ROLLBACK does not.
        if result.is_ok() || sql == "ROLLBACK" {
            self.lock().in_transaction = false;
        }
        tracing::debug!(statement = sql, ok = result.is_ok(), "sqlite transaction end");
        result
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        if !inner.db.is_null() {
            // SAFETY: db is valid and no statements outlive their call
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
        }
    }
}

/// A SQLite transaction. Rolled back on drop unless committed.
pub struct SqliteTransaction<'conn> {
    conn: &'conn SqliteConnection,
    finished: bool,
}

impl<'conn> SqliteTransaction<'conn> {
    fn new(conn: &'conn SqliteConnection) -> Self {
        Self {
            conn,
            finished: false,
        }
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.finish_sync("ROLLBACK") {
                tracing::warn!(error = %err, "rollback of dropped transaction failed");
            }
        }
    }
}

impl Connection for SqliteConnection {
    type Tx<'conn>
        = SqliteTransaction<'conn>
    where
        Self: 'conn;

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        self.query_sync(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        Ok(self.query_sync(sql, params)?.into_iter().next())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        self.execute_sync(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, Error> {
        self.execute_sync(sql, params)?;
        Ok(self.last_insert_rowid())
    }

    fn begin_with(&self, isolation: IsolationLevel) -> Result<Self::Tx<'_>, Error> {
        self.begin_sync(isolation)?;
        Ok(SqliteTransaction::new(self))
    }

    fn ping(&self) -> Result<(), Error> {
        self.query_sync("SELECT 1", &[]).map(|_| ())
    }

    /// `sqlite:` plus the canonical file path. In-memory and temporary
    /// databases are private to this connection and have no name.
    fn database_name(&self) -> Option<String> {
        if is_private_database(&self.path) {
            return None;
        }
        let path = std::fs::canonicalize(&self.path)
            .map_or_else(|_| self.path.clone(), |p| p.display().to_string());
        Some(format!("sqlite:{path}"))
    }
}

fn is_private_database(path: &str) -> bool {
    path.is_empty()
        || path == ":memory:"
        || path.starts_with("file::memory:")
        || path.contains("mode=memory")
}

impl TransactionOps for SqliteTransaction<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        self.conn.query_sync(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        Ok(self.conn.query_sync(sql, params)?.into_iter().next())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        self.conn.execute_sync(sql, params)
    }

    fn commit(mut self) -> Result<(), Error> {
        let result = self.conn.finish_sync("COMMIT");
        // Leave a failed commit to the drop-time rollback
        self.finished = result.is_ok();
        result
    }

    fn rollback(mut self) -> Result<(), Error> {
        self.finished = true;
        self.conn.finish_sync("ROLLBACK")
    }
}

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<*mut ffi::sqlite3_stmt, Error> {
    let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            ptr::null_mut(),
        )
    };

    if rc != ffi::SQLITE_OK {
        return Err(step_error(db, sql));
    }

    Ok(stmt)
}

/// Bind all parameters, finalizing the statement on failure.
///
/// # Safety
/// `stmt` must be a live statement prepared on `db`.
unsafe fn bind_params(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<(), Error> {
    for (i, param) in params.iter().enumerate() {
        // SAFETY: index is 1-based and stmt is valid
        let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
        if rc != ffi::SQLITE_OK {
            let err = Error::Query(QueryError {
                kind: QueryErrorKind::Database,
                sql: Some(sql.to_string()),
                message: format!("Failed to bind parameter {}: {}", i + 1, errmsg(db)),
                source: None,
            });
            // SAFETY: stmt is valid
            unsafe { ffi::sqlite3_finalize(stmt) };
            return Err(err);
        }
    }
    Ok(())
}

fn step_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let code = unsafe { ffi::sqlite3_errcode(db) };
    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        sql: Some(sql.to_string()),
        message: errmsg(db),
        source: None,
    })
}

fn null_byte_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn errmsg(db: *mut ffi::sqlite3) -> String {
    // SAFETY: db is valid, errmsg returns a valid C string
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errmsg(db))
            .to_string_lossy()
            .into_owned()
    }
}

fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a static string for any code
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errstr(code))
            .to_string_lossy()
            .into_owned()
    }
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // Extended result codes keep the primary code in the low byte
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Deadlock,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Cancelled,
        ffi::SQLITE_ERROR => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts_db() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_id INTEGER)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_open_memory() {
        let conn = SqliteConnection::open_memory().unwrap();
        assert_eq!(conn.path(), ":memory:");
        assert!(conn.is_valid());
    }

    #[test]
    fn test_database_name() {
        assert_eq!(SqliteConnection::open_memory().unwrap().database_name(), None);
        assert!(is_private_database(""));
        assert!(is_private_database("file::memory:?cache=shared"));
        assert!(is_private_database("file:blog?mode=memory"));

        let path = std::env::temp_dir().join(format!("runway-name-{}.db", std::process::id()));
        let path = path.display().to_string();
        let first = SqliteConnection::open_file(path.clone()).unwrap();
        let second = SqliteConnection::open_file(path.clone()).unwrap();
        let name = first.database_name().unwrap();
        assert!(name.starts_with("sqlite:"));
        assert_eq!(second.database_name(), Some(name));
        drop((first, second));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_execute_raw_and_changes() {
        let conn = posts_db();
        conn.execute_raw("INSERT INTO posts (title) VALUES ('One')")
            .unwrap();
        assert_eq!(conn.changes(), 1);
        assert_eq!(conn.last_insert_rowid(), 1);
    }

    #[test]
    fn test_parameterized_query() {
        let conn = posts_db();
        let id = conn
            .insert(
                "INSERT INTO posts (title, author_id) VALUES (?, ?)",
                &[Value::Text("Hello".into()), Value::BigInt(3)],
            )
            .unwrap();
        assert_eq!(id, 1);

        let rows = conn
            .query("SELECT * FROM posts WHERE author_id = ?", &[Value::BigInt(3)])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_named::<String>("title").unwrap(), "Hello");
        assert_eq!(rows[0].get_named::<i64>("author_id").unwrap(), 3);
    }

    #[test]
    fn test_query_one_returns_first_row() {
        let conn = posts_db();
        conn.execute_raw("INSERT INTO posts (title) VALUES ('a'), ('b')")
            .unwrap();
        let row = conn
            .query_one("SELECT title FROM posts ORDER BY id", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row.get_named::<String>("title").unwrap(), "a");
        assert!(
            conn.query_one("SELECT title FROM posts WHERE id = 99", &[])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_not_null_violation_is_constraint() {
        let conn = posts_db();
        let err = conn
            .execute("INSERT INTO posts (title) VALUES (?)", &[Value::Null])
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(err.sql().is_some());
    }

    #[test]
    fn test_syntax_error() {
        let conn = posts_db();
        match conn.query("SELEC 1", &[]) {
            Err(Error::Query(q)) => assert_eq!(q.kind, QueryErrorKind::Syntax),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_commit() {
        let conn = posts_db();
        let tx = conn.begin().unwrap();
        tx.execute("INSERT INTO posts (title) VALUES (?)", &[Value::from("kept")])
            .unwrap();
        tx.commit().unwrap();
        assert!(!conn.in_transaction());

        let rows = conn.query("SELECT id FROM posts", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_transaction_rollback_on_drop() {
        let conn = posts_db();
        {
            let tx = conn.begin().unwrap();
            tx.execute("INSERT INTO posts (title) VALUES (?)", &[Value::from("gone")])
                .unwrap();
        }
        assert!(!conn.in_transaction());
        let rows = conn.query("SELECT id FROM posts", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_nested_begin_rejected() {
        let conn = posts_db();
        let _tx = conn.begin().unwrap();
        match conn.begin() {
            Err(Error::Transaction(t)) => assert_eq!(t.kind, TransactionErrorKind::AlreadyActive),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("nested begin should fail"),
        }
    }

    #[test]
    fn test_foreign_keys_enforced_when_enabled() {
        let conn = SqliteConnection::open(&SqliteConfig::memory().foreign_keys(true)).unwrap();
        conn.execute_raw(
            "CREATE TABLE authors (id INTEGER PRIMARY KEY);
             CREATE TABLE posts (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors(id));",
        )
        .unwrap();
        let err = conn
            .execute("INSERT INTO posts (author_id) VALUES (?)", &[Value::BigInt(42)])
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_large_integers_round_trip() {
        let conn = SqliteConnection::open_memory().unwrap();
        let rows = conn
            .query("SELECT ? AS big, ? AS small", &[Value::BigInt(i64::MAX), Value::Int(7)])
            .unwrap();
        assert_eq!(rows[0].get_by_name("big"), Some(&Value::BigInt(i64::MAX)));
        assert_eq!(rows[0].get_by_name("small"), Some(&Value::Int(7)));
    }
}
