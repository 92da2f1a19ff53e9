//! Database connection traits.
//!
//! - [`Connection`] - executes statements and opens transactions
//! - [`TransactionOps`] - statements inside an open transaction
//! - [`IsolationLevel`] - SQL transaction isolation levels
//!
//! Execution is synchronous and blocking: one synchronization call runs
//! start to finish on the calling thread inside a single transaction.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Transactions can see uncommitted changes from others.
    ReadUncommitted,

    /// Transactions only see committed changes from others.
    #[default]
    ReadCommitted,

    /// Transactions see a consistent snapshot of the database.
    RepeatableRead,

    /// Transactions appear to execute sequentially.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// A database connection capable of executing queries.
///
/// # Example
///
/// ```rust,ignore
/// let rows = conn.query("SELECT id FROM posts WHERE author_id = ?", &[Value::BigInt(1)])?;
///
/// let tx = conn.begin()?;
/// tx.execute("UPDATE posts SET author_id = NULL WHERE id = ?", &[Value::BigInt(2)])?;
/// tx.commit()?;
/// ```
pub trait Connection {
    /// The transaction type returned by this connection.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Execute a statement (INSERT, UPDATE, DELETE) and return rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT and return the last inserted ID.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Begin a transaction with the default isolation level.
    fn begin(&self) -> Result<Self::Tx<'_>> {
        self.begin_with(IsolationLevel::default())
    }

    /// Begin a transaction with a specific isolation level.
    fn begin_with(&self, isolation: IsolationLevel) -> Result<Self::Tx<'_>>;

    /// Check the connection by running a trivial statement.
    fn ping(&self) -> Result<()>;

    /// Check if the connection is still valid.
    fn is_valid(&self) -> bool {
        self.ping().is_ok()
    }

    /// Name of the database this connection talks to, when it outlives the
    /// connection.
    ///
    /// Connections reporting the same name share schema caches. `None`
    /// (the default, and the answer for private in-memory databases) means
    /// nothing learned about this database may be reused by another
    /// connection.
    fn database_name(&self) -> Option<String> {
        None
    }
}

/// Operations available inside an open transaction.
///
/// Transactions must be explicitly committed; dropping one without
/// committing rolls it back.
///
/// ```rust,ignore
/// let tx = conn.begin()?;
/// tx.execute("INSERT INTO post_author (author_id, post_id) VALUES (?, ?)", &params)?;
/// tx.execute("DELETE FROM post_author WHERE author_id = ? AND post_id = ?", &stale)?;
/// tx.commit()?;
/// ```
pub trait TransactionOps {
    /// Execute a query within this transaction.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Execute a statement within this transaction.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Commit the transaction, making all changes permanent.
    fn commit(self) -> Result<()>;

    /// Roll back the transaction, discarding all changes.
    fn rollback(self) -> Result<()>;
}
