//! Persistence port for relationship state.
//!
//! The synchronizer never talks to a connection directly. It reads current
//! relationship state and applies [`RelationOp`]s through a
//! [`RelationStore`], so the reconciliation logic can run against an
//! in-memory store in tests and against [`SqlRelationStore`] in production.

use runway_core::{
    Connection, Error, HasManyInfo, IsolationLevel, LinkTableInfo, RecordId, Result, Row,
    TransactionError, TransactionErrorKind, TransactionOps, Value,
};
use runway_schema::Dialect;
use std::cell::RefCell;

/// Upper bound on keys bound into one statement.
const MAX_KEYS_PER_STATEMENT: usize = 500;

/// A single write against relationship state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationOp {
    /// Point target rows at `owner`, or detach them when `owner` is `None`.
    AssignOwner {
        table: String,
        key_column: String,
        foreign_key: String,
        owner: Option<RecordId>,
        ids: Vec<RecordId>,
    },
    /// Delete target rows outright.
    DeleteRows {
        table: String,
        key_column: String,
        ids: Vec<RecordId>,
    },
    /// Insert one pivot row per id.
    InsertPivot {
        table: String,
        local_column: String,
        remote_column: String,
        owner: RecordId,
        ids: Vec<RecordId>,
    },
    /// Delete the owner's pivot rows for these ids.
    DeletePivot {
        table: String,
        local_column: String,
        remote_column: String,
        owner: RecordId,
        ids: Vec<RecordId>,
    },
    /// Set `order_column` to each key's position, in one statement.
    ///
    /// `scope` restricts the update to rows whose scope column equals the
    /// owner: the foreign key for has-many, the local pivot column for
    /// belongs-to-many.
    WritePositions {
        table: String,
        key_column: String,
        order_column: String,
        scope: (String, RecordId),
        positions: Vec<(RecordId, usize)>,
    },
}

impl RelationOp {
    pub fn link(info: &HasManyInfo, owner: &RecordId, ids: Vec<RecordId>) -> Self {
        Self::AssignOwner {
            table: info.related_table.clone(),
            key_column: info.related_key.clone(),
            foreign_key: info.foreign_key.clone(),
            owner: Some(owner.clone()),
            ids,
        }
    }

    pub fn detach(info: &HasManyInfo, ids: Vec<RecordId>) -> Self {
        Self::AssignOwner {
            table: info.related_table.clone(),
            key_column: info.related_key.clone(),
            foreign_key: info.foreign_key.clone(),
            owner: None,
            ids,
        }
    }

    pub fn delete(info: &HasManyInfo, ids: Vec<RecordId>) -> Self {
        Self::DeleteRows {
            table: info.related_table.clone(),
            key_column: info.related_key.clone(),
            ids,
        }
    }

    pub fn attach(link: &LinkTableInfo, owner: &RecordId, ids: Vec<RecordId>) -> Self {
        Self::InsertPivot {
            table: link.table_name.clone(),
            local_column: link.local_column.clone(),
            remote_column: link.remote_column.clone(),
            owner: owner.clone(),
            ids,
        }
    }

    pub fn detach_pivot(link: &LinkTableInfo, owner: &RecordId, ids: Vec<RecordId>) -> Self {
        Self::DeletePivot {
            table: link.table_name.clone(),
            local_column: link.local_column.clone(),
            remote_column: link.remote_column.clone(),
            owner: owner.clone(),
            ids,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            RelationOp::AssignOwner { table, .. }
            | RelationOp::DeleteRows { table, .. }
            | RelationOp::InsertPivot { table, .. }
            | RelationOp::DeletePivot { table, .. }
            | RelationOp::WritePositions { table, .. } => table,
        }
    }

    /// Number of rows the op targets.
    pub fn len(&self) -> usize {
        match self {
            RelationOp::AssignOwner { ids, .. }
            | RelationOp::DeleteRows { ids, .. }
            | RelationOp::InsertPivot { ids, .. }
            | RelationOp::DeletePivot { ids, .. } => ids.len(),
            RelationOp::WritePositions { positions, .. } => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the op as parameterized SQL for `dialect`, splitting long key
    /// lists.
    pub fn to_statements(&self, dialect: Dialect) -> Vec<(String, Vec<Value>)> {
        match self {
            RelationOp::AssignOwner {
                table,
                key_column,
                foreign_key,
                owner,
                ids,
            } => ids
                .chunks(MAX_KEYS_PER_STATEMENT)
                .map(|chunk| {
                    let mut w = SqlWriter::new(dialect);
                    let owner_param = w.param();
                    let sql = format!(
                        "UPDATE {} SET {} = {} WHERE {} IN ({})",
                        w.ident(table),
                        w.ident(foreign_key),
                        owner_param,
                        w.ident(key_column),
                        w.params(chunk.len())
                    );
                    let mut params = Vec::with_capacity(chunk.len() + 1);
                    params.push(owner.as_ref().map_or(Value::Null, RecordId::to_value));
                    params.extend(chunk.iter().map(RecordId::to_value));
                    (sql, params)
                })
                .collect(),

            RelationOp::DeleteRows {
                table,
                key_column,
                ids,
            } => ids
                .chunks(MAX_KEYS_PER_STATEMENT)
                .map(|chunk| {
                    let mut w = SqlWriter::new(dialect);
                    let sql = format!(
                        "DELETE FROM {} WHERE {} IN ({})",
                        w.ident(table),
                        w.ident(key_column),
                        w.params(chunk.len())
                    );
                    (sql, chunk.iter().map(RecordId::to_value).collect())
                })
                .collect(),

            RelationOp::InsertPivot {
                table,
                local_column,
                remote_column,
                owner,
                ids,
            } => ids
                .chunks(MAX_KEYS_PER_STATEMENT / 2)
                .map(|chunk| {
                    let mut w = SqlWriter::new(dialect);
                    let rows = (0..chunk.len())
                        .map(|_| format!("({})", w.params(2)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let sql = format!(
                        "INSERT INTO {} ({}, {}) VALUES {}",
                        w.ident(table),
                        w.ident(local_column),
                        w.ident(remote_column),
                        rows
                    );
                    let params = chunk
                        .iter()
                        .flat_map(|id| [owner.to_value(), id.to_value()])
                        .collect();
                    (sql, params)
                })
                .collect(),

            RelationOp::DeletePivot {
                table,
                local_column,
                remote_column,
                owner,
                ids,
            } => ids
                .chunks(MAX_KEYS_PER_STATEMENT)
                .map(|chunk| {
                    let mut w = SqlWriter::new(dialect);
                    let owner_param = w.param();
                    let sql = format!(
                        "DELETE FROM {} WHERE {} = {} AND {} IN ({})",
                        w.ident(table),
                        w.ident(local_column),
                        owner_param,
                        w.ident(remote_column),
                        w.params(chunk.len())
                    );
                    let mut params = Vec::with_capacity(chunk.len() + 1);
                    params.push(owner.to_value());
                    params.extend(chunk.iter().map(RecordId::to_value));
                    (sql, params)
                })
                .collect(),

            RelationOp::WritePositions {
                table,
                key_column,
                order_column,
                scope: (scope_column, owner),
                positions,
            } => positions
                .chunks(MAX_KEYS_PER_STATEMENT / 3)
                .map(|chunk| {
                    let mut w = SqlWriter::new(dialect);
                    let cases = (0..chunk.len())
                        .map(|_| {
                            let key = w.param();
                            format!("WHEN {key} THEN {}", w.param())
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    let keys = w.params(chunk.len());
                    let scope_param = w.param();
                    let sql = format!(
                        "UPDATE {table} SET {order} = CASE {key} {cases} ELSE {order} END \
                         WHERE {key} IN ({keys}) AND {scope} = {scope_param}",
                        table = w.ident(table),
                        order = w.ident(order_column),
                        key = w.ident(key_column),
                        scope = w.ident(scope_column),
                    );
                    let mut params = Vec::with_capacity(chunk.len() * 3 + 1);
                    for (id, position) in chunk {
                        params.push(id.to_value());
                        params.push(Value::from(*position));
                    }
                    params.extend(chunk.iter().map(|(id, _)| id.to_value()));
                    params.push(owner.to_value());
                    (sql, params)
                })
                .collect(),
        }
    }
}

/// Quotes names and numbers bind parameters for one statement.
///
/// Parameters must be requested in the order their values are bound.
struct SqlWriter {
    dialect: Dialect,
    bound: usize,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, bound: 0 }
    }

    fn ident(&self, name: &str) -> String {
        self.dialect.quote_ident(name)
    }

    fn param(&mut self) -> String {
        self.bound += 1;
        self.dialect.placeholder(self.bound)
    }

    fn params(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| self.param())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `ORDER BY` for current targets: by `order_column` with NULLs last,
    /// then by key.
    fn order_by(&self, order_column: Option<&str>, key_column: &str) -> String {
        match order_column {
            Some(order) => format!(
                "ORDER BY {order} IS NULL, {order}, {key}",
                order = self.ident(order),
                key = self.ident(key_column)
            ),
            None => format!("ORDER BY {}", self.ident(key_column)),
        }
    }
}

/// Reads and writes relationship state inside one transaction.
pub trait RelationStore {
    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Keys of target rows whose foreign key equals `owner`, by
    /// `order_column` when given, then by key.
    fn owned_targets(
        &self,
        info: &HasManyInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>>;

    /// Target keys of the owner's pivot rows, by `order_column` when given,
    /// then by key.
    fn attached_targets(
        &self,
        link: &LinkTableInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>>;

    /// Apply one op, returning the number of rows affected.
    fn apply(&self, op: &RelationOp) -> Result<u64>;
}

/// [`RelationStore`] over a [`Connection`].
pub struct SqlRelationStore<'c, C: Connection + 'c> {
    conn: &'c C,
    isolation: IsolationLevel,
    dialect: Dialect,
    tx: RefCell<Option<C::Tx<'c>>>,
}

impl<'c, C: Connection + 'c> SqlRelationStore<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            isolation: IsolationLevel::default(),
            dialect: Dialect::default(),
            tx: RefCell::new(None),
        }
    }

    /// SQL dialect used to render reads and writes.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.borrow().is_some()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(sql = %sql, params = params.len(), "relation store query");
        match self.tx.borrow().as_ref() {
            Some(tx) => tx.query(sql, params),
            None => self.conn.query(sql, params),
        }
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::trace!(sql = %sql, params = params.len(), "relation store execute");
        match self.tx.borrow().as_ref() {
            Some(tx) => tx.execute(sql, params),
            None => self.conn.execute(sql, params),
        }
    }

    fn keys(rows: &[Row]) -> Result<Vec<RecordId>> {
        rows.iter()
            .map(|row| {
                let value = row.get(0).unwrap_or(&Value::Null);
                RecordId::from_value(value)
            })
            .collect()
    }

    fn take_tx(&self) -> Result<C::Tx<'c>> {
        self.tx.borrow_mut().take().ok_or_else(|| {
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                message: "relation store has no open transaction".to_string(),
            })
        })
    }
}

impl<'c, C: Connection + 'c> RelationStore for SqlRelationStore<'c, C> {
    fn begin(&self) -> Result<()> {
        if self.in_transaction() {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "relation store transaction already open".to_string(),
            }));
        }
        let tx = self.conn.begin_with(self.isolation)?;
        *self.tx.borrow_mut() = Some(tx);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.take_tx()?.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.take_tx()?.rollback()
    }

    fn owned_targets(
        &self,
        info: &HasManyInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>> {
        let mut w = SqlWriter::new(self.dialect);
        let sql = format!(
            "SELECT {key} FROM {table} WHERE {fk} = {owner} {order}",
            key = w.ident(&info.related_key),
            table = w.ident(&info.related_table),
            fk = w.ident(&info.foreign_key),
            owner = w.param(),
            order = w.order_by(order_column, &info.related_key),
        );
        Self::keys(&self.query(&sql, &[owner.to_value()])?)
    }

    fn attached_targets(
        &self,
        link: &LinkTableInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>> {
        let mut w = SqlWriter::new(self.dialect);
        let sql = format!(
            "SELECT {remote} FROM {table} WHERE {local} = {owner} {order}",
            remote = w.ident(&link.remote_column),
            table = w.ident(&link.table_name),
            local = w.ident(&link.local_column),
            owner = w.param(),
            order = w.order_by(order_column, &link.remote_column),
        );
        Self::keys(&self.query(&sql, &[owner.to_value()])?)
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, op),
        fields(table = op.table(), rows = op.len(), dialect = ?self.dialect)
    )]
    fn apply(&self, op: &RelationOp) -> Result<u64> {
        let mut affected = 0;
        for (sql, params) in op.to_statements(self.dialect) {
            affected += self.execute(&sql, &params)?;
        }
        Ok(affected)
    }
}
