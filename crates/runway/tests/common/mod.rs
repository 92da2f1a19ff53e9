//! In-memory fakes for the persistence and schema ports.

#![allow(dead_code)]

use runway::store::{RelationOp, RelationStore};
use runway_core::{
    Error, HasManyInfo, LinkTableInfo, QueryError, QueryErrorKind, RecordId, Result, Value,
};
use runway_schema::{ColumnInfo, SchemaCatalog};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

pub type Columns = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    /// table -> primary key -> columns
    pub rows: BTreeMap<String, BTreeMap<RecordId, Columns>>,
    /// pivot table -> rows
    pub pivots: BTreeMap<String, Vec<Columns>>,
}

/// Relation store over plain maps, with transaction snapshots and an op log.
#[derive(Default)]
pub struct MemoryStore {
    state: RefCell<State>,
    snapshot: RefCell<Option<State>>,
    applied: RefCell<Vec<RelationOp>>,
    events: RefCell<Vec<&'static str>>,
    fail_table: RefCell<Option<(String, QueryErrorKind)>>,
    fail_begin: Cell<Option<QueryErrorKind>>,
    fail_commit: Cell<Option<QueryErrorKind>>,
}

fn columns(values: &[(&str, Value)]) -> Columns {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn store_error(kind: QueryErrorKind, message: String) -> Error {
    Error::Query(QueryError {
        kind,
        sql: None,
        message,
        source: None,
    })
}

fn position(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Int(v)) => Some(i64::from(*v)),
        Some(Value::BigInt(v)) => Some(*v),
        _ => None,
    }
}

fn sort_by_order(entries: &mut [(RecordId, Option<i64>)]) {
    entries.sort_by(|(ka, pa), (kb, pb)| match (pa, pb) {
        (Some(a), Some(b)) => a.cmp(b).then_with(|| ka.cmp(kb)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => ka.cmp(kb),
    });
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_row(&self, table: &str, key: i64, values: &[(&str, Value)]) {
        self.state
            .borrow_mut()
            .rows
            .entry(table.to_string())
            .or_default()
            .insert(RecordId::Int(key), columns(values));
    }

    pub fn insert_pivot(&self, table: &str, values: &[(&str, Value)]) {
        self.state
            .borrow_mut()
            .pivots
            .entry(table.to_string())
            .or_default()
            .push(columns(values));
    }

    pub fn row(&self, table: &str, key: i64) -> Option<Columns> {
        self.state
            .borrow()
            .rows
            .get(table)
            .and_then(|rows| rows.get(&RecordId::Int(key)))
            .cloned()
    }

    pub fn value(&self, table: &str, key: i64, column: &str) -> Option<Value> {
        self.row(table, key).and_then(|row| row.get(column).cloned())
    }

    pub fn pivot_rows(&self, table: &str) -> Vec<Columns> {
        self.state
            .borrow()
            .pivots
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    pub fn applied(&self) -> Vec<RelationOp> {
        self.applied.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.applied.borrow_mut().clear();
        self.events.borrow_mut().clear();
    }

    /// `begin`, `commit` and `rollback` calls, in order.
    pub fn events(&self) -> Vec<&'static str> {
        self.events.borrow().clone()
    }

    /// Reject every later write to `table` as a constraint violation.
    pub fn fail_writes_to(&self, table: &str) {
        self.fail_writes_to_with(table, QueryErrorKind::Constraint);
    }

    /// Reject every later write to `table` with a `kind` error.
    pub fn fail_writes_to_with(&self, table: &str, kind: QueryErrorKind) {
        *self.fail_table.borrow_mut() = Some((table.to_string(), kind));
    }

    /// Make the next `begin` fail with a `kind` error.
    pub fn fail_begin_with(&self, kind: QueryErrorKind) {
        self.fail_begin.set(Some(kind));
    }

    /// Make the next `commit` fail with a `kind` error. The open
    /// transaction is discarded, as a database does with one it could not
    /// commit.
    pub fn fail_commit_with(&self, kind: QueryErrorKind) {
        self.fail_commit.set(Some(kind));
    }

    fn owned(state: &State, table: &str, fk: &str, owner: &Value) -> Vec<RecordId> {
        state
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, row)| row.get(fk) == Some(owner))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn write(&self, op: &RelationOp) -> u64 {
        let mut state = self.state.borrow_mut();
        let mut affected = 0;
        match op {
            RelationOp::AssignOwner {
                table,
                foreign_key,
                owner,
                ids,
                ..
            } => {
                let owner = owner.as_ref().map_or(Value::Null, RecordId::to_value);
                if let Some(rows) = state.rows.get_mut(table) {
                    for id in ids {
                        if let Some(row) = rows.get_mut(id) {
                            row.insert(foreign_key.clone(), owner.clone());
                            affected += 1;
                        }
                    }
                }
            }
            RelationOp::DeleteRows { table, ids, .. } => {
                if let Some(rows) = state.rows.get_mut(table) {
                    for id in ids {
                        if rows.remove(id).is_some() {
                            affected += 1;
                        }
                    }
                }
            }
            RelationOp::InsertPivot {
                table,
                local_column,
                remote_column,
                owner,
                ids,
            } => {
                let pivot = state.pivots.entry(table.clone()).or_default();
                for id in ids {
                    pivot.push(columns(&[
                        (local_column.as_str(), owner.to_value()),
                        (remote_column.as_str(), id.to_value()),
                    ]));
                    affected += 1;
                }
            }
            RelationOp::DeletePivot {
                table,
                local_column,
                remote_column,
                owner,
                ids,
            } => {
                if let Some(pivot) = state.pivots.get_mut(table) {
                    let owner = owner.to_value();
                    let ids: Vec<Value> = ids.iter().map(RecordId::to_value).collect();
                    let before = pivot.len();
                    pivot.retain(|row| {
                        !(row.get(local_column) == Some(&owner)
                            && row.get(remote_column).is_some_and(|v| ids.contains(v)))
                    });
                    affected = (before - pivot.len()) as u64;
                }
            }
            RelationOp::WritePositions {
                table,
                key_column,
                order_column,
                scope: (scope_column, owner),
                positions,
            } => {
                let owner = owner.to_value();
                let lookup: HashMap<&RecordId, usize> =
                    positions.iter().map(|(id, pos)| (id, *pos)).collect();
                if let Some(rows) = state.rows.get_mut(table) {
                    for (key, row) in rows.iter_mut() {
                        if row.get(scope_column) != Some(&owner) {
                            continue;
                        }
                        if let Some(pos) = lookup.get(key) {
                            row.insert(order_column.clone(), Value::from(*pos));
                            affected += 1;
                        }
                    }
                } else if let Some(pivot) = state.pivots.get_mut(table) {
                    for row in pivot.iter_mut() {
                        if row.get(scope_column) != Some(&owner) {
                            continue;
                        }
                        let key = row
                            .get(key_column)
                            .and_then(|v| RecordId::from_value(v).ok());
                        if let Some(pos) = key.as_ref().and_then(|k| lookup.get(k)) {
                            row.insert(order_column.clone(), Value::from(*pos));
                            affected += 1;
                        }
                    }
                }
            }
        }
        affected
    }
}

impl RelationStore for MemoryStore {
    fn begin(&self) -> Result<()> {
        self.events.borrow_mut().push("begin");
        if let Some(kind) = self.fail_begin.take() {
            return Err(store_error(kind, "could not begin".to_string()));
        }
        *self.snapshot.borrow_mut() = Some(self.state.borrow().clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.events.borrow_mut().push("commit");
        let snapshot = self.snapshot.borrow_mut().take();
        if let Some(kind) = self.fail_commit.take() {
            if let Some(snapshot) = snapshot {
                *self.state.borrow_mut() = snapshot;
            }
            return Err(store_error(kind, "could not commit".to_string()));
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.events.borrow_mut().push("rollback");
        if let Some(snapshot) = self.snapshot.borrow_mut().take() {
            *self.state.borrow_mut() = snapshot;
        }
        Ok(())
    }

    fn owned_targets(
        &self,
        info: &HasManyInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>> {
        let state = self.state.borrow();
        let keys = Self::owned(&state, &info.related_table, &info.foreign_key, &owner.to_value());
        let mut entries: Vec<(RecordId, Option<i64>)> = keys
            .into_iter()
            .map(|key| {
                let pos = order_column.and_then(|col| {
                    position(state.rows[&info.related_table][&key].get(col))
                });
                (key, pos)
            })
            .collect();
        sort_by_order(&mut entries);
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }

    fn attached_targets(
        &self,
        link: &LinkTableInfo,
        owner: &RecordId,
        order_column: Option<&str>,
    ) -> Result<Vec<RecordId>> {
        let owner = owner.to_value();
        let state = self.state.borrow();
        let mut entries = Vec::new();
        for row in state.pivots.get(&link.table_name).into_iter().flatten() {
            if row.get(&link.local_column) != Some(&owner) {
                continue;
            }
            let remote = row.get(&link.remote_column).unwrap_or(&Value::Null);
            let pos = order_column.and_then(|col| position(row.get(col)));
            entries.push((RecordId::from_value(remote)?, pos));
        }
        sort_by_order(&mut entries);
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }

    fn apply(&self, op: &RelationOp) -> Result<u64> {
        if let Some((table, kind)) = self.fail_table.borrow().as_ref() {
            if table == op.table() {
                return Err(store_error(*kind, format!("write to {table} failed")));
            }
        }
        self.applied.borrow_mut().push(op.clone());
        Ok(self.write(op))
    }
}

/// Schema catalog over a fixed column list, counting lookups.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, Vec<ColumnInfo>>,
    lookups: Cell<usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table from `(column, nullable)` pairs.
    pub fn table(mut self, name: &str, columns: &[(&str, bool)]) -> Self {
        let columns = columns
            .iter()
            .map(|(column, nullable)| ColumnInfo {
                name: column.to_string(),
                sql_type: "INTEGER".to_string(),
                nullable: *nullable,
                default: None,
                primary_key: *column == "id",
            })
            .collect();
        self.tables.insert(name.to_string(), columns);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl SchemaCatalog for MemoryCatalog {
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}
