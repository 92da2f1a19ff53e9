//! Relationship reconciliation.
//!
//! For every participating field the synchronizer reads what the database
//! currently links to the owner, diffs it against the requested ordered ids
//! and applies the difference through a [`RelationStore`]:
//!
//! - has-many targets are linked by pointing their foreign key at the owner;
//!   removed targets are detached (nullable foreign key) or deleted
//! - belongs-to-many targets are attached and detached through pivot rows
//! - reorderable fields get each target's zero-based position written to the
//!   order column
//!
//! One call is one transaction. Any failing write rolls the whole call back.

use crate::descriptor::{RelationKind, RelationshipFieldDescriptor};
use crate::store::{RelationOp, RelationStore};
use runway_core::{
    BelongsToManyInfo, ConfigError, Error, HasManyInfo, OwningRecord, RecordId, Result, SyncError,
};
use runway_schema::{Nullability, SchemaCatalog, SchemaInspector};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Submitted relationship values: field handle to ordered target ids.
///
/// A handle mapped to an empty list clears the relationship. A handle that is
/// absent leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: BTreeMap<String, Vec<RecordId>>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        mut self,
        handle: impl Into<String>,
        ids: impl IntoIterator<Item = impl Into<RecordId>>,
    ) -> Self {
        self.values
            .insert(handle.into(), ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, handle: &str) -> Option<&[RecordId]> {
        self.values.get(handle).map(Vec::as_slice)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.values.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read a submitted form payload such as `{"posts": [1, "2"]}`.
    ///
    /// Only array values are taken; other values belong to plain fields.
    /// Elements that are neither integers nor strings are dropped.
    pub fn from_json(payload: &serde_json::Value) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| {
            Error::Config(ConfigError::new(
                "relationship values must be a JSON object",
            ))
        })?;

        let mut values = BTreeMap::new();
        for (handle, value) in object {
            let Some(items) = value.as_array() else {
                continue;
            };
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    serde_json::Value::Number(n) => match n.as_i64() {
                        Some(id) => ids.push(RecordId::Int(id)),
                        None => tracing::warn!(field = %handle, value = %n, "ignoring non-integer id"),
                    },
                    serde_json::Value::String(s) => ids.push(RecordId::from(s.as_str())),
                    other => tracing::warn!(field = %handle, value = %other, "ignoring non-id value"),
                }
            }
            values.insert(handle.clone(), ids);
        }
        Ok(Self { values })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let payload: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&payload)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RecordId])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<H: Into<String>> FromIterator<(H, Vec<RecordId>)> for FieldValues {
    fn from_iter<T: IntoIterator<Item = (H, Vec<RecordId>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(h, ids)| (h.into(), ids)).collect(),
        }
    }
}

/// Drop repeated ids, keeping each first occurrence. `"12"` and `12` are
/// the same id.
pub fn dedupe(ids: &[RecordId]) -> Vec<RecordId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert((*id).clone().normalize()))
        .cloned()
        .collect()
}

/// Difference between current and requested targets for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Requested but not currently linked, in requested order.
    pub to_add: Vec<RecordId>,
    /// Currently linked but not requested, in current order.
    pub to_remove: Vec<RecordId>,
    /// Linked and requested, in requested order.
    pub kept: Vec<RecordId>,
    /// Every requested id with its zero-based position.
    pub positions: Vec<(RecordId, usize)>,
}

impl Reconciliation {
    /// Ids are matched by their normalized form. A requested id that is
    /// already linked takes the form the store returned, so it binds with
    /// the key column's storage class.
    pub fn plan(current: &[RecordId], requested: &[RecordId]) -> Self {
        let current = dedupe(current);
        let stored: HashMap<RecordId, &RecordId> = current
            .iter()
            .map(|id| (id.clone().normalize(), id))
            .collect();
        let requested: Vec<RecordId> = dedupe(requested)
            .into_iter()
            .map(|id| match stored.get(&id.clone().normalize()) {
                Some(existing) => (*existing).clone(),
                None => id,
            })
            .collect();
        let requested_keys: HashSet<RecordId> = requested
            .iter()
            .map(|id| id.clone().normalize())
            .collect();

        let (kept, to_add): (Vec<_>, Vec<_>) = requested
            .iter()
            .cloned()
            .partition(|id| stored.contains_key(&id.clone().normalize()));
        let to_remove = current
            .iter()
            .filter(|id| !requested_keys.contains(&(*id).clone().normalize()))
            .cloned()
            .collect();
        let positions = requested
            .iter()
            .cloned()
            .enumerate()
            .map(|(position, id)| (id, position))
            .collect();

        Self {
            to_add,
            to_remove,
            kept,
            positions,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Row counts for one synchronize call, logged when it commits.
#[derive(Debug, Default)]
struct SyncStats {
    fields: usize,
    linked: u64,
    detached: u64,
    deleted: u64,
    skipped: usize,
    attached: u64,
    unattached: u64,
    positioned: u64,
}

/// Applies requested relationship state for one owning record.
pub struct Synchronizer<'a, S: ?Sized, K> {
    store: &'a S,
    inspector: &'a SchemaInspector<K>,
}

impl<'a, S, K> Synchronizer<'a, S, K>
where
    S: RelationStore + ?Sized,
    K: SchemaCatalog,
{
    pub fn new(store: &'a S, inspector: &'a SchemaInspector<K>) -> Self {
        Self { store, inspector }
    }

    /// Reconcile every participating field present in `values`.
    ///
    /// Fields that are not relationships, are computed or unsaved, or are
    /// absent from `values` are left alone. When nothing participates no
    /// transaction is opened. Failures roll back and surface as
    /// [`Error::Sync`].
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(resource = owner.resource_handle(), key = %owner.key())
    )]
    pub fn synchronize<O: OwningRecord + ?Sized>(
        &self,
        owner: &O,
        values: &FieldValues,
        descriptors: &[RelationshipFieldDescriptor],
    ) -> Result<()> {
        let participating: Vec<(&RelationshipFieldDescriptor, &[RecordId])> = descriptors
            .iter()
            .filter(|d| d.participates())
            .filter_map(|d| values.get(&d.handle).map(|ids| (d, ids)))
            .collect();

        for (handle, _) in values.iter() {
            if !descriptors.iter().any(|d| d.handle == handle) {
                tracing::debug!(field = handle, "no relationship field for submitted value");
            }
        }

        if participating.is_empty() {
            tracing::debug!("no relationship fields to synchronize");
            return Ok(());
        }

        let key = owner.key();
        self.store
            .begin()
            .map_err(|e| Error::Sync(SyncError::from_store(None, e)))?;

        let mut stats = SyncStats::default();
        for (descriptor, requested) in participating {
            let outcome = match &descriptor.kind {
                RelationKind::HasMany(info) => {
                    self.sync_has_many(info, descriptor, &key, requested, &mut stats)
                }
                RelationKind::BelongsToMany(info) => {
                    self.sync_pivot(info, descriptor, &key, requested, &mut stats)
                }
                RelationKind::NotARelationship => Ok(()),
            };
            if let Err(e) = outcome {
                self.abort(&descriptor.handle);
                return Err(Error::Sync(SyncError::from_store(
                    Some(descriptor.handle.as_str()),
                    e,
                )));
            }
            stats.fields += 1;
        }

        self.store
            .commit()
            .map_err(|e| Error::Sync(SyncError::from_store(None, e)))?;

        tracing::info!(
            fields = stats.fields,
            linked = stats.linked,
            detached = stats.detached,
            deleted = stats.deleted,
            skipped = stats.skipped,
            attached = stats.attached,
            unattached = stats.unattached,
            positioned = stats.positioned,
            "relationships synchronized"
        );
        Ok(())
    }

    fn abort(&self, handle: &str) {
        if let Err(e) = self.store.rollback() {
            tracing::warn!(field = handle, error = %e, "rollback after failed synchronize also failed");
        } else {
            tracing::debug!(field = handle, "synchronize rolled back");
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(field = %descriptor.handle))]
    fn sync_has_many(
        &self,
        info: &HasManyInfo,
        descriptor: &RelationshipFieldDescriptor,
        owner: &RecordId,
        requested: &[RecordId],
        stats: &mut SyncStats,
    ) -> Result<()> {
        let order_column = descriptor.order_column.as_deref();
        let current = self.store.owned_targets(info, owner, order_column)?;
        let plan = Reconciliation::plan(&current, requested);
        tracing::debug!(
            field = %descriptor.handle,
            current = current.len(),
            link = plan.to_add.len(),
            unlink = plan.to_remove.len(),
            "reconciling has-many"
        );

        if !plan.to_add.is_empty() {
            let wanted = plan.to_add.len() as u64;
            let linked = self
                .store
                .apply(&RelationOp::link(info, owner, plan.to_add.clone()))?;
            if linked < wanted {
                tracing::warn!(
                    field = %descriptor.handle,
                    table = %info.related_table,
                    requested = wanted,
                    linked,
                    "some requested targets do not exist"
                );
            }
            stats.linked += linked;
        }

        if !plan.to_remove.is_empty() {
            match self
                .inspector
                .nullability(&info.related_table, &info.foreign_key)?
            {
                Nullability::Nullable => {
                    stats.detached += self
                        .store
                        .apply(&RelationOp::detach(info, plan.to_remove.clone()))?;
                }
                Nullability::NotNull => {
                    stats.deleted += self
                        .store
                        .apply(&RelationOp::delete(info, plan.to_remove.clone()))?;
                }
                Nullability::Unknown => {
                    tracing::warn!(
                        field = %descriptor.handle,
                        table = %info.related_table,
                        column = %info.foreign_key,
                        rows = plan.to_remove.len(),
                        "cannot determine foreign key nullability; leaving unlinked targets in place"
                    );
                    stats.skipped += plan.to_remove.len();
                }
            }
        }

        if let Some(order_column) = order_column {
            if !plan.positions.is_empty() {
                stats.positioned += self.store.apply(&RelationOp::WritePositions {
                    table: info.related_table.clone(),
                    key_column: info.related_key.clone(),
                    order_column: order_column.to_string(),
                    scope: (info.foreign_key.clone(), owner.clone()),
                    positions: plan.positions,
                })?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(field = %descriptor.handle))]
    fn sync_pivot(
        &self,
        info: &BelongsToManyInfo,
        descriptor: &RelationshipFieldDescriptor,
        owner: &RecordId,
        requested: &[RecordId],
        stats: &mut SyncStats,
    ) -> Result<()> {
        let link = &info.link_table;
        let order_column = descriptor.order_column.as_deref();
        let current = self.store.attached_targets(link, owner, order_column)?;
        let plan = Reconciliation::plan(&current, requested);
        tracing::debug!(
            field = %descriptor.handle,
            current = current.len(),
            attach = plan.to_add.len(),
            detach = plan.to_remove.len(),
            "reconciling belongs-to-many"
        );

        if !plan.to_add.is_empty() {
            stats.attached += self
                .store
                .apply(&RelationOp::attach(link, owner, plan.to_add.clone()))?;
        }
        if !plan.to_remove.is_empty() {
            stats.unattached += self.store.apply(&RelationOp::detach_pivot(
                link,
                owner,
                plan.to_remove.clone(),
            ))?;
        }

        if let Some(order_column) = order_column {
            if !plan.positions.is_empty() {
                stats.positioned += self.store.apply(&RelationOp::WritePositions {
                    table: link.table_name.clone(),
                    key_column: link.remote_column.clone(),
                    order_column: order_column.to_string(),
                    scope: (link.local_column.clone(), owner.clone()),
                    positions: plan.positions,
                })?;
            }
        }
        Ok(())
    }
}
