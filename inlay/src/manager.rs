//! Unit of work.
//!
//! The [`EntityManager`] owns every instance it created or loaded in an arena
//! addressed by [`Handle`], plus an identity map so a row is represented by at
//! most one managed instance. `flush` writes pending changes in one
//! transaction and only touches the arena once the commit succeeded.

use crate::config::MapperConfig;
use crate::dialect::Dialect;
use crate::flatten::{check_properties, is_null, KeyResolver, Row};
use crate::key_types::{EntityKey, KeyValue};
use crate::mapper::{ColumnType, Mapper};
use crate::merge::{UpsertOptions, UpsertPlan};
use crate::planner::LoadPlan;
use crate::query_builders::{FindQueryBuilder, UpsertQueryBuilder};
use crate::schema::{EntityDescriptor, FieldPath, PropertyKind, ScalarType, Schema};
use crate::sql::{self, SelectSpec};
use crate::types::{FieldOp, InlayError, InlayResult};
use crate::value::{Field, FieldValue, Handle, Object, Reference, UNLOADED};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
    Value,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

struct Managed {
    entity: Arc<EntityDescriptor>,
    object: Object,
    key: Option<EntityKey>,
    /// Column values as last read or written; `None` until inserted
    snapshot: Option<Row>,
    removed: bool,
}

#[derive(Default)]
struct FlushOutcome {
    inserted: Vec<(Handle, EntityKey, Row)>,
    updated: Vec<(Handle, Row)>,
    removed: Vec<Handle>,
}

pub struct EntityManager {
    conn: DatabaseConnection,
    mapper: Mapper,
    slots: Vec<Option<Managed>>,
    // handles below `base` belong to instances dropped by `clear`
    base: usize,
    identity: HashMap<(String, EntityKey), Handle>,
}

impl EntityManager {
    pub fn new(
        conn: DatabaseConnection,
        schema: impl Into<Arc<Schema>>,
        config: MapperConfig,
    ) -> InlayResult<Self> {
        let dialect = Dialect::for_backend(conn.get_database_backend());
        let mapper = Mapper::new(schema, config, dialect)?;
        Ok(Self {
            conn,
            mapper,
            slots: Vec::new(),
            base: 0,
            identity: HashMap::new(),
        })
    }

    pub async fn connect(
        url: &str,
        schema: impl Into<Arc<Schema>>,
        config: MapperConfig,
    ) -> InlayResult<Self> {
        let conn = Database::connect(url).await?;
        Self::new(conn, schema, config)
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Drop and recreate the table of every registered entity
    pub async fn refresh_schema(&self) -> InlayResult<()> {
        let backend = self.conn.get_database_backend();
        for entity in self.mapper.schema().entities() {
            sql::execute(&self.conn, backend.build(&sql::drop_table(entity))).await?;
            let create = sql::create_table(&self.mapper, entity)?;
            sql::execute(&self.conn, backend.build(&create)).await?;
        }
        log::debug!(
            "refreshed schema: {} tables",
            self.mapper.schema().entities().count()
        );
        Ok(())
    }

    /// Manage a new instance; it is inserted on the next `flush`
    pub fn create(&mut self, entity: &str, object: Object) -> InlayResult<Handle> {
        let descriptor = self.mapper.schema().entity(entity)?.clone();
        check_properties(&*descriptor, &object, "")?;
        Ok(self.push(Managed {
            entity: descriptor,
            object,
            key: None,
            snapshot: None,
            removed: false,
        }))
    }

    pub fn object(&self, handle: Handle) -> InlayResult<&Object> {
        Ok(&self.slot(handle)?.object)
    }

    pub fn object_mut(&mut self, handle: Handle) -> InlayResult<&mut Object> {
        Ok(&mut self.slot_mut(handle)?.object)
    }

    pub fn entity_of(&self, handle: Handle) -> InlayResult<&str> {
        Ok(&self.slot(handle)?.entity.name)
    }

    /// Primary key, once the instance has been inserted or loaded
    pub fn key(&self, handle: Handle) -> InlayResult<Option<&EntityKey>> {
        Ok(self.slot(handle)?.key.as_ref())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The managed instance of a persisted row, if it was loaded
    pub fn lookup(&self, entity: &str, key: &EntityKey) -> Option<Handle> {
        self.identity.get(&(entity.to_string(), key.clone())).copied()
    }

    /// Read a property by path, following relations to managed instances.
    ///
    /// Nothing is fetched: a relation whose target was never loaded, or any
    /// slot that was not selected, reads as `Field::Unloaded`.
    pub fn field(&self, handle: Handle, path: &str) -> InlayResult<&Field> {
        let managed = self.slot(handle)?;
        let parsed: FieldPath = path.parse()?;
        let resolved = self
            .mapper
            .schema()
            .resolve_path(&managed.entity.name, &parsed)?;

        let mut object = &managed.object;
        let last = resolved.steps.len() - 1;
        for (i, step) in resolved.steps.iter().enumerate() {
            let field = object.get(&step.property.name);
            if i == last {
                return Ok(field);
            }
            match &step.property.kind {
                PropertyKind::Embedded(_) => match field.as_object() {
                    Some(nested) => object = nested,
                    None => return Ok(field),
                },
                PropertyKind::Relation(relation) => {
                    let target = match field.as_reference() {
                        Some(Reference::Managed(target)) => Some(*target),
                        Some(Reference::Key(key)) => self.lookup(&relation.target, key),
                        None => return Ok(field),
                    };
                    match target {
                        Some(target) => object = &self.slot(target)?.object,
                        None => return Ok(&UNLOADED),
                    }
                }
                _ => {
                    return Err(InlayError::PathTraversal {
                        path: path.to_string(),
                        segment: step.property.name.clone(),
                        reason: "array elements are not addressable by path".to_string(),
                    })
                }
            }
        }
        Ok(&UNLOADED)
    }

    /// Schedule a delete; instances never inserted are simply forgotten
    pub fn remove(&mut self, handle: Handle) -> InlayResult<()> {
        if self.slot(handle)?.snapshot.is_none() {
            self.slots[handle.0 - self.base] = None;
        } else {
            self.slot_mut(handle)?.removed = true;
        }
        Ok(())
    }

    /// Detach every managed instance; their handles become unknown
    pub fn clear(&mut self) {
        self.base += self.slots.len();
        self.slots.clear();
        self.identity.clear();
    }

    pub fn find(&mut self, entity: &str) -> FindQueryBuilder<'_> {
        FindQueryBuilder::new(self, entity)
    }

    pub fn upsert(&mut self, entity: &str, payload: Object) -> UpsertQueryBuilder<'_> {
        UpsertQueryBuilder::new(self, entity, payload)
    }

    /// Write inserts, updates and deletes in one transaction
    pub async fn flush(&mut self) -> InlayResult<()> {
        let inserts = self.insert_order();
        let txn = self.conn.begin().await?;
        let outcome = match self.write_changes(&txn, &inserts).await {
            Ok(outcome) => {
                txn.commit().await?;
                outcome
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    log::warn!("rollback after failed flush: {}", rollback);
                }
                return Err(err);
            }
        };
        log::debug!(
            "flush: {} inserted, {} updated, {} removed",
            outcome.inserted.len(),
            outcome.updated.len(),
            outcome.removed.len()
        );
        self.adopt(outcome);
        Ok(())
    }

    fn push(&mut self, managed: Managed) -> Handle {
        self.slots.push(Some(managed));
        Handle(self.base + self.slots.len() - 1)
    }

    fn slot(&self, handle: Handle) -> InlayResult<&Managed> {
        handle
            .0
            .checked_sub(self.base)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
            .ok_or(InlayError::UnknownHandle { handle: handle.0 })
    }

    fn slot_mut(&mut self, handle: Handle) -> InlayResult<&mut Managed> {
        handle
            .0
            .checked_sub(self.base)
            .and_then(|i| self.slots.get_mut(i))
            .and_then(Option::as_mut)
            .ok_or(InlayError::UnknownHandle { handle: handle.0 })
    }

    fn handles(&self) -> impl Iterator<Item = (Handle, &Managed)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|m| (Handle(self.base + i), m)))
    }

    // New instances, each after the new instances it references
    fn insert_order(&self) -> Vec<Handle> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for (handle, _) in self.handles() {
            self.visit_new(handle, &mut visited, &mut order);
        }
        order
    }

    fn visit_new(&self, handle: Handle, visited: &mut HashSet<Handle>, order: &mut Vec<Handle>) {
        let Ok(managed) = self.slot(handle) else {
            return;
        };
        if managed.snapshot.is_some() || managed.removed || !visited.insert(handle) {
            return;
        }
        let mut dependencies = Vec::new();
        managed_references(&managed.object, &mut dependencies);
        for dependency in dependencies {
            self.visit_new(dependency, visited, order);
        }
        order.push(handle);
    }

    async fn write_changes(
        &self,
        txn: &DatabaseTransaction,
        inserts: &[Handle],
    ) -> InlayResult<FlushOutcome> {
        let backend = txn.get_database_backend();
        let mut outcome = FlushOutcome::default();
        let mut assigned: HashMap<Handle, EntityKey> = HashMap::new();

        for &handle in inserts {
            let managed = self.slot(handle)?;
            let mut row = {
                let keys = FlushKeys {
                    manager: self,
                    assigned: &assigned,
                };
                self.mapper.flatten(&managed.entity, &managed.object, &keys)?
            };
            let key = self.insert_row(txn, &managed.entity, &mut row).await?;
            assigned.insert(handle, key.clone());
            outcome.inserted.push((handle, key, row));
        }

        for (handle, managed) in self.handles() {
            let (Some(snapshot), Some(key)) = (&managed.snapshot, &managed.key) else {
                continue;
            };
            if managed.removed {
                continue;
            }
            let row = {
                let keys = FlushKeys {
                    manager: self,
                    assigned: &assigned,
                };
                self.mapper.flatten(&managed.entity, &managed.object, &keys)?
            };
            let primary = &managed.entity.primary_key;
            let changes: Row = row
                .into_iter()
                .filter(|(column, value)| {
                    !primary.contains(column) && snapshot.get(column) != Some(value)
                })
                .collect();
            if changes.is_empty() {
                continue;
            }
            let key_row = self.key_row(&managed.entity, key)?;
            let stmt = sql::update(&managed.entity.table, &changes, &key_row, backend);
            sql::execute(txn, stmt).await?;
            let mut next = snapshot.clone();
            next.extend(changes);
            outcome.updated.push((handle, next));
        }

        for (handle, managed) in self.handles() {
            if let (true, Some(key)) = (managed.removed, &managed.key) {
                let key_row = self.key_row(&managed.entity, key)?;
                sql::execute(txn, sql::delete(&managed.entity.table, &key_row, backend)).await?;
                outcome.removed.push(handle);
            }
        }
        Ok(outcome)
    }

    // Insert `row` and complete it with the generated key, if any
    async fn insert_row(
        &self,
        txn: &DatabaseTransaction,
        entity: &EntityDescriptor,
        row: &mut Row,
    ) -> InlayResult<EntityKey> {
        let backend = txn.get_database_backend();
        let primary = self.mapper.primary_key_columns(entity)?;
        let generated = primary
            .iter()
            .find(|c| c.auto_increment && row.get(&c.name).map_or(true, is_null));

        for column in &primary {
            let missing = row.get(&column.name).map_or(true, is_null);
            if missing && generated.map_or(true, |g| g.name != column.name) {
                return Err(InlayError::invalid_value(
                    format!("{}.{}", entity.name, column.name),
                    "primary key value",
                ));
            }
        }

        match generated {
            None => {
                sql::execute(txn, sql::insert(&entity.table, row, None, backend)?).await?;
            }
            Some(column) => {
                row.remove(&column.name);
                let ty = match column.ty {
                    ColumnType::Scalar(ty) => ty,
                    _ => ScalarType::Integer,
                };
                let value = if self.mapper.dialect().returning {
                    let stmt = sql::insert(&entity.table, row, Some(&column.name), backend)?;
                    let result = sql::query_one(txn, stmt)
                        .await?
                        .ok_or(DbErr::RecordNotInserted)?;
                    sql::decode_scalar(&result, &column.name, ty)?
                } else {
                    let result =
                        sql::execute(txn, sql::insert(&entity.table, row, None, backend)?).await?;
                    KeyValue::Int(result.last_insert_id() as i64).to_db_value(ty)
                };
                row.insert(column.name.clone(), value);
            }
        }

        EntityKey::from_db_values(primary.iter().filter_map(|c| row.get(&c.name))).ok_or_else(
            || InlayError::invalid_value(entity.name.clone(), "primary key value"),
        )
    }

    fn key_row(&self, entity: &EntityDescriptor, key: &EntityKey) -> InlayResult<Row> {
        let columns = self.mapper.primary_key_columns(entity)?;
        Ok(columns
            .into_iter()
            .map(|c| c.name)
            .zip(key.to_db_values(&entity.primary_key_types()))
            .collect())
    }

    fn adopt(&mut self, outcome: FlushOutcome) {
        for (handle, key, row) in outcome.inserted {
            let Ok(managed) = self.slot_mut(handle) else {
                continue;
            };
            for name in &managed.entity.primary_key {
                if !managed.object.get(name).is_loaded() {
                    if let Some(value) = row.get(name) {
                        managed.object.set(name.clone(), value.clone());
                    }
                }
            }
            managed.key = Some(key.clone());
            managed.snapshot = Some(row);
            let entity = managed.entity.name.clone();
            self.identity.insert((entity, key), handle);
        }
        for (handle, snapshot) in outcome.updated {
            if let Ok(managed) = self.slot_mut(handle) {
                managed.snapshot = Some(snapshot);
            }
        }
        for handle in outcome.removed {
            if let Ok(managed) = self.slot(handle) {
                if let Some(key) = managed.key.clone() {
                    let entity = managed.entity.name.clone();
                    self.identity.remove(&(entity, key));
                }
                self.slots[handle.0 - self.base] = None;
            }
        }
    }

    /// Run `plan` and every populate hop, returning the root handles in row order
    pub(crate) async fn load(
        &mut self,
        plan: &LoadPlan,
        spec: SelectSpec,
        refresh: bool,
    ) -> InlayResult<Vec<Handle>> {
        let backend = self.conn.get_database_backend();
        let mut queue = VecDeque::from([(plan.clone(), spec)]);
        let mut roots: Option<Vec<Handle>> = None;

        while let Some((plan, spec)) = queue.pop_front() {
            let entity = self.mapper.schema().entity(&plan.entity)?.clone();
            let stmt = sql::select(&entity.table, &plan.columns, &spec, backend);
            let results = sql::query_all(&self.conn, stmt).await?;

            let mut handles = Vec::with_capacity(results.len());
            let mut rows = Vec::with_capacity(results.len());
            for result in &results {
                let row = sql::decode_row(result, &plan.columns)?;
                let object = self.mapper.unflatten(&entity, &row, &plan.columns)?;
                handles.push(self.adopt_loaded(&entity, object, row.clone(), refresh)?);
                rows.push(row);
            }

            for populate in &plan.populates {
                let mut keys: Vec<Value> = Vec::new();
                for value in rows.iter().filter_map(|row| row.get(&populate.foreign_key)) {
                    if !is_null(value) && !keys.contains(value) {
                        keys.push(value.clone());
                    }
                }
                if keys.is_empty() {
                    continue;
                }
                let target = self.mapper.schema().entity(&populate.target)?;
                let Some(pk) = self.mapper.primary_key_columns(target)?.into_iter().next() else {
                    continue;
                };
                let spec = SelectSpec {
                    conditions: vec![sql::condition(&pk.name, &FieldOp::InVec(keys))],
                    ..Default::default()
                };
                queue.push_back((populate.plan.clone(), spec));
            }

            roots.get_or_insert(handles);
        }
        Ok(roots.unwrap_or_default())
    }

    fn adopt_loaded(
        &mut self,
        entity: &Arc<EntityDescriptor>,
        object: Object,
        row: Row,
        refresh: bool,
    ) -> InlayResult<Handle> {
        let primary = self.mapper.primary_key_columns(entity)?;
        let key = EntityKey::from_db_values(primary.iter().filter_map(|c| row.get(&c.name)))
            .ok_or_else(|| InlayError::MissingColumn {
                entity: entity.name.clone(),
                column: entity.primary_key.join(","),
            })?;

        if let Some(handle) = self.lookup(&entity.name, &key) {
            if refresh {
                let managed = self.slot_mut(handle)?;
                managed.object.assign(object);
                managed.snapshot.get_or_insert_with(Row::new).extend(row);
                return Ok(handle);
            }

            // Clean slots take the fresh values, dirty ones keep theirs and
            // their old baseline so the next flush still writes them
            let dirty = self.dirty_columns(handle)?;
            let clean: Row = row
                .iter()
                .filter(|(column, _)| !dirty.contains(*column))
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect();
            let fresh = self.mapper.unflatten(entity, &clean, &[])?;
            let managed = self.slot_mut(handle)?;
            managed.object.assign(fresh);
            managed.object.merge_unloaded(object);
            let snapshot = managed.snapshot.get_or_insert_with(Row::new);
            for (column, value) in row {
                if dirty.contains(&column) && snapshot.contains_key(&column) {
                    continue;
                }
                snapshot.insert(column, value);
            }
            return Ok(handle);
        }

        let handle = self.push(Managed {
            entity: entity.clone(),
            object,
            key: Some(key.clone()),
            snapshot: Some(row),
            removed: false,
        });
        self.identity.insert((entity.name.clone(), key), handle);
        Ok(handle)
    }

    // Columns whose in-memory value no longer matches the snapshot. An
    // instance pointing at a not yet inserted one counts as dirty everywhere.
    fn dirty_columns(&self, handle: Handle) -> InlayResult<HashSet<String>> {
        let managed = self.slot(handle)?;
        let snapshot = managed.snapshot.as_ref();
        match self.mapper.flatten(&managed.entity, &managed.object, self) {
            Ok(current) => Ok(current
                .into_iter()
                .filter(|(column, value)| snapshot.and_then(|s| s.get(column)) != Some(value))
                .map(|(column, _)| column)
                .collect()),
            Err(InlayError::UnresolvedReference { .. }) => Ok(self
                .mapper
                .columns(&managed.entity)?
                .into_iter()
                .map(|c| c.name)
                .collect()),
            Err(e) => Err(e),
        }
    }

    /// Upsert `payload` and re-read the stored row with the default plan
    pub(crate) async fn run_upsert(
        &mut self,
        entity: &str,
        payload: Object,
        options: &UpsertOptions,
    ) -> InlayResult<Handle> {
        let descriptor = self.mapper.schema().entity(entity)?.clone();
        check_properties(&*descriptor, &payload, "")?;
        let plan = self
            .mapper
            .resolve_upsert(&descriptor, &payload, options, &*self)?;
        let backend = self.conn.get_database_backend();

        if self.mapper.dialect().upsert_clause && !self.mapper.config().emulate_upsert {
            let stmt = sql::upsert(
                &descriptor.table,
                &plan.row,
                &plan.conflict_columns,
                &plan.merge_columns,
                backend,
            )?;
            sql::execute(&self.conn, stmt).await?;
        } else {
            let txn = self.conn.begin().await?;
            match self.emulate_upsert(&txn, &descriptor, &plan).await {
                Ok(()) => txn.commit().await?,
                Err(err) => {
                    if let Err(rollback) = txn.rollback().await {
                        log::warn!("rollback after failed upsert: {}", rollback);
                    }
                    return Err(err);
                }
            }
        }

        let target = conflict_row(&plan);
        let spec = SelectSpec {
            conditions: sql::row_conditions(&target),
            limit: Some(1),
            ..Default::default()
        };
        let default = self.mapper.default_plan(entity)?;
        self.load(&default, spec, true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InlayError::NotFound {
                entity: entity.to_string(),
            })
    }

    // Select-then-write for dialects without an upsert clause
    async fn emulate_upsert(
        &self,
        txn: &DatabaseTransaction,
        entity: &EntityDescriptor,
        plan: &UpsertPlan,
    ) -> InlayResult<()> {
        let backend = txn.get_database_backend();
        let target = conflict_row(plan);
        let primary = self.mapper.primary_key_columns(entity)?;
        let spec = SelectSpec {
            conditions: sql::row_conditions(&target),
            limit: Some(1),
            ..Default::default()
        };
        let stmt = sql::select(&entity.table, &primary, &spec, backend);
        let existing = sql::query_one(txn, stmt).await?;
        match existing {
            Some(_) if plan.merge_columns.is_empty() => {}
            Some(_) => {
                let changes: Row = plan
                    .merge_columns
                    .iter()
                    .filter_map(|c| plan.row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect();
                sql::execute(txn, sql::update(&entity.table, &changes, &target, backend)).await?;
            }
            None => {
                sql::execute(txn, sql::insert(&entity.table, &plan.row, None, backend)?).await?;
            }
        }
        Ok(())
    }
}

impl KeyResolver for EntityManager {
    fn resolve(&self, reference: &Reference) -> Option<EntityKey> {
        match reference {
            Reference::Key(key) => Some(key.clone()),
            Reference::Managed(handle) => self.slot(*handle).ok()?.key.clone(),
        }
    }
}

// Keys of the instances already inserted by the running flush take precedence
struct FlushKeys<'a> {
    manager: &'a EntityManager,
    assigned: &'a HashMap<Handle, EntityKey>,
}

impl KeyResolver for FlushKeys<'_> {
    fn resolve(&self, reference: &Reference) -> Option<EntityKey> {
        if let Reference::Managed(handle) = reference {
            if let Some(key) = self.assigned.get(handle) {
                return Some(key.clone());
            }
        }
        self.manager.resolve(reference)
    }
}

fn conflict_row(plan: &UpsertPlan) -> Row {
    plan.conflict_columns
        .iter()
        .filter_map(|c| plan.row.get(c).map(|v| (c.clone(), v.clone())))
        .collect()
}

fn managed_references(object: &Object, out: &mut Vec<Handle>) {
    for (_, field) in object.fields() {
        match field {
            Field::Value(FieldValue::Reference(Reference::Managed(handle))) => out.push(*handle),
            Field::Value(FieldValue::Embedded(nested)) => managed_references(nested, out),
            _ => {}
        }
    }
}
