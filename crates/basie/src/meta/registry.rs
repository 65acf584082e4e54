use super::{ChildMeta, Declaration, EntityMeta, FieldMeta, ForeignRef};
use crate::error::{OrmError, OrmResult};
use crate::value::FieldType;
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registration entry submitted by `#[derive(Entity)]`.
///
/// [`register_all`] walks these to declare every entity up front.
pub struct EntityRegistration {
    pub name: &'static str,
    pub register: fn() -> OrmResult<Arc<EntityMeta>>,
}

inventory::collect!(EntityRegistration);

/// Declare every entity submitted through `inventory`.
///
/// Returns how many registrations were processed.
pub fn register_all() -> OrmResult<usize> {
    let mut count = 0;
    for reg in inventory::iter::<EntityRegistration> {
        (reg.register)()?;
        count += 1;
    }
    tracing::debug!(target: "basie", count, "registered entities");
    Ok(count)
}

#[derive(Default)]
struct Inner {
    entities: HashMap<String, Arc<EntityMeta>>,
    /// Entities whose `Entity::declare` has been committed.
    declared: HashSet<String>,
    /// The Rust type that claimed each typed entity name.
    owners: HashMap<String, TypeId>,
}

fn name_conflict(entity: &str) -> OrmError {
    OrmError::configuration(format!(
        "entity name '{entity}' is already claimed by another type; \
         give one of them a distinct #[orm(name = \"...\")]"
    ))
}

/// Metadata registry keyed by entity name.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`crate::Entity`].
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy of the entity record and store it only if `f` succeeds.
    fn update(
        &self,
        entity: &str,
        f: impl FnOnce(&mut EntityMeta) -> OrmResult<()>,
    ) -> OrmResult<Arc<EntityMeta>> {
        let mut inner = self.write();
        let mut meta = inner
            .entities
            .get(entity)
            .map(|m| EntityMeta::clone(m))
            .unwrap_or_else(|| EntityMeta::empty(entity));
        f(&mut meta)?;
        let meta = Arc::new(meta);
        inner.entities.insert(entity.to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Set the table and/or primary key of an entity.
    pub fn declare_entity(
        &self,
        entity: &str,
        table: Option<&str>,
        primary_key: Option<&str>,
    ) -> OrmResult<()> {
        self.update(entity, |meta| {
            if let Some(table) = table {
                meta.set_table(table)?;
            }
            if let Some(pk) = primary_key {
                meta.set_primary_key(pk)?;
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Append a column binding.
    ///
    /// Declaring the identical binding twice is a no-op; reusing a column or a
    /// property name for a different binding is a configuration error.
    pub fn register_field(
        &self,
        entity: &str,
        column: &str,
        field: &str,
        field_type: Option<FieldType>,
    ) -> OrmResult<()> {
        let binding = FieldMeta::new(column, field, field_type);
        self.update(entity, |meta| meta.add_field(binding))
            .map(|_| ())
    }

    /// Append a relationship binding.
    pub fn register_child(
        &self,
        entity: &str,
        field: &str,
        foreign: ForeignRef,
        foreign_key: Option<&str>,
    ) -> OrmResult<()> {
        let binding = ChildMeta::new(field, foreign, foreign_key);
        self.update(entity, |meta| meta.add_child(binding))
            .map(|_| ())
    }

    /// The accumulated record; empty if the entity was never annotated.
    pub fn metadata(&self, entity: &str) -> Arc<EntityMeta> {
        self.get(entity)
            .unwrap_or_else(|| Arc::new(EntityMeta::empty(entity)))
    }

    pub fn get(&self, entity: &str) -> Option<Arc<EntityMeta>> {
        self.read().entities.get(entity).cloned()
    }

    /// Commit a whole declaration atomically.
    pub fn commit(&self, decl: Declaration) -> OrmResult<Arc<EntityMeta>> {
        let Declaration {
            name,
            table,
            primary_key,
            fields,
            children,
        } = decl;

        let meta = self.update(&name, |meta| {
            if let Some(table) = &table {
                meta.set_table(table)?;
            }
            if let Some(pk) = &primary_key {
                meta.set_primary_key(pk)?;
            }
            for field in fields {
                meta.add_field(field)?;
            }
            for child in children {
                meta.add_child(child)?;
            }
            Ok(())
        })?;

        self.write().declared.insert(name);
        tracing::trace!(
            target: "basie",
            entity = meta.name(),
            table = meta.table(),
            fields = meta.fields().len(),
            children = meta.children().len(),
            "entity declared"
        );
        Ok(meta)
    }

    /// Run `declare` once for `entity` and return its record.
    ///
    /// `owner` identifies the Rust type behind the name. A second type claiming
    /// the same name is a configuration error rather than a shared record.
    pub fn ensure(
        &self,
        entity: &str,
        owner: TypeId,
        declare: fn(&mut Declaration),
    ) -> OrmResult<Arc<EntityMeta>> {
        {
            let inner = self.read();
            match inner.owners.get(entity) {
                Some(existing) if *existing != owner => return Err(name_conflict(entity)),
                Some(_) if inner.declared.contains(entity) => {
                    if let Some(meta) = inner.entities.get(entity) {
                        return Ok(Arc::clone(meta));
                    }
                }
                _ => {}
            }
        }

        self.claim(entity, owner)?;
        let mut decl = Declaration::new(entity);
        declare(&mut decl);
        self.commit(decl)
    }

    fn claim(&self, entity: &str, owner: TypeId) -> OrmResult<()> {
        match self.write().owners.entry(entity.to_string()) {
            Entry::Occupied(e) if *e.get() != owner => Err(name_conflict(entity)),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(v) => {
                v.insert(owner);
                Ok(())
            }
        }
    }

    /// Look up an entity by name, declaring it from its `inventory` registration
    /// if it has not been used yet.
    pub fn resolve_named(&self, entity: &str) -> OrmResult<Arc<EntityMeta>> {
        if let Some(meta) = self.get(entity) {
            return Ok(meta);
        }
        if let Some(reg) = inventory::iter::<EntityRegistration>
            .into_iter()
            .find(|reg| reg.name == entity)
        {
            return (reg.register)();
        }
        Err(OrmError::configuration(format!(
            "unknown entity '{entity}'"
        )))
    }

    /// Names of every entity with a record.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().entities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entities.is_empty()
    }
}
