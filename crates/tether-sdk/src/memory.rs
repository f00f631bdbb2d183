//! In-memory collaborators
//!
//! Straightforward implementations of the host contracts, suitable for
//! embedders without an interpreter of their own and for tests. The object
//! table keeps an operation log so registration unwinding can be observed.

use crate::binder::{Binder, InterfaceResolver};
use crate::error::{StoreError, TableError};
use crate::flags::ObjectFlags;
use crate::host::Host;
use crate::objects::{HandleQuery, ObjectEntry, ObjectTable};
use crate::store::{Variable, VariableKind, VariableStore, VariableValue};
use crate::value::{NativeValue, ObjectId};
use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tether_types::TypeContext;

/// Variable store backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryVariableStore {
    vars: Mutex<FxHashMap<String, Variable>>,
    vetoed: Mutex<FxHashSet<String>>,
}

impl MemoryVariableStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a variable directly, bypassing all checks
    pub fn define(&self, name: &str, variable: Variable) {
        self.vars.lock().insert(name.to_string(), variable);
    }

    /// Define an array variable from `(index, value)` pairs
    pub fn define_array<'a>(&self, name: &str, elements: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let map: BTreeMap<String, String> = elements
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.define(name, Variable { kind: VariableKind::Array(map), read_only: false });
    }

    /// Make every write to `name` fail as if vetoed by a trace
    pub fn veto(&self, name: &str) {
        self.vetoed.lock().insert(name.to_string());
    }

    /// Text of a scalar variable
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name)?.scalar()?.as_text().map(str::to_string)
    }

    fn check_veto(&self, name: &str) -> Result<(), StoreError> {
        if self.vetoed.lock().contains(name) {
            return Err(StoreError::Vetoed(format!("can't set \"{}\": vetoed by trace", name)));
        }
        Ok(())
    }
}

impl VariableStore for MemoryVariableStore {
    fn get(&self, name: &str) -> Option<Variable> {
        self.vars.lock().get(name).cloned()
    }

    fn set(&self, name: &str, value: VariableValue) -> Result<(), StoreError> {
        self.check_veto(name)?;
        let mut vars = self.vars.lock();
        if let Some(existing) = vars.get(name) {
            if existing.read_only {
                return Err(StoreError::ReadOnly { name: name.to_string() });
            }
            if existing.is_array() {
                return Err(StoreError::IsArray { name: name.to_string() });
            }
        }
        vars.insert(
            name.to_string(),
            Variable { kind: VariableKind::Scalar(value), read_only: false },
        );
        Ok(())
    }

    fn set_element(&self, name: &str, index: &str, value: String) -> Result<(), StoreError> {
        self.check_veto(name)?;
        let mut vars = self.vars.lock();
        let variable = vars.entry(name.to_string()).or_insert_with(|| Variable {
            kind: VariableKind::Array(BTreeMap::new()),
            read_only: false,
        });
        if variable.read_only {
            return Err(StoreError::ReadOnly { name: name.to_string() });
        }
        match &mut variable.kind {
            VariableKind::Array(map) => {
                map.insert(index.to_string(), value);
                Ok(())
            }
            VariableKind::Scalar(_) => Err(StoreError::NotArray { name: name.to_string() }),
        }
    }

    fn unset(&self, name: &str) -> Result<(), StoreError> {
        self.check_veto(name)?;
        match self.vars.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { name: name.to_string() }),
        }
    }
}

/// Object table backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryObjectTable {
    entries: Mutex<FxHashMap<String, ObjectEntry>>,
    aliases: Mutex<FxHashMap<String, String>>,
    reject_aliases: Mutex<bool>,
    log: Mutex<Vec<String>>,
}

impl MemoryObjectTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent alias registration fail
    pub fn reject_aliases(&self, reject: bool) {
        *self.reject_aliases.lock() = reject;
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no handle is registered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Operations performed so far, e.g. `register Widget#1`
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }
}

impl ObjectTable for MemoryObjectTable {
    fn try_get_handle(&self, identity: ObjectId, query: &HandleQuery) -> Option<String> {
        let entries = self.entries.lock();
        let mut matches: Vec<&String> = entries
            .iter()
            .filter(|(_, e)| {
                e.identity() == Some(identity)
                    && e.alias.is_some() == query.want_alias
                    && e.flags.contains(query.required)
                    && !e.flags.intersects(query.excluded)
            })
            .map(|(name, _)| name)
            .collect();
        matches.sort();
        matches.first().map(|s| s.to_string())
    }

    fn lookup(&self, handle: &str) -> Option<ObjectEntry> {
        self.entries.lock().get(handle).cloned()
    }

    fn register(&self, handle: &str, entry: ObjectEntry) -> Result<String, TableError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(handle) {
            return Err(TableError::Duplicate(handle.to_string()));
        }
        entries.insert(handle.to_string(), entry);
        drop(entries);
        self.record(format!("register {}", handle));
        Ok(handle.to_string())
    }

    fn register_alias(&self, handle: &str, alias: &str) -> Result<String, TableError> {
        if *self.reject_aliases.lock() {
            return Err(TableError::Rejected(format!("alias \"{}\" refused", alias)));
        }
        let mut aliases = self.aliases.lock();
        if aliases.contains_key(alias) {
            return Err(TableError::AliasConflict(alias.to_string()));
        }
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(handle)
            .ok_or_else(|| TableError::NotFound(handle.to_string()))?;
        entry.alias = Some(alias.to_string());
        entry.flags |= ObjectFlags::ALIAS;
        aliases.insert(alias.to_string(), handle.to_string());
        drop(entries);
        drop(aliases);
        self.record(format!("alias {} {}", handle, alias));
        Ok(alias.to_string())
    }

    fn remove_alias(&self, alias: &str) -> Result<(), TableError> {
        let handle = self
            .aliases
            .lock()
            .remove(alias)
            .ok_or_else(|| TableError::NotFound(alias.to_string()))?;
        if let Some(entry) = self.entries.lock().get_mut(&handle) {
            entry.alias = None;
            entry.flags = entry.flags.difference(ObjectFlags::ALIAS);
        }
        self.record(format!("remove_alias {}", alias));
        Ok(())
    }

    fn remove(&self, token: &str) -> Result<ObjectEntry, TableError> {
        let entry = self
            .entries
            .lock()
            .remove(token)
            .ok_or_else(|| TableError::NotFound(token.to_string()))?;
        if let Some(alias) = &entry.alias {
            self.aliases.lock().remove(alias);
        }
        self.record(format!("remove {}", token));
        Ok(entry)
    }

    fn dispose(&self, value: &NativeValue) {
        if let NativeValue::Object(object) = value {
            object.dispose();
        }
        self.record("dispose".to_string());
    }
}

/// A complete in-memory interpreter
pub struct MemoryHost {
    types: TypeContext,
    variables: MemoryVariableStore,
    objects: MemoryObjectTable,
    binder: Option<Box<dyn Binder>>,
    interfaces: Option<Box<dyn InterfaceResolver>>,
    culture: Option<String>,
    lock: ReentrantMutex<()>,
}

impl MemoryHost {
    /// Host over the given type model with empty stores
    pub fn new(types: TypeContext) -> Self {
        Self {
            types,
            variables: MemoryVariableStore::new(),
            objects: MemoryObjectTable::new(),
            binder: None,
            interfaces: None,
            culture: None,
            lock: ReentrantMutex::new(()),
        }
    }

    /// Install a binder
    pub fn with_binder(mut self, binder: impl Binder + 'static) -> Self {
        self.binder = Some(Box::new(binder));
        self
    }

    /// Install an interface resolver
    pub fn with_interfaces(mut self, resolver: impl InterfaceResolver + 'static) -> Self {
        self.interfaces = Some(Box::new(resolver));
        self
    }

    /// Set the culture name
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    /// Concrete variable store
    pub fn memory_variables(&self) -> &MemoryVariableStore {
        &self.variables
    }

    /// Concrete object table
    pub fn memory_objects(&self) -> &MemoryObjectTable {
        &self.objects
    }
}

impl Host for MemoryHost {
    fn types(&self) -> &TypeContext {
        &self.types
    }

    fn variables(&self) -> &dyn VariableStore {
        &self.variables
    }

    fn objects(&self) -> &dyn ObjectTable {
        &self.objects
    }

    fn binder(&self) -> Option<&dyn Binder> {
        self.binder.as_deref()
    }

    fn interfaces(&self) -> Option<&dyn InterfaceResolver> {
        self.interfaces.as_deref()
    }

    fn culture(&self) -> Option<&str> {
        self.culture.as_deref()
    }

    fn lock(&self) -> &ReentrantMutex<()> {
        &self.lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::HostObject;
    use tether_types::TypeId;

    #[test]
    fn test_store_shape_checks() {
        let store = MemoryVariableStore::new();
        store.set("x", VariableValue::Text("1".into())).unwrap();
        assert_eq!(
            store.set_element("x", "0", "2".into()),
            Err(StoreError::NotArray { name: "x".into() })
        );

        store.set_element("arr", "0", "a".into()).unwrap();
        assert_eq!(
            store.set("arr", VariableValue::Text("b".into())),
            Err(StoreError::IsArray { name: "arr".into() })
        );
        assert!(store.get("arr").unwrap().is_array());
    }

    #[test]
    fn test_store_read_only_and_veto() {
        let store = MemoryVariableStore::new();
        store.define("ro", Variable { read_only: true, ..Variable::text("x") });
        assert!(matches!(
            store.set("ro", VariableValue::Text("y".into())),
            Err(StoreError::ReadOnly { .. })
        ));

        store.veto("v");
        assert!(matches!(
            store.set("v", VariableValue::Text("y".into())),
            Err(StoreError::Vetoed(_))
        ));
        assert!(store.get("v").is_none());
    }

    #[test]
    fn test_table_alias_lifecycle() {
        let table = MemoryObjectTable::new();
        let value = HostObject::new(TypeId::OBJECT).into_value();
        let id = value.identity().unwrap();

        table.register("Object#1", ObjectEntry::new(value.clone(), TypeId::OBJECT)).unwrap();
        let plain = HandleQuery::default();
        let aliased = HandleQuery { want_alias: true, ..HandleQuery::default() };
        assert_eq!(table.try_get_handle(id, &plain), Some("Object#1".to_string()));
        assert_eq!(table.try_get_handle(id, &aliased), None);

        table.register_alias("Object#1", "obj").unwrap();
        assert_eq!(table.try_get_handle(id, &aliased), Some("Object#1".to_string()));
        assert!(table.lookup("Object#1").unwrap().flags.contains(ObjectFlags::ALIAS));

        table.remove_alias("obj").unwrap();
        table.remove("Object#1").unwrap();
        assert!(table.is_empty());
        assert_eq!(
            table.log(),
            vec!["register Object#1", "alias Object#1 obj", "remove_alias obj", "remove Object#1"]
        );
    }

    #[test]
    fn test_table_duplicates() {
        let table = MemoryObjectTable::new();
        let value = HostObject::new(TypeId::OBJECT).into_value();
        table.register("a", ObjectEntry::new(value.clone(), TypeId::OBJECT)).unwrap();
        assert_eq!(
            table.register("a", ObjectEntry::new(value, TypeId::OBJECT)),
            Err(TableError::Duplicate("a".into()))
        );
    }
}
