//! COM-style interface resolution
//!
//! Before a COM object is classified, it is narrowed to the most specific
//! interface it supports so the handle carries a useful type.

use super::Marshaler;
use rustc_hash::FxHashSet;
use tether_sdk::HostObject;
use tether_types::{Type, TypeContext, TypeId};

/// An interface the caller is willing to expose, with a tie-break ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfacePriority {
    /// Interface type
    pub interface: TypeId,
    /// Lower values win when several interfaces remain
    pub priority: i32,
}

impl InterfacePriority {
    /// Entry with the given priority
    pub fn new(interface: TypeId, priority: i32) -> Self {
        Self { interface, priority }
    }
}

/// Whether `iface` extends `ancestor`, directly or transitively
fn extends(types: &TypeContext, iface: TypeId, ancestor: TypeId) -> bool {
    let mut pending = vec![iface];
    let mut seen = FxHashSet::default();
    while let Some(current) = pending.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(Type::Interface(def)) = types.get(current) {
            for &parent in &def.extends {
                if parent == ancestor {
                    return true;
                }
                pending.push(parent);
            }
        }
    }
    false
}

impl<'e> Marshaler<'e> {
    /// Most specific interface the object supports, if any
    pub(crate) fn resolve_interface(&self, object: &HostObject, table: &[InterfacePriority]) -> Option<TypeId> {
        let resolver = self.host.interfaces()?;
        let types = self.types();

        let supported: Vec<InterfacePriority> = table
            .iter()
            .copied()
            .filter(|entry| resolver.supports(object, entry.interface))
            .collect();

        // an interface is redundant when a more derived one is also supported
        let specific: Vec<InterfacePriority> = supported
            .iter()
            .copied()
            .filter(|entry| {
                !supported
                    .iter()
                    .any(|other| other.interface != entry.interface && extends(types, other.interface, entry.interface))
            })
            .collect();

        match specific.len() {
            0 => return None,
            1 => return Some(specific[0].interface),
            _ => {}
        }

        if let Some(advertised) = resolver.advertised_name(object) {
            let named = specific.iter().find(|entry| {
                types.display(entry.interface) == advertised || types.short_name(entry.interface) == advertised
            });
            if let Some(entry) = named {
                return Some(entry.interface);
            }
        }

        let mut chosen = specific[0];
        for entry in &specific[1..] {
            if entry.priority < chosen.priority {
                chosen = *entry;
            }
        }
        tracing::debug!(
            object = %types.display(object.ty()),
            interface = %types.display(chosen.interface),
            priority = chosen.priority,
            candidates = specific.len(),
            "ambiguous interface match resolved by priority"
        );
        Some(chosen.interface)
    }
}
