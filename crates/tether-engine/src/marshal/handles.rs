//! Object handle lifecycle
//!
//! Handles are reused per value identity. New registrations run under the
//! host lock and are unwound in reverse (alias, object, value) when a later
//! step fails.

use super::{FromNativeOptions, Marshaler};
use crate::error::{BindError, BindResult};
use std::sync::atomic::Ordering;
use tether_sdk::{HandleQuery, NativeValue, ObjectEntry, ObjectFlags, ObjectTable, TableError};
use tether_types::{ClassKind, TypeId};

/// Steps of one registration that succeeded so far
struct Registration<'t> {
    table: &'t dyn ObjectTable,
    token: Option<String>,
    alias: Option<String>,
}

impl Registration<'_> {
    fn unwind(self, value: &NativeValue, dispose: bool) {
        if let Some(alias) = &self.alias {
            if let Err(err) = self.table.remove_alias(alias) {
                tracing::warn!(alias = %alias, error = %err, "failed to remove alias during unwind");
            }
        }
        if let Some(token) = &self.token {
            if let Err(err) = self.table.remove(token) {
                tracing::warn!(token = %token, error = %err, "failed to remove object during unwind");
            }
        }
        if dispose {
            self.table.dispose(value);
        }
    }
}

impl<'e> Marshaler<'e> {
    /// Existing or newly registered handle for a value
    pub(crate) fn obtain_handle(&self, value: &NativeValue, ty: TypeId, options: &FromNativeOptions) -> BindResult<String> {
        let Some(identity) = value.identity() else {
            return Ok(self.plain_text(value));
        };

        let _guard = self.host.lock().lock();
        let table = self.host.objects();

        if !options.force_new {
            let query = HandleQuery {
                want_alias: options.want_alias,
                ..HandleQuery::default()
            };
            if let Some(handle) = table.try_get_handle(identity, &query) {
                tracing::trace!(handle = %handle, "reusing object handle");
                return Ok(handle);
            }
        }

        if !options.create {
            return Ok(self.plain_text(value));
        }

        let types = self.types();
        let kind = types.class_kind(ty);
        let assembly = kind == Some(ClassKind::Assembly) || options.object_flags.contains(ObjectFlags::ASSEMBLY);

        let mut flags = options.object_flags | self.object_flags;
        if !options.dispose {
            flags |= ObjectFlags::NO_DISPOSE;
        }
        if assembly {
            flags |= ObjectFlags::ASSEMBLY;
        }
        if kind == Some(ClassKind::ComObject) {
            flags |= ObjectFlags::COM;
        }

        let handle = self.new_handle_name(value, ty, assembly);
        let entry = ObjectEntry {
            value: value.clone(),
            ty,
            flags,
            client_data: options.client_data.clone(),
            ref_count: options.ref_count,
            alias: None,
        };

        let mut registration = Registration { table, token: None, alias: None };
        let fail = |registration: Registration<'_>, err: TableError| {
            registration.unwind(value, options.dispose);
            BindError::RegistrationError {
                handle: handle.clone(),
                reason: err.to_string(),
            }
        };

        match table.register(&handle, entry) {
            Ok(token) => registration.token = Some(token),
            Err(err) => return Err(fail(registration, err)),
        }

        if options.want_alias {
            let alias = options.alias_name.as_deref().unwrap_or(&handle);
            match table.register_alias(&handle, alias) {
                Ok(name) => registration.alias = Some(name),
                Err(err) => return Err(fail(registration, err)),
            }
        }

        tracing::debug!(handle = %handle, ty = %types.display(ty), alias = ?registration.alias, "registered object");
        Ok(handle)
    }

    /// Unused handle name for a value
    ///
    /// Assembly handles are derived from the assembly name so they stay the
    /// same across sessions; everything else gets a numbered name.
    fn new_handle_name(&self, value: &NativeValue, ty: TypeId, assembly: bool) -> String {
        let table = self.host.objects();
        let separator = &self.config.handle_separator;
        let short = self.types().short_name(ty);

        if assembly {
            let name = value
                .as_object()
                .and_then(|o| o.text())
                .map(str::to_string)
                .unwrap_or(short);
            let base = format!("{}{}{}", self.config.assembly_handle_prefix, separator, name);
            if table.lookup(&base).is_none() {
                return base;
            }
            loop {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                let candidate = format!("{}{}{}", base, separator, n);
                if table.lookup(&candidate).is_none() {
                    return candidate;
                }
            }
        }

        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let candidate = format!("{}{}{}", short, separator, n);
            if table.lookup(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
