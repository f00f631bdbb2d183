//! Output parameter write-back
//!
//! After a call, every recorded output parameter is rendered through
//! `from_native` and stored in its script variable. Arrays are written
//! element by element unless the flags ask for the whole value. Writes are
//! not rolled back when a later one fails.

use crate::error::{BindError, BindResult};
use crate::marshal::{index_key, FromNativeOptions, Marshaler, Slot};
use crate::matcher::{Binding, OutputArgument};
use crate::Engine;
use tether_sdk::{Host, MarshalFlags, NativeValue, StoreError, VariableValue};

/// Controls write-back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritebackOptions {
    /// `ARRAY_AS_VALUE` and `ARRAY_AS_LINK` are honoured
    pub flags: MarshalFlags,
    /// Rendering of each written value
    pub fixup: FromNativeOptions,
}

impl Engine {
    /// Store every output argument of a completed call
    pub fn write_back_outputs(&self, host: &dyn Host, binding: &Binding, options: &WritebackOptions) -> BindResult<()> {
        if binding.outputs.is_empty() {
            return Ok(());
        }
        let _guard = host.lock().lock();
        let marshaler = self.marshaler(host);

        for output in &binding.outputs {
            let value = binding
                .args
                .get(output.position)
                .cloned()
                .unwrap_or(NativeValue::Null);
            let at = Slot::new(output.position, &output.parameter).to_string();
            if host.types().array_info(output.ty).is_some() {
                self.write_array(host, &marshaler, output, &value, options, &at)?;
            } else {
                self.write_scalar(host, &marshaler, output, &value, options, &at)?;
            }
        }
        Ok(())
    }

    fn write_scalar(
        &self,
        host: &dyn Host,
        marshaler: &Marshaler<'_>,
        output: &OutputArgument,
        value: &NativeValue,
        options: &WritebackOptions,
        at: &str,
    ) -> BindResult<()> {
        let variables = host.variables();
        let name = &output.variable;
        if let Some(existing) = variables.get(name) {
            if existing.is_array() {
                return Err(BindError::OutputBindingError {
                    at: at.to_string(),
                    reason: format!("variable \"{}\" is array, scalar required", name),
                });
            }
            if existing.read_only {
                return Err(BindError::OutputBindingError {
                    at: at.to_string(),
                    reason: format!("variable \"{}\" is read-only", name),
                });
            }
        }

        let text = marshaler.from_native(value, &options.fixup)?;
        tracing::trace!(variable = %name, value = %text, "write back");
        variables
            .set(name, VariableValue::Text(text))
            .map_err(|e| BindError::from_store(at, name, e))
    }

    fn write_array(
        &self,
        host: &dyn Host,
        marshaler: &Marshaler<'_>,
        output: &OutputArgument,
        value: &NativeValue,
        options: &WritebackOptions,
        at: &str,
    ) -> BindResult<()> {
        let variables = host.variables();
        let name = &output.variable;
        let existing = variables.get(name);
        if existing.as_ref().is_some_and(|v| v.read_only) {
            return Err(BindError::OutputBindingError {
                at: at.to_string(),
                reason: format!("variable \"{}\" is read-only", name),
            });
        }
        let existing_array = existing.as_ref().is_some_and(|v| v.is_array());
        let store_err = |e: StoreError| BindError::from_store(at, name, e);

        let whole = if options.flags.contains(MarshalFlags::ARRAY_AS_LINK) {
            Some(VariableValue::Link(value.clone()))
        } else if options.flags.contains(MarshalFlags::ARRAY_AS_VALUE) {
            Some(VariableValue::Native(value.clone()))
        } else if value.is_null() {
            Some(VariableValue::Text(self.config.null_literal.clone()))
        } else {
            None
        };

        if let Some(whole) = whole {
            if existing_array {
                variables.unset(name).map_err(store_err)?;
            }
            return variables.set(name, whole).map_err(store_err);
        }

        let Some(array) = value.as_array() else {
            return Err(BindError::OutputBindingError {
                at: at.to_string(),
                reason: format!("expected an array result for variable \"{}\"", name),
            });
        };
        if existing.is_some() && !existing_array {
            return Err(BindError::OutputBindingError {
                at: at.to_string(),
                reason: format!("variable \"{}\" isn't array", name),
            });
        }
        if existing_array {
            variables.unset(name).map_err(store_err)?;
        }

        for indices in array.index_tuples() {
            let element = array.get(&indices).unwrap_or(NativeValue::Null);
            let text = marshaler.from_native(&element, &options.fixup)?;
            let key = index_key(&indices);
            variables.set_element(name, &key, text).map_err(store_err)?;
        }
        Ok(())
    }
}
