//! Diagnostic trace lines for bindings
//!
//! Emitted at debug level when the call flags include `TRACE`, one line per
//! bound candidate naming the flags, the signature and the converted
//! arguments.

use crate::marshal::{list, Marshaler};
use crate::matcher::Binding;
use tether_sdk::{CallCandidate, MarshalFlags, NativeValue};

/// Converted arguments as a script list
pub(crate) fn format_arguments(marshaler: &Marshaler<'_>, args: &[NativeValue]) -> String {
    list::format_list(args.iter().map(|v| marshaler.plain_text(v)))
}

/// Trace a binding at the given pipeline stage
pub(crate) fn binding(marshaler: &Marshaler<'_>, stage: &str, candidate: &CallCandidate, binding: &Binding, flags: MarshalFlags) {
    if !flags.contains(MarshalFlags::TRACE) {
        return;
    }
    tracing::debug!(
        stage,
        flags = %flags,
        candidate = %candidate.signature(marshaler.types()),
        args = %format_arguments(marshaler, &binding.args),
        outputs = binding.outputs.len(),
        "binding"
    );
}
