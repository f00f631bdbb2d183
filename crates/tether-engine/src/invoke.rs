//! The call pipeline
//!
//! Resolve, optionally reorder, select one binding, invoke it through the
//! embedder, write back outputs and render the return value.

use crate::error::{BindError, BindResult};
use crate::marshal::FromNativeOptions;
use crate::matcher::BindRequest;
use crate::trace;
use crate::writeback::WritebackOptions;
use crate::Engine;
use tether_sdk::{CallCandidate, Host, Invoker, MarshalFlags, NativeValue, ReorderFlags};
use tether_types::TypeId;

/// Input to [`Engine::invoke`]
#[derive(Debug, Clone)]
pub struct CallRequest<'a> {
    /// Candidates, arguments and matching policy
    pub bind: BindRequest<'a>,
    /// Ranking policy under `REORDER_MATCHES`; the engine default when `None`
    pub reorder: Option<ReorderFlags>,
    /// Explicit overload index into the (reordered) bindings
    pub index: Option<usize>,
    /// Fail unless exactly one overload binds
    pub strict_member: bool,
    /// Skip output write-back
    pub no_by_ref: bool,
    /// Write-back rendering
    pub writeback: WritebackOptions,
    /// Return value rendering
    pub result: FromNativeOptions,
}

impl<'a> CallRequest<'a> {
    /// Call with default policy
    pub fn new(bind: BindRequest<'a>) -> Self {
        Self {
            bind,
            reorder: None,
            index: None,
            strict_member: false,
            no_by_ref: false,
            writeback: WritebackOptions::default(),
            result: FromNativeOptions::default(),
        }
    }

    /// Ranking policy
    pub fn with_reorder(mut self, flags: ReorderFlags) -> Self {
        self.reorder = Some(flags);
        self
    }

    /// Pick the overload at `index`
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Require exactly one matching overload
    pub fn strict(mut self) -> Self {
        self.strict_member = true;
        self
    }

    /// Do not write output arguments back
    pub fn without_write_back(mut self) -> Self {
        self.no_by_ref = true;
        self
    }
}

/// Result of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// Index of the invoked candidate
    pub candidate: usize,
    /// Arguments after the call, including by-ref results
    pub args: Vec<NativeValue>,
    /// Raw return value
    pub raw: NativeValue,
    /// Return value as script text; empty for `Void`
    pub result: String,
}

impl Engine {
    /// Resolve and invoke one overload
    pub fn invoke(&self, host: &dyn Host, invoker: &dyn Invoker, request: &CallRequest<'_>) -> BindResult<CallOutcome> {
        let types = host.types();
        let candidates = request.bind.candidates;
        let flags = request.bind.flags.unwrap_or(self.marshal_flags);

        let mut bindings = self.resolve_and_bind(host, &request.bind)?;
        if flags.contains(MarshalFlags::REORDER_MATCHES) {
            let reorder = request.reorder.unwrap_or(self.reorder_flags);
            bindings = self.reorder(types, candidates, bindings, reorder)?;
        }

        let name = || request.bind.name.unwrap_or_default().to_string();
        match request.index {
            Some(index) if index >= bindings.len() => {
                return Err(BindError::InvalidIndex { index, count: bindings.len() });
            }
            None if request.strict_member && bindings.len() != 1 => {
                return Err(BindError::AmbiguousMatch { name: name(), count: bindings.len() });
            }
            _ => {}
        }

        let selected = match request.index {
            Some(index) => index,
            None => select_with_binder(host, candidates, &bindings).unwrap_or(0),
        };
        let count = bindings.len();
        let mut binding = bindings
            .into_iter()
            .nth(selected)
            .ok_or(BindError::InvalidIndex { index: selected, count })?;
        let candidate: &CallCandidate = candidates
            .get(binding.candidate)
            .ok_or(BindError::InvalidIndex { index: binding.candidate, count: candidates.len() })?;

        let marshaler = self.marshaler(host);
        trace::binding(&marshaler, "invoke", candidate, &binding, flags);

        let raw = invoker.invoke(candidate, &mut binding.args)?;

        if !request.no_by_ref {
            // call-wide array forms also govern write-back
            let mut writeback = request.writeback.clone();
            writeback.flags |= flags.intersection(MarshalFlags::ARRAY_AS_VALUE | MarshalFlags::ARRAY_AS_LINK);
            self.write_back_outputs(host, &binding, &writeback)?;
        }

        let result = if candidate.return_type == TypeId::VOID {
            String::new()
        } else {
            marshaler.from_native(&raw, &request.result)?
        };

        Ok(CallOutcome {
            candidate: binding.candidate,
            args: binding.args,
            raw,
            result,
        })
    }
}

/// Let the binder pick among several bindings
fn select_with_binder(host: &dyn Host, candidates: &[CallCandidate], bindings: &[crate::matcher::Binding]) -> Option<usize> {
    if bindings.len() < 2 {
        return None;
    }
    let binder = host.binder()?;
    let chosen: Vec<&CallCandidate> = bindings
        .iter()
        .filter_map(|b| candidates.get(b.candidate))
        .collect();
    let args: Vec<Vec<NativeValue>> = bindings.iter().map(|b| b.args.clone()).collect();
    let index = binder.select_method_index(&chosen, &args)?;
    if index < bindings.len() {
        Some(index)
    } else {
        tracing::warn!(index, count = bindings.len(), "binder selected an out-of-range overload, using the first");
        None
    }
}
