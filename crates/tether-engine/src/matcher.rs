//! Overload matching
//!
//! Every candidate whose name and kind fit the request is bound in turn:
//! arity and type hints are checked, then each actual argument is converted
//! to its formal parameter type. Candidates that bind become [`Binding`]s;
//! the others contribute failure reasons.

use crate::error::{BindError, BindResult};
use crate::marshal::{primitive, Direction, Marshaler, Slot};
use crate::trace;
use crate::Engine;
use std::sync::Arc;
use tether_sdk::{ArgumentValue, CallCandidate, Host, MarshalFlags, MemberKind, NativeArray, NativeValue};
use tether_types::{TypeClassifier, TypeId};

/// Name and kind matching rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRules {
    /// Accepted member kinds; empty accepts every kind
    pub kinds: Vec<MemberKind>,
    /// Let `Name` match the accessors `get_Name` and `set_Name`
    pub strip_accessor_prefix: bool,
}

impl Default for BindingRules {
    fn default() -> Self {
        Self {
            kinds: Vec::new(),
            strip_accessor_prefix: true,
        }
    }
}

impl BindingRules {
    /// Only accept the given kinds
    pub fn only(kinds: &[MemberKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            ..Self::default()
        }
    }

    fn accepts_kind(&self, kind: MemberKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    fn matches_name(&self, candidate: &CallCandidate, name: &str, ignore_case: bool) -> bool {
        let eq = |a: &str, b: &str| if ignore_case { a.eq_ignore_ascii_case(b) } else { a == b };
        if eq(&candidate.name, name) {
            return true;
        }
        if self.strip_accessor_prefix && candidate.kind.is_accessor() {
            let stripped = candidate
                .name
                .strip_prefix("get_")
                .or_else(|| candidate.name.strip_prefix("set_"));
            if let Some(stripped) = stripped {
                return eq(stripped, name);
            }
        }
        false
    }
}

/// Input to [`Engine::resolve_and_bind`]
#[derive(Debug, Clone)]
pub struct BindRequest<'a> {
    /// Candidate overloads, in declaration order
    pub candidates: &'a [CallCandidate],
    /// Member name filter; `None` accepts every name
    pub name: Option<&'a str>,
    /// Name and kind rules
    pub rules: BindingRules,
    /// Actual arguments; `None` matches on name alone
    pub args: Option<&'a [ArgumentValue]>,
    /// Per-position type hints
    pub type_hints: &'a [Option<TypeId>],
    /// Per-parameter flags added to the call flags
    pub parameter_flags: &'a [MarshalFlags],
    /// Stop after this many successful bindings
    pub limit: Option<usize>,
    /// Call flags; the engine default when `None`
    pub flags: Option<MarshalFlags>,
}

impl<'a> BindRequest<'a> {
    /// Request over `candidates` with no filters
    pub fn new(candidates: &'a [CallCandidate]) -> Self {
        Self {
            candidates,
            name: None,
            rules: BindingRules::default(),
            args: None,
            type_hints: &[],
            parameter_flags: &[],
            limit: None,
            flags: None,
        }
    }

    /// Only candidates with this name
    pub fn named(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Replace the name and kind rules
    pub fn with_rules(mut self, rules: BindingRules) -> Self {
        self.rules = rules;
        self
    }

    /// Bind against these actual arguments
    pub fn with_args(mut self, args: &'a [ArgumentValue]) -> Self {
        self.args = Some(args);
        self
    }

    /// Per-position type hints
    pub fn with_type_hints(mut self, hints: &'a [Option<TypeId>]) -> Self {
        self.type_hints = hints;
        self
    }

    /// Per-parameter flags
    pub fn with_parameter_flags(mut self, flags: &'a [MarshalFlags]) -> Self {
        self.parameter_flags = flags;
        self
    }

    /// Cap on successful bindings
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Call flags
    pub fn with_flags(mut self, flags: MarshalFlags) -> Self {
        self.flags = Some(flags);
        self
    }
}

/// Parameter whose result must be written back to a script variable
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArgument {
    /// Zero-based parameter position
    pub position: usize,
    /// Parameter name
    pub parameter: String,
    /// Script variable receiving the result
    pub variable: String,
    /// Parameter type without the by-ref wrapper
    pub ty: TypeId,
}

/// A candidate bound to converted arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Index into the request's candidate list
    pub candidate: usize,
    /// Converted arguments, one per formal parameter
    pub args: Vec<NativeValue>,
    /// Parameters needing write-back
    pub outputs: Vec<OutputArgument>,
    /// Fewest arguments the candidate accepts
    pub min_args: usize,
    /// Most arguments the candidate accepts; `None` when unbounded
    pub max_args: Option<usize>,
    /// Arguments supplied by the caller
    pub supplied: usize,
}

impl Engine {
    /// Bind every matching candidate
    ///
    /// Returns the successful bindings in candidate order. When none binds,
    /// the error says whether no name matched or why the named overloads
    /// were rejected: all reasons under `VERBOSE`, otherwise the first.
    pub fn resolve_and_bind(&self, host: &dyn Host, request: &BindRequest<'_>) -> BindResult<Vec<Binding>> {
        let flags = request.flags.unwrap_or(self.marshal_flags);
        let ignore_case = flags.contains(MarshalFlags::IGNORE_CASE);
        let verbose = flags.contains(MarshalFlags::VERBOSE);
        let limit = request.limit.filter(|&n| n > 0);
        let marshaler = self.marshaler(host);
        let types = host.types();

        let mut bindings = Vec::new();
        let mut failures = Vec::new();
        let mut name_matched = false;

        for (index, candidate) in request.candidates.iter().enumerate() {
            if limit.is_some_and(|n| bindings.len() >= n) {
                break;
            }
            if !request.rules.accepts_kind(candidate.kind) {
                continue;
            }
            if let Some(name) = request.name {
                if !request.rules.matches_name(candidate, name, ignore_case) {
                    continue;
                }
            }
            name_matched = true;

            match self.bind_candidate(&marshaler, request, index, candidate, flags) {
                Ok(binding) => {
                    trace::binding(&marshaler, "bound", candidate, &binding, flags);
                    bindings.push(binding);
                }
                Err(err) => {
                    tracing::trace!(candidate = %candidate.signature(types), error = %err, "candidate rejected");
                    if verbose || failures.is_empty() {
                        failures.push(err);
                    }
                }
            }
        }

        if !bindings.is_empty() {
            return Ok(bindings);
        }

        let name = request.name.unwrap_or_default().to_string();
        if !name_matched {
            return Err(BindError::NameNotFound { name });
        }
        if failures.len() > 1 {
            return Err(BindError::Multiple { name, failures });
        }
        Err(failures.pop().unwrap_or(BindError::NameNotFound { name }))
    }

    fn bind_candidate(
        &self,
        marshaler: &Marshaler<'_>,
        request: &BindRequest<'_>,
        index: usize,
        candidate: &CallCandidate,
        flags: MarshalFlags,
    ) -> BindResult<Binding> {
        let types = marshaler.types();
        let classifier = TypeClassifier::new(types);
        let min_args = candidate.min_arguments();
        let max_args = candidate.max_arguments();

        let Some(args) = request.args else {
            return Ok(Binding {
                candidate: index,
                args: Vec::new(),
                outputs: Vec::new(),
                min_args,
                max_args,
                supplied: 0,
            });
        };

        for (position, param) in candidate.parameters.iter().enumerate() {
            if classifier.involves_pointer(param.ty) {
                return Err(BindError::PointerTypeRejected {
                    name: candidate.name.clone(),
                    at: Slot::new(position, &param.name).to_string(),
                    ty: types.display(param.ty),
                });
            }
        }

        let supplied = args.len();
        if supplied < min_args || max_args.is_some_and(|max| supplied > max) {
            return Err(BindError::ArityMismatch {
                name: candidate.name.clone(),
                min: min_args,
                max: max_args,
                supplied,
            });
        }

        for (position, hint) in request.type_hints.iter().enumerate() {
            let Some(hint) = *hint else { continue };
            let Some((param_index, formal)) = formal_at(marshaler, candidate, position) else {
                continue;
            };
            let fits = if flags.contains(MarshalFlags::STRICT_TYPE) {
                hint == formal
            } else {
                marshaler.is_compatible(formal, Some(hint), flags, Direction::IN)
            };
            if !fits {
                return Err(BindError::TypeHintMismatch {
                    at: Slot::new(param_index, &candidate.parameters[param_index].name).to_string(),
                    hint: types.display(hint),
                    formal: types.display(formal),
                });
            }
        }

        let missing = ArgumentValue::Missing;
        let mut converted = Vec::with_capacity(candidate.parameters.len());
        let mut outputs = Vec::new();

        for (position, param) in candidate.parameters.iter().enumerate() {
            let param_flags = flags | request.parameter_flags.get(position).copied().unwrap_or_default();
            let slot = Slot::new(position, &param.name);

            if param.variadic {
                let rest = args.get(position..).unwrap_or(&[]);
                converted.push(bind_variadic(marshaler, param.ty, rest, position, &param.name, param_flags)?);
                break;
            }

            let arg = args.get(position).unwrap_or(&missing);
            if arg.is_missing() {
                let value = param
                    .default_value
                    .clone()
                    .unwrap_or_else(|| primitive::default_value(types, param.ty));
                converted.push(value);
                continue;
            }

            let by_ref = types.is_by_ref(param.ty);
            let direction = if !by_ref
                || param_flags.contains(MarshalFlags::USE_IN_ONLY)
                || param_flags.contains(MarshalFlags::NO_BY_REF_ARGUMENTS)
            {
                Direction::IN
            } else if param.is_out && !param_flags.contains(MarshalFlags::USE_BY_REF_ONLY) {
                Direction::OUT
            } else {
                Direction::IN_OUT
            };

            let target = match request.type_hints.get(position).copied().flatten() {
                Some(hint) if param_flags.contains(MarshalFlags::FORCE_PARAMETER_TYPE) => hint,
                _ => param.ty,
            };

            if direction.output {
                let ArgumentValue::Literal(variable) = arg else {
                    return Err(BindError::OutputBindingError {
                        at: slot.to_string(),
                        reason: format!("expected a variable name, got {}", arg.describe()),
                    });
                };
                outputs.push(OutputArgument {
                    position,
                    parameter: param.name.clone(),
                    variable: variable.clone(),
                    ty: types.strip_by_ref(param.ty),
                });
            }

            converted.push(marshaler.to_native(arg, target, direction, param_flags, slot)?);
        }

        Ok(Binding {
            candidate: index,
            args: converted,
            outputs,
            min_args,
            max_args,
            supplied,
        })
    }
}

/// Parameter index and formal type an actual argument position binds to
///
/// Positions covered by a variadic tail bind to the tail's element type.
fn formal_at(marshaler: &Marshaler<'_>, candidate: &CallCandidate, position: usize) -> Option<(usize, TypeId)> {
    let types = marshaler.types();
    let last = candidate.parameters.len().checked_sub(1)?;
    let param_index = position.min(last);
    let param = &candidate.parameters[param_index];
    if param.variadic {
        let element = types.array_info(types.strip_by_ref(param.ty))?.element;
        return Some((param_index, element));
    }
    if position > last {
        return None;
    }
    Some((param_index, types.strip_by_ref(param.ty)))
}

/// Collapse the trailing actual arguments into the variadic array
///
/// A single argument that already is a compatible host array is passed
/// through unchanged.
fn bind_variadic(
    marshaler: &Marshaler<'_>,
    ty: TypeId,
    rest: &[ArgumentValue],
    position: usize,
    name: &str,
    flags: MarshalFlags,
) -> BindResult<NativeValue> {
    let types = marshaler.types();
    let array_type = types.strip_by_ref(ty);
    let info = types.array_info(array_type).ok_or_else(|| {
        BindError::UnsupportedFeature(format!(
            "variadic {} has non-array type {}",
            Slot::new(position, name),
            types.display(ty)
        ))
    })?;

    if let [ArgumentValue::Native(value)] = rest {
        if value.as_array().is_some() && marshaler.is_compatible(array_type, value.type_id(), flags, Direction::IN) {
            return Ok(value.clone());
        }
    }

    let mut items = Vec::with_capacity(rest.len());
    for (offset, arg) in rest.iter().enumerate() {
        let slot = Slot::new(position + offset, name);
        items.push(marshaler.to_native(arg, info.element, Direction::IN, flags, slot)?);
    }
    Ok(NativeValue::Array(Arc::new(NativeArray::vector(array_type, info.element, items))))
}
