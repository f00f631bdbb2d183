//! Array arguments
//!
//! Arrays arrive as script array variables keyed by comma-joined index
//! tuples, as script lists (rank 1), as strings (for `Char[]`), or as host
//! arrays already of a compatible type.

use super::{list, primitive, Direction, Marshaler, Slot};
use crate::error::{BindError, BindResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tether_sdk::{cell_count, ArgumentValue, MarshalFlags, NativeArray, NativeValue, VariableKind, VariableValue};
use tether_types::{ArrayType, PrimitiveType, TypeId};

impl<'e> Marshaler<'e> {
    pub(super) fn to_native_array(
        &self,
        arg: &ArgumentValue,
        target: TypeId,
        direction: Direction,
        flags: MarshalFlags,
        slot: Slot<'_>,
    ) -> BindResult<NativeValue> {
        let types = self.types();
        let info = types
            .array_info(target)
            .ok_or_else(|| BindError::UnsupportedFeature(format!("{}: {} is not an array type", slot, types.display(target))))?;
        if info.rank as usize > self.config.max_array_rank {
            return Err(BindError::ArrayShapeError {
                at: slot.to_string(),
                reason: format!("rank {} exceeds the limit of {}", info.rank, self.config.max_array_rank),
            });
        }

        let text = match arg {
            ArgumentValue::Missing => return Ok(NativeValue::Null),
            ArgumentValue::Native(value) => return self.existing_array(value.clone(), target, flags, direction, slot),
            ArgumentValue::Handle(handle) => {
                let value = self.lookup_handle(handle, target, slot)?;
                return self.existing_array(value, target, flags, direction, slot);
            }
            ArgumentValue::Literal(text) => text,
        };

        if *text == self.config.null_literal {
            return Ok(NativeValue::Null);
        }

        if direction.output {
            if !direction.input {
                return Ok(NativeValue::Null);
            }
            return match self.host.variables().get(text) {
                None => Ok(NativeValue::Null),
                Some(variable) => match variable.kind {
                    VariableKind::Array(elements) => self.from_array_variable(text, &elements, target, info, flags, slot),
                    VariableKind::Scalar(VariableValue::Native(value))
                    | VariableKind::Scalar(VariableValue::Link(value)) => {
                        self.existing_array(value, target, flags, direction, slot)
                    }
                    VariableKind::Scalar(VariableValue::Text(_)) => Err(BindError::OutputBindingError {
                        at: slot.to_string(),
                        reason: format!("variable \"{}\" isn't array", text),
                    }),
                },
            };
        }

        if let Some(variable) = self.host.variables().get(text) {
            if let VariableKind::Array(elements) = variable.kind {
                return self.from_array_variable(text, &elements, target, info, flags, slot);
            }
        }

        if !flags.contains(MarshalFlags::NO_HANDLE) {
            if let Some(entry) = self.host.objects().lookup(text) {
                return self.existing_array(entry.value, target, flags, direction, slot);
            }
        }

        if info.rank == 1 && types.as_primitive(info.element) == Some(PrimitiveType::Char) {
            let chars: Vec<NativeValue> = text.chars().map(NativeValue::Char).collect();
            return Ok(NativeValue::Array(Arc::new(NativeArray::vector(target, info.element, chars))));
        }

        if info.rank == 1 {
            let items = list::split_list(text).map_err(|reason| BindError::ArrayShapeError {
                at: slot.to_string(),
                reason,
            })?;
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let element = ArgumentValue::Literal(item);
                values.push(self.to_native(&element, info.element, Direction::IN, flags, slot)?);
            }
            return Ok(NativeValue::Array(Arc::new(NativeArray::vector(target, info.element, values))));
        }

        Err(BindError::ArrayShapeError {
            at: slot.to_string(),
            reason: format!(
                "value \"{}\" is not an array variable and rank {} arrays cannot be built from a list",
                text, info.rank
            ),
        })
    }

    fn existing_array(
        &self,
        value: NativeValue,
        target: TypeId,
        flags: MarshalFlags,
        direction: Direction,
        slot: Slot<'_>,
    ) -> BindResult<NativeValue> {
        if value.is_null() {
            return Ok(NativeValue::Null);
        }
        if value.as_array().is_some() && self.is_compatible(target, value.type_id(), flags, direction) {
            return Ok(value);
        }
        let types = self.types();
        Err(BindError::ConversionError {
            at: slot.to_string(),
            value: format!("\"{}\"", self.plain_text(&value)),
            source_type: value.type_id().map(|t| types.display(t)).unwrap_or_else(|| "null".into()),
            target: types.display(target),
            cause: "value is not a compatible array".to_string(),
        })
    }

    /// Build an array from a script array variable
    ///
    /// The first pass derives the lower bound and length of every dimension
    /// from the populated index tuples; the second allocates the array and
    /// converts each element.
    fn from_array_variable(
        &self,
        name: &str,
        elements: &BTreeMap<String, String>,
        target: TypeId,
        info: ArrayType,
        flags: MarshalFlags,
        slot: Slot<'_>,
    ) -> BindResult<NativeValue> {
        let rank = info.rank as usize;
        let shape_error = |reason: String| BindError::ArrayShapeError {
            at: format!("{} (variable \"{}\")", slot, name),
            reason,
        };

        let mut entries: Vec<(Vec<i64>, &str)> = Vec::with_capacity(elements.len());
        let mut bounds: Vec<(i64, i64)> = vec![(i64::MAX, i64::MIN); rank];

        for (key, value) in elements {
            if key.is_empty() {
                continue;
            }
            let indices = parse_index_tuple(key).ok_or_else(|| shape_error(format!("index \"{}\" is not an integer tuple", key)))?;
            if indices.len() != rank {
                return Err(shape_error(format!(
                    "index \"{}\" has {} components, array rank is {}",
                    key,
                    indices.len(),
                    rank
                )));
            }
            for (dim, &index) in indices.iter().enumerate() {
                let (lower, upper) = &mut bounds[dim];
                *lower = (*lower).min(index);
                *upper = (*upper).max(index);
            }
            entries.push((indices, value.as_str()));
        }

        let (lower_bounds, lengths) = if entries.is_empty() {
            (vec![0; rank], vec![0; rank])
        } else {
            let mut lower_bounds = Vec::with_capacity(rank);
            let mut lengths = Vec::with_capacity(rank);
            for &(lower, upper) in &bounds {
                let length = upper
                    .checked_sub(lower)
                    .and_then(|d| d.checked_add(1))
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| shape_error(format!("dimension from {} to {} has no valid length", lower, upper)))?;
                lower_bounds.push(lower);
                lengths.push(length);
            }
            (lower_bounds, lengths)
        };

        tracing::trace!(variable = name, ?lower_bounds, ?lengths, "array bounds");

        let limit = self.config.max_array_length;
        match cell_count(&lengths) {
            Some(total) if total <= limit => {}
            Some(total) => {
                return Err(shape_error(format!("{} cells exceed the limit of {}", total, limit)));
            }
            None => {
                return Err(shape_error(format!("shape {:?} overflows the cell count", lengths)));
            }
        }

        let fill = primitive::default_value(self.types(), info.element);
        let array = NativeArray::new(target, info.element, lower_bounds, lengths, fill)
            .ok_or_else(|| shape_error("array shape cannot be allocated".to_string()))?;
        for (indices, text) in entries {
            let element = ArgumentValue::Literal(text.to_string());
            let value = self.to_native(&element, info.element, Direction::IN, flags, slot)?;
            if !array.set(&indices, value) {
                return Err(shape_error(format!("index {:?} is out of range", indices)));
            }
        }
        Ok(NativeValue::Array(Arc::new(array)))
    }
}

/// Parse a comma-joined integer tuple such as `"1,-2"`
pub(crate) fn parse_index_tuple(key: &str) -> Option<Vec<i64>> {
    key.split(',')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Comma-joined index key for a tuple
pub(crate) fn index_key(indices: &[i64]) -> String {
    indices
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::ErrorKind;
    use std::sync::atomic::AtomicU64;
    use tether_sdk::memory::MemoryHost;
    use tether_sdk::{ObjectFlags, Variable};
    use tether_types::TypeContext;

    fn run(host: &MemoryHost, arg: ArgumentValue, target: TypeId, direction: Direction) -> BindResult<NativeValue> {
        let config = EngineConfig::default();
        let counter = AtomicU64::new(0);
        let m = Marshaler::new(host, &config, ObjectFlags::NONE, &counter);
        m.to_native(&arg, target, direction, MarshalFlags::NONE, Slot::new(0, "values"))
    }

    fn int() -> TypeId {
        TypeId::primitive(PrimitiveType::Int32)
    }

    #[test]
    fn test_index_tuple_parsing() {
        assert_eq!(parse_index_tuple("3"), Some(vec![3]));
        assert_eq!(parse_index_tuple("1,-2"), Some(vec![1, -2]));
        assert_eq!(parse_index_tuple("a"), None);
        assert_eq!(parse_index_tuple("1,"), None);
        assert_eq!(index_key(&[0, 2]), "0,2");
    }

    #[test]
    fn test_vector_from_array_variable() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let host = MemoryHost::new(types);
        host.memory_variables().define_array("a", [("0", "5"), ("1", "7"), ("", "ignored")]);

        let value = run(&host, "a".into(), ints, Direction::IN).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.lower_bounds(), &[0]);
        assert_eq!(array.to_vec(), vec![NativeValue::Int32(5), NativeValue::Int32(7)]);
    }

    #[test]
    fn test_two_dimensional_bounds() {
        let mut types = TypeContext::new();
        let grid = types.array_type(int(), 2).unwrap();
        let host = MemoryHost::new(types);
        host.memory_variables()
            .define_array("g", [("1,0", "1"), ("2,1", "4"), ("1,1", "2")]);

        let value = run(&host, "g".into(), grid, Direction::IN).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.lower_bounds(), &[1, 0]);
        assert_eq!(array.lengths(), &[2, 2]);
        assert_eq!(array.get(&[2, 1]), Some(NativeValue::Int32(4)));
        // unpopulated cells keep the element default
        assert_eq!(array.get(&[2, 0]), Some(NativeValue::Int32(0)));
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let host = MemoryHost::new(types);
        host.memory_variables().define_array("a", [("0,0", "1")]);

        let err = run(&host, "a".into(), ints, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArrayShapeError);

        host.memory_variables().define_array("b", [("x", "1")]);
        let err = run(&host, "b".into(), ints, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArrayShapeError);
    }

    #[test]
    fn test_sparse_indices_over_limit_rejected() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let grid = types.array_type(int(), 2).unwrap();
        let host = MemoryHost::new(types);

        host.memory_variables()
            .define_array("a", [("0", "1"), ("9000000000000000000", "2")]);
        let err = run(&host, "a".into(), ints, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArrayShapeError);
        assert!(err.to_string().contains("exceed the limit"));

        // each dimension fits but the product does not
        host.memory_variables()
            .define_array("g", [("0,0", "1"), ("9000000000000000000,9000000000000000000", "2")]);
        let err = run(&host, "g".into(), grid, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArrayShapeError);
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_configured_length_limit() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let host = MemoryHost::new(types);
        host.memory_variables().define_array("a", [("0", "1"), ("3", "2")]);

        let config = EngineConfig {
            max_array_length: 3,
            ..EngineConfig::default()
        };
        let counter = AtomicU64::new(0);
        let m = Marshaler::new(&host, &config, ObjectFlags::NONE, &counter);
        let slot = Slot::new(0, "values");
        let err = m
            .to_native(&"a".into(), ints, Direction::IN, MarshalFlags::NONE, slot)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArrayShapeError);

        host.memory_variables().define_array("b", [("0", "1"), ("2", "2")]);
        let value = m
            .to_native(&"b".into(), ints, Direction::IN, MarshalFlags::NONE, slot)
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_list_and_char_forms() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let chars = types.vector_type(TypeId::primitive(PrimitiveType::Char));
        let host = MemoryHost::new(types);

        let value = run(&host, "1 2 3".into(), ints, Direction::IN).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);

        let value = run(&host, "hey".into(), chars, Direction::IN).unwrap();
        assert_eq!(
            value.as_array().unwrap().to_vec(),
            vec![NativeValue::Char('h'), NativeValue::Char('e'), NativeValue::Char('y')]
        );

        let err = run(&host, "1 x".into(), ints, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn test_null_and_output_forms() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let host = MemoryHost::new(types);
        host.memory_variables().define("s", Variable::text("1 2"));

        assert_eq!(run(&host, "null".into(), ints, Direction::IN).unwrap(), NativeValue::Null);
        assert_eq!(run(&host, "s".into(), ints, Direction::OUT).unwrap(), NativeValue::Null);

        let err = run(&host, "s".into(), ints, Direction::IN_OUT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutputBindingError);
    }

    #[test]
    fn test_existing_native_array_passes_through() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(int());
        let host = MemoryHost::new(types);
        let native = NativeValue::Array(Arc::new(NativeArray::vector(ints, int(), vec![NativeValue::Int32(1)])));

        let value = run(&host, ArgumentValue::Native(native.clone()), ints, Direction::IN).unwrap();
        assert_eq!(value, native);

        let err = run(&host, ArgumentValue::Native(NativeValue::Int32(1)), ints, Direction::IN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }
}
