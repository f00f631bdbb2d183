//! Built-in scalar conversion
//!
//! The fallback used when no binder is installed or the binder declines:
//! literal parsing, numeric widening/narrowing with range checks, and the
//! natural string form of scalar values.

use tether_sdk::NativeValue;
use tether_types::{EnumType, PrimitiveType, Type, TypeContext, TypeId};

/// Parse a script boolean: `true/false/yes/no/on/off` or an integer
pub fn parse_boolean(text: &str) -> Option<bool> {
    let t = text.trim();
    match t.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => parse_integer(t).map(|i| i != 0),
    }
}

/// Parse an integer literal: optional sign, decimal, `0x` hex, `0o` octal or `0b` binary
pub fn parse_integer(text: &str) -> Option<i128> {
    let t = text.trim();
    let (negative, digits) = match t.as_bytes().first()? {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    let lower = digits.to_ascii_lowercase();
    let radix_digits = |rest: &str, radix: u32| -> Option<i128> {
        if rest.starts_with(['+', '-']) {
            return None;
        }
        i128::from_str_radix(rest, radix).ok()
    };
    let magnitude = if let Some(hex) = lower.strip_prefix("0x") {
        radix_digits(hex, 16)?
    } else if let Some(oct) = lower.strip_prefix("0o") {
        radix_digits(oct, 8)?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        radix_digits(bin, 2)?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i128>().ok()?
    };
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}

/// Build an integral value of the given primitive, checking its range
pub fn integral_value(p: PrimitiveType, v: i128) -> Option<NativeValue> {
    let (lo, hi) = p.integral_range()?;
    if v < lo || v > hi {
        return None;
    }
    let value = match p {
        PrimitiveType::SByte => NativeValue::SByte(v as i8),
        PrimitiveType::Byte => NativeValue::Byte(v as u8),
        PrimitiveType::Int16 => NativeValue::Int16(v as i16),
        PrimitiveType::UInt16 => NativeValue::UInt16(v as u16),
        PrimitiveType::Int32 => NativeValue::Int32(v as i32),
        PrimitiveType::UInt32 => NativeValue::UInt32(v as u32),
        PrimitiveType::Int64 => NativeValue::Int64(v as i64),
        PrimitiveType::UInt64 => NativeValue::UInt64(v as u64),
        PrimitiveType::IntPtr => NativeValue::IntPtr(v as isize),
        PrimitiveType::UIntPtr => NativeValue::UIntPtr(v as usize),
        _ => return None,
    };
    Some(value)
}

/// Parse a literal as the given primitive
pub fn parse_primitive(text: &str, p: PrimitiveType) -> Option<NativeValue> {
    match p {
        PrimitiveType::Boolean => parse_boolean(text).map(NativeValue::Boolean),
        PrimitiveType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(NativeValue::Char(c)),
                _ => None,
            }
        }
        PrimitiveType::Single => text.trim().parse::<f32>().ok().map(NativeValue::Single),
        PrimitiveType::Double => text.trim().parse::<f64>().ok().map(NativeValue::Double),
        _ => integral_value(p, parse_integer(text)?),
    }
}

/// Parse an enum literal: a member name, an integer, or for flag enums
/// several names separated by `|`, `,` or whitespace
pub fn parse_enum(text: &str, ty: TypeId, def: &EnumType) -> Option<NativeValue> {
    let t = text.trim();
    if let Some(i) = parse_integer(t) {
        integral_value(def.underlying, i)?;
        return Some(NativeValue::Enum { ty, value: i as i64 });
    }

    let parts: Vec<&str> = t
        .split(|c: char| c == '|' || c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [] => None,
        [single] => {
            let value = def
                .value_of(single, false)
                .or_else(|| def.value_of(single, true))?;
            Some(NativeValue::Enum { ty, value })
        }
        many if def.flags => {
            let mut value = 0i64;
            for part in many {
                value |= def.value_of(part, false).or_else(|| def.value_of(part, true))?;
            }
            Some(NativeValue::Enum { ty, value })
        }
        _ => None,
    }
}

/// Render an enum value by member name; flag enums list every set member
pub fn render_enum(def: &EnumType, value: i64) -> String {
    if let Some(name) = def.name_of(value) {
        return name.to_string();
    }
    if def.flags && value != 0 {
        let mut rest = value;
        let mut names = Vec::new();
        for (name, bits) in &def.members {
            if *bits != 0 && value & bits == *bits {
                names.push(name.as_str());
                rest &= !bits;
            }
        }
        if rest == 0 && !names.is_empty() {
            return names.join(", ");
        }
    }
    value.to_string()
}

/// Natural string form of a scalar; `None` for arrays, objects and null
pub fn render_scalar(types: &TypeContext, value: &NativeValue) -> Option<String> {
    let text = match value {
        NativeValue::Null | NativeValue::Array(_) | NativeValue::Object(_) => return None,
        NativeValue::Boolean(b) => (if *b { "True" } else { "False" }).to_string(),
        NativeValue::Char(c) => c.to_string(),
        NativeValue::String(s) => s.clone(),
        NativeValue::Single(f) => f.to_string(),
        NativeValue::Double(f) => f.to_string(),
        NativeValue::Enum { ty, value } => match types.as_enum(*ty) {
            Some(def) => render_enum(def, *value),
            None => value.to_string(),
        },
        other => other.as_integer()?.to_string(),
    };
    Some(text)
}

/// Convert a value to `target` without help from the binder
///
/// `text` is the value's string form, used when the value itself is a string
/// or has no numeric interpretation.
pub fn convert(types: &TypeContext, value: &NativeValue, text: &str, target: TypeId) -> Option<NativeValue> {
    match types.get(target)? {
        Type::Nullable(inner) => convert(types, value, text, *inner),
        Type::String => match value {
            NativeValue::Object(o) => o.text().map(|t| NativeValue::String(t.to_string())),
            other => render_scalar(types, other).map(NativeValue::String),
        },
        Type::Primitive(p) => convert_primitive(value, text, *p),
        Type::Enum(def) => match value {
            NativeValue::String(s) => parse_enum(s, target, def),
            other => {
                let i = other.as_integer()?;
                integral_value(def.underlying, i)?;
                Some(NativeValue::Enum { ty: target, value: i as i64 })
            }
        },
        _ => None,
    }
}

fn convert_primitive(value: &NativeValue, text: &str, p: PrimitiveType) -> Option<NativeValue> {
    match value {
        NativeValue::String(s) => parse_primitive(s, p),
        NativeValue::Boolean(b) => match p {
            PrimitiveType::Boolean => Some(NativeValue::Boolean(*b)),
            PrimitiveType::Single => Some(NativeValue::Single(if *b { 1.0 } else { 0.0 })),
            PrimitiveType::Double => Some(NativeValue::Double(if *b { 1.0 } else { 0.0 })),
            PrimitiveType::Char => None,
            _ => integral_value(p, *b as i128),
        },
        NativeValue::Char(c) => match p {
            PrimitiveType::Char => Some(NativeValue::Char(*c)),
            PrimitiveType::Boolean | PrimitiveType::Single | PrimitiveType::Double => None,
            _ => integral_value(p, *c as u32 as i128),
        },
        NativeValue::Single(_) | NativeValue::Double(_) => {
            let f = value.as_float()?;
            match p {
                PrimitiveType::Single => Some(NativeValue::Single(f as f32)),
                PrimitiveType::Double => Some(NativeValue::Double(f)),
                PrimitiveType::Boolean => Some(NativeValue::Boolean(f != 0.0)),
                PrimitiveType::Char => None,
                _ => {
                    if f.fract() != 0.0 || !f.is_finite() {
                        return None;
                    }
                    integral_value(p, f as i128)
                }
            }
        }
        NativeValue::Null | NativeValue::Array(_) => None,
        NativeValue::Object(_) => parse_primitive(text, p),
        other => {
            let i = other.as_integer()?;
            match p {
                PrimitiveType::Boolean => Some(NativeValue::Boolean(i != 0)),
                PrimitiveType::Single => Some(NativeValue::Single(i as f32)),
                PrimitiveType::Double => Some(NativeValue::Double(i as f64)),
                PrimitiveType::Char => {
                    let code = u32::try_from(i).ok()?;
                    char::from_u32(code).map(NativeValue::Char)
                }
                _ => integral_value(p, i),
            }
        }
    }
}

/// Default value of a type: zero for primitives and enums, null otherwise
pub fn default_value(types: &TypeContext, ty: TypeId) -> NativeValue {
    let ty = types.strip_by_ref(ty);
    match types.get(ty) {
        Some(Type::Primitive(p)) => NativeValue::zero(*p),
        Some(Type::Enum(_)) => NativeValue::Enum { ty, value: 0 },
        _ => NativeValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(ctx: &mut TypeContext) -> TypeId {
        ctx.enum_type(
            "Color",
            PrimitiveType::Int32,
            false,
            vec![("Red".into(), 1), ("Green".into(), 2)],
        )
    }

    fn access(ctx: &mut TypeContext) -> TypeId {
        ctx.enum_type(
            "Access",
            PrimitiveType::Byte,
            true,
            vec![("Read".into(), 1), ("Write".into(), 2), ("Exec".into(), 4)],
        )
    }

    #[test]
    fn test_parse_integer_forms() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer(" -7 "), Some(-7));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("1.5"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer("-0x10"), Some(-16));
    }

    #[test]
    fn test_parse_integer_rejects_sign_after_prefix() {
        assert_eq!(parse_integer("0x-5"), None);
        assert_eq!(parse_integer("-0x-5"), None);
        assert_eq!(parse_integer("0b+1"), None);
        assert_eq!(parse_integer("-0x-80000000000000000000000000000000"), None);
    }

    #[test]
    fn test_parse_boolean_forms() {
        assert_eq!(parse_boolean("Yes"), Some(true));
        assert_eq!(parse_boolean("off"), Some(false));
        assert_eq!(parse_boolean("0"), Some(false));
        assert_eq!(parse_boolean("maybe"), None);
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(parse_primitive("255", PrimitiveType::Byte), Some(NativeValue::Byte(255)));
        assert_eq!(parse_primitive("256", PrimitiveType::Byte), None);
        assert_eq!(parse_primitive("-1", PrimitiveType::UInt32), None);
        assert_eq!(parse_primitive("x", PrimitiveType::Char), Some(NativeValue::Char('x')));
        assert_eq!(parse_primitive("xy", PrimitiveType::Char), None);
    }

    #[test]
    fn test_numeric_conversion() {
        let ctx = TypeContext::new();
        let int = ctx.primitive(PrimitiveType::Int32);
        let byte = ctx.primitive(PrimitiveType::Byte);
        let double = ctx.primitive(PrimitiveType::Double);

        assert_eq!(convert(&ctx, &NativeValue::Int64(12), "12", int), Some(NativeValue::Int32(12)));
        assert_eq!(convert(&ctx, &NativeValue::Int32(300), "300", byte), None);
        assert_eq!(convert(&ctx, &NativeValue::Double(3.0), "3", int), Some(NativeValue::Int32(3)));
        assert_eq!(convert(&ctx, &NativeValue::Double(3.5), "3.5", int), None);
        assert_eq!(convert(&ctx, &NativeValue::Int32(2), "2", double), Some(NativeValue::Double(2.0)));
        assert_eq!(
            convert(&ctx, &NativeValue::Int32(2), "2", TypeId::STRING),
            Some(NativeValue::String("2".into()))
        );
    }

    #[test]
    fn test_enum_parse_and_render() {
        let mut ctx = TypeContext::new();
        let color = colors(&mut ctx);
        let flags = access(&mut ctx);
        let color_def = ctx.as_enum(color).unwrap().clone();
        let flags_def = ctx.as_enum(flags).unwrap().clone();

        assert_eq!(parse_enum("green", color, &color_def), Some(NativeValue::Enum { ty: color, value: 2 }));
        assert_eq!(parse_enum("Red|Green", color, &color_def), None);
        assert_eq!(parse_enum("Read|Exec", flags, &flags_def), Some(NativeValue::Enum { ty: flags, value: 5 }));
        assert_eq!(parse_enum("Read, Write", flags, &flags_def), Some(NativeValue::Enum { ty: flags, value: 3 }));
        assert_eq!(parse_enum("300", flags, &flags_def), None);

        assert_eq!(render_enum(&color_def, 1), "Red");
        assert_eq!(render_enum(&color_def, 9), "9");
        assert_eq!(render_enum(&flags_def, 5), "Read, Exec");
    }

    #[test]
    fn test_render_scalars() {
        let ctx = TypeContext::new();
        assert_eq!(render_scalar(&ctx, &NativeValue::Boolean(true)).as_deref(), Some("True"));
        assert_eq!(render_scalar(&ctx, &NativeValue::Double(1.5)).as_deref(), Some("1.5"));
        assert_eq!(render_scalar(&ctx, &NativeValue::UInt64(u64::MAX)).as_deref(), Some("18446744073709551615"));
        assert_eq!(render_scalar(&ctx, &NativeValue::Null), None);
    }

    #[test]
    fn test_default_values() {
        let mut ctx = TypeContext::new();
        let int = ctx.primitive(PrimitiveType::Int32);
        let int_ref = ctx.by_ref(int);
        let color = colors(&mut ctx);
        assert_eq!(default_value(&ctx, int_ref), NativeValue::Int32(0));
        assert_eq!(default_value(&ctx, color), NativeValue::Enum { ty: color, value: 0 });
        assert_eq!(default_value(&ctx, TypeId::STRING), NativeValue::Null);
    }
}
