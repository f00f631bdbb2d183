//! Policy flag sets
//!
//! Every policy knob of the binding engine is a small bitset with named
//! constants, parsed from and rendered to `NAME|NAME` strings so they can
//! live in configuration files.
//!
//! ```toml
//! default_marshal_flags = "VERBOSE|CUSTOM_ASSIGNABILITY"
//! default_reorder_flags = "FEWEST_PARAMETERS|DEEPEST_TYPES"
//! ```

use std::fmt;

macro_rules! flag_set {
    ($name:ident, $bits:ty) => {
        impl $name {
            /// Create from raw bits
            pub const fn from_bits(bits: $bits) -> Self {
                Self(bits)
            }

            /// Get raw bits
            pub const fn bits(&self) -> $bits {
                self.0
            }

            /// Whether no flag is set
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Check if all flags in `other` are set
            pub const fn contains(&self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Check if any flag in `other` is set
            pub const fn intersects(&self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// Union of flags
            pub const fn union(&self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Intersection of flags
            pub const fn intersection(&self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            /// Difference (remove flags)
            pub const fn difference(&self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Parse a single flag name, or a hex/decimal literal
            pub fn from_str(s: &str) -> Option<Self> {
                let upper = s.trim().to_uppercase();
                if let Some((_, flag)) = Self::NAMES.iter().find(|(n, _)| *n == upper) {
                    return Some(*flag);
                }
                if let Some(hex) = upper.strip_prefix("0X") {
                    <$bits>::from_str_radix(hex, 16).ok().map(Self::from_bits)
                } else {
                    upper.parse::<$bits>().ok().map(Self::from_bits)
                }
            }

            /// Parse combined flags from a pipe-separated string (e.g. `"A|B"`)
            pub fn from_combined_str(s: &str) -> Option<Self> {
                let mut result = Self(0);
                for part in s.split('|') {
                    if part.trim().is_empty() {
                        continue;
                    }
                    result = result.union(Self::from_str(part)?);
                }
                Some(result)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                *self = self.union(rhs);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.0 == 0 {
                    return f.write_str("NONE");
                }
                let mut rest = self.0;
                let mut first = true;
                for (n, flag) in Self::NAMES.iter() {
                    if flag.0 != 0 && flag.0.count_ones() == 1 && rest & flag.0 != 0 {
                        if !first {
                            f.write_str("|")?;
                        }
                        f.write_str(n)?;
                        first = false;
                        rest &= !flag.0;
                    }
                }
                if rest != 0 {
                    if !first {
                        f.write_str("|")?;
                    }
                    write!(f, "0x{:X}", rest)?;
                }
                Ok(())
            }
        }
    };
}

/// Conversion and matching policy (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MarshalFlags(u32);

impl MarshalFlags {
    /// No special policy
    pub const NONE: Self = Self(0);
    /// Accumulate every per-candidate failure instead of only the first
    pub const VERBOSE: Self = Self(1 << 0);
    /// Emit a trace line for each accepted binding
    pub const TRACE: Self = Self(1 << 1);
    /// Type hints must equal the formal parameter type exactly
    pub const STRICT_TYPE: Self = Self(1 << 2);
    /// Convert to the hinted type instead of the formal parameter type
    pub const FORCE_PARAMETER_TYPE: Self = Self(1 << 3);
    /// Do not resolve handle-shaped strings to objects
    pub const NO_HANDLE: Self = Self(1 << 4);
    /// Never record by-ref outputs for write-back
    pub const NO_BY_REF_ARGUMENTS: Self = Self(1 << 5);
    /// Treat every parameter as input-only
    pub const USE_IN_ONLY: Self = Self(1 << 6);
    /// Treat out parameters as ref (input and output)
    pub const USE_BY_REF_ONLY: Self = Self(1 << 7);
    /// Never call the external change-type callback
    pub const NO_CHANGE_TYPE: Self = Self(1 << 8);
    /// Trust the callback result without re-checking compatibility
    pub const SKIP_CHANGE_TYPE_CHECK: Self = Self(1 << 9);
    /// The value-type root is compatible with any value type
    pub const SPECIAL_VALUE_TYPE: Self = Self(1 << 10);
    /// Structural assignability instead of the host check
    pub const CUSTOM_ASSIGNABILITY: Self = Self(1 << 11);
    /// Reorder matches before selecting one in the call pipeline
    pub const REORDER_MATCHES: Self = Self(1 << 12);
    /// Write output arrays into the variable as one native value
    pub const ARRAY_AS_VALUE: Self = Self(1 << 13);
    /// Write output arrays into the variable as a live link
    pub const ARRAY_AS_LINK: Self = Self(1 << 14);
    /// Match member names ignoring ASCII case
    pub const IGNORE_CASE: Self = Self(1 << 15);

    const NAMES: &'static [(&'static str, Self)] = &[
        ("NONE", Self::NONE),
        ("VERBOSE", Self::VERBOSE),
        ("TRACE", Self::TRACE),
        ("STRICT_TYPE", Self::STRICT_TYPE),
        ("FORCE_PARAMETER_TYPE", Self::FORCE_PARAMETER_TYPE),
        ("NO_HANDLE", Self::NO_HANDLE),
        ("NO_BY_REF_ARGUMENTS", Self::NO_BY_REF_ARGUMENTS),
        ("USE_IN_ONLY", Self::USE_IN_ONLY),
        ("USE_BY_REF_ONLY", Self::USE_BY_REF_ONLY),
        ("NO_CHANGE_TYPE", Self::NO_CHANGE_TYPE),
        ("SKIP_CHANGE_TYPE_CHECK", Self::SKIP_CHANGE_TYPE_CHECK),
        ("SPECIAL_VALUE_TYPE", Self::SPECIAL_VALUE_TYPE),
        ("CUSTOM_ASSIGNABILITY", Self::CUSTOM_ASSIGNABILITY),
        ("REORDER_MATCHES", Self::REORDER_MATCHES),
        ("ARRAY_AS_VALUE", Self::ARRAY_AS_VALUE),
        ("ARRAY_AS_LINK", Self::ARRAY_AS_LINK),
        ("IGNORE_CASE", Self::IGNORE_CASE),
    ];
}

flag_set!(MarshalFlags, u32);

/// Overload ordering policy (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReorderFlags(u32);

impl ReorderFlags {
    /// Leave the order untouched
    pub const NONE: Self = Self(0);
    /// Ascending by parameter count
    pub const FEWEST_PARAMETERS: Self = Self(1 << 0);
    /// Descending by parameter count
    pub const MOST_PARAMETERS: Self = Self(1 << 1);
    /// Ascending by parameter type depth
    pub const SHALLOWEST_TYPES: Self = Self(1 << 2);
    /// Descending by parameter type depth
    pub const DEEPEST_TYPES: Self = Self(1 << 3);
    /// Compare depth vectors before parameter counts
    pub const TYPE_DEPTHS_FIRST: Self = Self(1 << 4);
    /// Compare the summed depth difference instead of the first difference
    pub const TOTAL_TYPE_DEPTH: Self = Self(1 << 5);
    /// Minimum count is the primary count key (maximum otherwise)
    pub const MINIMUM_COUNT_FIRST: Self = Self(1 << 6);
    /// Substitute the supplied argument count for an unbounded maximum
    pub const USE_ARGUMENT_COUNTS: Self = Self(1 << 7);
    /// Add wrapper nesting levels to type depths
    pub const SUB_TYPE_DEPTHS: Self = Self(1 << 8);
    /// Count the value-type root in type depths
    pub const VALUE_TYPE_DEPTHS: Self = Self(1 << 9);
    /// String parameters count deeper by the configured bonus
    pub const STRING_TYPE_BONUS: Self = Self(1 << 10);
    /// String parameters count shallower by the configured penalty
    pub const STRING_TYPE_PENALTY: Self = Self(1 << 11);
    /// Any ranking failure aborts the reorder
    pub const STRICT: Self = Self(1 << 12);
    /// Candidates that fail to rank sort last instead of aborting
    pub const CONTINUE_ON_ERROR: Self = Self(1 << 13);
    /// Emit trace lines for the resulting order
    pub const TRACE: Self = Self(1 << 14);

    /// Parameter-count ordering flags
    pub const COUNT_ORDER: Self = Self(Self::FEWEST_PARAMETERS.0 | Self::MOST_PARAMETERS.0);
    /// Type-depth ordering flags
    pub const DEPTH_ORDER: Self = Self(Self::SHALLOWEST_TYPES.0 | Self::DEEPEST_TYPES.0);
    /// Prefer short signatures with the most specific parameter types
    pub const DEFAULT: Self = Self(Self::FEWEST_PARAMETERS.0 | Self::DEEPEST_TYPES.0);

    const NAMES: &'static [(&'static str, Self)] = &[
        ("NONE", Self::NONE),
        ("FEWEST_PARAMETERS", Self::FEWEST_PARAMETERS),
        ("MOST_PARAMETERS", Self::MOST_PARAMETERS),
        ("SHALLOWEST_TYPES", Self::SHALLOWEST_TYPES),
        ("DEEPEST_TYPES", Self::DEEPEST_TYPES),
        ("TYPE_DEPTHS_FIRST", Self::TYPE_DEPTHS_FIRST),
        ("TOTAL_TYPE_DEPTH", Self::TOTAL_TYPE_DEPTH),
        ("MINIMUM_COUNT_FIRST", Self::MINIMUM_COUNT_FIRST),
        ("USE_ARGUMENT_COUNTS", Self::USE_ARGUMENT_COUNTS),
        ("SUB_TYPE_DEPTHS", Self::SUB_TYPE_DEPTHS),
        ("VALUE_TYPE_DEPTHS", Self::VALUE_TYPE_DEPTHS),
        ("STRING_TYPE_BONUS", Self::STRING_TYPE_BONUS),
        ("STRING_TYPE_PENALTY", Self::STRING_TYPE_PENALTY),
        ("STRICT", Self::STRICT),
        ("CONTINUE_ON_ERROR", Self::CONTINUE_ON_ERROR),
        ("TRACE", Self::TRACE),
        ("DEFAULT", Self::DEFAULT),
    ];

    /// Whether any ordering criterion is requested
    pub const fn has_ordering(&self) -> bool {
        self.intersects(Self::COUNT_ORDER) || self.intersects(Self::DEPTH_ORDER)
    }
}

flag_set!(ReorderFlags, u32);

/// Object table entry flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectFlags(u16);

impl ObjectFlags {
    /// Plain entry
    pub const NONE: Self = Self(0);
    /// Removing the entry must not dispose the object
    pub const NO_DISPOSE: Self = Self(1 << 0);
    /// A named alias command is bound to the handle
    pub const ALIAS: Self = Self(1 << 1);
    /// The value is a code assembly
    pub const ASSEMBLY: Self = Self(1 << 2);
    /// The value is a COM-style component
    pub const COM: Self = Self(1 << 3);

    const NAMES: &'static [(&'static str, Self)] = &[
        ("NONE", Self::NONE),
        ("NO_DISPOSE", Self::NO_DISPOSE),
        ("ALIAS", Self::ALIAS),
        ("ASSEMBLY", Self::ASSEMBLY),
        ("COM", Self::COM),
    ];
}

flag_set!(ObjectFlags, u16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_parse_and_display() {
        let flags = MarshalFlags::from_combined_str("verbose | trace").unwrap();
        assert!(flags.contains(MarshalFlags::VERBOSE));
        assert!(flags.contains(MarshalFlags::TRACE));
        assert_eq!(flags.to_string(), "VERBOSE|TRACE");
        assert_eq!(MarshalFlags::NONE.to_string(), "NONE");
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(MarshalFlags::from_combined_str("VERBOSE|BOGUS").is_none());
        assert_eq!(ReorderFlags::from_str("0x3"), Some(ReorderFlags::COUNT_ORDER));
    }

    #[test]
    fn test_presets() {
        assert_eq!(ReorderFlags::from_str("default"), Some(ReorderFlags::DEFAULT));
        assert!(ReorderFlags::DEFAULT.has_ordering());
        assert!(!ReorderFlags::TRACE.has_ordering());
        assert_eq!(ReorderFlags::DEFAULT.to_string(), "FEWEST_PARAMETERS|DEEPEST_TYPES");
    }

    #[test]
    fn test_set_algebra() {
        let f = ObjectFlags::ALIAS | ObjectFlags::NO_DISPOSE;
        assert!(f.intersects(ObjectFlags::ALIAS));
        assert_eq!(f.difference(ObjectFlags::ALIAS), ObjectFlags::NO_DISPOSE);
        assert!(f.intersection(ObjectFlags::COM).is_empty());
    }
}
