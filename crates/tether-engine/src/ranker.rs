//! Overload ranking
//!
//! Orders successful bindings by parameter-count tightness and by the
//! inheritance depth of the formal parameter types. Keys that could not be
//! computed always sort after every computed key.

use crate::error::{BindError, BindResult};
use crate::matcher::Binding;
use crate::Engine;
use std::cmp::Ordering;
use tether_sdk::{CallCandidate, ReorderFlags};
use tether_types::{DepthOptions, TypeClassifier, TypeContext};

/// Reject contradictory reorder flag pairs
pub(crate) fn check_policy(flags: ReorderFlags) -> BindResult<()> {
    const EXCLUSIVE: [(ReorderFlags, ReorderFlags, &str); 4] = [
        (ReorderFlags::FEWEST_PARAMETERS, ReorderFlags::MOST_PARAMETERS, "FEWEST_PARAMETERS and MOST_PARAMETERS"),
        (ReorderFlags::SHALLOWEST_TYPES, ReorderFlags::DEEPEST_TYPES, "SHALLOWEST_TYPES and DEEPEST_TYPES"),
        (ReorderFlags::STRING_TYPE_BONUS, ReorderFlags::STRING_TYPE_PENALTY, "STRING_TYPE_BONUS and STRING_TYPE_PENALTY"),
        (ReorderFlags::STRICT, ReorderFlags::CONTINUE_ON_ERROR, "STRICT and CONTINUE_ON_ERROR"),
    ];
    for (a, b, names) in EXCLUSIVE {
        if flags.contains(a) && flags.contains(b) {
            return Err(BindError::InvalidPolicy(format!("{} are mutually exclusive", names)));
        }
    }
    Ok(())
}

/// Sort keys of one binding
#[derive(Debug, Clone, PartialEq, Eq)]
struct RankKey {
    primary: Option<usize>,
    secondary: Option<usize>,
    depths: Option<Vec<i64>>,
}

/// `None` sorts after every value in both directions
fn compare_optional<T: Ord>(a: &Option<T>, b: &Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if descending {
                b.cmp(a)
            } else {
                a.cmp(b)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_depths(a: &[i64], b: &[i64], total: bool) -> Ordering {
    if a.len() != b.len() {
        return a.len().cmp(&b.len());
    }
    if total {
        let sum: i64 = a.iter().zip(b).map(|(x, y)| x - y).sum();
        return sum.cmp(&0);
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

struct Comparator {
    counts: Option<bool>,
    depths: Option<bool>,
    depths_first: bool,
    total: bool,
}

impl Comparator {
    fn new(flags: ReorderFlags) -> Self {
        let direction = |asc: ReorderFlags, desc: ReorderFlags| {
            if flags.contains(desc) {
                Some(true)
            } else if flags.contains(asc) {
                Some(false)
            } else {
                None
            }
        };
        Self {
            counts: direction(ReorderFlags::FEWEST_PARAMETERS, ReorderFlags::MOST_PARAMETERS),
            depths: direction(ReorderFlags::SHALLOWEST_TYPES, ReorderFlags::DEEPEST_TYPES),
            depths_first: flags.contains(ReorderFlags::TYPE_DEPTHS_FIRST),
            total: flags.contains(ReorderFlags::TOTAL_TYPE_DEPTH),
        }
    }

    fn by_counts(&self, a: &RankKey, b: &RankKey) -> Ordering {
        let Some(descending) = self.counts else {
            return Ordering::Equal;
        };
        compare_optional(&a.primary, &b.primary, descending)
            .then_with(|| compare_optional(&a.secondary, &b.secondary, descending))
    }

    fn by_depths(&self, a: &RankKey, b: &RankKey) -> Ordering {
        let Some(descending) = self.depths else {
            return Ordering::Equal;
        };
        match (&a.depths, &b.depths) {
            (Some(x), Some(y)) => {
                let ord = compare_depths(x, y, self.total);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn compare(&self, a: &RankKey, b: &RankKey) -> Ordering {
        if self.depths_first {
            self.by_depths(a, b).then_with(|| self.by_counts(a, b))
        } else {
            self.by_counts(a, b).then_with(|| self.by_depths(a, b))
        }
    }
}

impl Engine {
    /// Reorder bindings by the ranking policy
    ///
    /// Without a count or depth criterion the order is returned unchanged.
    /// A depth that cannot be computed aborts under `STRICT`, sorts last
    /// under `CONTINUE_ON_ERROR`, and otherwise leaves the original order.
    pub fn reorder(
        &self,
        types: &TypeContext,
        candidates: &[CallCandidate],
        bindings: Vec<Binding>,
        flags: ReorderFlags,
    ) -> BindResult<Vec<Binding>> {
        check_policy(flags)?;
        if !flags.has_ordering() || bindings.len() < 2 {
            return Ok(bindings);
        }

        let classifier = TypeClassifier::new(types).with_generic_limit(self.config.max_generic_depth);
        let string_bonus = if flags.contains(ReorderFlags::STRING_TYPE_BONUS) {
            self.config.string_type_bonus
        } else if flags.contains(ReorderFlags::STRING_TYPE_PENALTY) {
            -self.config.string_type_penalty
        } else {
            0
        };
        let options = DepthOptions {
            string_bonus,
            count_sub_types: flags.contains(ReorderFlags::SUB_TYPE_DEPTHS),
            count_value_types: flags.contains(ReorderFlags::VALUE_TYPE_DEPTHS),
            output: true,
        };
        let wants_depths = flags.intersects(ReorderFlags::DEPTH_ORDER);

        let mut keys = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            // an unbounded maximum ranks as infinitely many parameters
            let max = match binding.max_args {
                Some(max) => Some(max),
                None if flags.contains(ReorderFlags::USE_ARGUMENT_COUNTS) => Some(binding.supplied),
                None => Some(usize::MAX),
            };
            let min = Some(binding.min_args);
            let (primary, secondary) = if flags.contains(ReorderFlags::MINIMUM_COUNT_FIRST) {
                (min, max)
            } else {
                (max, min)
            };

            let depths = if wants_depths {
                let candidate = candidates.get(binding.candidate).ok_or_else(|| {
                    BindError::InvalidIndex {
                        index: binding.candidate,
                        count: candidates.len(),
                    }
                })?;
                let computed: Result<Vec<i64>, _> = candidate
                    .parameters
                    .iter()
                    .map(|p| classifier.compute_type_depth(p.ty, options))
                    .collect();
                match computed {
                    Ok(depths) => Some(depths),
                    Err(err) if flags.contains(ReorderFlags::STRICT) => return Err(err.into()),
                    Err(err) if flags.contains(ReorderFlags::CONTINUE_ON_ERROR) => {
                        tracing::debug!(candidate = %candidate.name, error = %err, "type depth unavailable, ranking last");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(candidate = %candidate.name, error = %err, "ranking failed, keeping original order");
                        return Ok(bindings);
                    }
                }
            } else {
                None
            };

            keys.push(RankKey { primary, secondary, depths });
        }

        let comparator = Comparator::new(flags);
        let mut order: Vec<usize> = (0..bindings.len()).collect();
        order.sort_by(|&a, &b| comparator.compare(&keys[a], &keys[b]));

        if flags.contains(ReorderFlags::TRACE) {
            for (rank, &i) in order.iter().enumerate() {
                let signature = candidates
                    .get(bindings[i].candidate)
                    .map(|c| c.signature(types))
                    .unwrap_or_default();
                tracing::debug!(rank, flags = %flags, candidate = %signature, key = ?keys[i], "reordered");
            }
        }

        let mut slots: Vec<Option<Binding>> = bindings.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tether_sdk::ParameterInfo;
    use tether_types::{PrimitiveType, TypeId};

    fn binding(candidate: usize, min: usize, max: Option<usize>, supplied: usize) -> Binding {
        Binding {
            candidate,
            args: Vec::new(),
            outputs: Vec::new(),
            min_args: min,
            max_args: max,
            supplied,
        }
    }

    fn order(bindings: &[Binding]) -> Vec<usize> {
        bindings.iter().map(|b| b.candidate).collect()
    }

    #[test]
    fn test_conflicting_policy_rejected() {
        let err = check_policy(ReorderFlags::FEWEST_PARAMETERS | ReorderFlags::MOST_PARAMETERS).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Policy);
        assert!(check_policy(ReorderFlags::DEFAULT).is_ok());
    }

    #[test]
    fn test_identity_without_ordering_flags() {
        let engine = Engine::default();
        let types = TypeContext::new();
        let bindings = vec![binding(0, 3, Some(3), 3), binding(1, 1, Some(1), 3)];
        let out = engine
            .reorder(&types, &[], bindings.clone(), ReorderFlags::STRICT)
            .unwrap();
        assert_eq!(out, bindings);
    }

    #[test]
    fn test_count_directions_and_unbounded() {
        let engine = Engine::default();
        let types = TypeContext::new();
        let bindings = vec![binding(0, 0, None, 2), binding(1, 2, Some(2), 2), binding(2, 1, Some(3), 2)];

        let out = engine
            .reorder(&types, &[], bindings.clone(), ReorderFlags::FEWEST_PARAMETERS)
            .unwrap();
        assert_eq!(order(&out), vec![1, 2, 0]);

        let out = engine
            .reorder(&types, &[], bindings.clone(), ReorderFlags::MOST_PARAMETERS)
            .unwrap();
        assert_eq!(order(&out), vec![0, 2, 1]);

        let flags = ReorderFlags::FEWEST_PARAMETERS | ReorderFlags::USE_ARGUMENT_COUNTS;
        let out = engine.reorder(&types, &[], bindings, flags).unwrap();
        assert_eq!(order(&out), vec![0, 1, 2]);
    }

    #[test]
    fn test_depth_ordering() {
        let engine = Engine::default();
        let mut types = TypeContext::new();
        let animal = types.class_type("Animal", None, vec![]);
        let dog = types.class_type("Dog", Some(animal), vec![]);
        let candidates = vec![
            CallCandidate::method("feed", vec![ParameterInfo::new("a", animal)]),
            CallCandidate::method("feed", vec![ParameterInfo::new("d", dog)]),
            CallCandidate::method("feed", vec![ParameterInfo::new("o", TypeId::OBJECT)]),
        ];
        let bindings = vec![binding(0, 1, Some(1), 1), binding(1, 1, Some(1), 1), binding(2, 1, Some(1), 1)];

        let out = engine
            .reorder(&types, &candidates, bindings.clone(), ReorderFlags::DEEPEST_TYPES)
            .unwrap();
        assert_eq!(order(&out), vec![1, 0, 2]);

        let out = engine
            .reorder(&types, &candidates, bindings, ReorderFlags::SHALLOWEST_TYPES)
            .unwrap();
        assert_eq!(order(&out), vec![2, 0, 1]);
    }

    #[test]
    fn test_string_bonus_and_penalty() {
        let engine = Engine::default();
        let types = TypeContext::new();
        let int = TypeId::primitive(PrimitiveType::Int32);
        let candidates = vec![
            CallCandidate::method("f", vec![ParameterInfo::new("i", int)]),
            CallCandidate::method("f", vec![ParameterInfo::new("s", TypeId::STRING)]),
        ];
        let bindings = vec![binding(0, 1, Some(1), 1), binding(1, 1, Some(1), 1)];

        // Int32 -> ValueType -> Object is two levels, String -> Object is two
        let flags = ReorderFlags::DEEPEST_TYPES | ReorderFlags::STRING_TYPE_BONUS;
        let out = engine.reorder(&types, &candidates, bindings.clone(), flags).unwrap();
        assert_eq!(order(&out), vec![1, 0]);

        let flags = ReorderFlags::DEEPEST_TYPES | ReorderFlags::VALUE_TYPE_DEPTHS | ReorderFlags::STRING_TYPE_PENALTY;
        let out = engine.reorder(&types, &candidates, bindings, flags).unwrap();
        assert_eq!(order(&out), vec![0, 1]);
    }

    #[test]
    fn test_depth_failure_policies() {
        let engine = Engine::default();
        let types = TypeContext::new();
        let broken = TypeId::new(9_999);
        let candidates = vec![
            CallCandidate::method("f", vec![ParameterInfo::new("x", broken)]),
            CallCandidate::method("f", vec![ParameterInfo::new("y", TypeId::STRING)]),
        ];
        let bindings = vec![binding(0, 1, Some(1), 1), binding(1, 1, Some(1), 1)];

        let strict = ReorderFlags::SHALLOWEST_TYPES | ReorderFlags::STRICT;
        let err = engine.reorder(&types, &candidates, bindings.clone(), strict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);

        let cont = ReorderFlags::SHALLOWEST_TYPES | ReorderFlags::CONTINUE_ON_ERROR;
        let out = engine.reorder(&types, &candidates, bindings.clone(), cont).unwrap();
        assert_eq!(order(&out), vec![1, 0]);

        let out = engine
            .reorder(&types, &candidates, bindings.clone(), ReorderFlags::SHALLOWEST_TYPES)
            .unwrap();
        assert_eq!(out, bindings);
    }

    #[test]
    fn test_total_versus_first_difference() {
        assert_eq!(compare_depths(&[1, 5], &[2, 1], false), Ordering::Less);
        assert_eq!(compare_depths(&[1, 5], &[2, 1], true), Ordering::Greater);
        assert_eq!(compare_depths(&[9], &[1, 1], false), Ordering::Less);
    }
}
