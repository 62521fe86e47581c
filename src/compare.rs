//! Deep structural comparison
//!
//! Compares two composite [`ScriptValue`]s and reports the first point of
//! divergence together with the key-path leading to it. The walk uses an
//! explicit frame stack rather than native recursion, so arbitrarily deep
//! values cannot overflow the host stack and the algorithm is testable
//! with no interpreter in sight.

use std::collections::BTreeSet;

use crate::value::ScriptValue;

/// The first difference found between two composite values.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Keys locating the point of divergence, outermost first.
    pub key_path: Vec<ScriptValue>,
    /// Human-readable description of the mismatch.
    pub description: String,
}

impl Diff {
    /// The key-path joined for display: `"a"."b".3`
    pub fn path_display(&self) -> String {
        self.key_path
            .iter()
            .map(ScriptValue::key_encoding)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// One composite pair under comparison.
struct Frame<'a> {
    lhs: &'a ScriptValue,
    rhs: &'a ScriptValue,
    /// Keys of `lhs` in display order.
    keys: Vec<ScriptValue>,
    index: usize,
    /// Keys of `rhs` not yet matched by an `lhs` key.
    remaining: BTreeSet<ScriptValue>,
}

impl<'a> Frame<'a> {
    fn new(lhs: &'a ScriptValue, rhs: &'a ScriptValue) -> Self {
        Frame {
            lhs,
            rhs,
            keys: composite_keys(lhs),
            index: 0,
            remaining: composite_keys(rhs).into_iter().collect(),
        }
    }
}

/// Enumerate the keys of a composite value. A list of length n has keys
/// 1..=n; a map has its own keys in map order. This uniform enumeration is
/// what lets a list be compared against a map with no special case.
fn composite_keys(value: &ScriptValue) -> Vec<ScriptValue> {
    match value {
        ScriptValue::List(items) => (1..=items.len() as i64).map(ScriptValue::Integer).collect(),
        ScriptValue::Map(entries) => entries.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Look up a key in a composite value.
fn composite_get<'a>(value: &'a ScriptValue, key: &ScriptValue) -> Option<&'a ScriptValue> {
    match value {
        ScriptValue::List(items) => match key {
            ScriptValue::Integer(i) if *i >= 1 => items.get(*i as usize - 1),
            _ => None,
        },
        ScriptValue::Map(entries) => entries.get(key),
        _ => None,
    }
}

/// Compare two composite values, returning the first divergence or `None`
/// when they are structurally equal.
///
/// The walk visits the keys of the expected (`lhs`) side in display order:
/// a key absent from `rhs` reports "missing", a leaf mismatch reports both
/// renderings, a nested composite pair descends, and once every `lhs` key
/// has matched, any key left over in `rhs` reports "extra". Comparison
/// stops at the first mismatch.
pub fn deep_compare(lhs: &ScriptValue, rhs: &ScriptValue) -> Option<Diff> {
    let mut path: Vec<ScriptValue> = Vec::new();
    let mut stack = vec![Frame::new(lhs, rhs)];

    while let Some(top) = stack.len().checked_sub(1) {
        if stack[top].index < stack[top].keys.len() {
            let key = stack[top].keys[stack[top].index].clone();
            stack[top].index += 1;

            let (frame_lhs, frame_rhs) = (stack[top].lhs, stack[top].rhs);
            let Some(rhs_value) = composite_get(frame_rhs, &key) else {
                return Some(Diff {
                    key_path: path,
                    description: format!("Actual value missing key {}", key.key_encoding()),
                });
            };
            stack[top].remaining.remove(&key);

            let lhs_value =
                composite_get(frame_lhs, &key).expect("key was enumerated from this value");
            if lhs_value.is_composite() && rhs_value.is_composite() {
                path.push(key);
                stack.push(Frame::new(lhs_value, rhs_value));
            } else if !lhs_value.leaf_eq(rhs_value) {
                path.push(key);
                return Some(Diff {
                    key_path: path,
                    description: format!(
                        "Expected '{}', actual was '{}'",
                        lhs_value, rhs_value
                    ),
                });
            }
        } else {
            if let Some(extra) = stack[top].remaining.iter().next() {
                return Some(Diff {
                    key_path: path,
                    description: format!("Actual value has extra key {}", extra.key_encoding()),
                });
            }
            stack.pop();
            // This nesting level matched completely; drop its key.
            if !stack.is_empty() {
                path.pop();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(items: Vec<ScriptValue>) -> ScriptValue {
        ScriptValue::List(items)
    }

    fn map(entries: Vec<(&str, ScriptValue)>) -> ScriptValue {
        ScriptValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (ScriptValue::String(k.into()), v))
                .collect(),
        )
    }

    fn int(i: i64) -> ScriptValue {
        ScriptValue::Integer(i)
    }

    #[test]
    fn equal_composites_report_no_difference() {
        let value = map(vec![
            ("a", int(1)),
            ("b", list(vec![int(1), int(2)])),
            ("c", map(vec![("nested", ScriptValue::Boolean(true))])),
        ]);
        assert_eq!(deep_compare(&value, &value.clone()), None);
    }

    #[test]
    fn equality_is_symmetric() {
        let a = map(vec![("x", list(vec![int(1), ScriptValue::Float(2.0)]))]);
        let b = map(vec![("x", list(vec![int(1), int(2)]))]);
        // Float(2.0) and Integer(2) are leaf-equal in both directions.
        assert_eq!(deep_compare(&a, &b), None);
        assert_eq!(deep_compare(&b, &a), None);
    }

    #[test]
    fn leaf_mismatch_reports_both_renderings_and_the_key() {
        let lhs = map(vec![("count", int(25))]);
        let rhs = map(vec![("count", int(24))]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.description, "Expected '25', actual was '24'");
        assert_eq!(diff.path_display(), "\"count\"");
    }

    #[test]
    fn missing_key_points_at_the_enclosing_composite() {
        let lhs = list(vec![int(1), int(2), int(3)]);
        let rhs = list(vec![int(1), int(2)]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.description, "Actual value missing key 3");
        assert_eq!(diff.key_path, Vec::<ScriptValue>::new());
    }

    #[test]
    fn extra_key_is_reported_after_all_expected_keys_match() {
        let lhs = list(vec![int(1)]);
        let rhs = list(vec![int(1), int(2)]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.description, "Actual value has extra key 2");
    }

    #[test]
    fn nested_divergence_carries_the_full_key_path() {
        let lhs = map(vec![("outer", map(vec![("inner", int(1))]))]);
        let rhs = map(vec![("outer", map(vec![("inner", int(2))]))]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.path_display(), "\"outer\".\"inner\"");
        assert_eq!(diff.description, "Expected '1', actual was '2'");
    }

    #[test]
    fn matched_siblings_do_not_pollute_the_path() {
        // "a" matches completely before "b" diverges; the path must not
        // retain "a".
        let lhs = map(vec![("a", map(vec![("k", int(1))])), ("b", int(2))]);
        let rhs = map(vec![("a", map(vec![("k", int(1))])), ("b", int(3))]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.path_display(), "\"b\"");
    }

    #[test]
    fn list_versus_map_falls_out_of_the_generic_key_walk() {
        let lhs = list(vec![int(7)]);
        let rhs = map(vec![("a", int(7))]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        // Key 1 of the list is simply absent from the map.
        assert_eq!(diff.description, "Actual value missing key 1");
    }

    #[test]
    fn comparison_stops_at_the_first_divergence() {
        let lhs = list(vec![int(1), int(2), int(3)]);
        let rhs = list(vec![int(9), int(8), int(7)]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.path_display(), "1");
        assert_eq!(diff.description, "Expected '1', actual was '9'");
    }

    #[test]
    fn deep_nesting_stays_off_the_host_stack() {
        let mut lhs = int(0);
        let mut rhs = int(1);
        for _ in 0..4096 {
            lhs = map(vec![("k", lhs)]);
            rhs = map(vec![("k", rhs)]);
        }
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.key_path.len(), 4096);
    }

    #[test]
    fn scalar_composite_mismatch_is_a_leaf_mismatch() {
        let lhs = map(vec![("v", list(vec![int(1)]))]);
        let rhs = map(vec![("v", int(1))]);
        let diff = deep_compare(&lhs, &rhs).unwrap();
        assert_eq!(diff.path_display(), "\"v\"");
        assert!(diff.description.starts_with("Expected '{"));
    }
}
