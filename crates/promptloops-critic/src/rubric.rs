//! The four-axis quality rubric shared by prompt critique and response judging.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Canonical rubric axes, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Intent,
    Clarity,
    Structure,
    Safety,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Intent, Axis::Clarity, Axis::Structure, Axis::Safety];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Intent => "intent",
            Axis::Clarity => "clarity",
            Axis::Structure => "structure",
            Axis::Safety => "safety",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds every axis value is clamped into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubricRange {
    pub min: i64,
    pub max: i64,
}

impl RubricRange {
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

/// Range used when critiquing prompts
pub const CRITIQUE_RANGE: RubricRange = RubricRange { min: 0, max: 5 };
/// Range used when judging responses
pub const JUDGE_RANGE: RubricRange = RubricRange { min: 1, max: 5 };

/// Coerce an untrusted score value to an integer.
///
/// Integers pass through, floats truncate toward zero, integer strings are
/// parsed, booleans count as 1/0. Anything else is 0.
pub fn coerce_score(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Per-axis scores, already clamped into their range.
///
/// Canonical axes come first in [`Axis::ALL`] order; any extra axes a
/// generator invented follow in name order. Totals and the weakest axis are
/// computed over every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricScore {
    entries: Vec<(String, i64)>,
}

impl RubricScore {
    /// Every canonical axis at the bottom of `range`
    pub fn floor(range: RubricRange) -> Self {
        Self {
            entries: Axis::ALL
                .iter()
                .map(|axis| (axis.as_str().to_string(), range.min))
                .collect(),
        }
    }

    /// Build from known values, clamping each one
    pub fn from_axes(values: [(Axis, i64); 4], range: RubricRange) -> Self {
        let mut entries: Vec<(String, i64)> = Vec::with_capacity(values.len());
        for axis in Axis::ALL {
            if let Some((_, value)) = values.iter().find(|(a, _)| *a == axis) {
                entries.push((axis.as_str().to_string(), range.clamp(*value)));
            }
        }
        Self { entries }
    }

    /// Build from an untrusted mapping. Keys are lowercased and trimmed;
    /// values are coerced with [`coerce_score`] and clamped. Keys listed in
    /// `ignore` (e.g. `notes`) are skipped. When two keys fold to the same
    /// name, the one already written in lowercase wins.
    pub fn from_map(raw: &Map<String, Value>, range: RubricRange, ignore: &[&str]) -> Self {
        let keyed = normalized_keys(raw, ignore);

        let mut entries: Vec<(String, i64)> = Vec::with_capacity(keyed.len());
        for axis in Axis::ALL {
            if let Some((key, value)) = keyed.iter().find(|(k, _)| k == axis.as_str()) {
                entries.push((key.clone(), range.clamp(coerce_score(value))));
            }
        }
        for (key, value) in &keyed {
            if !Axis::ALL.iter().any(|axis| axis.as_str() == key) {
                entries.push((key.clone(), range.clamp(coerce_score(value))));
            }
        }

        Self { entries }
    }

    /// Build from an untrusted mapping using the canonical axes only.
    ///
    /// Any other key is ignored and a missing axis sits at `range.min`, so
    /// totals always cover exactly four axes.
    pub fn from_canonical_map(raw: &Map<String, Value>, range: RubricRange) -> Self {
        let keyed = normalized_keys(raw, &[]);
        let entries = Axis::ALL
            .iter()
            .map(|axis| {
                let value = keyed
                    .iter()
                    .find(|(k, _)| k == axis.as_str())
                    .map_or(range.min, |(_, value)| range.clamp(coerce_score(value)));
                (axis.as_str().to_string(), value)
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, axis: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, axis: &str) -> bool {
        self.get(axis).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Sum of every axis value
    pub fn total(&self) -> i64 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    /// Lowest-scoring axis; ties go to the first one in order
    pub fn weakest(&self) -> Option<&str> {
        let mut weakest: Option<&(String, i64)> = None;
        for entry in &self.entries {
            if weakest.map_or(true, |w| entry.1 < w.1) {
                weakest = Some(entry);
            }
        }
        weakest.map(|(name, _)| name.as_str())
    }
}

/// Lowercased, trimmed keys in name order, one per folded name.
/// An exact lowercase key beats its differently-cased duplicates.
fn normalized_keys<'a>(raw: &'a Map<String, Value>, ignore: &[&str]) -> Vec<(String, &'a Value)> {
    let mut keyed: Vec<(String, bool, &Value)> = raw
        .iter()
        .map(|(k, v)| {
            let folded = k.trim().to_lowercase();
            let exact = folded == *k;
            (folded, exact, v)
        })
        .filter(|(k, _, _)| !k.is_empty() && !ignore.contains(&k.as_str()))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    keyed.dedup_by(|a, b| a.0 == b.0);
    keyed.into_iter().map(|(k, _, v)| (k, v)).collect()
}

impl Serialize for RubricScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_coerce_score() {
        assert_eq!(coerce_score(&json!(4)), 4);
        assert_eq!(coerce_score(&json!(3.9)), 3);
        assert_eq!(coerce_score(&json!(" 2 ")), 2);
        assert_eq!(coerce_score(&json!("4.5")), 0);
        assert_eq!(coerce_score(&json!("great")), 0);
        assert_eq!(coerce_score(&json!(true)), 1);
        assert_eq!(coerce_score(&json!(null)), 0);
        assert_eq!(coerce_score(&json!([5])), 0);
    }

    #[test]
    fn test_from_map_clamps_and_orders() {
        let raw = as_map(json!({"safety": 9, "Intent": -3, "clarity": "4", "structure": 2.7}));
        let scores = RubricScore::from_map(&raw, CRITIQUE_RANGE, &[]);

        let names: Vec<&str> = scores.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["intent", "clarity", "structure", "safety"]);
        assert_eq!(scores.get("intent"), Some(0));
        assert_eq!(scores.get("safety"), Some(5));
        assert_eq!(scores.total(), 11);
    }

    #[test]
    fn test_extra_axes_follow_canonical() {
        let raw = as_map(json!({"specificity": 1, "clarity": 3, "context": 2}));
        let scores = RubricScore::from_map(&raw, CRITIQUE_RANGE, &[]);

        let names: Vec<&str> = scores.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["clarity", "context", "specificity"]);
        assert_eq!(scores.total(), 6);
        assert_eq!(scores.weakest(), Some("specificity"));
    }

    #[test]
    fn test_ignored_keys() {
        let raw = as_map(json!({"intent": 4, "notes": "fine"}));
        let scores = RubricScore::from_map(&raw, JUDGE_RANGE, &["notes"]);
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn test_lowercase_key_wins_over_folded_duplicate() {
        let raw = as_map(json!({"Intent": 1, "intent": 4, " INTENT ": 2}));
        let scores = RubricScore::from_map(&raw, CRITIQUE_RANGE, &[]);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.get("intent"), Some(4));
    }

    #[test]
    fn test_canonical_map_drops_extra_keys() {
        let raw = as_map(json!({"intent": 3, "clarity": 3, "comment": "fine", "Safety": 4}));
        let scores = RubricScore::from_canonical_map(&raw, JUDGE_RANGE);

        let names: Vec<&str> = scores.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["intent", "clarity", "structure", "safety"]);
        assert_eq!(scores.get("structure"), Some(1));
        assert!(!scores.contains("comment"));
        assert_eq!(scores.total(), 11);
    }

    #[test]
    fn test_weakest_ties_use_canonical_order() {
        let scores = RubricScore::from_axes(
            [
                (Axis::Intent, 4),
                (Axis::Clarity, 2),
                (Axis::Structure, 2),
                (Axis::Safety, 2),
            ],
            CRITIQUE_RANGE,
        );
        assert_eq!(scores.weakest(), Some("clarity"));
    }

    #[test]
    fn test_floor() {
        let scores = RubricScore::floor(JUDGE_RANGE);
        assert_eq!(scores.total(), 4);
        assert_eq!(scores.weakest(), Some("intent"));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let scores = RubricScore::from_axes(
            [
                (Axis::Safety, 5),
                (Axis::Intent, 3),
                (Axis::Clarity, 4),
                (Axis::Structure, 1),
            ],
            CRITIQUE_RANGE,
        );
        let text = serde_json::to_string(&scores).unwrap();
        assert_eq!(text, r#"{"intent":3,"clarity":4,"structure":1,"safety":5}"#);
    }
}
