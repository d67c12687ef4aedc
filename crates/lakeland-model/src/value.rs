//! List-or-scalar normalization for Airtable cells.
//!
//! The Airtable API returns linked-record and lookup columns as arrays even
//! when they hold one value, and some columns flip between shapes across
//! exports. Cells are normalized into [`FieldValue`] before a record is
//! constructed; record fields that may legitimately hold several values use
//! [`OneOrMany`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A raw cell after singleton unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The cell was missing or `null`.
    Absent,
    /// A bare value, or the only element of a one-element list.
    Scalar(Value),
    /// A list with zero or two-or-more elements.
    Multiple(Vec<Value>),
}

impl FieldValue {
    /// Normalize a raw JSON cell.
    ///
    /// Only one level of nesting is unwrapped: `[[x]]` becomes `Scalar([x])`.
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::Array(mut items) if items.len() == 1 => match items.pop() {
                Some(Value::Null) | None => FieldValue::Absent,
                Some(inner) => FieldValue::Scalar(inner),
            },
            Value::Array(items) => FieldValue::Multiple(items),
            other => FieldValue::Scalar(other),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Back to JSON for record construction. `Absent` yields `None` so the
    /// field is omitted and the record's default applies.
    pub fn into_json(self) -> Option<Value> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Scalar(v) => Some(v),
            FieldValue::Multiple(items) => Some(Value::Array(items)),
        }
    }

    /// Render a scalar for human-readable hints.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Scalar(Value::String(s)) => s.clone(),
            FieldValue::Scalar(v) => v.to_string(),
            FieldValue::Multiple(items) => Value::Array(items.clone()).to_string(),
        }
    }
}

/// A record field that holds either a single value or a list of values.
///
/// `Many` is listed first so an array is never captured by `One` when `T`
/// itself accepts arrays (e.g. `serde_json::Value`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Many(items) => items.iter(),
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::Many(items) => items.len(),
            OneOrMany::One(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, needle: &T) -> bool {
        self.iter().any(|item| item == needle)
    }
}

impl OneOrMany<String> {
    pub fn contains_str(&self, needle: &str) -> bool {
        self.iter().any(|item| item == needle)
    }
}

/// Accept either a JSON string or a JSON number for a text field.
///
/// Airtable number-formatted columns (coordinates, page numbers) come back as
/// numbers or strings depending on how the column was configured at export.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        S(String),
        N(serde_json::Number),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::S(s) => s,
        Text::N(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn singleton_list_unwraps_to_scalar() {
        assert_eq!(
            FieldValue::normalize(json!(["recX"])),
            FieldValue::Scalar(json!("recX"))
        );
    }

    #[test]
    fn empty_and_long_lists_stay_lists() {
        assert_eq!(FieldValue::normalize(json!([])), FieldValue::Multiple(vec![]));
        assert_eq!(
            FieldValue::normalize(json!(["a", "b"])),
            FieldValue::Multiple(vec![json!("a"), json!("b")])
        );
    }

    #[test]
    fn null_is_absent() {
        assert!(FieldValue::normalize(Value::Null).is_absent());
        assert!(FieldValue::normalize(json!([null])).is_absent());
        assert_eq!(FieldValue::Absent.into_json(), None);
    }

    #[test]
    fn only_one_level_is_unwrapped() {
        assert_eq!(
            FieldValue::normalize(json!([["x"]])),
            FieldValue::Scalar(json!(["x"]))
        );
    }

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let one: OneOrMany<String> = serde_json::from_value(json!("a")).unwrap();
        let many: OneOrMany<String> = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(one.to_vec(), vec!["a".to_string()]);
        assert_eq!(many.len(), 2);
        assert!(many.contains_str("b"));
    }

    #[test]
    fn one_or_many_value_keeps_arrays_as_many() {
        let blob: OneOrMany<Value> =
            serde_json::from_value(json!([{"url": "a"}, {"url": "b"}])).unwrap();
        assert_eq!(blob.len(), 2);
        let single: OneOrMany<Value> = serde_json::from_value(json!({"url": "a"})).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn string_or_number_reads_numbers() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "string_or_number")]
            lat: String,
        }
        let p: Probe = serde_json::from_value(json!({"lat": 38.99})).unwrap();
        assert_eq!(p.lat, "38.99");
        let p: Probe = serde_json::from_value(json!({"lat": "38.99"})).unwrap();
        assert_eq!(p.lat, "38.99");
    }
}
