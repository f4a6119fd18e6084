//! Attribute filtering for loosely-shaped Redfish documents
//!
//! Every Redfish resource is a flat-ish JSON object whose exact fields vary by
//! vendor and firmware. This module reduces such an object to the scalar
//! key/value pairs worth keeping, and is the single place where that schema
//! looseness is absorbed: [`AttributeFilter::extract`] accepts any JSON value
//! and never fails.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Exclusion lists
// ============================================================================

/// Fields never promoted on subsystem records (processors, NICs, storage, disks).
pub const GENERIC_EXCLUSIONS: &[&str] = &[
    "Description",
    "Id",
    "Oem",
    "Links",
    "Actions",
    "RelatedItem",
];

/// Fields never promoted on a System. A subset of [`GENERIC_EXCLUSIONS`]:
/// the System keeps its `Id`.
pub const SYSTEM_EXCLUSIONS: &[&str] = &["Description", "Oem", "Actions"];

// ============================================================================
// Domain Models
// ============================================================================

/// A JSON value that can be stored directly as an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Convert a JSON value into a scalar.
    ///
    /// Objects, arrays and `null` are not scalars and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Integer)
                .or_else(|| n.as_u64().map(Scalar::Unsigned))
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Unsigned(u) => Some(*u as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Bool(_) | Scalar::String(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Unsigned(u) => write!(f, "{u}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// Attribute name to scalar value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Scalar>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    /// Convenience lookup for string attributes.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Scalar::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) -> Option<Scalar> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Scalar)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// Attribute Filter
// ============================================================================

/// Decides which fields of a document become attributes.
///
/// A field is kept when its value is a scalar, its key is identifier-safe
/// (see [`is_identifier`]) and its key does not match any exclusion,
/// compared case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    exclusions: Vec<String>,
}

impl AttributeFilter {
    pub fn new<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclusions: exclusions.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter used for System documents.
    pub fn system() -> Self {
        Self::new(SYSTEM_EXCLUSIONS.iter().copied())
    }

    /// Extend the exclusion list with additional field names.
    pub fn with_exclusions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Whether `key` is rejected regardless of its value.
    pub fn is_excluded(&self, key: &str) -> bool {
        !is_identifier(key)
            || self
                .exclusions
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(key))
    }

    /// Reduce a document to its promotable scalar attributes.
    ///
    /// Anything that is not a JSON object yields an empty mapping.
    pub fn extract(&self, document: &Value) -> Attributes {
        let Some(object) = document.as_object() else {
            return Attributes::new();
        };

        object
            .iter()
            .filter(|(key, _)| !self.is_excluded(key))
            .filter_map(|(key, value)| Scalar::from_json(value).map(|s| (key.clone(), s)))
            .collect()
    }
}

impl Default for AttributeFilter {
    fn default() -> Self {
        Self::new(GENERIC_EXCLUSIONS.iter().copied())
    }
}

/// A key is identifier-safe when it is non-empty, starts with an ASCII letter
/// and contains only ASCII letters and digits.
///
/// This rejects odata control keys such as `@odata.id` and annotated keys
/// such as `Members@odata.count`.
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[A-Za-z0-9@_.]{1,12}",
            (prop::sample::select(GENERIC_EXCLUSIONS), any::<bool>()).prop_map(|(name, upper)| {
                if upper {
                    name.to_uppercase()
                } else {
                    name.to_lowercase()
                }
            }),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            (-1.0e9..1.0e9f64).prop_map(Value::from),
            "[ -~]{0,16}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[A-Za-z]{1,6}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_extract_keeps_exactly_the_promotable_pairs(
            pairs in prop::collection::vec((key(), value()), 0..12),
        ) {
            let document = Value::Object(pairs.into_iter().collect());
            let filter = AttributeFilter::default();

            let attributes = filter.extract(&document);

            for (key, value) in document.as_object().unwrap() {
                let promotable = is_identifier(key)
                    && !GENERIC_EXCLUSIONS.iter().any(|name| name.eq_ignore_ascii_case(key))
                    && !(value.is_object() || value.is_array() || value.is_null());
                prop_assert_eq!(attributes.contains_key(key), promotable, "key {:?}", key);
                if promotable {
                    let expected = Scalar::from_json(value);
                    prop_assert_eq!(attributes.get(key), expected.as_ref());
                }
            }
            prop_assert!(attributes.len() <= document.as_object().unwrap().len());
        }
    }
}
