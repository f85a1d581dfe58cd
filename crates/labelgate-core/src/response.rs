//! Tagged response values.
//!
//! A submission's response is polymorphic: a scalar, free text, an ordered
//! sequence, or a keyed record. Modeling it as a tagged variant lets the
//! comparator and the consensus engine dispatch on shape with a `match`
//! instead of runtime type inspection, and removes any ambiguity about
//! numbers-seen-as-strings.
//!
//! Records use a `BTreeMap` so the canonical rendering is sorted by key
//! without an extra normalization pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A worker's response value.
///
/// The untagged serde representation round-trips naturally with the JSON
/// bodies the surrounding service layer shuttles around: booleans, numbers,
/// strings, arrays and objects map onto the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar. Integers are widened to `f64` on ingestion.
    Number(f64),
    /// Free text.
    Text(String),
    /// Ordered sequence of nested responses.
    Sequence(Vec<Response>),
    /// Keyed record of nested responses, sorted by key.
    Record(BTreeMap<String, Response>),
}

/// Shape tag for a [`Response`], used in mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Boolean scalar.
    Bool,
    /// Numeric scalar.
    Number,
    /// Free text.
    Text,
    /// Ordered sequence.
    Sequence,
    /// Keyed record.
    Record,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::Sequence => "sequence",
            Self::Record => "record",
        };
        f.write_str(name)
    }
}

impl Response {
    /// Convenience constructor for text responses.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Convenience constructor for record responses.
    #[must_use]
    pub fn record<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Response>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the shape tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::Bool(_) => ResponseKind::Bool,
            Self::Number(_) => ResponseKind::Number,
            Self::Text(_) => ResponseKind::Text,
            Self::Sequence(_) => ResponseKind::Sequence,
            Self::Record(_) => ResponseKind::Record,
        }
    }

    /// Returns `true` if this value is a scalar (bool, number, or text).
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Number(_) | Self::Text(_))
    }

    /// Equality as the engine understands it: text compares
    /// case-insensitively after trimming, every other shape compares exactly.
    ///
    /// Used for bot-detection repetition checks and consensus pairwise
    /// agreement.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => normalize_text(a) == normalize_text(b),
            (a, b) => a == b,
        }
    }

    /// Canonical string key for frequency counting.
    ///
    /// Text normalizes to its trimmed lowercase form; structured values
    /// render as compact JSON with record keys already sorted by the
    /// `BTreeMap` representation. Two responses with equal canonical keys are
    /// counted as the same answer when selecting a majority.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Text(text) => normalize_text(text),
            other => serde_json::Value::from(other).to_string(),
        }
    }
}

impl From<bool> for Response {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Response {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Response {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Response {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Response {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&Response> for serde_json::Value {
    fn from(response: &Response) -> Self {
        match response {
            Response::Bool(b) => Self::Bool(*b),
            Response::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(Self::Null, Self::Number),
            Response::Text(t) => Self::String(t.clone()),
            Response::Sequence(items) => {
                Self::Array(items.iter().map(Self::from).collect())
            },
            Response::Record(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Trimmed, lowercased form of a text value.
pub(crate) fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
