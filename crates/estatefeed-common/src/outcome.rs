//! Degradation-tagged results
//!
//! Several pipeline stages prefer a lower-quality result over aborting the
//! run. Those stages return an [`Outcome`] so callers (and tests) can tell a
//! clean result apart from one that went through a fallback path.

use serde::Serialize;
use std::fmt;

/// A recoverable loss of quality recorded while producing a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Bytes could not be converted from the detected encoding and were
    /// read as (lossy) UTF-8 instead
    EncodingFallback { encoding: String, reason: String },

    /// The destination lacks required columns and they could not be created
    SchemaIncomplete { missing: Vec<String> },

    /// The destination schema could not be read at all
    SchemaUnreadable { reason: String },

    /// A value could not be coerced to its column type and was left out
    FieldDropped { column: String, value: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::EncodingFallback { encoding, reason } => {
                write!(f, "could not decode as {}, read as UTF-8 ({})", encoding, reason)
            },
            Degradation::SchemaIncomplete { missing } => {
                write!(f, "destination is missing {} column(s): {}", missing.len(), missing.join(", "))
            },
            Degradation::SchemaUnreadable { reason } => {
                write!(f, "destination schema unreadable: {}", reason)
            },
            Degradation::FieldDropped { column, value } => {
                write!(f, "dropped '{}' for column '{}'", value, column)
            },
        }
    }
}

/// A value that was either produced cleanly or with recorded degradations
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Degraded { value: T, reasons: Vec<Degradation> },
}

impl<T> Outcome<T> {
    /// Wrap a value produced through a single fallback path
    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded {
            value,
            reasons: vec![reason],
        }
    }

    /// Build from a value and whatever degradations were collected for it
    pub fn from_parts(value: T, reasons: Vec<Degradation>) -> Self {
        if reasons.is_empty() {
            Outcome::Complete(value)
        } else {
            Outcome::Degraded { value, reasons }
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reasons(&self) -> &[Degradation] {
        match self {
            Outcome::Complete(_) => &[],
            Outcome::Degraded { reasons, .. } => reasons,
        }
    }

    /// Split into the value and its degradations
    pub fn into_parts(self) -> (T, Vec<Degradation>) {
        match self {
            Outcome::Complete(value) => (value, Vec::new()),
            Outcome::Degraded { value, reasons } => (value, reasons),
        }
    }

    pub fn into_value(self) -> T {
        self.into_parts().0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Degraded { value, reasons } => Outcome::Degraded {
                value: f(value),
                reasons,
            },
        }
    }
}
