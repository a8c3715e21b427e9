//! Property value model
//!
//! Values live on the property chain (spec §4.3 "Property chains").
//! Small scalars are inlined directly in a property record; strings and
//! arrays that don't fit are written to the dynamic string/array stores
//! and referenced by their first block id.

use serde::{Deserialize, Serialize};

/// A property value, as seen by the command/extraction layer. Storage
/// encoding (inline vs. dynamic chain) is decided by
/// `graphkernel-storage`'s property record format; this type is the
/// in-memory representation shared across crates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Boolean scalar.
    Bool(bool),
    /// 64-bit signed integer scalar.
    Int(i64),
    /// 64-bit floating point scalar.
    Float(f64),
    /// UTF-8 string. Inlined if it fits in a property record block,
    /// otherwise chained through the dynamic string store.
    String(String),
    /// Homogeneous array of scalars. Chained through the dynamic array
    /// store when it doesn't fit inline.
    IntArray(Vec<i64>),
    /// Homogeneous array of strings.
    StringArray(Vec<String>),
}

impl PropertyValue {
    /// Byte length of this value's own payload, excluding any inline
    /// record header. Used to decide whether a value fits inline or
    /// must be chained through a dynamic store.
    pub fn encoded_len(&self) -> usize {
        match self {
            PropertyValue::Bool(_) => 1,
            PropertyValue::Int(_) => 8,
            PropertyValue::Float(_) => 8,
            PropertyValue::String(s) => s.len(),
            PropertyValue::IntArray(a) => a.len() * 8,
            PropertyValue::StringArray(a) => a.iter().map(|s| s.len() + 4).sum(),
        }
    }

    /// True if this value is small enough to live entirely inside a
    /// fixed-size property record rather than a dynamic chain.
    pub fn fits_inline(&self, inline_capacity: usize) -> bool {
        self.encoded_len() <= inline_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_fit_inline() {
        assert!(PropertyValue::Int(42).fits_inline(8));
        assert!(PropertyValue::Bool(true).fits_inline(8));
    }

    #[test]
    fn long_string_does_not_fit_inline() {
        let long = "x".repeat(100);
        assert!(!PropertyValue::String(long).fits_inline(16));
    }

    #[test]
    fn short_string_fits_inline() {
        assert!(PropertyValue::String("hi".into()).fits_inline(16));
    }
}
