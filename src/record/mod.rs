//! The structured court-decision record and its building blocks.
//!
//! Every struct in [`schema`] is declared through `record_types!`, which wraps
//! each field in [`Field`] and generates the merge plumbing, so the JSON
//! schema sent to the model, the parser, and the merge rules are all derived
//! from one declaration.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use crate::field::Field;

macro_rules! record_types {
    ($(
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                pub $field:ident: $ty:ty,
            )*
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
        pub struct $name {
            $(
                $(#[doc = $doc])*
                #[serde(default, skip_serializing_if = "Field::is_absent")]
                pub $field: Field<$ty>,
            )*
        }

        impl $name {
            /// Merge `incoming` into `self`, field by field.
            pub fn merge_fields(
                &mut self,
                incoming: &Self,
                level: $crate::pipeline::merge::Level,
            ) {
                $( self.$field.merge_from(&incoming.$field, level); )*
            }

            /// Number of fields that carry a value.
            pub fn populated_fields(&self) -> usize {
                0 $( + usize::from(self.$field.has_value()) )*
            }
        }

        impl $crate::pipeline::merge::MergeValue for $name {
            fn merge_value(&mut self, incoming: &Self) {
                self.merge_fields(incoming, $crate::pipeline::merge::Level::Nested);
            }
        }
    )*};
}

mod schema;

pub use schema::*;

// ── Lenient numbers ──────────────────────────────────────────────────────

/// Whole number that also accepts `18.0` and `"18"` from model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(pub i64);

/// Real number that also accepts numeric strings from model output.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Number(pub f64);

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let parsed = match &raw {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Integer)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, got {raw}")))
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let parsed = match &raw {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|f| f.is_finite())
            .map(Number)
            .ok_or_else(|| D::Error::custom(format!("expected a number, got {raw}")))
    }
}

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl JsonSchema for Integer {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        i64::schema_name()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        i64::json_schema(gen)
    }
}

impl JsonSchema for Number {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        f64::schema_name()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        f64::json_schema(gen)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ExtractionRecord {
    /// JSON schema of the record, embedded in the extraction system prompt.
    pub fn json_schema_string() -> String {
        let schema = schemars::schema_for!(ExtractionRecord);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }

    /// The model's self-reported confidence, clamped to `0.0..=1.0`.
    pub fn confidence(&self) -> Option<f64> {
        self.extraction_confidence
            .value()
            .map(|c| c.0.clamp(0.0, 1.0))
    }

    pub fn is_empty(&self) -> bool {
        self.populated_fields() == 0
    }
}
