//! Tri-state field presence.
//!
//! A model response distinguishes three situations for every key: the key was
//! never mentioned, the key was present with `null` ("looked for, not found"),
//! or the key carries a value. `Option<T>` collapses the first two, which
//! would let a chunk that never looked at a field erase what an earlier chunk
//! found. [`Field`] keeps them apart.
//!
//! Serde wiring: struct fields are declared with
//! `#[serde(default, skip_serializing_if = "Field::is_absent")]`, so a missing
//! key deserialises to [`Field::Absent`] and an absent field is omitted on
//! output. A present key goes through `Option<T>`, which maps `null` to
//! [`Field::Null`].

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Key not present in the source object.
    Absent,
    /// Key present with an explicit `null`.
    Null,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn has_value(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Value(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::Null | Field::Absent => serializer.serialize_none(),
        }
    }
}

// The schema sent to the model is the nullable schema of `T`; presence is a
// property of the parsed document, not of the contract.
impl<T: JsonSchema> JsonSchema for Field<T> {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        Option::<T>::schema_name()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        Option::<T>::json_schema(gen)
    }
}
