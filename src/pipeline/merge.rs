//! Presence-aware deep merge of partial extraction results.
//!
//! Each chunk returns a [`PartialResult`](crate::pipeline::invoke::PartialResult) that
//! only knows about the pages it saw. Merging folds it into the running
//! accumulator with these rules, applied per field:
//!
//! | accumulator | incoming        | result                              |
//! |-------------|-----------------|-------------------------------------|
//! | any         | absent          | unchanged                           |
//! | value       | null            | unchanged                           |
//! | absent/null | value           | incoming value, verbatim            |
//! | object      | object          | recurse one level down              |
//! | list        | non-empty list  | incoming list replaces the old one  |
//! | list        | empty list      | unchanged                           |
//! | scalar      | scalar          | incoming scalar                     |
//! | absent      | null (nested)   | explicit null recorded              |
//! | absent      | null (top)      | stays absent                        |
//!
//! Lists are replaced wholesale, never appended. The model receives the
//! accumulator in its prompt and is asked to return the complete updated
//! list, so concatenation would duplicate entries.

use crate::field::Field;
use crate::record::{ExtractionRecord, Integer, Number};

/// Depth of the field being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// A field of [`ExtractionRecord`] itself.
    Top,
    /// A field of a nested object.
    Nested,
}

/// How a present value absorbs an incoming value of the same type.
pub trait MergeValue: Clone {
    fn merge_value(&mut self, incoming: &Self);
}

macro_rules! overwrite_scalars {
    ($($t:ty),*) => {$(
        impl MergeValue for $t {
            fn merge_value(&mut self, incoming: &Self) {
                *self = incoming.clone();
            }
        }
    )*};
}

overwrite_scalars!(String, bool, Integer, Number);

impl<T: Clone> MergeValue for Vec<T> {
    fn merge_value(&mut self, incoming: &Self) {
        if !incoming.is_empty() {
            *self = incoming.clone();
        }
    }
}

impl<T: MergeValue> Field<T> {
    /// Fold `incoming` into `self`. `incoming` is never modified.
    pub fn merge_from(&mut self, incoming: &Field<T>, level: Level) {
        match incoming {
            Field::Absent => {}
            Field::Null => {
                if level == Level::Nested && self.is_absent() {
                    *self = Field::Null;
                }
            }
            Field::Value(new) => match self {
                Field::Value(current) => current.merge_value(new),
                _ => *self = Field::Value(new.clone()),
            },
        }
    }
}

/// Merge `partial` into a copy of `accumulator`.
pub fn merge(accumulator: &ExtractionRecord, partial: &ExtractionRecord) -> ExtractionRecord {
    let mut merged = accumulator.clone();
    merge_into(&mut merged, partial);
    merged
}

/// In-place form of [`merge`], used by the chunk loop.
pub fn merge_into(accumulator: &mut ExtractionRecord, partial: &ExtractionRecord) {
    accumulator.merge_fields(partial, Level::Top);
}
