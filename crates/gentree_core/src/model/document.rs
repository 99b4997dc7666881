//! Dataset document shape and legacy-payload normalization.
//!
//! # Responsibility
//! - Define the `{ data, config, meta }` document persisted as the source
//!   of truth.
//! - Normalize every accepted legacy shape (bare array, `tree` key) exactly
//!   once, at the storage boundary.
//!
//! # Invariants
//! - Unrecognized top-level shapes normalize to an empty dataset rather
//!   than failing the caller.

use crate::model::person::Person;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical dataset document: the person array plus opaque editor state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub data: Vec<Value>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Document {
    /// Normalizes an arbitrary JSON payload into the canonical shape.
    ///
    /// Accepted inputs: a bare person array, an object with `data`, or an
    /// object with the legacy `tree` key. Anything else is treated as an
    /// empty dataset.
    pub fn normalize(payload: &Value) -> Self {
        if let Some(items) = payload.as_array() {
            return Self {
                data: items.clone(),
                ..Self::default()
            };
        }

        if let Some(object) = payload.as_object() {
            let data = object
                .get("data")
                .or_else(|| object.get("tree"))
                .and_then(Value::as_array);
            if let Some(items) = data {
                return Self {
                    data: items.clone(),
                    config: object
                        .get("config")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                    meta: object
                        .get("meta")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                };
            }
        }

        Self::default()
    }

    /// Builds a document from typed persons, e.g. after a GEDCOM parse.
    pub fn from_persons(persons: &[Person]) -> Self {
        Self {
            data: persons.iter().map(Person::to_value).collect(),
            ..Self::default()
        }
    }

    /// Typed persons, dropping entries that fail id normalization.
    pub fn persons(&self) -> Vec<Person> {
        self.data.iter().filter_map(Person::from_value).collect()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "data": self.data,
            "config": self.config,
            "meta": self.meta,
        })
    }
}
