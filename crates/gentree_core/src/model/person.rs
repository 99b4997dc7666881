//! Person domain model and boundary normalization.
//!
//! # Responsibility
//! - Define the canonical in-memory person record shared by the projection,
//!   the GEDCOM codec and the import pipeline.
//! - Normalize the duck-typed JSON person shape exactly once, at the
//!   boundary.
//!
//! # Invariants
//! - `id` is caller-assigned, trimmed and never blank.
//! - `data`/`extras` are preserved verbatim so a projected person can be
//!   round-tripped back into the canonical document.
//! - Relationship lists hold bare ids; `{ "id": ... }` objects are unwrapped
//!   during normalization.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Conventional attribute keys used by the tree document.
pub const FIELD_FIRST_NAME: &str = "first name";
pub const FIELD_LAST_NAME: &str = "last name";
pub const FIELD_BIRTHDAY: &str = "birthday";
pub const FIELD_GENDER: &str = "gender";
pub const FIELD_DEATH: &str = "death";
pub const FIELD_BIRTHPLACE: &str = "birthplace";
pub const FIELD_DEATHPLACE: &str = "deathplace";
pub const FIELD_OCCUPATION: &str = "occupation";
pub const FIELD_NOTE: &str = "note";
pub const FIELD_NAME: &str = "name";

/// Parent/child/spouse adjacency declared on a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rels {
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub spouses: Vec<String>,
}

impl Rels {
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty() && self.spouses.is_empty()
    }
}

/// Canonical person record.
///
/// `data` carries the free-form attribute map (names, dates, anything the
/// editor stored); `extras` carries unrecognized top-level keys. Both are
/// opaque to the relational projection and survive rebuilds unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub rels: Rels,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl Person {
    /// Creates an empty person with the given id.
    ///
    /// Callers are expected to pass a non-blank id; boundary input goes
    /// through [`Person::from_value`] instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Normalizes one raw JSON person into the typed record.
    ///
    /// Returns `None` when the value is not an object or carries a
    /// missing/blank id; such entries are dropped silently by the
    /// projection.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }

        let data = object
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let rels_value = object.get("rels").and_then(Value::as_object);
        let rels = Rels {
            parents: collect_rel_ids(rels_value, "parents"),
            children: collect_rel_ids(rels_value, "children"),
            spouses: collect_rel_ids(rels_value, "spouses"),
        };

        let mut extras = Map::new();
        for (key, entry) in object {
            if key == "id" || key == "data" || key == "rels" {
                continue;
            }
            extras.insert(key.clone(), entry.clone());
        }

        Some(Self {
            id: id.to_string(),
            data,
            rels,
            extras,
        })
    }

    /// Rebuilds the canonical JSON shape, extras spliced back at top level.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object.insert("data".to_string(), Value::Object(self.data.clone()));
        object.insert(
            "rels".to_string(),
            json!({
                "parents": self.rels.parents,
                "children": self.rels.children,
                "spouses": self.rels.spouses,
            }),
        );
        for (key, entry) in &self.extras {
            object.entry(key.clone()).or_insert_with(|| entry.clone());
        }
        Value::Object(object)
    }

    /// Serialized opaque metadata persisted in the `persons` table.
    pub fn metadata_json(&self) -> DbMetadata {
        DbMetadata {
            data: &self.data,
            rels: &self.rels,
            extras: &self.extras,
        }
    }

    pub fn given_name(&self) -> Option<&str> {
        self.data_str(FIELD_FIRST_NAME)
    }

    pub fn family_name(&self) -> Option<&str> {
        self.data_str(FIELD_LAST_NAME)
    }

    pub fn birth_date(&self) -> Option<&str> {
        self.data_str(FIELD_BIRTHDAY)
    }

    pub fn gender(&self) -> Option<&str> {
        self.data_str(FIELD_GENDER)
    }

    /// Returns a string-typed attribute from the free-form map.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Stores a string attribute in the free-form map.
    pub fn set_data(&mut self, key: &str, value: impl Into<String>) {
        self.data
            .insert(key.to_string(), Value::String(value.into()));
    }

    /// Parent→child pairs declared by this person, in declaration order.
    ///
    /// Both directions are collected: declared parents produce
    /// `(parent, self)` and declared children produce `(self, child)`.
    /// Endpoint existence is the projection's concern, not the model's.
    pub fn relationship_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.rels.parents.len() + self.rels.children.len());
        for parent in &self.rels.parents {
            pairs.push((parent.clone(), self.id.clone()));
        }
        for child in &self.rels.children {
            pairs.push((self.id.clone(), child.clone()));
        }
        pairs
    }
}

/// Opaque metadata blob shape stored per person row.
#[derive(Debug, Serialize)]
pub struct DbMetadata<'a> {
    pub data: &'a Map<String, Value>,
    pub rels: &'a Rels,
    pub extras: &'a Map<String, Value>,
}

fn collect_rel_ids(rels: Option<&Map<String, Value>>, key: &str) -> Vec<String> {
    let Some(entries) = rels.and_then(|map| map.get(key)).and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = match entry {
            Value::String(text) => text.trim(),
            Value::Object(object) => object
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or(""),
            _ => "",
        };
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_accepts_bare_and_object_rel_refs() {
        let person = Person::from_value(&json!({
            "id": " A ",
            "data": { "first name": "Ann" },
            "rels": {
                "parents": ["P1", { "id": "P2" }, "", 42],
                "children": [{ "id": " C1 " }],
            },
        }))
        .expect("person should normalize");

        assert_eq!(person.id, "A");
        assert_eq!(person.rels.parents, vec!["P1", "P2"]);
        assert_eq!(person.rels.children, vec!["C1"]);
        assert!(person.rels.spouses.is_empty());
    }

    #[test]
    fn from_value_rejects_blank_or_missing_id() {
        assert!(Person::from_value(&json!({ "id": "  " })).is_none());
        assert!(Person::from_value(&json!({ "data": {} })).is_none());
        assert!(Person::from_value(&json!("not an object")).is_none());
    }

    #[test]
    fn extras_round_trip_through_to_value() {
        let raw = json!({
            "id": "A",
            "data": { "last name": "Doe" },
            "rels": { "parents": [], "children": [], "spouses": [] },
            "main": true,
        });
        let person = Person::from_value(&raw).expect("person should normalize");
        assert_eq!(person.extras.get("main"), Some(&json!(true)));
        assert_eq!(person.to_value(), raw);
    }

    #[test]
    fn relationship_pairs_cover_both_directions() {
        let person = Person::from_value(&json!({
            "id": "B",
            "rels": { "parents": ["A"], "children": ["C"] },
        }))
        .expect("person should normalize");

        assert_eq!(
            person.relationship_pairs(),
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
    }
}
