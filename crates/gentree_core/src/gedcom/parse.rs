//! GEDCOM text parser.
//!
//! # Responsibility
//! - Turn GEDCOM text into typed persons: three passes (record grouping,
//!   INDI attribute extraction, FAM relationship linking) plus a final
//!   referential-integrity filter.
//!
//! # Invariants
//! - Lines failing the grammar are skipped without error; malformed input
//!   degrades to partial data.
//! - Spouses are inferred by co-parenthood: a HUSB/WIFE pair of the same
//!   family become mutual spouses even when the relational projection
//!   never stores that edge.
//! - No returned person references an id that was not parsed.

use crate::gedcom::line::{parse_line, strip_xref, GedcomLine};
use crate::model::person::{
    Person, FIELD_BIRTHDAY, FIELD_BIRTHPLACE, FIELD_DEATH, FIELD_DEATHPLACE, FIELD_FIRST_NAME,
    FIELD_GENDER, FIELD_LAST_NAME, FIELD_NAME, FIELD_NOTE, FIELD_OCCUPATION,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Indi,
    Fam,
}

struct RawRecord {
    id: String,
    kind: RecordKind,
    attributes: Vec<GedcomLine>,
}

/// Parses GEDCOM text into typed persons with linked relationships.
pub fn parse_gedcom(text: &str) -> Vec<Person> {
    let records = group_records(text);

    let mut persons: Vec<Person> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records.iter().filter(|r| r.kind == RecordKind::Indi) {
        if index.contains_key(&record.id) {
            continue;
        }
        let person = extract_individual(record);
        index.insert(person.id.clone(), persons.len());
        persons.push(person);
    }

    for record in records.iter().filter(|r| r.kind == RecordKind::Fam) {
        link_family(record, &mut persons, &index);
    }

    enforce_referential_integrity(&mut persons, &index);
    persons
}

/// Pass 1: group raw lines into top-level records by level-0 boundaries.
fn group_records(text: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut current: Option<RawRecord> = None;

    for raw in text.lines() {
        let Some(line) = parse_line(raw) else {
            continue;
        };

        if line.level == 0 {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let kind = if line.value.contains("INDI") {
                Some(RecordKind::Indi)
            } else if line.value.contains("FAM") {
                Some(RecordKind::Fam)
            } else {
                None
            };
            current = kind.map(|kind| RawRecord {
                id: strip_xref(&line.tag),
                kind,
                attributes: Vec::new(),
            });
        } else if let Some(record) = current.as_mut() {
            record.attributes.push(line);
        }
    }

    if let Some(record) = current.take() {
        records.push(record);
    }
    records
}

/// Pass 2: extract structured fields from one INDI record.
fn extract_individual(record: &RawRecord) -> Person {
    let mut person = Person::new(record.id.clone());
    let mut context: Option<&str> = None;

    for line in &record.attributes {
        if line.level == 1 {
            context = Some(line.tag.as_str());
            match line.tag.as_str() {
                "NAME" => {
                    let cleaned = line.value.replace('/', "");
                    let mut parts = cleaned.split_whitespace();
                    if let Some(first) = parts.next() {
                        person.set_data(FIELD_FIRST_NAME, first);
                    }
                    let rest = parts.collect::<Vec<_>>().join(" ");
                    if !rest.is_empty() {
                        person.set_data(FIELD_LAST_NAME, rest);
                    }
                    person.set_data(FIELD_NAME, cleaned.trim());
                }
                "SEX" => {
                    let gender = if line.value == "M" { "M" } else { "F" };
                    person.set_data(FIELD_GENDER, gender);
                }
                "OCCU" => person.set_data(FIELD_OCCUPATION, line.value.clone()),
                "NOTE" => person.set_data(FIELD_NOTE, line.value.clone()),
                _ => {}
            }
        } else if line.level == 2 {
            match (context, line.tag.as_str()) {
                (Some("BIRT"), "DATE") => person.set_data(FIELD_BIRTHDAY, line.value.clone()),
                (Some("BIRT"), "PLAC") => person.set_data(FIELD_BIRTHPLACE, line.value.clone()),
                (Some("DEAT"), "DATE") => person.set_data(FIELD_DEATH, line.value.clone()),
                (Some("DEAT"), "PLAC") => person.set_data(FIELD_DEATHPLACE, line.value.clone()),
                (Some("NOTE"), "CONT") => append_note(&mut person, &line.value, " "),
                (Some("NOTE"), "CONC") => append_note(&mut person, &line.value, ""),
                _ => {}
            }
        }
    }

    person
}

fn append_note(person: &mut Person, value: &str, separator: &str) {
    let note = person
        .data_str(FIELD_NOTE)
        .map(|existing| format!("{existing}{separator}{value}"))
        .unwrap_or_else(|| value.to_string());
    person.set_data(FIELD_NOTE, note);
}

/// Pass 3: attach parent/child links from one FAM record and make the two
/// co-parents mutual spouses.
fn link_family(record: &RawRecord, persons: &mut [Person], index: &HashMap<String, usize>) {
    let mut husband: Option<String> = None;
    let mut wife: Option<String> = None;
    let mut children: Vec<String> = Vec::new();
    for line in &record.attributes {
        match line.tag.as_str() {
            "HUSB" => husband = Some(strip_xref(&line.value)),
            "WIFE" => wife = Some(strip_xref(&line.value)),
            "CHIL" => children.push(strip_xref(&line.value)),
            _ => {}
        }
    }

    let father = husband.filter(|id| index.contains_key(id));
    let mother = wife.filter(|id| index.contains_key(id));

    if let (Some(father_id), Some(mother_id)) = (father.as_ref(), mother.as_ref()) {
        push_unique(&mut persons[index[father_id]].rels.spouses, mother_id);
        push_unique(&mut persons[index[mother_id]].rels.spouses, father_id);
    }

    for child_id in &children {
        let Some(&child_index) = index.get(child_id) else {
            continue;
        };
        for parent_id in [father.as_ref(), mother.as_ref()].into_iter().flatten() {
            push_unique(&mut persons[child_index].rels.parents, parent_id);
            push_unique(&mut persons[index[parent_id]].rels.children, child_id);
        }
    }
}

/// Final pass: drop relationship ids that name no parsed person.
fn enforce_referential_integrity(persons: &mut [Person], index: &HashMap<String, usize>) {
    for person in persons {
        person.rels.parents.retain(|id| index.contains_key(id));
        person.rels.children.retain(|id| index.contains_key(id));
        person.rels.spouses.retain(|id| index.contains_key(id));
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}
