//! GEDCOM text generator.
//!
//! # Responsibility
//! - Emit GEDCOM 5.5.1 text from typed persons, resolving all family
//!   groupings before any record is written so each individual's
//!   FAMC/FAMS links appear ahead of the family record they reference.
//!
//! # Invariants
//! - Family membership is keyed by the sorted set of a child's declared
//!   parent ids: siblings sharing a parent pair land in one family unit
//!   regardless of input order; sole-parent families are permitted.
//! - Declared spouse pairs without shared children still get a family
//!   record, so spousal links survive a parse/generate round trip.
//! - The HUSB slot prefers gender `M` and WIFE prefers `F`; an untyped or
//!   same-gender co-parent takes whichever slot is free, husband first.

use crate::model::person::{
    Person, FIELD_BIRTHPLACE, FIELD_DEATH, FIELD_DEATHPLACE, FIELD_NOTE, FIELD_OCCUPATION,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const HEADER: &str = "0 HEAD\n1 SOUR gentree\n1 GEDC\n2 VERS 5.5.1\n2 FORM LINEAGE-LINKED\n1 CHAR UTF-8\n";
const TRAILER: &str = "0 TRLR\n";

/// Generates GEDCOM text for the person graph.
pub fn generate_gedcom(persons: &[Person]) -> String {
    let known: HashMap<&str, &Person> = persons
        .iter()
        .map(|person| (person.id.as_str(), person))
        .collect();
    let xrefs = build_xref_map(persons);
    let families = build_family_groups(persons, &known);

    // Per-person family links, resolved before any record is emitted.
    let mut child_of: HashMap<&str, &str> = HashMap::new();
    let mut spouse_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for family in &families {
        for child in &family.children {
            child_of.entry(child.as_str()).or_insert(&family.xref);
        }
        for parent in &family.parents {
            spouse_of
                .entry(parent.as_str())
                .or_default()
                .push(&family.xref);
        }
    }

    let mut output = String::from(HEADER);
    for person in persons {
        emit_individual(&mut output, person, &xrefs, &child_of, &spouse_of);
    }
    for family in &families {
        emit_family(&mut output, family, &known, &xrefs);
    }
    output.push_str(TRAILER);
    output
}

struct FamilyGroup {
    xref: String,
    /// Sorted, deduplicated parent ids; one or two entries.
    parents: Vec<String>,
    children: Vec<String>,
}

/// Reconciles the flat per-person edge lists into family units.
fn build_family_groups(persons: &[Person], known: &HashMap<&str, &Person>) -> Vec<FamilyGroup> {
    // BTreeMap keys give a deterministic family numbering.
    let mut children_by_parents: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();

    for person in persons {
        let mut parents: Vec<String> = person
            .rels
            .parents
            .iter()
            .filter(|id| known.contains_key(id.as_str()))
            .cloned()
            .collect();
        parents.sort();
        parents.dedup();
        if parents.is_empty() {
            continue;
        }
        children_by_parents
            .entry(parents)
            .or_default()
            .push(person.id.clone());
    }

    // Childless declared-spouse pairs still form a family unit; without it
    // the spousal link would be unrecoverable from the generated text.
    for person in persons {
        for spouse in &person.rels.spouses {
            if spouse == &person.id || !known.contains_key(spouse.as_str()) {
                continue;
            }
            let mut key = vec![person.id.clone(), spouse.clone()];
            key.sort();
            children_by_parents.entry(key).or_default();
        }
    }

    children_by_parents
        .into_iter()
        .enumerate()
        .map(|(index, (parents, children))| FamilyGroup {
            xref: format!("@F{}@", index + 1),
            parents,
            children,
        })
        .collect()
}

/// Maps person ids to GEDCOM cross-references, synthesizing one when an id
/// has no usable characters.
fn build_xref_map(persons: &[Person]) -> HashMap<String, String> {
    let mut xrefs = HashMap::with_capacity(persons.len());
    for person in persons {
        let cleaned: String = person
            .id
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect();
        let xref = if cleaned.is_empty() {
            format!("@I{}@", Uuid::new_v4().simple())
        } else {
            format!("@{cleaned}@")
        };
        xrefs.insert(person.id.clone(), xref);
    }
    xrefs
}

fn emit_individual(
    output: &mut String,
    person: &Person,
    xrefs: &HashMap<String, String>,
    child_of: &HashMap<&str, &str>,
    spouse_of: &HashMap<&str, Vec<&str>>,
) {
    let Some(xref) = xrefs.get(&person.id) else {
        return;
    };
    output.push_str(&format!("0 {xref} INDI\n"));

    let first = person.given_name().unwrap_or_default();
    let last = person.family_name().unwrap_or_default();
    if !first.is_empty() || !last.is_empty() {
        output.push_str(&format!("1 NAME {first} /{last}/\n"));
        if !first.is_empty() {
            output.push_str(&format!("2 GIVN {first}\n"));
        }
        if !last.is_empty() {
            output.push_str(&format!("2 SURN {last}\n"));
        }
    }

    if let Some(gender) = person.gender() {
        output.push_str(&format!("1 SEX {gender}\n"));
    }

    emit_event(
        output,
        "BIRT",
        person.birth_date(),
        person.data_str(FIELD_BIRTHPLACE),
    );
    emit_event(
        output,
        "DEAT",
        person.data_str(FIELD_DEATH),
        person.data_str(FIELD_DEATHPLACE),
    );

    if let Some(occupation) = person.data_str(FIELD_OCCUPATION) {
        output.push_str(&format!("1 OCCU {occupation}\n"));
    }
    if let Some(note) = person.data_str(FIELD_NOTE) {
        let single_line = note.replace('\n', " ");
        output.push_str(&format!("1 NOTE {single_line}\n"));
    }

    if let Some(family_xref) = child_of.get(person.id.as_str()) {
        output.push_str(&format!("1 FAMC {family_xref}\n"));
    }
    if let Some(family_xrefs) = spouse_of.get(person.id.as_str()) {
        for family_xref in family_xrefs {
            output.push_str(&format!("1 FAMS {family_xref}\n"));
        }
    }
}

fn emit_event(output: &mut String, tag: &str, date: Option<&str>, place: Option<&str>) {
    if date.is_none() && place.is_none() {
        return;
    }
    output.push_str(&format!("1 {tag}\n"));
    if let Some(date) = date {
        output.push_str(&format!("2 DATE {date}\n"));
    }
    if let Some(place) = place {
        output.push_str(&format!("2 PLAC {place}\n"));
    }
}

fn emit_family(
    output: &mut String,
    family: &FamilyGroup,
    known: &HashMap<&str, &Person>,
    xrefs: &HashMap<String, String>,
) {
    output.push_str(&format!("0 {} FAM\n", family.xref));

    let (husband, wife) = assign_parent_slots(&family.parents, known);
    if let Some(id) = husband {
        if let Some(xref) = xrefs.get(id) {
            output.push_str(&format!("1 HUSB {xref}\n"));
        }
    }
    if let Some(id) = wife {
        if let Some(xref) = xrefs.get(id) {
            output.push_str(&format!("1 WIFE {xref}\n"));
        }
    }
    for child in &family.children {
        if let Some(xref) = xrefs.get(child) {
            output.push_str(&format!("1 CHIL {xref}\n"));
        }
    }
}

/// Assigns parents to the HUSB/WIFE slots.
///
/// Gender `M` claims the husband slot and `F` the wife slot; whoever is
/// left takes the free slot, husband first when both remain free.
fn assign_parent_slots<'a>(
    parents: &'a [String],
    known: &HashMap<&str, &Person>,
) -> (Option<&'a str>, Option<&'a str>) {
    let mut husband: Option<&str> = None;
    let mut wife: Option<&str> = None;
    let mut unassigned: Vec<&str> = Vec::new();

    for id in parents {
        let gender = known.get(id.as_str()).and_then(|person| person.gender());
        match gender {
            Some("M") if husband.is_none() => husband = Some(id),
            Some("F") if wife.is_none() => wife = Some(id),
            _ => unassigned.push(id),
        }
    }
    for id in unassigned {
        if husband.is_none() {
            husband = Some(id);
        } else if wife.is_none() {
            wife = Some(id);
        }
    }

    (husband, wife)
}
