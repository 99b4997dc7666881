//! Streaming GEDCOM importer.
//!
//! # Responsibility
//! - Read a GEDCOM source line by line and feed the import buffer without
//!   materializing the whole file as a JSON tree first.
//!
//! # Invariants
//! - Memory is bounded by one in-flight record plus the buffer's
//!   relationship dedup set.
//! - The birth/death event context is explicit state, reset on every
//!   level-1 tag, so a stray `DATE` after an unrelated tag is never
//!   misattributed.
//! - Lines failing the grammar are skipped without error.

use crate::gedcom::line::{parse_line, strip_xref, GedcomLine};
use crate::import::{ImportBuffer, ImportResult};
use crate::model::person::{
    Person, FIELD_BIRTHDAY, FIELD_DEATH, FIELD_FIRST_NAME, FIELD_GENDER, FIELD_LAST_NAME,
    FIELD_NAME, FIELD_OCCUPATION,
};
use log::info;
use std::io::BufRead;

/// Counters describing one streaming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub persons: usize,
    /// Unique pairs queued; duplicates across family records count once.
    pub relationship_pairs: usize,
}

/// Which level-1 event a following `DATE` line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventContext {
    None,
    Birth,
    Death,
}

enum PendingRecord {
    Indi {
        person: Person,
        context: EventContext,
    },
    Fam {
        husband: Option<String>,
        wife: Option<String>,
        children: Vec<String>,
    },
}

/// Streams GEDCOM lines into the import buffer.
///
/// Persons flush as records close; relationship pairs queue in the buffer
/// and hit storage only at `commit`, after every person is present.
pub fn ingest_gedcom<R: BufRead>(
    reader: R,
    buffer: &mut ImportBuffer<'_>,
) -> ImportResult<IngestSummary> {
    let mut current: Option<PendingRecord> = None;
    let mut summary = IngestSummary::default();

    for line_result in reader.lines() {
        let raw = line_result?;
        let Some(line) = parse_line(&raw) else {
            continue;
        };

        if line.level == 0 {
            flush_record(current.take(), buffer, &mut summary)?;
            current = open_record(&line);
        } else if let Some(record) = current.as_mut() {
            apply_line(record, &line);
        }
    }

    flush_record(current.take(), buffer, &mut summary)?;
    info!(
        "event=gedcom_ingest module=import status=ok persons={} pairs={}",
        summary.persons, summary.relationship_pairs
    );
    Ok(summary)
}

fn open_record(line: &GedcomLine) -> Option<PendingRecord> {
    if line.value.contains("INDI") {
        Some(PendingRecord::Indi {
            person: Person::new(strip_xref(&line.tag)),
            context: EventContext::None,
        })
    } else if line.value.contains("FAM") {
        Some(PendingRecord::Fam {
            husband: None,
            wife: None,
            children: Vec::new(),
        })
    } else {
        // HEAD, TRLR, submitter records and the like accumulate nothing.
        None
    }
}

fn apply_line(record: &mut PendingRecord, line: &GedcomLine) {
    match record {
        PendingRecord::Indi { person, context } => {
            if line.level == 1 {
                *context = EventContext::None;
                match line.tag.as_str() {
                    "NAME" => apply_name(person, &line.value),
                    "SEX" => person.set_data(FIELD_GENDER, line.value.clone()),
                    "OCCU" => person.set_data(FIELD_OCCUPATION, line.value.clone()),
                    "BIRT" => *context = EventContext::Birth,
                    "DEAT" => *context = EventContext::Death,
                    _ => {}
                }
            } else if line.tag == "DATE" {
                match context {
                    EventContext::Birth => person.set_data(FIELD_BIRTHDAY, line.value.clone()),
                    EventContext::Death => person.set_data(FIELD_DEATH, line.value.clone()),
                    EventContext::None => {}
                }
            }
        }
        PendingRecord::Fam {
            husband,
            wife,
            children,
        } => match line.tag.as_str() {
            "HUSB" => *husband = Some(strip_xref(&line.value)),
            "WIFE" => *wife = Some(strip_xref(&line.value)),
            "CHIL" => children.push(strip_xref(&line.value)),
            _ => {}
        },
    }
}

fn apply_name(person: &mut Person, value: &str) {
    let cleaned = value.replace('/', "");
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

fn flush_record(
    record: Option<PendingRecord>,
    buffer: &mut ImportBuffer<'_>,
    summary: &mut IngestSummary,
) -> ImportResult<()> {
    match record {
        Some(PendingRecord::Indi { person, .. }) => {
            buffer.add_person(person)?;
            summary.persons += 1;
        }
        Some(PendingRecord::Fam {
            husband,
            wife,
            children,
        }) => {
            for parent in [husband, wife].into_iter().flatten() {
                for child in &children {
                    if buffer.add_relationship(&parent, child) {
                        summary.relationship_pairs += 1;
                    }
                }
            }
        }
        None => {}
    }
    Ok(())
}
