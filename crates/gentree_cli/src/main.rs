//! CLI entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to drive the core store: dataset info,
//!   GEDCOM file import/export and text search.
//! - Keep output deterministic for quick local sanity checks.

use gentree_core::{ImportOptions, PersonRepository, SearchQuery, TreeService};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("gentree: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (db_path, command, rest) = match args {
        [] => {
            println!("gentree_core version={}", gentree_core::core_version());
            println!("usage: gentree_cli <db-path> info|import|export|search [args]");
            return Ok(());
        }
        [db_path, command, rest @ ..] => (db_path, command.as_str(), rest),
        [_] => return Err("missing command; expected info|import|export|search".to_string()),
    };

    let mut service = TreeService::open(db_path).map_err(|err| err.to_string())?;

    match command {
        "info" => {
            let count = service
                .persons()
                .count_persons()
                .map_err(|err| err.to_string())?;
            let updated_at = service
                .last_updated_at()
                .map_err(|err| err.to_string())?
                .unwrap_or_else(|| "never".to_string());
            println!("persons={count} updated_at={updated_at} search={}",
                service.store().search_enabled());
        }
        "import" => {
            let [file_path] = rest else {
                return Err("usage: import <file.ged>".to_string());
            };
            let file = File::open(file_path).map_err(|err| err.to_string())?;
            let outcome = service
                .import_gedcom(BufReader::new(file), ImportOptions::default())
                .map_err(|err| err.to_string())?;
            println!(
                "imported persons={} relationships={}",
                outcome.persons, outcome.relationships
            );
        }
        "export" => {
            let text = service.export_gedcom().map_err(|err| err.to_string())?;
            print!("{text}");
        }
        "search" => {
            let [text] = rest else {
                return Err("usage: search <text>".to_string());
            };
            let hits = service
                .search(&SearchQuery::new(text.as_str()))
                .map_err(|err| err.to_string())?;
            for hit in hits {
                println!(
                    "{}\t{} {}",
                    hit.id,
                    hit.given_name.unwrap_or_default(),
                    hit.family_name.unwrap_or_default()
                );
            }
        }
        other => return Err(format!("unknown command `{other}`")),
    }

    service.close();
    Ok(())
}
