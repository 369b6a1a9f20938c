//! `tdk listing import` - Bulk-load listings from a CSV file

use console::style;
use csv::{ReaderBuilder, StringRecord};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{load_directory, open_session, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::ModerationEngine;
use crate::entities::{ListingData, NewListing};
use crate::schema::{form, SchemaModel};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Directory ID
    pub directory: String,

    /// CSV file to import (header row names the fields)
    pub file: Option<PathBuf>,

    /// Print a CSV header row for the directory's schema
    #[arg(long)]
    pub template: bool,

    /// Validate CSV without creating listings
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,
}

/// Import statistics
#[derive(Debug, Default)]
struct ImportStats {
    rows_processed: usize,
    listings_created: usize,
    errors: usize,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let dir = load_directory(&session.store, &args.directory)?;

    if args.template {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        writer.write_record(dir.schema.field_order()).into_diagnostic()?;
        writer.flush().into_diagnostic()?;
        return Ok(());
    }

    let file_path = args.file.clone().ok_or_else(|| {
        miette::miette!("CSV file required. Usage: tdk listing import <DIR> data.csv")
    })?;
    if !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    println!(
        "{} Importing listings into {} from {}{}",
        style("→").blue(),
        style(&dir.name).cyan(),
        style(file_path.display()).yellow(),
        if args.dry_run {
            style(" (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );
    println!();

    let file = File::open(&file_path).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();
    let columns = map_headers(&dir.schema, &headers);

    let author = session.config.author();
    let status = ModerationEngine::new(session.config.auto_approve.clone()).initial_status(&author);
    let mut stats = ImportStats::default();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // +2 for 1-indexed and header row
        stats.rows_processed += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{} Row {}: CSV parse error: {}", style("✗").red(), row_num, e);
                stats.errors += 1;
                if !args.skip_errors {
                    return Err(miette::miette!("CSV parse error at row {}: {}", row_num, e));
                }
                continue;
            }
        };

        let values = row_values(&dir.schema, &columns, &record);
        let problems = form::validate(&dir.schema, &values);
        if !problems.is_empty() {
            let messages: Vec<&str> = problems.iter().map(|p| p.message.as_str()).collect();
            eprintln!(
                "{} Row {}: {}",
                style("✗").red(),
                row_num,
                messages.join("; ")
            );
            stats.errors += 1;
            if !args.skip_errors {
                return Err(miette::miette!(
                    "Row {}: {} required field(s) missing",
                    row_num,
                    problems.len()
                ));
            }
            continue;
        }

        let label = row_label(&values);
        if args.dry_run {
            println!(
                "{} Row {}: Would create listing - {}",
                style("○").dim(),
                row_num,
                truncate_str(&label, 40)
            );
            continue;
        }

        let id = session.store.insert_listing(&NewListing {
            directory_id: dir.id.clone(),
            data: form::prepare_for_storage(values),
            status,
        })?;
        println!(
            "{} Row {}: Created {} - {}",
            style("✓").green(),
            row_num,
            style(&id).cyan(),
            truncate_str(&label, 40)
        );
        stats.listings_created += 1;
    }

    tracing::info!(
        directory = %dir.id,
        rows = stats.rows_processed,
        created = stats.listings_created,
        errors = stats.errors,
        "import finished"
    );

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed:   {}", style(stats.rows_processed).cyan());
    println!("  Listings created: {}", style(stats.listings_created).green());
    if stats.errors > 0 {
        println!("  Errors:           {}", style(stats.errors).red());
    }

    if args.dry_run {
        println!();
        println!("{}", style("Dry run complete. No listings were created.").yellow());
    }

    if stats.errors > 0 && !args.skip_errors {
        return Err(miette::miette!("Import completed with {} error(s)", stats.errors));
    }

    Ok(())
}

/// Resolve each CSV column to a field key
///
/// Tries the exact key, then the key ignoring case, then the field title.
/// Headers matching nothing are kept under their own name.
fn map_headers(schema: &SchemaModel, headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            let header = header.trim();
            if schema.field(header).is_some() {
                return header.to_string();
            }
            let lower = header.to_lowercase();
            schema
                .fields()
                .iter()
                .find(|f| f.key.to_lowercase() == lower)
                .or_else(|| {
                    schema
                        .fields()
                        .iter()
                        .find(|f| f.title.to_lowercase() == lower)
                })
                .map(|f| f.key.clone())
                .unwrap_or_else(|| header.to_string())
        })
        .collect()
}

/// Build listing data from one row; empty cells are left out
fn row_values(schema: &SchemaModel, columns: &[String], record: &StringRecord) -> ListingData {
    let mut values = ListingData::new();
    for (key, cell) in columns.iter().zip(record.iter()) {
        if key.is_empty() || cell.is_empty() {
            continue;
        }
        values.insert(key.clone(), form::coerce_for(schema, key, cell));
    }
    values
}

fn row_label(values: &ListingData) -> String {
    values
        .values()
        .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
        .unwrap_or("(untitled)")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn schema() -> SchemaModel {
        SchemaModel::parse(&json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "title": "Organization Name"},
                "website": {"type": "string", "format": "uri"},
                "remote": {"type": "boolean", "title": "Remote friendly"}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[test]
    fn test_map_headers_by_key_case_and_title() {
        let headers = StringRecord::from(vec!["name", "WEBSITE", "Remote Friendly", "notes"]);
        let columns = map_headers(&schema(), &headers);
        assert_eq!(columns, vec!["name", "website", "remote", "notes"]);
    }

    #[test]
    fn test_row_values_coerces_and_skips_empty_cells() {
        let schema = schema();
        let columns = vec!["name".to_string(), "website".to_string(), "remote".to_string()];
        let record = StringRecord::from(vec!["Acme", "", "yes"]);
        let values = row_values(&schema, &columns, &record);

        assert_eq!(values.get("name"), Some(&Value::from("Acme")));
        assert!(!values.contains_key("website"));
        assert_eq!(values.get("remote"), Some(&Value::from("true")));
    }

    #[test]
    fn test_row_label_falls_back() {
        let mut values = ListingData::new();
        assert_eq!(row_label(&values), "(untitled)");
        values.insert("name".into(), Value::from("Acme"));
        assert_eq!(row_label(&values), "Acme");
    }
}
