//! `tdk schema` command - Inspect schema documents before using them

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::path::PathBuf;

use crate::cli::helpers::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::schema::form;
use crate::schema::SchemaModel;

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Parse a schema document and show the form it produces
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Schema document (JSON)
    pub file: PathBuf,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SchemaCommands::Check(args) => run_check(args, global),
    }
}

fn run_check(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .map_err(|e| miette::miette!("Cannot read {}: {}", args.file.display(), e))?;
    let name = args.file.display().to_string();
    let schema = SchemaModel::parse_named(&text, &name)?;
    let fields = form::fields_to_render(&schema);

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let coercions: Vec<_> = schema
                .coercions()
                .iter()
                .map(|c| json!({"key": c.key, "declared": c.declared}))
                .collect();
            let report = json!({
                "fields": fields,
                "required": schema.required(),
                "coercions": coercions,
            });
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&report).into_diagnostic()?);
            }
        }
        format => {
            let mut table = Table::new(["KEY", "TYPE", "TITLE", "REQUIRED", "MULTILINE"]);
            for field in &fields {
                table.push(vec![
                    field.key.clone(),
                    field.field_type.to_string(),
                    field.title.clone(),
                    yes_no(field.required),
                    yes_no(field.multiline),
                ]);
            }
            table.print(format)?;

            if !global.quiet && matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
                for coercion in schema.coercions() {
                    println!(
                        "{} field '{}': unknown type '{}', treated as string",
                        style("!").yellow(),
                        coercion.key,
                        coercion.declared
                    );
                }
                println!();
                println!(
                    "{} {} field(s), {} required",
                    style("✓").green(),
                    style(schema.len()).cyan(),
                    schema.required().len()
                );
            }
        }
    }

    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
