//! `tdk dir` command - Directory authoring and inspection

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{effective_format, load_directory, open_session, truncate_str, Table};
use crate::cli::prompt;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::command::{CommandClient, StaticGenerator};
use crate::core::services::{InterviewAnswers, SchemaGenerator};
use crate::schema::form;
use crate::schema::{SchemaModel, Wizard, WizardServices};

#[derive(Subcommand, Debug)]
pub enum DirCommands {
    /// Create a directory (interactive wizard unless --name is given)
    New(NewArgs),

    /// List directories
    List,

    /// Show a directory and its fields
    Show(ShowArgs),

    /// Print a directory's schema, or replace it wholesale
    Schema(SchemaArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Directory name (runs without prompts when given)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// What the directory collects
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Subject area
    #[arg(long, default_value = "")]
    pub domain: String,

    /// Kind of entries the directory lists (e.g. "nonprofit organizations")
    #[arg(long = "type", short = 't', default_value = "")]
    pub directory_type: String,

    /// Example entries, comma-separated
    #[arg(long, default_value = "")]
    pub examples: String,

    /// Information every entry must have
    #[arg(long, default_value = "")]
    pub required: String,

    /// Nice-to-have information
    #[arg(long, default_value = "")]
    pub optional: String,

    /// Use a hand-authored schema document instead of the generator
    #[arg(long)]
    pub schema_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Directory ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Directory ID
    pub id: String,

    /// Replace the schema with this document after validating it in full
    #[arg(long)]
    pub set: Option<PathBuf>,
}

pub fn run(cmd: DirCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DirCommands::New(args) => run_new(args, global),
        DirCommands::List => run_list(global),
        DirCommands::Show(args) => run_show(args, global),
        DirCommands::Schema(args) => run_schema(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let owner = session.config.author();

    let generator: Box<dyn SchemaGenerator> = match args.schema_file {
        Some(ref path) => Box::new(StaticGenerator::from_file(path)?),
        None => {
            let command_line = session.config.generator.clone().ok_or_else(|| {
                miette::miette!(
                    help = "Set 'generator' in .tdk/config.yaml, export TDK_GENERATOR, or pass --schema-file",
                    "No schema generator configured"
                )
            })?;
            Box::new(
                CommandClient::from_command_line("generator", &command_line)
                    .map_err(|e| miette::miette!("{}", e))?
                    .with_working_dir(session.project.root()),
            )
        }
    };

    let mut services = WizardServices {
        generator: &*generator,
        directories: &mut session.store,
        owner: &owner,
    };

    let wizard = match args.name {
        Some(name) => {
            let mut wizard = Wizard::new()
                .with_name(name)
                .with_description(args.description)
                .with_domain(args.domain)
                .with_interview(InterviewAnswers {
                    directory_type: args.directory_type,
                    example_organizations: args.examples,
                    required_fields: args.required,
                    optional_fields: args.optional,
                });
            // Walk forward until committed or refused
            while !wizard.is_committed() {
                wizard = wizard.advance(&mut services);
                if wizard.error().is_some() {
                    break;
                }
            }
            if !wizard.is_committed() {
                return match wizard.into_error() {
                    Some(err) => Err(err.into()),
                    None => Err(miette::miette!("Directory was not created")),
                };
            }
            wizard
        }
        None => prompt::run_wizard(Wizard::new(), &mut services)?,
    };

    let id = wizard
        .directory_id()
        .ok_or_else(|| miette::miette!("Directory was not created"))?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
    } else {
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(id).cyan()
        );
        if let Some(schema) = wizard.schema() {
            println!(
                "   {} field(s), {} required",
                schema.len(),
                schema.required().len()
            );
        }
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;
    let directories = session.store.list_directories()?;

    let format = match effective_format(global, &session.config) {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&directories).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&directories).into_diagnostic()?);
        }
        format => {
            if directories.is_empty() && format == OutputFormat::Tsv {
                println!("No directories found.");
                return Ok(());
            }
            let mut table = Table::new(["ID", "NAME", "DOMAIN", "FIELDS", "LISTINGS", "CREATED"]);
            for dir in &directories {
                table.push(vec![
                    dir.id.to_string(),
                    truncate_str(&dir.name, 30),
                    truncate_str(&dir.domain, 20),
                    dir.schema.len().to_string(),
                    session.store.count_listings(&dir.id)?.to_string(),
                    dir.created.format("%Y-%m-%d").to_string(),
                ]);
            }
            table.print(format)?;
            if format == OutputFormat::Tsv && !global.quiet {
                println!();
                println!("{} directory(ies) found.", style(directories.len()).cyan());
            }
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;
    let dir = load_directory(&session.store, &args.id)?;

    match effective_format(global, &session.config) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&dir).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&dir).into_diagnostic()?);
        }
        OutputFormat::Id => {
            println!("{}", dir.id);
        }
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(&dir.id).cyan());
            println!("{}: {}", style("Name").bold(), style(&dir.name).yellow());
            if !dir.description.is_empty() {
                println!("{}: {}", style("Description").bold(), dir.description);
            }
            if !dir.domain.is_empty() {
                println!("{}: {}", style("Domain").bold(), dir.domain);
            }
            println!("{}: {}", style("Created by").bold(), dir.created_by);
            println!(
                "{}: {}",
                style("Created").bold(),
                dir.created.format("%Y-%m-%d %H:%M")
            );
            println!(
                "{}: {}",
                style("Listings").bold(),
                session.store.count_listings(&dir.id)?
            );
            println!("{}", style("─".repeat(60)).dim());
            println!();

            let mut table = Table::new(["KEY", "TYPE", "TITLE", "REQUIRED"]);
            for field in form::fields_to_render(&dir.schema) {
                table.push(vec![
                    field.key,
                    field.field_type.to_string(),
                    field.title,
                    if field.required { "yes" } else { "no" }.to_string(),
                ]);
            }
            table.print(OutputFormat::Tsv)?;
        }
    }
    Ok(())
}

fn run_schema(args: SchemaArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let dir = load_directory(&session.store, &args.id)?;

    let Some(path) = args.set else {
        let document = dir.schema.to_document();
        match effective_format(global, &session.config) {
            OutputFormat::Yaml => print!("{}", serde_yml::to_string(&document).into_diagnostic()?),
            _ => println!("{}", serde_json::to_string_pretty(&document).into_diagnostic()?),
        }
        return Ok(());
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))?;
    let schema = SchemaModel::parse_named(&text, &path.display().to_string())?;
    session.store.replace_schema(&dir.id, &schema)?;

    println!(
        "{} Replaced schema of {} ({} field(s), {} required)",
        style("✓").green(),
        style(&dir.id).cyan(),
        schema.len(),
        schema.required().len()
    );
    for coercion in schema.coercions() {
        println!(
            "{} field '{}': unknown type '{}', treated as string",
            style("!").yellow(),
            coercion.key,
            coercion.declared
        );
    }
    Ok(())
}
