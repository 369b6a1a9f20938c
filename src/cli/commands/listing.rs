//! `tdk listing` command - Submit, browse and moderate listings

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::import::{self, ImportArgs};
use crate::cli::helpers::{
    effective_format, load_directory, open_session, parse_id, truncate_str, Table,
};
use crate::cli::prompt;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::command::CommandClient;
use crate::core::identity::RecordPrefix;
use crate::core::services::{AutofillRequest, Autofiller};
use crate::core::{ListingStatus, ModerationEngine};
use crate::entities::{ListingData, NewListing};
use crate::listing::{FacetEngine, FilterState};
use crate::schema::form;

#[derive(Subcommand, Debug)]
pub enum ListingCommands {
    /// Submit a listing to a directory
    New(NewArgs),

    /// List listings of a directory, optionally filtered
    List(ListArgs),

    /// Show the filterable fields of a directory and their values
    Facets(FacetsArgs),

    /// Show a listing's details
    Show(ShowArgs),

    /// Approve a listing
    Approve(ModerateArgs),

    /// Reject a listing
    Reject(ModerateArgs),

    /// Import listings from a CSV file
    Import(ImportArgs),
}

/// Status filter for list and facets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    All,
    Pending,
    #[default]
    Approved,
    Rejected,
}

impl StatusFilter {
    fn status(self) -> Option<ListingStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Pending => Some(ListingStatus::Pending),
            StatusFilter::Approved => Some(ListingStatus::Approved),
            StatusFilter::Rejected => Some(ListingStatus::Rejected),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Directory ID
    pub directory: String,

    /// Field value (KEY=VALUE, repeatable)
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Ask the autofill service about this entity before anything else
    #[arg(long, value_name = "ENTITY")]
    pub autofill: Option<String>,

    /// Prompt for every field
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Directory ID
    pub directory: String,

    /// Which moderation status to show
    #[arg(long, value_enum, default_value_t = StatusFilter::Approved)]
    pub status: StatusFilter,

    /// Facet constraint (KEY=VALUE, repeatable, all must match)
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filter: Vec<String>,

    /// Limit output to N items
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct FacetsArgs {
    /// Directory ID
    pub directory: String,

    /// Which moderation status to draw values from
    #[arg(long, value_enum, default_value_t = StatusFilter::Approved)]
    pub status: StatusFilter,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Listing ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ModerateArgs {
    /// Listing ID
    pub id: String,
}

pub fn run(cmd: ListingCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ListingCommands::New(args) => run_new(args, global),
        ListingCommands::List(args) => run_list(args, global),
        ListingCommands::Facets(args) => run_facets(args, global),
        ListingCommands::Show(args) => run_show(args, global),
        ListingCommands::Approve(args) => run_moderate(args, ListingStatus::Approved, global),
        ListingCommands::Reject(args) => run_moderate(args, ListingStatus::Rejected, global),
        ListingCommands::Import(args) => import::run(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let dir = load_directory(&session.store, &args.directory)?;

    let mut values = ListingData::new();

    if let Some(entity) = args.autofill {
        let command_line = session.config.autofill.clone().ok_or_else(|| {
            miette::miette!(
                help = "Set 'autofill' in .tdk/config.yaml or export TDK_AUTOFILL",
                "No autofill command configured"
            )
        })?;
        let client = CommandClient::from_command_line("autofill", &command_line)
            .map_err(|e| miette::miette!("{}", e))?
            .with_working_dir(session.project.root());
        let response = client.autofill(&AutofillRequest {
            directory_id: dir.id.clone(),
            entity_name: entity,
        })?;
        tracing::debug!(fields = response.data.len(), "autofill returned");
        values = form::merge_values(&values, response.data);
    }

    for pair in &args.set {
        let (key, raw) = parse_assignment(pair)?;
        values.insert(key.to_string(), form::coerce_for(&dir.schema, key, raw));
    }

    if args.interactive {
        let fields = form::fields_to_render(&dir.schema);
        values = prompt::prompt_listing(&fields, &values)?;
    }

    let errors = form::validate(&dir.schema, &values);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{} {}", style("✗").red(), error.message);
        }
        return Err(miette::miette!(
            "{} required field(s) missing",
            errors.len()
        ));
    }

    let author = session.config.author();
    let status = ModerationEngine::new(session.config.auto_approve.clone()).initial_status(&author);
    let id = session.store.insert_listing(&NewListing {
        directory_id: dir.id.clone(),
        data: form::prepare_for_storage(values),
        status,
    })?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
    } else {
        println!(
            "{} Created listing {} ({})",
            style("✓").green(),
            style(&id).cyan(),
            status
        );
    }
    Ok(())
}

/// Split a `--set KEY=VALUE` argument; the key is trimmed and must not be blank
fn parse_assignment(pair: &str) -> Result<(&str, &str)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| miette::miette!("Invalid --set '{}': expected KEY=VALUE", pair))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(miette::miette!("Invalid --set '{}': missing field key", pair));
    }
    Ok((key, raw))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;
    let dir = load_directory(&session.store, &args.directory)?;
    let filters = FilterState::from_pairs(&args.filter).map_err(|e| miette::miette!("{}", e))?;

    let listings = session.store.listings_for(&dir.id, args.status.status())?;
    let engine = FacetEngine::new(&dir.schema);
    let mut visible = engine.filter(&listings, &filters);
    if let Some(limit) = args.limit {
        visible.truncate(limit);
    }

    let format = match effective_format(global, &session.config) {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&visible).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&visible).into_diagnostic()?);
        }
        format => {
            if visible.is_empty() && format == OutputFormat::Tsv {
                println!("No listings found.");
                return Ok(());
            }
            let keys = dir.schema.field_order();
            let mut headers = vec!["ID".to_string(), "STATUS".to_string()];
            headers.extend(keys.iter().map(|k| k.to_uppercase()));
            let mut table = Table::new(headers);
            for listing in &visible {
                let mut row = vec![listing.id.to_string(), listing.status.to_string()];
                row.extend(keys.iter().map(|k| truncate_str(&listing.display(k), 30)));
                table.push(row);
            }
            table.print(format)?;
            if format == OutputFormat::Tsv && !global.quiet {
                println!();
                println!("{} listing(s) found.", style(visible.len()).cyan());
            }
        }
    }
    Ok(())
}

fn run_facets(args: FacetsArgs, global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;
    let dir = load_directory(&session.store, &args.directory)?;
    let listings = session.store.listings_for(&dir.id, args.status.status())?;
    let facets = FacetEngine::new(&dir.schema).facets(&listings);

    let format = match effective_format(global, &session.config) {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&facets).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&facets).into_diagnostic()?);
        }
        format => {
            if facets.is_empty() && format == OutputFormat::Tsv {
                println!("No facets available.");
                return Ok(());
            }
            let mut table = Table::new(["FIELD", "TITLE", "VALUES"]);
            for facet in &facets {
                table.push(vec![
                    facet.key.clone(),
                    facet.title.clone(),
                    facet.values.join(", "),
                ]);
            }
            table.print(format)?;
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;
    let id = parse_id(&args.id, RecordPrefix::Lst)?;
    let listing = session
        .store
        .get_listing(&id)?
        .ok_or_else(|| miette::miette!("No listing found with id {}", id))?;

    match effective_format(global, &session.config) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listing).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&listing).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Id => {
            println!("{}", listing.id);
            return Ok(());
        }
        _ => {}
    }

    let dir = session
        .store
        .get_directory(&listing.directory_id)?
        .ok_or_else(|| miette::miette!("No directory found with id {}", listing.directory_id))?;

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&listing.id).cyan());
    println!(
        "{}: {} ({})",
        style("Directory").bold(),
        dir.name,
        style(&dir.id).dim()
    );
    println!("{}: {}", style("Status").bold(), status_style(listing.status));
    println!(
        "{}: {}",
        style("Created").bold(),
        listing.created.format("%Y-%m-%d %H:%M")
    );
    println!("{}", style("─".repeat(60)).dim());

    for field in form::fields_to_render(&dir.schema) {
        let value = listing.display(&field.key);
        if value.is_empty() {
            continue;
        }
        if field.multiline {
            println!("{}:", style(&field.title).bold());
            for line in value.lines() {
                println!("  {}", line);
            }
        } else {
            println!("{}: {}", style(&field.title).bold(), value);
        }
    }

    // Keys the schema no longer declares
    let others: Vec<_> = listing
        .data
        .iter()
        .filter(|(key, _)| dir.schema.field(key).is_none())
        .collect();
    if !others.is_empty() {
        println!();
        println!("{}", style("Other fields").dim());
        for (key, value) in others {
            println!("  {}: {}", key, value);
        }
    }
    Ok(())
}

fn status_style(status: ListingStatus) -> console::StyledObject<&'static str> {
    match status {
        ListingStatus::Pending => style(status.as_str()).yellow(),
        ListingStatus::Approved => style(status.as_str()).green(),
        ListingStatus::Rejected => style(status.as_str()).red(),
    }
}

fn run_moderate(args: ModerateArgs, target: ListingStatus, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let id = parse_id(&args.id, RecordPrefix::Lst)?;
    let listing = session
        .store
        .get_listing(&id)?
        .ok_or_else(|| miette::miette!("No listing found with id {}", id))?;

    let engine = ModerationEngine::new(session.config.auto_approve.clone());
    if let Err(e) = engine.check_transition(listing.status, target) {
        let allowed: Vec<&str> = engine
            .allowed_transitions(listing.status)
            .iter()
            .map(|s| s.as_str())
            .collect();
        return Err(miette::miette!(
            help = format!("Allowed from {}: {}", listing.status, allowed.join(", ")),
            "{}",
            e
        ));
    }

    session.store.set_listing_status(&id, target)?;
    tracing::info!(id = %id, from = %listing.status, to = %target, "moderated listing");

    if !global.quiet {
        println!(
            "{} {} is now {}",
            style("✓").green(),
            style(&id).cyan(),
            status_style(target)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("name=Acme").unwrap(), ("name", "Acme"));
        assert_eq!(parse_assignment(" city =Berlin=Mitte").unwrap(), ("city", "Berlin=Mitte"));
        assert_eq!(parse_assignment("notes=").unwrap(), ("notes", ""));
    }

    #[test]
    fn test_parse_assignment_rejects_missing_key() {
        assert!(parse_assignment("=value").is_err());
        assert!(parse_assignment("  =value").is_err());
        assert!(parse_assignment("novalue").is_err());
    }
}
