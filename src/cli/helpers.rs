//! Shared helper functions for CLI commands
//!
//! Project/store opening, id resolution and the tabular output used by every
//! list command.

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{RecordId, RecordPrefix};
use crate::core::{Config, Project, Store};
use crate::entities::Directory;

/// Everything a project-scoped command needs
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub store: Store,
}

/// Discover the project (honouring `--project`), load config, open the store
pub fn open_session(global: &GlobalOpts) -> Result<Session> {
    let project = match global.project {
        Some(ref path) => Project::discover_from(path),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load(Some(&project));
    let store = Store::open(&project)?;
    Ok(Session {
        project,
        config,
        store,
    })
}

/// The output format after applying `default_format` from config
pub fn effective_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    config
        .default_format
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or(OutputFormat::Auto)
}

/// Parse a record id, with a readable error
pub fn parse_id(input: &str, prefix: RecordPrefix) -> Result<RecordId> {
    RecordId::parse_as(input, prefix).map_err(|e| miette::miette!("{}", e))
}

/// Load a directory or fail with "not found"
pub fn load_directory(store: &Store, input: &str) -> Result<Directory> {
    let id = parse_id(input, RecordPrefix::Dir)?;
    store
        .get_directory(&id)?
        .ok_or_else(|| miette::miette!("No directory found with id {}", id))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// A simple rows-and-columns result for list commands
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Print in one of the tabular formats (tsv, csv, md, id)
    ///
    /// `Id` prints the first column. Structured formats are the caller's job.
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record(&self.headers).into_diagnostic()?;
                for row in &self.rows {
                    writer.write_record(row).into_diagnostic()?;
                }
                writer.flush().into_diagnostic()?;
            }
            OutputFormat::Md => {
                let mut builder = Builder::default();
                builder.push_record(self.headers.iter().cloned());
                for row in &self.rows {
                    builder.push_record(row.iter().cloned());
                }
                println!("{}", builder.build().with(Style::markdown()));
            }
            OutputFormat::Id => {
                for row in &self.rows {
                    if let Some(first) = row.first() {
                        println!("{}", first);
                    }
                }
            }
            _ => self.print_tsv(),
        }
        Ok(())
    }

    fn print_tsv(&self) {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{}", style(format!("{:<w$}", h, w = w)).bold()))
            .collect();
        println!("{}", header.join("\t").trim_end());

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", c, w = w))
                .collect();
            println!("{}", cells.join("\t").trim_end());
        }
    }
}
