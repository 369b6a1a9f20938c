//! Interactive prompts for listing forms and the directory wizard
//!
//! Both are driven by the library: forms by `fields_to_render`, the wizard
//! by `Wizard::advance`/`Wizard::previous`. This module only asks questions.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::core::services::InterviewAnswers;
use crate::entities::ListingData;
use crate::listing::normalize;
use crate::schema::form::{self, RenderField};
use crate::schema::{FieldType, Wizard, WizardServices, WizardStep};

/// Prompt for every field in render order, seeded with `current`
pub fn prompt_listing(fields: &[RenderField], current: &ListingData) -> Result<ListingData> {
    let theme = ColorfulTheme::default();
    let mut values = current.clone();

    for field in fields {
        if let Some(value) = prompt_field(&theme, field, current.get(&field.key))? {
            values.insert(field.key.clone(), value);
        }
    }

    Ok(values)
}

fn prompt_field(
    theme: &ColorfulTheme,
    field: &RenderField,
    current: Option<&Value>,
) -> Result<Option<Value>> {
    let prompt = format_prompt(field);
    let existing = normalize::display_value(current);

    match field.field_type {
        FieldType::Boolean => {
            let items = &["Yes", "No"];
            let default_idx = if form::coerce(FieldType::Boolean, &existing) == Value::from("true") {
                0
            } else {
                1
            };
            let selection = Select::with_theme(theme)
                .with_prompt(&prompt)
                .items(items)
                .default(default_idx)
                .interact()
                .into_diagnostic()?;
            Ok(Some(form::coerce(
                FieldType::Boolean,
                if selection == 0 { "yes" } else { "no" },
            )))
        }
        _ if !field.options.is_empty() => {
            let mut items: Vec<String> = field.options.clone();
            if !field.required {
                items.push("(none)".to_string());
            }
            let default_idx = items.iter().position(|o| *o == existing).unwrap_or(0);
            let selection = Select::with_theme(theme)
                .with_prompt(&prompt)
                .items(&items)
                .default(default_idx)
                .interact()
                .into_diagnostic()?;
            if selection >= field.options.len() {
                return Ok(None);
            }
            Ok(Some(form::coerce(field.field_type, &items[selection])))
        }
        _ => {
            let mut input = Input::<String>::with_theme(theme)
                .with_prompt(&prompt)
                .allow_empty(true);
            if !existing.is_empty() {
                input = input.default(existing);
            }
            let value = input.interact_text().into_diagnostic()?;
            if value.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(form::coerce(field.field_type, &value)))
            }
        }
    }
}

/// Format the prompt for a field
fn format_prompt(field: &RenderField) -> String {
    let mut prompt = field.title.clone();
    if field.required {
        prompt.push_str(" *");
    }
    if field.multiline {
        prompt.push_str(" (long text)");
    }
    if let Some(ref desc) = field.description {
        // Truncate long descriptions
        let short: String = if desc.chars().count() > 50 {
            format!("{}...", desc.chars().take(47).collect::<String>())
        } else {
            desc.clone()
        };
        prompt = format!("{} ({})", prompt, style(short).dim());
    }
    prompt
}

/// Operator's choice at the end of a wizard step
enum StepChoice {
    Continue,
    Back,
    Cancel,
}

/// Drive the wizard from the terminal until it commits or is cancelled
pub fn run_wizard(mut wizard: Wizard, services: &mut WizardServices<'_>) -> Result<Wizard> {
    let theme = ColorfulTheme::default();

    while !wizard.is_committed() {
        println!();
        println!(
            "{} Step {} of 4: {}",
            style("◆").cyan(),
            wizard.step().number(),
            style(wizard.step()).bold()
        );
        println!("{}", style("─".repeat(50)).dim());

        let choice = match wizard.step() {
            WizardStep::BasicInfo => {
                wizard = ask_basic_info(&theme, wizard)?;
                StepChoice::Continue
            }
            WizardStep::Interview => {
                wizard = ask_interview(&theme, wizard)?;
                choose(&theme, &["Generate schema", "Back", "Cancel"])?
            }
            WizardStep::SchemaEdit => {
                println!("{}", wizard.form().schema_text);
                let (next, choice) = ask_schema_edit(&theme, wizard)?;
                wizard = next;
                choice
            }
            WizardStep::Review => {
                print_review(&wizard);
                choose(&theme, &["Create directory", "Back", "Cancel"])?
            }
            WizardStep::Committed => break,
        };

        wizard = match choice {
            StepChoice::Continue => wizard.advance(services),
            StepChoice::Back => wizard.previous(),
            StepChoice::Cancel => return Err(miette::miette!("Directory creation cancelled")),
        };

        if let Some(err) = wizard.error() {
            eprintln!("{} {}", style("✗").red(), err);
        }
    }

    Ok(wizard)
}

fn choose(theme: &ColorfulTheme, items: &[&str]) -> Result<StepChoice> {
    let selection = Select::with_theme(theme)
        .items(items)
        .default(0)
        .interact()
        .into_diagnostic()?;
    Ok(match selection {
        0 => StepChoice::Continue,
        1 => StepChoice::Back,
        _ => StepChoice::Cancel,
    })
}

fn ask_text(theme: &ColorfulTheme, prompt: &str, current: &str) -> Result<String> {
    let mut input = Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true);
    if !current.is_empty() {
        input = input.default(current.to_string());
    }
    input.interact_text().into_diagnostic()
}

fn ask_basic_info(theme: &ColorfulTheme, wizard: Wizard) -> Result<Wizard> {
    let form = wizard.form().clone();
    let name = ask_text(theme, "Directory name", &form.name)?;
    let description = ask_text(theme, "Description", &form.description)?;
    let domain = ask_text(theme, "Domain (e.g. climate, education)", &form.domain)?;
    Ok(wizard
        .with_name(name)
        .with_description(description)
        .with_domain(domain))
}

fn ask_interview(theme: &ColorfulTheme, wizard: Wizard) -> Result<Wizard> {
    let current = wizard.form().interview.clone();
    let answers = InterviewAnswers {
        directory_type: ask_text(
            theme,
            "What kind of entries will it list?",
            &current.directory_type,
        )?,
        example_organizations: ask_text(
            theme,
            "Example entries (comma-separated)",
            &current.example_organizations,
        )?,
        required_fields: ask_text(
            theme,
            "Information every entry must have",
            &current.required_fields,
        )?,
        optional_fields: ask_text(theme, "Nice-to-have information", &current.optional_fields)?,
    };
    Ok(wizard.with_interview(answers))
}

fn ask_schema_edit(theme: &ColorfulTheme, wizard: Wizard) -> Result<(Wizard, StepChoice)> {
    let items = &["Accept schema", "Replace from file", "Back", "Cancel"];
    let selection = Select::with_theme(theme)
        .items(items)
        .default(0)
        .interact()
        .into_diagnostic()?;
    match selection {
        0 => Ok((wizard, StepChoice::Continue)),
        1 => {
            let path: String = Input::with_theme(theme)
                .with_prompt("Schema file")
                .interact_text()
                .into_diagnostic()?;
            let text = std::fs::read_to_string(path.trim()).into_diagnostic()?;
            Ok((wizard.with_schema_text(text), StepChoice::Continue))
        }
        2 => Ok((wizard, StepChoice::Back)),
        _ => Ok((wizard, StepChoice::Cancel)),
    }
}

fn print_review(wizard: &Wizard) {
    let form = wizard.form();
    println!("{}: {}", style("Name").bold(), style(&form.name).yellow());
    if !form.description.is_empty() {
        println!("{}: {}", style("Description").bold(), form.description);
    }
    if !form.domain.is_empty() {
        println!("{}: {}", style("Domain").bold(), form.domain);
    }
    if let Some(schema) = wizard.schema() {
        println!("{}:", style("Fields").bold());
        for field in form::fields_to_render(schema) {
            let marker = if field.required { "*" } else { " " };
            println!(
                "  {} {} {} {}",
                marker,
                style(&field.key).cyan(),
                style(field.field_type).dim(),
                field.title
            );
        }
    }
}
