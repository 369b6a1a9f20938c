//! Directory authoring wizard
//!
//! A linear state machine: basic info, interview, schema edit, review,
//! committed. The machine owns the legality of transitions; whoever drives
//! it owns the prompting. Transitions consume the wizard and return the next
//! one, so every step is an explicit `(step, form)` value.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::identity::RecordId;
use crate::core::services::{
    DirectoryStore, ExternalCallError, GenerationRequest, InterviewAnswers, SchemaGenerator,
};
use crate::entities::NewDirectory;
use crate::schema::model::{ParseError, SchemaModel, SchemaTextError};

/// Wizard steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStep {
    #[default]
    BasicInfo,
    Interview,
    SchemaEdit,
    Review,
    Committed,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "basic info",
            WizardStep::Interview => "interview",
            WizardStep::SchemaEdit => "schema edit",
            WizardStep::Review => "review",
            WizardStep::Committed => "committed",
        }
    }

    /// 1-based position, for "step 2 of 4" style headers
    pub fn number(&self) -> usize {
        match self {
            WizardStep::BasicInfo => 1,
            WizardStep::Interview => 2,
            WizardStep::SchemaEdit => 3,
            WizardStep::Review => 4,
            WizardStep::Committed => 5,
        }
    }

    fn back(&self) -> WizardStep {
        match self {
            WizardStep::BasicInfo => WizardStep::BasicInfo,
            WizardStep::Interview => WizardStep::BasicInfo,
            WizardStep::SchemaEdit => WizardStep::Interview,
            WizardStep::Review => WizardStep::SchemaEdit,
            WizardStep::Committed => WizardStep::Committed,
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a wizard error should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Step-local input problem; no collaborator was called
    Validation,
    /// Operator-edited schema text did not parse
    Parse,
    /// A collaborator call failed
    External,
}

/// Why a forward transition was refused
#[derive(Debug, Error, Diagnostic)]
pub enum WizardError {
    #[error("Directory name is required")]
    #[diagnostic(code(tdk::wizard::missing_name))]
    MissingName,

    #[error("Directory type is required")]
    #[diagnostic(
        code(tdk::wizard::missing_type),
        help("Describe what kind of entries the directory lists, e.g. 'nonprofit organizations'")
    )]
    MissingDirectoryType,

    #[error("{0}")]
    #[diagnostic(code(tdk::wizard::generation_failed))]
    Generation(ExternalCallError),

    #[error("Generated schema was rejected: {0}")]
    #[diagnostic(code(tdk::wizard::generated_schema_invalid))]
    GeneratedSchemaInvalid(ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SchemaText(SchemaTextError),

    #[error("No validated schema to commit")]
    #[diagnostic(code(tdk::wizard::missing_schema))]
    MissingSchema,

    #[error("{0}")]
    #[diagnostic(code(tdk::wizard::commit_failed))]
    Commit(ExternalCallError),
}

impl WizardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WizardError::MissingName
            | WizardError::MissingDirectoryType
            | WizardError::MissingSchema => ErrorKind::Validation,
            WizardError::SchemaText(_) => ErrorKind::Parse,
            // An unusable generated document counts as a failed generation
            WizardError::Generation(_)
            | WizardError::GeneratedSchemaInvalid(_)
            | WizardError::Commit(_) => ErrorKind::External,
        }
    }
}

/// Everything the operator has entered so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardForm {
    pub name: String,
    pub description: String,
    pub domain: String,
    pub interview: InterviewAnswers,
    /// Schema document text as shown in (and edited at) the schema step
    pub schema_text: String,
}

/// Collaborators the wizard calls on its way forward
pub struct WizardServices<'a> {
    pub generator: &'a dyn SchemaGenerator,
    pub directories: &'a mut dyn DirectoryStore,
    /// Recorded as the directory's creator
    pub owner: &'a str,
}

/// The wizard state: current step, form data and the last refusal
#[derive(Debug, Default)]
pub struct Wizard {
    step: WizardStep,
    form: WizardForm,
    schema: Option<SchemaModel>,
    directory_id: Option<RecordId>,
    error: Option<WizardError>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &WizardForm {
        &self.form
    }

    /// Most recently accepted schema
    pub fn schema(&self) -> Option<&SchemaModel> {
        self.schema.as_ref()
    }

    /// Id of the created directory, once committed
    pub fn directory_id(&self) -> Option<&RecordId> {
        self.directory_id.as_ref()
    }

    /// Why the last forward transition was refused, if it was
    pub fn error(&self) -> Option<&WizardError> {
        self.error.as_ref()
    }

    /// Consume the wizard, keeping only the last refusal
    pub fn into_error(self) -> Option<WizardError> {
        self.error
    }

    pub fn is_committed(&self) -> bool {
        self.step == WizardStep::Committed
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.form.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.form.description = description.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.form.domain = domain.into();
        self
    }

    pub fn with_interview(mut self, interview: InterviewAnswers) -> Self {
        self.form.interview = interview;
        self
    }

    pub fn with_schema_text(mut self, text: impl Into<String>) -> Self {
        self.form.schema_text = text.into();
        self
    }

    /// Attempt the forward transition from the current step.
    ///
    /// On refusal the step is unchanged and [`Wizard::error`] says why; the
    /// form is never discarded.
    pub fn advance(mut self, services: &mut WizardServices<'_>) -> Wizard {
        self.error = None;
        let from = self.step;

        let outcome = match self.step {
            WizardStep::BasicInfo => self.leave_basic_info(),
            WizardStep::Interview => self.leave_interview(services.generator),
            WizardStep::SchemaEdit => self.leave_schema_edit(),
            WizardStep::Review => self.commit(services),
            WizardStep::Committed => Ok(WizardStep::Committed),
        };

        match outcome {
            Ok(next) => {
                tracing::debug!(from = %from, to = %next, "wizard advanced");
                self.step = next;
            }
            Err(err) => {
                tracing::warn!(step = %from, error = %err, "wizard transition refused");
                self.error = Some(err);
            }
        }
        self
    }

    /// Step back one state; always permitted, never validated
    pub fn previous(mut self) -> Wizard {
        let back = self.step.back();
        if back != self.step {
            tracing::debug!(from = %self.step, to = %back, "wizard stepped back");
            self.step = back;
            self.error = None;
        }
        self
    }

    fn leave_basic_info(&self) -> Result<WizardStep, WizardError> {
        if self.form.name.trim().is_empty() {
            return Err(WizardError::MissingName);
        }
        Ok(WizardStep::Interview)
    }

    fn leave_interview(&mut self, generator: &dyn SchemaGenerator) -> Result<WizardStep, WizardError> {
        if self.form.interview.directory_type.trim().is_empty() {
            return Err(WizardError::MissingDirectoryType);
        }

        let request = GenerationRequest {
            name: self.form.name.trim().to_string(),
            description: self.form.description.trim().to_string(),
            domain: self.form.domain.trim().to_string(),
            interview_answers: self.form.interview.clone(),
        };
        let response = generator
            .generate_schema(&request)
            .map_err(WizardError::Generation)?;
        let model =
            SchemaModel::parse(&response.schema).map_err(WizardError::GeneratedSchemaInvalid)?;

        self.form.schema_text = pretty(&response.schema);
        self.schema = Some(model);
        Ok(WizardStep::SchemaEdit)
    }

    fn leave_schema_edit(&mut self) -> Result<WizardStep, WizardError> {
        let model = SchemaModel::parse_str(&self.form.schema_text).map_err(WizardError::SchemaText)?;
        self.schema = Some(model);
        Ok(WizardStep::Review)
    }

    fn commit(&mut self, services: &mut WizardServices<'_>) -> Result<WizardStep, WizardError> {
        let schema = self.schema.clone().ok_or(WizardError::MissingSchema)?;
        let request = NewDirectory {
            name: self.form.name.trim().to_string(),
            description: self.form.description.trim().to_string(),
            domain: self.form.domain.trim().to_string(),
            schema,
            created_by: services.owner.to_string(),
        };
        let id = services
            .directories
            .create_directory(&request)
            .map_err(WizardError::Commit)?;
        self.directory_id = Some(id);
        Ok(WizardStep::Committed)
    }
}

fn pretty(doc: &Value) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string())
}
