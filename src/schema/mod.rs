//! Schema system - directory schemas, forms and the authoring wizard

pub mod diagnostics;
pub mod form;
pub mod model;
pub mod shape;
pub mod wizard;

pub use form::{FieldError, RenderField};
pub use model::{FieldSpec, FieldType, ParseError, SchemaModel, SchemaTextError};
pub use wizard::{Wizard, WizardError, WizardServices, WizardStep};
