//! Error taxonomy for schema compilation and sheet conversion.
//!
//! [`StageError`] separates failures the engine can report without touching the
//! host process:
//!
//! - compile-time problems ([`StageError::Schema`], [`StageError::UnsupportedType`])
//!   abort before any row is read;
//! - resolution and coercion problems abort only the current sheet and travel
//!   alongside the partial record sequence in [`crate::convert::Conversion`].

use thiserror::Error;

pub type StageResult<T> = std::result::Result<T, StageError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    /// Malformed field tag.
    #[error("Invalid tag for field '{field}': {message}")]
    Schema { field: String, message: String },

    /// Declared field type has no coercion.
    #[error("Field '{field}' declares unsupported type '{type_name}'")]
    UnsupportedType { field: String, type_name: String },

    #[error("Could not find column header '{header}' in sheet '{sheet}'")]
    MissingHeader { header: String, sheet: String },

    #[error("Constant '{key}' missing for field '{field}' in sheet '{sheet}'")]
    MissingConstant {
        key: String,
        field: String,
        sheet: String,
    },

    #[error(
        "Column {column} mapped to field '{field}' is out of range for sheet '{sheet}' ({max_column} column(s))"
    )]
    OutOfRangeColumn {
        field: String,
        column: usize,
        max_column: usize,
        sheet: String,
    },

    #[error("Could not convert '{value}' to {target}: {reason}")]
    TypeCoercion {
        value: String,
        target: String,
        reason: String,
    },

    /// Coercion failure annotated with where it happened.
    #[error("Row {row} field '{field}'")]
    Field {
        row: usize,
        field: String,
        #[source]
        source: Box<StageError>,
    },

    #[error("Could not find sheet '{0}'")]
    SheetNotFound(String),

    #[error("Record type rejected field '{field}': {message}")]
    Assign { field: String, message: String },
}

impl StageError {
    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn coercion(
        value: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        StageError::TypeCoercion {
            value: value.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a coercion failure with its row and field, leaving other errors untouched.
    pub fn at_field(self, row: usize, field: &str) -> Self {
        match self {
            StageError::TypeCoercion { .. } => StageError::Field {
                row,
                field: field.to_string(),
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The innermost error once row/field annotations are stripped.
    pub fn root(&self) -> &StageError {
        match self {
            StageError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error was raised before any row was read.
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self.root(),
            StageError::Schema { .. } | StageError::UnsupportedType { .. }
        )
    }
}
