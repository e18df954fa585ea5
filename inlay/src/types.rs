use sea_orm::{DbErr, Value};

// Crate-wide result alias for ergonomics (non-conflicting)
pub type InlayResult<T> = std::result::Result<T, InlayError>;

/// Typed inlay errors.
///
/// Schema and path problems are raised before any statement reaches the
/// database. Driver failures are carried through `Driver` untouched.
#[derive(Debug, thiserror::Error)]
pub enum InlayError {
    // Schema/path errors
    #[error("InlayError::UnknownEntity: entity='{entity}'")]
    UnknownEntity { entity: String },

    #[error("InlayError::UnknownProperty: owner='{owner}' path='{path}'")]
    UnknownProperty { owner: String, path: String },

    #[error("InlayError::PathTraversal: path='{path}' segment='{segment}' reason='{reason}'")]
    PathTraversal {
        path: String,
        segment: String,
        reason: String,
    },

    #[error("InlayError::InvalidSchema: {message}")]
    InvalidSchema { message: String },

    // Mapping errors
    #[error("InlayError::UnresolvedReference: entity='{entity}' column='{column}'")]
    UnresolvedReference { entity: String, column: String },

    #[error("InlayError::MissingColumn: entity='{entity}' column='{column}'")]
    MissingColumn { entity: String, column: String },

    #[error("InlayError::InvalidValue: path='{path}' expected='{expected}'")]
    InvalidValue { path: String, expected: String },

    // Upsert errors
    #[error("InlayError::UnknownMergeField: entity='{entity}' field='{field}'")]
    UnknownMergeField { entity: String, field: String },

    #[error("InlayError::NoConflictTarget: entity='{entity}'")]
    NoConflictTarget { entity: String },

    // Unit of work errors
    #[error("InlayError::NotFound: entity='{entity}'")]
    NotFound { entity: String },

    #[error("InlayError::UnknownHandle: handle={handle}")]
    UnknownHandle { handle: usize },

    // Configuration errors
    #[error("InlayError::InvalidConfiguration: component='{component}' message='{message}'")]
    InvalidConfiguration { component: String, message: String },

    #[error("InlayError::Driver: {0}")]
    Driver(#[from] DbErr),
}

impl From<InlayError> for DbErr {
    fn from(err: InlayError) -> Self {
        match err {
            InlayError::Driver(inner) => inner,
            other => DbErr::Custom(other.to_string()),
        }
    }
}

impl InlayError {
    pub fn unknown_property(owner: impl Into<String>, path: impl Into<String>) -> Self {
        Self::UnknownProperty {
            owner: owner.into(),
            path: path.into(),
        }
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    pub fn invalid_value(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid_configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True for errors raised by schema or path validation, i.e. before any I/O
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownEntity { .. }
                | Self::UnknownProperty { .. }
                | Self::PathTraversal { .. }
                | Self::InvalidSchema { .. }
                | Self::UnknownMergeField { .. }
                | Self::NoConflictTarget { .. }
                | Self::InvalidValue { .. }
        )
    }
}

#[derive(Copy, Clone, Debug)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Generic field operations for filtering
#[derive(Debug, Clone)]
pub enum FieldOp {
    Equals(Value),
    NotEquals(Value),
    Gt(Value),
    Lt(Value),
    Gte(Value),
    Lte(Value),
    InVec(Vec<Value>),
    NotInVec(Vec<Value>),
    IsNull,
    IsNotNull,
}

impl FieldOp {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }
}

/// A single condition on a field path of the queried entity
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub operation: FieldOp,
}

impl Filter {
    pub fn new(field: impl Into<String>, operation: FieldOp) -> Self {
        Self {
            field: field.into(),
            operation,
        }
    }
}
