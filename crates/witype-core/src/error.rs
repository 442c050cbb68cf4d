use std::fmt;

use uuid::Uuid;

/// Entity labels carried by `NotFound`, `AlreadyExists`, and `VersionConflict`.
pub const TYPE_ENTITY: &str = "work item type";
pub const LINK_TYPE_ENTITY: &str = "work item link type";
pub const LINK_CATEGORY_ENTITY: &str = "work item link category";

/// Result alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    CatalogParseError,
    BadParameter,
    ConversionFailed,
    UnsupportedKind,
    TypeNotFound,
    LinkTypeNotFound,
    LinkCategoryNotFound,
    AlreadyExists,
    VersionConflict,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::CatalogParseError => "E1003",
            Self::BadParameter => "E2001",
            Self::ConversionFailed => "E2002",
            Self::UnsupportedKind => "E2003",
            Self::TypeNotFound => "E3001",
            Self::LinkTypeNotFound => "E3002",
            Self::LinkCategoryNotFound => "E3003",
            Self::AlreadyExists => "E3004",
            Self::VersionConflict => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::CatalogParseError => "Catalog file parse error",
            Self::BadParameter => "Invalid or missing parameter",
            Self::ConversionFailed => "Field value conversion failed",
            Self::UnsupportedKind => "Unsupported field kind",
            Self::TypeNotFound => "Work item type not found",
            Self::LinkTypeNotFound => "Work item link type not found",
            Self::LinkCategoryNotFound => "Work item link category not found",
            Self::AlreadyExists => "Record already exists",
            Self::VersionConflict => "Record was modified concurrently",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Create .witype/config.toml or pass --catalog."),
            Self::ConfigParseError => Some("Fix syntax in .witype/config.toml and retry."),
            Self::CatalogParseError => Some("Fix syntax in the catalog file and run `wt check`."),
            Self::BadParameter => Some("Correct the named field and retry."),
            Self::ConversionFailed => Some("Make the stored value match the field's declared kind."),
            Self::UnsupportedKind => Some("Use one of the documented field kinds."),
            Self::TypeNotFound => Some("Run `wt types` to list known work item types."),
            Self::LinkTypeNotFound => Some("Run `wt links` to list known link types."),
            Self::LinkCategoryNotFound => None,
            Self::AlreadyExists => Some("Use a fresh identifier or update the existing record."),
            Self::VersionConflict => Some("Reload the record and reapply your change."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Why a single field value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// A kind descriptor names no supported kind.
    #[error("unsupported field kind '{0}'")]
    UnsupportedKind(String),

    /// The value's JSON shape does not match the declared kind.
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The shape is right but the content is not acceptable for the kind.
    #[error("invalid {kind} value: {reason}")]
    InvalidValue { kind: &'static str, reason: String },
}

/// Errors produced by the type, field, and link-type engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required field is missing, empty, or outside its valid set.
    #[error("bad parameter '{field}': '{value}'{}", expected_suffix(.expected.as_deref()))]
    BadParameter {
        field: String,
        value: String,
        expected: Option<String>,
    },

    /// A field value could not be converted between model and external form.
    #[error("failed to convert field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },

    /// The presented version is not the stored version.
    #[error("version conflict on {entity} {id}: presented version {expected}, stored version {actual}")]
    VersionConflict {
        entity: &'static str,
        id: Uuid,
        expected: u32,
        actual: u32,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: Uuid },

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    StorePoisoned,
}

fn expected_suffix(expected: Option<&str>) -> String {
    expected.map_or_else(String::new, |e| format!(" (expected {e})"))
}

impl EngineError {
    /// Build a [`EngineError::BadParameter`] without an expected-value hint.
    pub fn bad_parameter(field: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::BadParameter {
            field: field.into(),
            value: value.to_string(),
            expected: None,
        }
    }

    /// Attach the set of acceptable values to a [`EngineError::BadParameter`].
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn expected(self, expected: impl Into<String>) -> Self {
        match self {
            Self::BadParameter { field, value, .. } => Self::BadParameter {
                field,
                value,
                expected: Some(expected.into()),
            },
            other => other,
        }
    }

    /// Wrap a conversion failure with the name of the field it happened on.
    pub fn conversion(field: impl Into<String>, source: ConversionError) -> Self {
        Self::Conversion {
            field: field.into(),
            source,
        }
    }

    /// Name of the offending field, for `BadParameter` and `Conversion`.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::BadParameter { field, .. } | Self::Conversion { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadParameter { .. } => ErrorCode::BadParameter,
            Self::Conversion {
                source: ConversionError::UnsupportedKind(_),
                ..
            } => ErrorCode::UnsupportedKind,
            Self::Conversion { .. } => ErrorCode::ConversionFailed,
            Self::VersionConflict { .. } => ErrorCode::VersionConflict,
            Self::NotFound { entity, .. } => match *entity {
                LINK_TYPE_ENTITY => ErrorCode::LinkTypeNotFound,
                LINK_CATEGORY_ENTITY => ErrorCode::LinkCategoryNotFound,
                _ => ErrorCode::TypeNotFound,
            },
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::StorePoisoned => ErrorCode::InternalUnexpected,
        }
    }

    /// Remediation hint derived from the error code.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.code()
            .hint()
            .unwrap_or_else(|| self.code().message())
            .to_string()
    }
}
