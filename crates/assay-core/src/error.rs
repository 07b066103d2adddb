use std::fmt;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    CatalogInvalid,
    ReportNotFound,
    ValidationFailed,
    StorageUnavailable,
    RemoteNotConfigured,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::CatalogInvalid => "E1002",
            Self::ReportNotFound => "E2001",
            Self::ValidationFailed => "E2003",
            Self::StorageUnavailable => "E5001",
            Self::RemoteNotConfigured => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::CatalogInvalid => "Product catalog is invalid",
            Self::ReportNotFound => "Report not found",
            Self::ValidationFailed => "Input validation failed",
            Self::StorageUnavailable => "Report storage unavailable",
            Self::RemoteNotConfigured => "Remote store not configured",
        }
    }

    /// Optional remediation hint that can be surfaced to the analyst.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .assay/config.toml and retry."),
            Self::CatalogInvalid => {
                Some("Every product needs a unique key and a unique code in the catalog file.")
            }
            Self::ReportNotFound => Some("Run `assay list` to see the saved report ids."),
            Self::ValidationFailed => None,
            Self::StorageUnavailable => {
                Some("Check disk space and write permissions, or the remote store's reachability.")
            }
            Self::RemoteNotConfigured => Some(
                "Provide a service-account descriptor via [storage].credentials or ASSAY_CREDENTIALS, and a user id.",
            ),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Faults surfaced by the report store and the session controller.
///
/// None of these abort a session: callers translate them into a message and
/// keep the in-progress form.
#[derive(Debug, thiserror::Error)]
pub enum AssayError {
    /// Update or lookup of an id that does not exist.
    #[error("report '{id}' not found")]
    NotFound { id: String },

    /// I/O or backend failure. The operation was aborted.
    #[error("storage fault: {message}")]
    StorageFault {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Missing or invalid remote credentials/settings.
    #[error("configuration fault: {0}")]
    ConfigurationFault(String),

    /// User input rejected before any store call.
    #[error("{0}")]
    ValidationFault(String),

    /// Catalog file could not be loaded.
    #[error(transparent)]
    CatalogInvalid(#[from] crate::catalog::CatalogError),
}

impl AssayError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn storage(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self::StorageFault {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn storage_msg(message: impl Into<String>) -> Self {
        Self::StorageFault {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationFault(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFault(message.into())
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ReportNotFound,
            Self::StorageFault { .. } => ErrorCode::StorageUnavailable,
            Self::ConfigurationFault(_) => ErrorCode::RemoteNotConfigured,
            Self::ValidationFault(_) => ErrorCode::ValidationFailed,
            Self::CatalogInvalid(_) => ErrorCode::CatalogInvalid,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = AssayError> = std::result::Result<T, E>;
