use std::fmt;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ItemNotFound,
    InvalidPayload,
    CycleDetected,
    InvalidParentKind,
    InvalidRank,
    Forbidden,
    DatabaseFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ItemNotFound => "E2001",
            Self::InvalidPayload => "E2002",
            Self::CycleDetected => "E2003",
            Self::InvalidParentKind => "E2004",
            Self::InvalidRank => "E2006",
            Self::Forbidden => "E4001",
            Self::DatabaseFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Board not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ItemNotFound => "Item not found",
            Self::InvalidPayload => "Malformed request payload",
            Self::CycleDetected => "Cycle would be created",
            Self::InvalidParentKind => "Parent kind not allowed",
            Self::InvalidRank => "Malformed stack rank",
            Self::Forbidden => "Repository administrator required",
            Self::DatabaseFailure => "Database failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `sb init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .stackboard/config.toml and retry."),
            Self::ItemNotFound => None,
            Self::InvalidPayload => Some("Check the request fields and retry."),
            Self::CycleDetected => Some("Pick a parent outside the item's own subtree."),
            Self::InvalidParentKind => {
                Some("Epics are top-level; issues go under epics, tasks under issues or epics.")
            }
            Self::InvalidRank => Some("Ranks use 0-9, A-Z, a-z and never end in '0'."),
            Self::Forbidden => Some("Ask a repository administrator to run `sb admin grant`."),
            Self::DatabaseFailure => Some("Retry once. If persistent, check the database file."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by reorder, hierarchy, and lifecycle operations.
///
/// Callers receive these unmodified; recovery such as a UI rollback is
/// theirs to perform.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Malformed payload, rejected before any rank computation.
    #[error("invalid {field}: {reason}")]
    Validation {
        code: ErrorCode,
        field: &'static str,
        reason: String,
    },
    /// The item, parent, or user does not exist (or is soft-deleted).
    #[error("{what} not found: '{id}'")]
    NotFound { what: &'static str, id: String },
    /// The caller lacks repository-administrator privilege.
    #[error("user '{user}' is not an administrator of repository '{repo}'")]
    Forbidden { user: String, repo: String },
    /// Any persistence failure.
    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl BoardError {
    pub fn validation(code: ErrorCode, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            code,
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::Database(_) => ErrorCode::DatabaseFailure,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(anyhow::Error::new(err))
    }
}
