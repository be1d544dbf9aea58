use std::fmt;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    IdentityRequired,
    NotFound,
    Forbidden,
    CycleDetected,
    AmbiguousId,
    InvalidEnumValue,
    ValidationFailed,
    CodeSpaceExhausted,
    CorruptStore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::IdentityRequired => "E1003",
            Self::NotFound => "E2001",
            Self::Forbidden => "E2002",
            Self::CycleDetected => "E2003",
            Self::AmbiguousId => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::ValidationFailed => "E2006",
            Self::CodeSpaceExhausted => "E3001",
            Self::CorruptStore => "E3003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Journal not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::IdentityRequired => "No user identity",
            Self::NotFound => "Record not found",
            Self::Forbidden => "Not permitted for this user",
            Self::CycleDetected => "Cycle would be created",
            Self::AmbiguousId => "Ambiguous ID prefix",
            Self::InvalidEnumValue => "Invalid category/status value",
            Self::ValidationFailed => "Invalid input",
            Self::CodeSpaceExhausted => "No unique feedback code available",
            Self::CorruptStore => "Corrupt SQLite store",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and scripts.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `retro init` to create a journal here."),
            Self::ConfigParseError => Some("Fix syntax in .retro/config.toml and retry."),
            Self::IdentityRequired => {
                Some("Pass --user NAME, set RETRO_USER, or add `name` to your user config.")
            }
            Self::NotFound => None,
            Self::Forbidden => {
                Some("Only the owner may edit or delete; attendees may add items and comments.")
            }
            Self::CycleDetected => {
                Some("Pick a parent that is not the retrospective itself or one of its children.")
            }
            Self::AmbiguousId => Some("Use a longer ID prefix to disambiguate."),
            Self::InvalidEnumValue => {
                Some("Use rose/bud/thorn for items and booked/pending_review/declined for trips.")
            }
            Self::ValidationFailed => None,
            Self::CodeSpaceExhausted => Some("Retry, or raise [feedback] code_length in config."),
            Self::CorruptStore => Some("Move .retro/retro.sqlite3 aside and run `retro init`."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Domain errors returned by store operations and the hierarchy model.
#[derive(Debug, thiserror::Error)]
pub enum RetroError {
    #[error("no journal found at {path}")]
    NotInitialized { path: String },

    #[error("config error in {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("this command needs a user identity")]
    IdentityRequired,

    #[error("{kind} not found: '{id}'")]
    NotFound { kind: &'static str, id: String },

    #[error("ID prefix '{prefix}' matches several {kind}s: {}", .candidates.join(", "))]
    AmbiguousId {
        kind: &'static str,
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("user '{user}' may not {action} '{target}'")]
    Forbidden {
        user: String,
        action: &'static str,
        target: String,
    },

    #[error("reparenting '{retro_id}' under '{proposed_parent}' would create a cycle")]
    CycleDetected {
        retro_id: String,
        proposed_parent: String,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("invalid {field} '{value}': expected one of {expected}")]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("no unique feedback code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

impl RetroError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn forbidden(user: &str, action: &'static str, target: &str) -> Self {
        Self::Forbidden {
            user: user.to_string(),
            action,
            target: target.to_string(),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::IdentityRequired => ErrorCode::IdentityRequired,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AmbiguousId { .. } => ErrorCode::AmbiguousId,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::InvalidEnumValue { .. } => ErrorCode::InvalidEnumValue,
            Self::CodeSpaceExhausted { .. } => ErrorCode::CodeSpaceExhausted,
            Self::Db(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for users and scripts.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = RetroError> = std::result::Result<T, E>;
