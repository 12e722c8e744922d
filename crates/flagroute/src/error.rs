use thiserror::Error;

use crate::key::OptionKind;

/// Coarse classification of a [`ParseError`], for boundary layers that map
/// failures to exit codes or messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    UnknownOption,
    Validation,
    File,
    DuplicateAlias,
    RequiredMissing,
    DependencyMissing,
    Declaration,
    NotParsed,
}

/// The single terminal failure of a parse call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Malformed token, or a flag missing its following value.
    #[error("unable to parse option {token}: {reason}")]
    Syntax { token: String, reason: String },

    #[error("unknown option, {0}, specified")]
    UnknownOption(String),

    /// A `must` rule rejected the raw value.
    #[error("invalid value for {option}: {value}")]
    Validation { option: String, value: String },

    #[error("{option}: {reason}: {path}")]
    File {
        option: String,
        path: String,
        reason: String,
    },

    #[error("alias conflict: '{alias}' already refers to '{existing}'")]
    DuplicateAlias { alias: String, existing: String },

    #[error("required {kind} {name} must be specified")]
    RequiredMissing { kind: OptionKind, name: String },

    #[error("option \"{name}\" does not have required option(s): {}", missing.join(", "))]
    DependencyMissing { name: String, missing: Vec<String> },

    /// Invalid declaration chain, reported by the next `parse` call.
    #[error("invalid declaration: {0}")]
    Declaration(String),

    #[error("arguments have not been parsed")]
    NotParsed,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnknownOption(_) => ErrorKind::UnknownOption,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::File { .. } => ErrorKind::File,
            Self::DuplicateAlias { .. } => ErrorKind::DuplicateAlias,
            Self::RequiredMissing { .. } => ErrorKind::RequiredMissing,
            Self::DependencyMissing { .. } => ErrorKind::DependencyMissing,
            Self::Declaration(_) => ErrorKind::Declaration,
            Self::NotParsed => ErrorKind::NotParsed,
        }
    }

    pub(crate) fn syntax(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
