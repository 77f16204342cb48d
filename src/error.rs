//! Error types for the DCF parsing and dependency-query core.
//!
//! Each subsystem gets its own `thiserror`-derived `Error`/`ErrorKind` pair
//! following the `{source: XxxErrorKind}` shape used elsewhere in this
//! codebase (see the sync module's errors), so a caller that only cares
//! whether something went wrong can match on the outer type, while one that
//! needs detail can match on `.source`.

use std::fmt;

/// A byte range into the buffer a [`crate::dcf::Parser`] was given.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Span(pub usize, pub usize);

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.0, self.1)
    }
}

/// Errors raised while parsing a [`crate::Version`], [`crate::Operator`], or
/// a standalone [`crate::NameAndVersionConstraint`].
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("invalid version format: {0:?}")]
    InvalidVersionFormat(String),
    #[error("invalid operator: {0:?}")]
    InvalidOperator(String),
    #[error("invalid name format: {0:?}")]
    InvalidNameFormat(String),
}

/// Structural errors raised while tokenizing/parsing a DCF buffer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DcfErrorKind {
    #[error("expected ':' at {0}")]
    ExpectedColon(Span),
    #[error("expected an identifier at {0}")]
    ExpectedIdentifier(Span),
    #[error("expected a version literal at {0}")]
    ExpectedVersion(Span),
    #[error("expected a comparison operator at {0}")]
    ExpectedOperator(Span),
    #[error("expected ')' at {0}")]
    ExpectedCloseParen(Span),
    #[error("unexpected end of input")]
    UnexpectedEof,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to parse DCF input")]
#[non_exhaustive]
pub struct DcfError {
    pub span: Span,
    pub source: DcfErrorKind,
}

impl DcfError {
    pub fn new(span: Span, source: DcfErrorKind) -> Self {
        Self { span, source }
    }
}

/// Errors raised by [`crate::Repository`] queries.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryErrorKind {
    #[error("package {0:?} not found, or no version satisfies the requested constraint")]
    NotFound(String),
    #[error(
        "constraint for {name:?} is unsatisfiable: {lower} and {upper} cannot both hold"
    )]
    UnsatisfiableConstraint {
        name: String,
        lower: String,
        upper: String,
    },
    #[error("cyclic dependency detected among: {0:?}")]
    CyclicDependencies(Vec<String>),
    #[error(transparent)]
    Dcf(#[from] DcfError),
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct RepositoryError {
    pub source: RepositoryErrorKind,
}

impl From<RepositoryErrorKind> for RepositoryError {
    fn from(source: RepositoryErrorKind) -> Self {
        Self { source }
    }
}

impl From<DcfError> for RepositoryError {
    fn from(error: DcfError) -> Self {
        Self {
            source: RepositoryErrorKind::Dcf(error),
        }
    }
}

/// Errors raised by [`crate::Index`] queries.
#[derive(Debug, thiserror::Error)]
pub enum IndexErrorKind {
    #[error("package {0:?} not found in the repository this index was built from")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct IndexError {
    pub source: IndexErrorKind,
}

impl From<IndexErrorKind> for IndexError {
    fn from(source: IndexErrorKind) -> Self {
        Self { source }
    }
}

/// Errors raised while reading or decompressing a DCF source from disk/network.
#[derive(Debug, thiserror::Error)]
pub enum IoErrorKind {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct IoError {
    pub source: IoErrorKind,
}

impl From<std::io::Error> for IoError {
    fn from(error: std::io::Error) -> Self {
        Self {
            source: IoErrorKind::Io(error),
        }
    }
}

impl From<walkdir::Error> for IoError {
    fn from(error: walkdir::Error) -> Self {
        Self {
            source: IoErrorKind::Walk(error),
        }
    }
}

/// Errors raised by the fetch/orchestration layer that sits above the core.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationErrorKind {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to fetch {url:?}: {message}")]
    Fetch { url: String, message: String },
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct OrchestrationError {
    pub source: OrchestrationErrorKind,
}

impl From<IoError> for OrchestrationError {
    fn from(error: IoError) -> Self {
        Self {
            source: OrchestrationErrorKind::Io(error),
        }
    }
}

impl From<RepositoryError> for OrchestrationError {
    fn from(error: RepositoryError) -> Self {
        Self {
            source: OrchestrationErrorKind::Repository(error),
        }
    }
}

impl From<OrchestrationErrorKind> for OrchestrationError {
    fn from(source: OrchestrationErrorKind) -> Self {
        Self { source }
    }
}
