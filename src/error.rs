//! Error types for doclink.
//!
//! Only structural problems abort a build. Everything recoverable is a
//! [`crate::diagnostics::Diagnostic`] instead.

/// Fatal errors: the build returns no graph.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("cyclic @lends redirection: {}", chain.join(" -> "))]
    LendsCycle { chain: Vec<String> },

    #[error("name-path collision at {path}: {first} and {second} have no deterministic order")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("source file given more than once: {0}")]
    DuplicateSource(String),
}

/// Failure to find a single entity for a (possibly partial) name-path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no entity path ends in {0}")]
    NotFound(String),

    #[error("ambiguous path {suffix}: could be any of {}", candidates.join(", "))]
    Ambiguous {
        suffix: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    InvalidPath(#[from] NamePathError),
}

/// Syntax errors in textual name-paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamePathError {
    #[error("empty name-path")]
    Empty,

    #[error("unterminated quote in name-path: {0}")]
    UnterminatedQuote(String),

    #[error("empty segment in name-path: {0}")]
    EmptySegment(String),
}
