//! Non-fatal warnings collected during a build.

use crate::model::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Tag syntax that could not be parsed and was kept as free text.
    MalformedTag,
    /// More than one visibility annotation on one entity.
    VisibilityConflict,
    /// Documented default differs from the code's default.
    DefaultMismatch,
    /// Documented and code defaults have the same text but different types.
    DefaultTypeMismatch,
    /// `@lends` names an entity that does not exist.
    UnresolvedLendsTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<Location>,
}

/// Ordered warning sink. Every warning is also logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        location: Option<&Location>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match location {
            Some(loc) => tracing::warn!(file = %loc.file, line = loc.line, ?kind, "{message}"),
            None => tracing::warn!(?kind, "{message}"),
        }
        self.items.push(Diagnostic {
            kind,
            message,
            location: location.cloned(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
