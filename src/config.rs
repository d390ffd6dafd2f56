//! Build configuration.

use serde::{Deserialize, Serialize};

/// Order of entries in by-container indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberOrder {
    #[default]
    Declaration,
    Alphabetical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lines allowed between the end of a doc comment and the declaration
    /// it documents. 0 means the comment must be immediately adjacent.
    pub max_comment_gap: u32,
    pub member_order: MemberOrder,
    /// Process files sorted by path rather than in the order given.
    pub sort_files: bool,
    /// Root namespace name used when no `@module` tag supplies one.
    pub root_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_comment_gap: 0,
            member_order: MemberOrder::Declaration,
            sort_files: false,
            root_name: "global".to_string(),
        }
    }
}
