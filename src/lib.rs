//! doclink: documentation-entity extraction and linking.
//!
//! Takes source files already parsed by an external parser (declarations
//! plus raw comments with positions) and builds an immutable graph of
//! documented entities keyed by canonical name-path.
//!
//! ```text
//! SourceFile ─▶ attach ─▶ tags ─▶ normalize
//!            ─▶ paths ─▶ visibility/lends ─▶ EntityGraph
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod model;
pub mod namepath;
pub mod normalize;
pub mod parser;
pub mod resolve;
pub mod snapshot;
pub mod source;

pub use config::{Config, MemberOrder};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{DocError, LookupError, NamePathError};
pub use graph::{EntityGraph, ReferenceKind, UnresolvedReference};
pub use model::{Entity, EntityKind, ModuleInfo, Visibility};
pub use namepath::{Binding, NamePath};
pub use snapshot::Snapshot;
pub use source::SourceFile;

use std::collections::HashSet;

/// A successful build: the graph plus every warning, in order.
#[derive(Debug)]
pub struct Output {
    pub graph: EntityGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the whole pipeline over `files`.
///
/// Files are processed in the order given, or sorted by path when
/// [`Config::sort_files`] is set. That order decides shadowing across files.
/// Each file is normalized independently; path assignment and everything
/// after it run once over all files.
pub fn build(files: &[SourceFile], config: &Config) -> Result<Output, DocError> {
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    if config.sort_files {
        ordered.sort_by(|a, b| a.path.cmp(&b.path));
    }
    let mut seen = HashSet::new();
    for file in &ordered {
        if !seen.insert(file.path.as_str()) {
            return Err(DocError::DuplicateSource(file.path.clone()));
        }
    }

    let units: Vec<normalize::FileUnit> = ordered
        .iter()
        .zip(0u32..)
        .map(|(file, index)| normalize::normalize_file(file, index, config))
        .collect();

    let mut diagnostics = Diagnostics::default();
    let mut module: Option<ModuleInfo> = None;
    let mut drafts = Vec::with_capacity(units.len());
    for unit in units {
        diagnostics.extend(unit.diagnostics);
        if let Some(info) = unit.module {
            module = Some(match module {
                Some(existing) => merge_module(existing, info),
                None => info,
            });
        }
        drafts.push(unit.drafts);
    }
    let mut module = module.unwrap_or_default();
    if module.name.is_empty() {
        module.name = config.root_name.clone();
    }

    let mut registry = resolve::paths::assign_paths(drafts)?;
    resolve::visibility::resolve(&mut registry, &mut diagnostics)?;

    let graph = EntityGraph::new(
        registry.entries,
        registry.superseded,
        module,
        config.member_order,
    );
    tracing::debug!(files = files.len(), warnings = diagnostics.len(), "build finished");
    Ok(Output {
        graph,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Earlier files win for single-valued fields; authors accumulate.
fn merge_module(mut into: ModuleInfo, other: ModuleInfo) -> ModuleInfo {
    if into.name.is_empty() {
        into.name = other.name;
    }
    if into.description.is_empty() {
        into.description = other.description;
    }
    into.version = into.version.or(other.version);
    into.license = into.license.or(other.license);
    for author in other.authors {
        if !into.authors.contains(&author) {
            into.authors.push(author);
        }
    }
    into
}
