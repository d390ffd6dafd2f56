//! Resolution passes that run after every file is normalized: name-path
//! assignment, then visibility, `@lends` and supertypes.

pub mod paths;
pub mod visibility;

use crate::model::Entity;
use crate::namepath::NamePath;
use indexmap::IndexMap;

/// Resolve a textual reference (`Base`, `ns.Base<T>`, `#method`) to a
/// known path: an exact match first, then a unique suffix match.
pub(crate) fn resolve_reference(
    entries: &IndexMap<NamePath, Entity>,
    text: &str,
) -> Option<NamePath> {
    let text = strip_type_args(text.trim());
    let query = NamePath::parse(text).ok()?;
    if entries.contains_key(&query) {
        return Some(query);
    }
    let explicit = text.starts_with(&['.', '#', '~'][..]);
    let mut matches = entries.keys().filter(|k| k.ends_with(&query, explicit));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.clone())
}

/// `Map<K, V>` → `Map`, `Foo[]` → `Foo`.
fn strip_type_args(text: &str) -> &str {
    let end = text.find(&['<', '['][..]).unwrap_or(text.len());
    text[..end].trim_end()
}
