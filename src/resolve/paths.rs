//! Name-path assignment and the shadowing registry.

use crate::error::DocError;
use crate::model::{Entity, Relation, RelationKind};
use crate::namepath::{Binding, NamePath};
use crate::normalize::{Directives, Draft};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Live entities by path, plus everything that lost a path collision.
#[derive(Debug, Default)]
pub struct Registry {
    pub entries: IndexMap<NamePath, Entity>,
    pub superseded: Vec<Entity>,
    pub directives: HashMap<NamePath, Directives>,
}

impl Registry {
    /// Insert under `entity.path`. Returns `false` when an entry from later
    /// in source order already holds the path, in which case `entity` goes
    /// straight to the superseded list.
    pub fn insert(&mut self, mut entity: Entity, directives: Directives) -> Result<bool, DocError> {
        let path = entity.path.clone();
        if let Some(existing) = self.entries.get(&path) {
            match existing.order.cmp(&entity.order) {
                Ordering::Equal => {
                    return Err(DocError::PathCollision {
                        path: path.to_string(),
                        first: describe(existing),
                        second: describe(&entity),
                    });
                }
                Ordering::Greater => {
                    tracing::debug!(%path, "earlier declaration arrived late, superseded");
                    self.superseded.push(entity);
                    return Ok(false);
                }
                Ordering::Less => {
                    tracing::debug!(%path, shadowed = %describe(existing), "shadowing");
                    self.supersede_subtree(&path);
                    entity
                        .relations
                        .push(Relation::unresolved(RelationKind::Shadow, path.to_string()));
                }
            }
        }
        self.directives.insert(path.clone(), directives);
        self.entries.insert(path, entity);
        Ok(true)
    }

    /// Move `path` and everything below it to the superseded list.
    pub fn supersede_subtree(&mut self, path: &NamePath) {
        for key in self.subtree(path) {
            if let Some(entity) = self.entries.shift_remove(&key) {
                self.directives.remove(&key);
                self.superseded.push(entity);
            }
        }
    }

    /// `path` and its descendants, in registry order.
    pub fn subtree(&self, path: &NamePath) -> Vec<NamePath> {
        self.entries
            .keys()
            .filter(|k| *k == path || k.is_descendant_of(path))
            .cloned()
            .collect()
    }

    /// A direct child of `container` named `name`, under any binding.
    fn child_named(&self, container: &NamePath, name: &str) -> Option<NamePath> {
        [Binding::Inner, Binding::Static, Binding::Instance]
            .into_iter()
            .map(|b| container.child(b, name))
            .find(|p| self.entries.contains_key(p))
    }
}

fn describe(entity: &Entity) -> String {
    format!("{} ({}:{})", entity.name, entity.location.file, entity.location.line)
}

/// Walk every file's drafts in processing order and register them.
pub fn assign_paths(files: Vec<Vec<Draft>>) -> Result<Registry, DocError> {
    let mut registry = Registry::default();
    for drafts in files {
        for draft in drafts {
            place(&mut registry, draft, &NamePath::root(), &[])?;
        }
    }
    Ok(registry)
}

fn place(
    registry: &mut Registry,
    draft: Draft,
    container: &NamePath,
    scopes: &[NamePath],
) -> Result<(), DocError> {
    let Draft {
        mut entity,
        binding,
        target,
        member_of,
        directives,
        children,
        ..
    } = draft;

    let path = if let Some(member_of) = member_of.as_deref() {
        let (owner, owner_binding) = split_container(member_of);
        let owner = NamePath::parse(owner)
            .unwrap_or_else(|_| NamePath::root().child(Binding::Static, owner));
        owner.child(owner_binding.unwrap_or(binding), &entity.name)
    } else if let Some(target) = target.as_deref() {
        resolve_target(registry, target, scopes, &entity.name)
    } else {
        container.child(binding, &entity.name)
    };

    entity.parent = path.parent();
    entity.path = path.clone();

    if !registry.insert(entity, directives)? {
        for child in children {
            supersede_draft(registry, child, &path);
        }
        return Ok(());
    }

    let mut inner_scopes = scopes.to_vec();
    inner_scopes.push(path.clone());
    for child in children {
        place(registry, child, &path, &inner_scopes)?;
    }
    Ok(())
}

fn supersede_draft(registry: &mut Registry, draft: Draft, container: &NamePath) {
    let mut entity = draft.entity;
    let path = container.child(draft.binding, &entity.name);
    entity.parent = path.parent();
    entity.path = path.clone();
    registry.superseded.push(entity);
    for child in draft.children {
        supersede_draft(registry, child, &path);
    }
}

/// `Foo.prototype` and `Foo#` name instance members of `Foo`.
pub(crate) fn split_container(text: &str) -> (&str, Option<Binding>) {
    let text = text.trim();
    if let Some(owner) = text.strip_suffix(".prototype") {
        return (owner, Some(Binding::Instance));
    }
    if let Some(owner) = text.strip_suffix('#') {
        return (owner, Some(Binding::Instance));
    }
    (text, None)
}

/// Path for an assignment `a.b.c = ...`. The leading identifier is looked
/// up from the innermost scope outwards; when nothing matches the target is
/// taken as global.
fn resolve_target(registry: &Registry, target: &str, scopes: &[NamePath], name: &str) -> NamePath {
    let (owner_expr, _) = target.rsplit_once('.').unwrap_or(("", target));
    let (owner_expr, binding) = split_container(owner_expr);
    let binding = binding.unwrap_or(Binding::Static);

    let mut idents = owner_expr.split('.').filter(|s| !s.is_empty());
    let Some(head) = idents.next() else {
        return NamePath::root().child(Binding::Static, name);
    };

    let mut owner = scopes
        .iter()
        .rev()
        .chain(std::iter::once(&NamePath::root()))
        .find_map(|scope| registry.child_named(scope, head))
        .unwrap_or_else(|| NamePath::root().child(Binding::Static, head));
    for ident in idents {
        owner = registry
            .child_named(&owner, ident)
            .unwrap_or_else(|| owner.child(Binding::Static, ident));
    }
    owner.child(binding, name)
}
