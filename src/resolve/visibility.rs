//! Visibility finalization, `@lends` redirection and supertype linking.

use super::paths::{split_container, Registry};
use super::resolve_reference;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::DocError;
use crate::model::{Relation, RelationKind, Visibility};
use crate::namepath::{Binding, NamePath};
use std::collections::HashMap;

pub fn resolve(registry: &mut Registry, diags: &mut Diagnostics) -> Result<(), DocError> {
    finalize_visibility(registry, diags);
    redirect_lends(registry, diags)?;
    link_supertypes(registry);
    Ok(())
}

/// Default public; the most restrictive explicit mark wins.
fn finalize_visibility(registry: &mut Registry, diags: &mut Diagnostics) {
    for (path, entity) in registry.entries.iter_mut() {
        let marks = registry
            .directives
            .get(path)
            .map(|d| d.visibility.as_slice())
            .unwrap_or_default();
        let visibility = marks.iter().copied().max().unwrap_or(Visibility::Public);

        let mut distinct = marks.to_vec();
        distinct.sort();
        distinct.dedup();
        if distinct.len() > 1 {
            diags.warn(
                DiagnosticKind::VisibilityConflict,
                Some(&entity.location),
                format!("{path}: conflicting visibility {distinct:?}, using {visibility:?}"),
            );
        }
        entity.visibility = visibility;
    }
}

fn redirect_lends(registry: &mut Registry, diags: &mut Diagnostics) -> Result<(), DocError> {
    let lends: Vec<(NamePath, String)> = registry
        .entries
        .keys()
        .filter_map(|p| {
            let target = registry.directives.get(p)?.lends.clone()?;
            Some((p.clone(), target))
        })
        .collect();
    if lends.is_empty() {
        return Ok(());
    }

    // Every hop is resolved before anything moves, so chains are followed
    // through the original layout.
    let mut hops: HashMap<NamePath, (NamePath, Binding)> = HashMap::new();
    for (source, text) in &lends {
        let (owner, binding) = split_container(text);
        match resolve_reference(&registry.entries, owner) {
            Some(target) => {
                hops.insert(source.clone(), (target, binding.unwrap_or(Binding::Static)));
            }
            None => {
                if let Some(entity) = registry.entries.get_mut(source) {
                    diags.warn(
                        DiagnosticKind::UnresolvedLendsTarget,
                        Some(&entity.location),
                        format!("{source}: @lends target {text} not found, members left in place"),
                    );
                    entity.relations.push(Relation::unresolved(RelationKind::Lends, text.clone()));
                }
            }
        }
    }

    for (source, text) in &lends {
        let Some(first_hop) = hops.get(source) else {
            continue;
        };
        let (target, binding) = follow_chain(source, first_hop, &hops)?;
        if !registry.entries.contains_key(source) {
            continue;
        }

        tracing::debug!(%source, %target, "redirecting members");
        move_members(registry, source, &target, binding)?;

        let drop_source = match registry.entries.get_mut(source) {
            Some(_) if target == *source => false,
            Some(entity) => {
                entity.relations.push(Relation {
                    kind: RelationKind::Lends,
                    target: text.clone(),
                    resolved: Some(target.clone()),
                });
                entity.visibility == Visibility::Private || entity.description.trim().is_empty()
            }
            None => false,
        };
        if drop_source {
            registry.supersede_subtree(source);
        }
    }
    Ok(())
}

/// Follow `@lends` hops to the final target. Revisiting any path, or
/// lending into the source's own subtree, is a cycle. A hop from an entity
/// to itself (`@lends Person.prototype` on `Person`) only rebinds its
/// members and ends the chain there.
fn follow_chain(
    source: &NamePath,
    first_hop: &(NamePath, Binding),
    hops: &HashMap<NamePath, (NamePath, Binding)>,
) -> Result<(NamePath, Binding), DocError> {
    if first_hop.0 == *source {
        return Ok(first_hop.clone());
    }
    let mut chain = vec![source.clone()];
    let (mut target, mut binding) = first_hop.clone();
    loop {
        if chain.contains(&target) || target.is_descendant_of(source) {
            chain.push(target);
            return Err(DocError::LendsCycle {
                chain: chain.iter().map(ToString::to_string).collect(),
            });
        }
        match hops.get(&target) {
            Some((next, next_binding)) if *next == target => return Ok((target, *next_binding)),
            Some(next) => {
                chain.push(target);
                (target, binding) = next.clone();
            }
            None => return Ok((target, binding)),
        }
    }
}

/// Re-parent every descendant of `source` under `target`. Direct members
/// take `binding`; deeper members keep theirs.
fn move_members(
    registry: &mut Registry,
    source: &NamePath,
    target: &NamePath,
    binding: Binding,
) -> Result<(), DocError> {
    let moved: Vec<NamePath> = registry
        .subtree(source)
        .into_iter()
        .filter(|p| p != source)
        .collect();
    let mut lost: Vec<NamePath> = Vec::new();

    for old in moved {
        let Some(mut entity) = registry.entries.shift_remove(&old) else {
            continue;
        };
        let directives = registry.directives.remove(&old).unwrap_or_default();
        let new_path = relocate(&old, source, target, binding);
        entity.parent = new_path.parent();
        entity.path = new_path.clone();

        if lost.iter().any(|l| new_path.is_descendant_of(l)) {
            registry.superseded.push(entity);
            continue;
        }
        if !registry.insert(entity, directives)? {
            lost.push(new_path);
        }
    }
    Ok(())
}

fn relocate(old: &NamePath, source: &NamePath, target: &NamePath, binding: Binding) -> NamePath {
    let mut path = target.clone();
    for (i, seg) in old.segments()[source.len()..].iter().enumerate() {
        let seg_binding = if i == 0 { binding } else { seg.binding };
        path = path.child(seg_binding, &seg.name);
    }
    path
}

/// Resolve `extends`/`implements` targets that name known entities. The
/// rest stay unresolved.
fn link_supertypes(registry: &mut Registry) {
    let mut found: Vec<(usize, usize, NamePath)> = Vec::new();
    for (i, entity) in registry.entries.values().enumerate() {
        for (j, relation) in entity.relations.iter().enumerate() {
            let supertype =
                matches!(relation.kind, RelationKind::Extends | RelationKind::Implements);
            if !supertype || relation.resolved.is_some() {
                continue;
            }
            if let Some(path) = resolve_reference(&registry.entries, &relation.target) {
                found.push((i, j, path));
            }
        }
    }
    for (i, j, path) in found {
        if let Some((_, entity)) = registry.entries.get_index_mut(i) {
            entity.relations[j].resolved = Some(path);
        }
    }
}
