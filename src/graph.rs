//! The final, immutable entity graph and its queries.

use crate::config::MemberOrder;
use crate::error::LookupError;
use crate::model::{Entity, EntityKind, ModuleInfo, RelationKind, Visibility};
use crate::namepath::{Binding, NamePath};
use crate::resolve::resolve_reference;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// What a `@see` target resolved to, and who refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SeeEntry {
    resolved: Option<NamePath>,
    referrers: Vec<NamePath>,
}

/// A reference to a name that is not in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference<'a> {
    pub from: &'a NamePath,
    pub kind: ReferenceKind,
    pub target: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    See,
    Extends,
    Implements,
    Lends,
}

/// Every live entity keyed by name-path, in source order, with indexes.
/// Private entities are kept but only reachable through the `*_any`
/// accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGraph {
    module: ModuleInfo,
    member_order: MemberOrder,
    entities: IndexMap<NamePath, Entity>,
    public: IndexSet<NamePath>,
    by_kind: IndexMap<EntityKind, Vec<NamePath>>,
    /// Direct members per container. Top-level entities are under the root
    /// path.
    by_container: IndexMap<NamePath, Vec<NamePath>>,
    see_index: IndexMap<String, SeeEntry>,
    superseded: Vec<Entity>,
}

impl EntityGraph {
    /// Build the indexes. Entities are ordered by source order.
    pub(crate) fn new(
        mut entities: IndexMap<NamePath, Entity>,
        superseded: Vec<Entity>,
        module: ModuleInfo,
        member_order: MemberOrder,
    ) -> Self {
        entities.sort_by(|_, a, _, b| a.order.cmp(&b.order));

        let mut by_container: IndexMap<NamePath, Vec<NamePath>> = IndexMap::new();
        let mut by_kind: IndexMap<EntityKind, Vec<NamePath>> = IndexMap::new();
        for (path, entity) in &entities {
            let container = entity.parent.clone().unwrap_or_default();
            by_container.entry(container).or_default().push(path.clone());
            by_kind.entry(entity.kind).or_default().push(path.clone());
        }
        if member_order == MemberOrder::Alphabetical {
            for members in by_container.values_mut() {
                members.sort_by(|a, b| {
                    let (na, nb) = (a.name().unwrap_or_default(), b.name().unwrap_or_default());
                    na.to_lowercase()
                        .cmp(&nb.to_lowercase())
                        .then_with(|| na.cmp(nb))
                        .then_with(|| a.cmp(b))
                });
            }
        }
        for (path, entity) in entities.iter_mut() {
            entity.members = by_container.get(path).cloned().unwrap_or_default();
        }

        let public = entities
            .keys()
            .filter(|path| is_public(&entities, path))
            .cloned()
            .collect();

        let mut see_index: IndexMap<String, SeeEntry> = IndexMap::new();
        for (path, entity) in &entities {
            for target in &entity.see_also {
                see_index
                    .entry(target.clone())
                    .or_insert_with(|| SeeEntry {
                        resolved: resolve_reference(&entities, target),
                        referrers: Vec::new(),
                    })
                    .referrers
                    .push(path.clone());
            }
        }

        tracing::debug!(
            entities = entities.len(),
            superseded = superseded.len(),
            "entity graph built"
        );
        Self {
            module,
            member_order,
            entities,
            public,
            by_kind,
            by_container,
            see_index,
            superseded,
        }
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn member_order(&self) -> MemberOrder {
        self.member_order
    }

    /// Public entity at `path`.
    pub fn get(&self, path: &NamePath) -> Option<&Entity> {
        if !self.public.contains(path) {
            return None;
        }
        self.entities.get(path)
    }

    /// Entity at `path`, private ones included.
    pub fn get_any(&self, path: &NamePath) -> Option<&Entity> {
        self.entities.get(path)
    }

    /// Public entity by textual path: exact, else unique suffix.
    pub fn find(&self, text: &str) -> Result<&Entity, LookupError> {
        let path = NamePath::parse(text)?;
        if let Some(entity) = self.get(&path) {
            return Ok(entity);
        }
        self.lookup_suffix(text)
    }

    /// Public entities in source order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.public.iter().filter_map(|p| self.entities.get(p))
    }

    /// Every live entity, private ones included.
    pub fn entities_any(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty()
    }

    /// Public direct members of `container`, in the configured order. The
    /// root path lists top-level entities.
    pub fn members_of(&self, container: &NamePath) -> Vec<&Entity> {
        self.by_container
            .get(container)
            .into_iter()
            .flatten()
            .filter_map(|p| self.get(p))
            .collect()
    }

    pub fn by_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|p| self.get(p))
            .collect()
    }

    /// Entities that lost a path collision, in the order they lost.
    pub fn superseded(&self) -> &[Entity] {
        &self.superseded
    }

    /// Entities whose `@see` resolves to `path`.
    pub fn referrers_of(&self, path: &NamePath) -> Vec<&Entity> {
        let mut seen = HashSet::new();
        self.see_index
            .values()
            .filter(|e| e.resolved.as_ref() == Some(path))
            .flat_map(|e| e.referrers.iter())
            .filter(|p| seen.insert(*p))
            .filter_map(|p| self.entities.get(p))
            .collect()
    }

    /// `@see`, `extends`, `implements` and `@lends` targets that name
    /// nothing in the graph.
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference<'_>> {
        let mut out = Vec::new();
        for (path, entity) in &self.entities {
            for target in &entity.see_also {
                if self.see_index.get(target).is_some_and(|e| e.resolved.is_none()) {
                    out.push(UnresolvedReference {
                        from: path,
                        kind: ReferenceKind::See,
                        target,
                    });
                }
            }
            for relation in entity.relations.iter().filter(|r| r.resolved.is_none()) {
                let kind = match relation.kind {
                    RelationKind::Extends => ReferenceKind::Extends,
                    RelationKind::Implements => ReferenceKind::Implements,
                    RelationKind::Lends => ReferenceKind::Lends,
                    RelationKind::Shadow => continue,
                };
                out.push(UnresolvedReference {
                    from: path,
                    kind,
                    target: &relation.target,
                });
            }
        }
        out
    }

    /// Own public members followed by inherited ones, composed along
    /// resolved `extends` and `implements` relations. A member is hidden by
    /// a closer one with the same name and binding. Cycles are cut.
    pub fn effective_members(&self, path: &NamePath) -> Vec<&Entity> {
        let mut out: Vec<&Entity> = Vec::new();
        let mut taken: HashSet<(&str, Option<Binding>)> = HashSet::new();
        let mut visited: HashSet<&NamePath> = HashSet::new();
        let mut queue: Vec<&NamePath> = vec![path];

        while !queue.is_empty() {
            let current = queue.remove(0);
            if !visited.insert(current) {
                continue;
            }
            let Some(entity) = self.entities.get(current) else {
                continue;
            };
            for member in self.members_of(current) {
                if taken.insert((member.name.as_str(), member.path.binding())) {
                    out.push(member);
                }
            }
            for relation in &entity.relations {
                if matches!(relation.kind, RelationKind::Extends | RelationKind::Implements) {
                    if let Some(target) = &relation.resolved {
                        queue.push(target);
                    }
                }
            }
        }
        out
    }

    /// The unique public entity whose path ends with `text`. A leading
    /// separator (`#method`) must match the binding too.
    pub fn lookup_suffix(&self, text: &str) -> Result<&Entity, LookupError> {
        let query = NamePath::parse(text)?;
        let explicit = text.starts_with(&['.', '#', '~'][..]);
        let candidates: Vec<&NamePath> = self
            .public
            .iter()
            .filter(|p| p.ends_with(&query, explicit))
            .collect();

        match candidates.as_slice() {
            [] => Err(LookupError::NotFound(text.to_string())),
            [only] => self
                .entities
                .get(*only)
                .ok_or_else(|| LookupError::NotFound(text.to_string())),
            many => {
                if let Some(exact) = many.iter().find(|p| ***p == query) {
                    if let Some(entity) = self.entities.get(*exact) {
                        return Ok(entity);
                    }
                }
                let mut candidates: Vec<String> = many.iter().map(|p| p.to_string()).collect();
                candidates.sort();
                Err(LookupError::Ambiguous {
                    suffix: text.to_string(),
                    candidates,
                })
            }
        }
    }

    pub(crate) fn raw_entities(&self) -> &IndexMap<NamePath, Entity> {
        &self.entities
    }
}

/// Not private, and no live ancestor is private either.
fn is_public(entities: &IndexMap<NamePath, Entity>, path: &NamePath) -> bool {
    let mut current = Some(path.clone());
    while let Some(p) = current {
        if entities.get(&p).is_some_and(|e| e.visibility == Visibility::Private) {
            return false;
        }
        current = p.parent();
    }
    true
}
