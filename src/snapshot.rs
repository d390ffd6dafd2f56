//! Lossless JSON projection of an [`EntityGraph`].
//!
//! Entities nest under their containers, keyed by name-path. Private and
//! superseded entities are included, so [`EntityGraph::from_snapshot`]
//! rebuilds exactly the graph that was saved. Diagnostics are not part of
//! a snapshot.

use crate::config::MemberOrder;
use crate::graph::EntityGraph;
use crate::model::{Entity, ModuleInfo};
use crate::namepath::NamePath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub module: ModuleInfo,
    #[serde(default)]
    pub member_order: MemberOrder,
    /// Top-level entities, and entities whose container is not in the
    /// graph.
    pub entities: IndexMap<NamePath, SnapshotNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub members: IndexMap<NamePath, SnapshotNode>,
}

impl EntityGraph {
    pub fn to_snapshot(&self) -> Snapshot {
        let entities = self.raw_entities();
        let roots = entities
            .values()
            .filter(|e| e.parent.as_ref().is_none_or(|p| !entities.contains_key(p)))
            .map(|e| (e.path.clone(), node(entities, e)))
            .collect();
        Snapshot {
            module: self.module().clone(),
            member_order: self.member_order(),
            entities: roots,
            superseded: self.superseded().to_vec(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut entities = IndexMap::new();
        for (path, node) in snapshot.entities {
            flatten(path, node, &mut entities);
        }
        EntityGraph::new(entities, snapshot.superseded, snapshot.module, snapshot.member_order)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

fn node(entities: &IndexMap<NamePath, Entity>, entity: &Entity) -> SnapshotNode {
    let members = entity
        .members
        .iter()
        .filter_map(|p| entities.get(p))
        .map(|m| (m.path.clone(), node(entities, m)))
        .collect();
    let mut entity = entity.clone();
    entity.members.clear();
    SnapshotNode { entity, members }
}

fn flatten(path: NamePath, node: SnapshotNode, out: &mut IndexMap<NamePath, Entity>) {
    out.insert(path, node.entity);
    for (member_path, member) in node.members {
        flatten(member_path, member, out);
    }
}
