//! Join-path resolution.
//!
//! The host ORM reports the joins it will emit as a flat list of
//! [`JoinDescriptor`]s, each knowing its own relation name, its parent join,
//! and the table alias assigned to it. [`JoinPathMap::resolve`] folds that
//! list into a hierarchical relation-name map so that every condition group
//! can be handed the alias matching its position in the relation hierarchy.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Table alias metadata assigned to one join clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAlias(String);

impl TableAlias {
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One join clause reported by the host ORM.
///
/// Parent links form a tree; root descriptors hang directly off the base
/// table and have no parent.
#[derive(Debug, Clone)]
pub struct JoinDescriptor {
    relation: String,
    parent: Option<Arc<JoinDescriptor>>,
    alias: TableAlias,
}

impl JoinDescriptor {
    /// Create a descriptor joined directly against the base table.
    pub fn root(relation: impl Into<String>, alias: TableAlias) -> Arc<Self> {
        Arc::new(Self {
            relation: relation.into(),
            parent: None,
            alias,
        })
    }

    /// Create a descriptor joined through a parent join.
    pub fn nested(
        relation: impl Into<String>,
        parent: Arc<JoinDescriptor>,
        alias: TableAlias,
    ) -> Arc<Self> {
        Arc::new(Self {
            relation: relation.into(),
            parent: Some(parent),
            alias,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn parent(&self) -> Option<&Arc<JoinDescriptor>> {
        self.parent.as_ref()
    }

    pub fn alias(&self) -> &TableAlias {
        &self.alias
    }

    /// Root-to-leaf sequence of relation names, by walking parent links.
    pub fn ancestry(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(desc) = current {
            names.push(desc.relation.as_str());
            current = desc.parent.as_deref();
        }
        names.reverse();
        names
    }
}

/// One node of the resolved join hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPathNode {
    alias: Option<TableAlias>,
    children: BTreeMap<String, JoinPathNode>,
}

impl JoinPathNode {
    pub fn alias(&self) -> Option<&TableAlias> {
        self.alias.as_ref()
    }

    pub fn child(&self, relation: &str) -> Option<&JoinPathNode> {
        self.children.get(relation)
    }
}

/// Hierarchical relation-name → alias-metadata map.
///
/// Built once per query and immutable thereafter. Insertion is idempotent
/// per path, so descriptor processing order does not affect the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPathMap {
    root: JoinPathNode,
}

impl JoinPathMap {
    /// Fold a descriptor list into the hierarchy. The base table's alias
    /// sits at the root node.
    pub fn resolve(base: TableAlias, descriptors: &[Arc<JoinDescriptor>]) -> Self {
        let mut root = JoinPathNode {
            alias: Some(base),
            children: BTreeMap::new(),
        };
        for desc in descriptors {
            let mut node = &mut root;
            for name in desc.ancestry() {
                node = node.children.entry(name.to_string()).or_default();
            }
            node.alias = Some(desc.alias().clone());
        }
        Self { root }
    }

    pub fn root(&self) -> &JoinPathNode {
        &self.root
    }

    /// Look up the node at a root-to-leaf relation path.
    pub fn lookup(&self, path: &[&str]) -> Option<&JoinPathNode> {
        let mut node = &self.root;
        for name in path {
            node = node.child(name)?;
        }
        Some(node)
    }
}

/// The join reflection handed back by the external collaborator: the base
/// table's alias plus every join clause the compiled query will need.
#[derive(Debug, Clone)]
pub struct JoinSet {
    pub base: TableAlias,
    pub joins: Vec<Arc<JoinDescriptor>>,
}
