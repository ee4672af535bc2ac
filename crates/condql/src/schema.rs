//! Static schema description used to resolve identifiers at authoring time.
//!
//! Column and relation names referenced inside an authoring block are checked
//! against an [`EntitySchema`] looked up in a [`SchemaRegistry`]. The registry
//! is built once by the host application from its ORM's reflection data and
//! shared (via `Arc`) by every query built against it.

use crate::error::{QueryError, QueryResult};
use std::collections::HashMap;

/// A named relation (association) from one entity to another.
#[derive(Debug, Clone)]
pub struct RelationSchema {
    /// Relation name as used in authoring blocks.
    pub name: String,
    /// Registry name of the target entity.
    pub target: String,
}

/// Column and relation namespaces for one entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    /// Entity name under which this schema is registered.
    pub name: String,
    /// Database table backing the entity.
    pub table: String,
    /// Column names.
    pub columns: Vec<String>,
    /// Declared relations.
    pub relations: Vec<RelationSchema>,
}

impl EntitySchema {
    /// Create a new entity schema.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Add columns to this entity.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            self.columns.push(col.to_string());
        }
        self
    }

    /// Declare a relation to another registered entity.
    pub fn with_relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(RelationSchema {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Check if this entity has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Look up a declared relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Registry of entity schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity schema under its name.
    pub fn register(&mut self, entity: EntitySchema) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Look up a registered entity, failing if it is unknown.
    pub fn entity(&self, name: &str) -> QueryResult<&EntitySchema> {
        self.entities
            .get(name)
            .ok_or_else(|| QueryError::validation(format!("Entity '{name}' is not registered")))
    }

    /// Check if an entity is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }
}
