//! Condition group trees and their compiler.
//!
//! A [`ConditionGroup`] is a boolean-combined collection of comparisons and
//! nested groups, bound to one entity of a [`SchemaRegistry`]. Identifiers
//! are checked against the entity's column and relation namespaces when the
//! authoring closure runs; anything unknown fails immediately with
//! [`QueryError::UnknownReference`].

use crate::condition::{Comparison, SqlFragment};
use crate::error::{QueryError, QueryResult};
use crate::joins::{JoinPathNode, TableAlias};
use crate::schema::SchemaRegistry;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Boolean combinator for a group, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    fn separator(self) -> &'static str {
        match self {
            BoolOp::And => " AND ",
            BoolOp::Or => " OR ",
        }
    }
}

/// One ordering directive: a column reference plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRef {
    pub(crate) column: String,
    pub(crate) descending: bool,
}

impl OrderRef {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Ascending ordering directive.
pub fn asc(column: impl Into<String>) -> OrderRef {
    OrderRef::asc(column)
}

/// Descending ordering directive.
pub fn desc(column: impl Into<String>) -> OrderRef {
    OrderRef::desc(column)
}

/// Nested eager-loading instructions for the host ORM: the set of relation
/// paths touched by a group and its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncludeMap(BTreeMap<String, IncludeMap>);

impl IncludeMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, relation: &str) -> Option<&IncludeMap> {
        self.0.get(relation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IncludeMap)> {
        self.0.iter()
    }

    fn entry(&mut self, relation: &str) -> &mut IncludeMap {
        self.0.entry(relation.to_string()).or_default()
    }
}

/// Auxiliary query options carried alongside the compiled conditions.
///
/// `limit`/`offset` merge rather than replace: setting a limit without an
/// offset preserves a previously set offset. Extra options merge per key,
/// last write wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    limit: Option<u64>,
    offset: Option<u64>,
    extra: BTreeMap<String, Value>,
}

impl FindOptions {
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

#[derive(Debug, Clone)]
enum GroupNode {
    Cmp(Comparison),
    Group(ConditionGroup),
}

/// A boolean-combined collection of comparisons and nested groups.
#[derive(Debug, Clone)]
pub struct ConditionGroup {
    registry: Arc<SchemaRegistry>,
    entity: String,
    op: BoolOp,
    relation: Option<String>,
    children: Vec<GroupNode>,
    order: Vec<OrderRef>,
    negated: bool,
    paginate_requested: bool,
    options: FindOptions,
    alias: Option<TableAlias>,
}

impl ConditionGroup {
    pub(crate) fn new(
        registry: Arc<SchemaRegistry>,
        entity: String,
        op: BoolOp,
        relation: Option<String>,
    ) -> Self {
        Self {
            registry,
            entity,
            op,
            relation,
            children: Vec::new(),
            order: Vec::new(),
            negated: false,
            paginate_requested: false,
            options: FindOptions::default(),
            alias: None,
        }
    }

    /// Name of the entity this group is bound to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The relation this group scopes into; `None` for the base query scope.
    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    /// Append a comparison on one of the entity's columns and return it for
    /// fluent configuration.
    pub fn column(&mut self, name: &str) -> QueryResult<&mut Comparison> {
        let schema = self.registry.entity(&self.entity)?;
        if !schema.has_column(name) {
            return Err(QueryError::unknown_reference(name, &self.entity));
        }
        self.children.push(GroupNode::Cmp(Comparison::new(name)));
        match self.children.last_mut() {
            Some(GroupNode::Cmp(cmp)) => Ok(cmp),
            _ => unreachable!("a comparison was just pushed"),
        }
    }

    /// Open a relation-scoped subgroup bound to the relation's target
    /// entity. The subgroup inherits this group's boolean combinator.
    pub fn relation_scope(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ConditionGroup) -> QueryResult<()>,
    ) -> QueryResult<()> {
        let schema = self.registry.entity(&self.entity)?;
        let Some(rel) = schema.relation(name) else {
            return Err(QueryError::unknown_reference(name, &self.entity));
        };
        let target = rel.target.clone();
        self.registry.entity(&target)?;
        let mut group = ConditionGroup::new(
            self.registry.clone(),
            target,
            self.op,
            Some(name.to_string()),
        );
        f(&mut group)?;
        self.children.push(GroupNode::Group(group));
        Ok(())
    }

    /// Nested disjunctive subgroup on the same entity.
    pub fn any(&mut self, f: impl FnOnce(&mut ConditionGroup) -> QueryResult<()>) -> QueryResult<()> {
        self.subgroup(BoolOp::Or, f)
    }

    /// Nested conjunctive subgroup on the same entity.
    pub fn all(&mut self, f: impl FnOnce(&mut ConditionGroup) -> QueryResult<()>) -> QueryResult<()> {
        self.subgroup(BoolOp::And, f)
    }

    fn subgroup(
        &mut self,
        op: BoolOp,
        f: impl FnOnce(&mut ConditionGroup) -> QueryResult<()>,
    ) -> QueryResult<()> {
        let mut group =
            ConditionGroup::new(self.registry.clone(), self.entity.clone(), op, None);
        f(&mut group)?;
        self.children.push(GroupNode::Group(group));
        Ok(())
    }

    /// Toggle negation; double negation cancels.
    pub fn negate(&mut self) -> &mut Self {
        self.negated = !self.negated;
        self
    }

    /// Append ordering directives. Column references are validated against
    /// this group's entity.
    pub fn order_by(&mut self, refs: impl IntoIterator<Item = OrderRef>) -> QueryResult<()> {
        let schema = self.registry.entity(&self.entity)?;
        for r in refs {
            if !schema.has_column(&r.column) {
                return Err(QueryError::unknown_reference(&r.column, &self.entity));
            }
            self.order.push(r);
        }
        Ok(())
    }

    /// Request pagination: `limit = per_page`, `offset = (page-1)*per_page`.
    pub fn paginate(&mut self, page: u64, per_page: u64) {
        self.paginate_requested = true;
        let page = page.max(1);
        self.limit(per_page, Some((page - 1) * per_page));
    }

    /// Set a row limit; a `None` offset preserves any previously set offset.
    pub fn limit(&mut self, limit: u64, offset: Option<u64>) {
        self.options.limit = Some(limit);
        if offset.is_some() {
            self.options.offset = offset;
        }
    }

    /// Set a free-form extra option, last write wins per key.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.extra.insert(key.into(), value.into());
    }

    /// Whether pagination was requested on this group or any descendant.
    pub fn paginated(&self) -> bool {
        self.paginate_requested
            || self
                .children
                .iter()
                .any(|c| matches!(c, GroupNode::Group(g) if g.paginated()))
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Compile the group to a parenthesized predicate. Children producing
    /// no fragment are skipped; a group with zero contributing children
    /// contributes nothing itself.
    pub fn to_sql(&self) -> Option<SqlFragment> {
        let frags: Vec<SqlFragment> = self
            .children
            .iter()
            .filter_map(|child| match child {
                GroupNode::Cmp(cmp) => cmp.to_sql(),
                GroupNode::Group(group) => group.to_sql(),
            })
            .collect();
        if frags.is_empty() {
            return None;
        }

        let joined = frags
            .iter()
            .map(|f| f.sql.as_str())
            .collect::<Vec<_>>()
            .join(self.op.separator());
        let sql = if self.negated {
            format!("NOT ({joined})")
        } else {
            format!("({joined})")
        };
        let params = frags.into_iter().flat_map(|f| f.params).collect();
        Some(SqlFragment { sql, params })
    }

    /// Render ordering directives for this group and its descendants as an
    /// ORDER BY clause body. `None` when no directives exist.
    pub fn order_clause(&self) -> Option<String> {
        let mut parts = Vec::new();
        self.collect_order(&mut parts);
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    fn collect_order(&self, out: &mut Vec<String>) {
        for r in &self.order {
            let mut rendered = match &self.alias {
                Some(alias) => format!("{alias}.{}", r.column),
                None => r.column.clone(),
            };
            if r.descending {
                rendered.push_str(" DESC");
            }
            out.push(rendered);
        }
        for child in &self.children {
            if let GroupNode::Group(group) = child {
                group.collect_order(out);
            }
        }
    }

    /// Collect the relation paths touched below this group, deduplicated,
    /// as eager-loading instructions for the host ORM.
    pub fn include(&self) -> IncludeMap {
        let mut map = IncludeMap::default();
        self.collect_include(&mut map);
        map
    }

    fn collect_include(&self, map: &mut IncludeMap) {
        for child in &self.children {
            if let GroupNode::Group(group) = child {
                match &group.relation {
                    Some(rel) => group.collect_include(map.entry(rel)),
                    None => group.collect_include(map),
                }
            }
        }
    }

    /// Push alias metadata down the tree. `node` is the join-path node for
    /// this group's own scope; a relation with no matching node leaves the
    /// subtree unqualified.
    pub(crate) fn assign_aliases(&mut self, node: Option<&JoinPathNode>) {
        self.alias = node.and_then(|n| n.alias().cloned());
        let alias = self.alias.clone();
        for child in &mut self.children {
            match child {
                GroupNode::Cmp(cmp) => cmp.set_alias(alias.clone()),
                GroupNode::Group(group) => {
                    let child_node = match &group.relation {
                        Some(rel) => node.and_then(|n| n.child(rel)),
                        None => node,
                    };
                    group.assign_aliases(child_node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joins::{JoinDescriptor, JoinPathMap};
    use crate::schema::EntitySchema;

    fn registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        registry.register(
            EntitySchema::new("Address", "addresses")
                .with_columns(&["id", "address", "city", "state", "zip"])
                .with_relation("company", "Company"),
        );
        registry.register(
            EntitySchema::new("Company", "companies")
                .with_columns(&["id", "name"])
                .with_relation("users", "User")
                .with_relation("addresses", "Address"),
        );
        registry.register(
            EntitySchema::new("User", "users")
                .with_columns(&["id", "name"])
                .with_relation("company", "Company"),
        );
        registry.register(
            EntitySchema::new("Tag", "tags").with_columns(&["id", "name"]),
        );
        Arc::new(registry)
    }

    fn root_for(entity: &str) -> ConditionGroup {
        ConditionGroup::new(registry(), entity.to_string(), BoolOp::And, None)
    }

    fn with_base_alias(group: &mut ConditionGroup, table: &str) {
        let map = JoinPathMap::resolve(TableAlias::new(table), &[]);
        group.assign_aliases(Some(map.root()));
    }

    #[test]
    fn conjunction_blocks_join_with_correct_words() {
        let mut root = root_for("Tag");
        root.any(|g| {
            g.column("id")?.eq(1i64);
            g.column("id")?.eq(2i64);
            g.all(|g| {
                g.column("name")?.eq("Stuff");
                g.column("name")?.eq("Rails");
                Ok(())
            })
        })
        .unwrap();
        root.any(|g| {
            g.column("name")?.eq("Things");
            g.column("id")?.eq(3i64);
            Ok(())
        })
        .unwrap();
        with_base_alias(&mut root, "tags");

        let frag = root.to_sql().unwrap();
        assert_eq!(
            frag.sql,
            "((tags.id = ? OR tags.id = ? OR (tags.name = ? AND tags.name = ?)) \
             AND (tags.name = ? OR tags.id = ?))"
        );
        assert_eq!(
            frag.params,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::from("Stuff"),
                Value::from("Rails"),
                Value::from("Things"),
                Value::Int(3),
            ]
        );
    }

    #[test]
    fn negated_groups_and_comparisons() {
        let mut root = root_for("Company");
        root.any(|g| {
            g.negate();
            g.column("id")?.eq(1i64);
            g.column("id")?.eq(2i64);
            Ok(())
        })
        .unwrap();
        root.column("id").unwrap().eq(3i64).negate();
        with_base_alias(&mut root, "companies");

        let frag = root.to_sql().unwrap();
        assert_eq!(
            frag.sql,
            "(NOT (companies.id = ? OR companies.id = ?) AND NOT (companies.id = ?))"
        );
        assert_eq!(
            frag.params,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn double_negation_cancels() {
        let mut root = root_for("Tag");
        root.column("id").unwrap().eq(1i64);
        root.negate().negate();
        with_base_alias(&mut root, "tags");

        assert_eq!(root.to_sql().unwrap().sql, "(tags.id = ?)");
    }

    #[test]
    fn operator_less_children_are_skipped() {
        let mut root = root_for("Tag");
        root.column("id").unwrap();
        root.column("name").unwrap().eq("Rails");
        with_base_alias(&mut root, "tags");

        assert_eq!(root.to_sql().unwrap().sql, "(tags.name = ?)");
    }

    #[test]
    fn empty_group_contributes_nothing() {
        let mut root = root_for("Tag");
        root.any(|_| Ok(())).unwrap();
        root.column("id").unwrap();
        assert!(root.to_sql().is_none());
    }

    #[test]
    fn unknown_column_is_a_binding_error() {
        let mut root = root_for("Tag");
        let err = root.column("colour").unwrap_err();
        match err {
            QueryError::UnknownReference { name, entity } => {
                assert_eq!(name, "colour");
                assert_eq!(entity, "Tag");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_relation_is_a_binding_error() {
        let mut root = root_for("Tag");
        let err = root.relation_scope("owner", |_| Ok(())).unwrap_err();
        assert!(err.is_unknown_reference());
    }

    #[test]
    fn ordering_directives() {
        let mut root = root_for("Address");
        root.order_by([asc("id")]).unwrap();
        with_base_alias(&mut root, "addresses");
        assert_eq!(root.order_clause().unwrap(), "addresses.id");

        let mut root = root_for("Address");
        root.order_by([desc("id")]).unwrap();
        with_base_alias(&mut root, "addresses");
        assert_eq!(root.order_clause().unwrap(), "addresses.id DESC");

        let mut root = root_for("Address");
        root.order_by([asc("state"), desc("id")]).unwrap();
        with_base_alias(&mut root, "addresses");
        assert_eq!(root.order_clause().unwrap(), "addresses.state, addresses.id DESC");
    }

    #[test]
    fn ordering_collects_across_relation_subgroups() {
        let mut root = root_for("Address");
        root.order_by([desc("state"), asc("id"), desc("address")])
            .unwrap();
        root.relation_scope("company", |g| g.order_by([asc("name")]))
            .unwrap();

        let company = JoinDescriptor::root("company", TableAlias::new("companies"));
        let map = JoinPathMap::resolve(TableAlias::new("addresses"), &[company]);
        root.assign_aliases(Some(map.root()));

        assert_eq!(
            root.order_clause().unwrap(),
            "addresses.state DESC, addresses.id, addresses.address DESC, companies.name"
        );
    }

    #[test]
    fn no_directives_means_no_clause() {
        let mut root = root_for("Address");
        root.column("id").unwrap().eq(1i64);
        assert_eq!(root.order_clause(), None);
    }

    #[test]
    fn ordering_validates_columns() {
        let mut root = root_for("Address");
        assert!(root.order_by([asc("nope")]).is_err());
    }

    #[test]
    fn include_collects_and_deduplicates_relations() {
        let mut root = root_for("Address");
        root.relation_scope("company", |g| {
            g.column("name")?.eq("initech");
            Ok(())
        })
        .unwrap();
        root.any(|g| {
            g.relation_scope("company", |g| {
                g.relation_scope("users", |g| {
                    g.column("name")?.eq("jon");
                    Ok(())
                })
            })
        })
        .unwrap();

        let include = root.include();
        let company = include.get("company").unwrap();
        assert!(company.get("users").unwrap().is_empty());
        assert_eq!(include.iter().count(), 1);
    }

    #[test]
    fn include_serializes_as_nested_map() {
        let mut root = root_for("Address");
        root.relation_scope("company", |g| {
            g.relation_scope("users", |_| Ok(()))
        })
        .unwrap();
        assert_eq!(
            serde_json::to_string(&root.include()).unwrap(),
            r#"{"company":{"users":{}}}"#
        );
    }

    #[test]
    fn missing_join_path_leaves_columns_unqualified() {
        let mut root = root_for("Address");
        root.column("id").unwrap().eq(1i64);
        root.relation_scope("company", |g| {
            g.column("name")?.eq("initech");
            Ok(())
        })
        .unwrap();
        // The resolved join set knows nothing about "company".
        with_base_alias(&mut root, "addresses");

        assert_eq!(
            root.to_sql().unwrap().sql,
            "(addresses.id = ? AND (name = ?))"
        );
    }

    #[test]
    fn pagination_is_transitive() {
        let mut root = root_for("Tag");
        assert!(!root.paginated());
        root.any(|g| {
            g.paginate(2, 4);
            Ok(())
        })
        .unwrap();
        assert!(root.paginated());
    }

    #[test]
    fn paginate_computes_limit_and_offset() {
        let mut root = root_for("Tag");
        root.paginate(2, 4);
        assert_eq!(root.options().limit(), Some(4));
        assert_eq!(root.options().offset(), Some(4));
    }

    #[test]
    fn limit_preserves_existing_offset() {
        let mut root = root_for("Tag");
        root.limit(10, Some(30));
        root.limit(5, None);
        assert_eq!(root.options().limit(), Some(5));
        assert_eq!(root.options().offset(), Some(30));
    }

    #[test]
    fn extra_options_merge_last_write_wins() {
        let mut root = root_for("Tag");
        root.set_option("lock", true);
        root.set_option("lock", false);
        root.set_option("group", "tags.name");
        assert_eq!(root.options().extra().get("lock"), Some(&Value::Bool(false)));
        assert_eq!(
            root.options().extra().get("group"),
            Some(&Value::from("tags.name"))
        );
    }

    #[test]
    fn relation_subgroup_inherits_boolean_op() {
        let mut root = root_for("Address");
        root.any(|g| {
            g.relation_scope("company", |g| {
                g.column("id")?.eq(1i64);
                g.column("id")?.eq(2i64);
                Ok(())
            })
        })
        .unwrap();

        // Inner relation group joins with OR, inherited from `any`.
        assert_eq!(root.to_sql().unwrap().sql, "(((id = ? OR id = ?)))");
    }
}
