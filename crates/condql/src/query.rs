//! Query orchestration.
//!
//! Building a query is a two-phase sequence made explicit in the types:
//! [`Query::build`] runs the authoring closure and returns the unresolved
//! tree; [`Query::resolve`] asks the backend for join descriptors, pushes
//! alias metadata into the tree, and returns a [`ResolvedQuery`] that can
//! be compiled and executed.

use crate::backend::QueryBackend;
use crate::condition::SqlFragment;
use crate::error::QueryResult;
use crate::group::{BoolOp, ConditionGroup, IncludeMap};
use crate::joins::JoinPathMap;
use crate::paginator::Paginator;
use crate::schema::SchemaRegistry;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Compiled query parameters, ready to hand to the external fetch
/// operation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Compiled predicate; `None` when the tree contributes no conditions.
    pub conditions: Option<SqlFragment>,
    /// Eager-loading instructions.
    pub include: IncludeMap,
    /// ORDER BY clause body.
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Free-form extra options, passed through untouched.
    pub extra: BTreeMap<String, Value>,
}

impl QueryParams {
    /// Copy with pagination stripped, for the row-count operation.
    pub fn without_pagination(&self) -> QueryParams {
        QueryParams {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

/// An authored condition tree, not yet bound to join aliases.
#[derive(Debug, Clone)]
pub struct Query {
    registry: Arc<SchemaRegistry>,
    root: ConditionGroup,
}

impl Query {
    /// Run an authoring closure against a fresh conjunctive root group
    /// bound to `entity`. Construction must complete before any read.
    pub fn build(
        registry: Arc<SchemaRegistry>,
        entity: &str,
        f: impl FnOnce(&mut ConditionGroup) -> QueryResult<()>,
    ) -> QueryResult<Self> {
        registry.entity(entity)?;
        let mut root =
            ConditionGroup::new(registry.clone(), entity.to_string(), BoolOp::And, None);
        f(&mut root)?;
        Ok(Self { registry, root })
    }

    pub fn conditions(&self) -> &ConditionGroup {
        &self.root
    }

    pub fn include(&self) -> IncludeMap {
        self.root.include()
    }

    /// Resolve join aliases through the backend's association reflection.
    pub fn resolve<B: QueryBackend>(mut self, backend: &B) -> QueryResult<ResolvedQuery> {
        let include = self.root.include();
        let schema = self.registry.entity(self.root.entity())?;
        let joins = backend.join_set(schema, &include)?;
        let map = JoinPathMap::resolve(joins.base.clone(), &joins.joins);
        self.root.assign_aliases(Some(map.root()));
        tracing::debug!(
            entity = self.root.entity(),
            joins = joins.joins.len(),
            "resolved join aliases"
        );
        Ok(ResolvedQuery { root: self.root })
    }
}

/// A condition tree with join aliases assigned, ready to compile and run.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    root: ConditionGroup,
}

impl ResolvedQuery {
    pub fn conditions(&self) -> &ConditionGroup {
        &self.root
    }

    pub fn to_sql(&self) -> Option<SqlFragment> {
        self.root.to_sql()
    }

    pub fn order_clause(&self) -> Option<String> {
        self.root.order_clause()
    }

    pub fn include(&self) -> IncludeMap {
        self.root.include()
    }

    /// Compile the full parameter set for the external fetch operation.
    pub fn to_params(&self) -> QueryParams {
        let options = self.root.options();
        QueryParams {
            conditions: self.root.to_sql(),
            include: self.root.include(),
            order: self.root.order_clause(),
            limit: options.limit(),
            offset: options.offset(),
            extra: options.extra().clone(),
        }
    }

    /// Fetch rows through the backend; when pagination was requested
    /// anywhere in the tree, additionally count rows and attach a
    /// [`Paginator`] built from the root group's limit and offset.
    pub async fn execute<B: QueryBackend>(
        &self,
        backend: &B,
    ) -> QueryResult<ResultSet<B::Row>> {
        let params = self.to_params();
        tracing::debug!(
            sql = params.conditions.as_ref().map(|f| f.sql.as_str()),
            paginated = self.root.paginated(),
            "executing query"
        );
        let rows = backend.fetch(&params).await?;

        if !self.root.paginated() {
            return Ok(ResultSet {
                rows,
                pages: None,
                total_results: None,
            });
        }

        let total = backend.count(&params.without_pagination()).await?;
        let pages = Paginator::new(
            total,
            params.limit.unwrap_or(0),
            params.offset.unwrap_or(0),
        )?;
        Ok(ResultSet {
            rows,
            pages: Some(pages),
            total_results: Some(total),
        })
    }
}

/// Rows returned by the backend, with pagination metadata attached when it
/// was requested.
#[derive(Debug, Clone)]
pub struct ResultSet<R> {
    pub rows: Vec<R>,
    pub pages: Option<Paginator>,
    pub total_results: Option<u64>,
}

impl<R> std::ops::Deref for ResultSet<R> {
    type Target = [R];

    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl<R> IntoIterator for ResultSet<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
