//! # condql
//!
//! A block-structured condition tree compiler for ORM-backed SQL queries.
//!
//! ## Features
//!
//! - **Declarative conditions**: comparisons and AND/OR groups authored in
//!   closures, compiled to one parameterized SQL fragment
//! - **Schema-checked identifiers**: column and relation names are resolved
//!   against a registered schema at authoring time, not at the database
//! - **Join-path aware**: column references are qualified with the table
//!   alias the host ORM assigned to their relation path
//! - **Pagination metadata**: paginated result sets carry page-navigation
//!   arithmetic computed once from (count, limit, offset)
//! - **ORM agnostic**: fetching, counting, and join reflection are behind
//!   the [`QueryBackend`] trait
//!
//! ## Example
//!
//! ```ignore
//! use condql::{Query, group::desc};
//!
//! let query = Query::build(registry, "Post", |q| {
//!     q.column("title")?.matches("%Rails%");
//!     q.relation_scope("user", |g| {
//!         g.column("name")?.eq("jon");
//!         Ok(())
//!     })?;
//!     q.order_by([desc("id")])?;
//!     q.paginate(2, 20);
//!     Ok(())
//! })?;
//!
//! let results = query.resolve(&backend)?.execute(&backend).await?;
//! let pages = results.pages.as_ref().unwrap();
//! println!("page {} of {}", pages.current(), pages.last());
//! ```

pub mod backend;
pub mod condition;
pub mod error;
pub mod group;
pub mod joins;
pub mod paginator;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod value;

pub use backend::QueryBackend;
pub use condition::{Comparison, SqlFragment};
pub use error::{QueryError, QueryResult};
pub use group::{BoolOp, ConditionGroup, FindOptions, IncludeMap, OrderRef, asc, desc};
pub use joins::{JoinDescriptor, JoinPathMap, JoinPathNode, JoinSet, TableAlias};
pub use paginator::{Page, Paginator};
pub use query::{Query, QueryParams, ResolvedQuery, ResultSet};
pub use schema::{EntitySchema, RelationSchema, SchemaRegistry};
pub use value::Value;
