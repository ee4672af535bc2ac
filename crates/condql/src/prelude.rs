//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use condql::prelude::*;
//! ```

pub use crate::backend::QueryBackend;
pub use crate::condition::{Comparison, SqlFragment};
pub use crate::error::{QueryError, QueryResult};
pub use crate::group::{ConditionGroup, IncludeMap, OrderRef, asc, desc};
pub use crate::joins::{JoinDescriptor, JoinSet, TableAlias};
pub use crate::paginator::{Page, Paginator};
pub use crate::query::{Query, QueryParams, ResolvedQuery, ResultSet};
pub use crate::schema::{EntitySchema, SchemaRegistry};
pub use crate::value::Value;
