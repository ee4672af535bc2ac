//! External collaborator interface.
//!
//! The core never touches the database itself: join reflection, row
//! fetching, and row counting are delegated to the host ORM through
//! [`QueryBackend`]. Failures propagate unchanged; the core performs no
//! retries and imposes no timeout of its own.

use crate::error::QueryResult;
use crate::group::IncludeMap;
use crate::joins::JoinSet;
use crate::query::QueryParams;
use crate::schema::EntitySchema;
use std::future::Future;

/// The host ORM's fetch/count/reflection surface.
pub trait QueryBackend: Sync {
    /// Row type produced by the host ORM.
    type Row;

    /// Reflect the join clauses needed to reach every relation in
    /// `include`, together with the base table's alias.
    fn join_set(&self, entity: &EntitySchema, include: &IncludeMap) -> QueryResult<JoinSet>;

    /// Fetch rows for compiled query params.
    fn fetch(
        &self,
        params: &QueryParams,
    ) -> impl Future<Output = QueryResult<Vec<Self::Row>>> + Send;

    /// Count matching rows. Receives conditions and include only; the
    /// orchestrator strips pagination before calling.
    fn count(&self, params: &QueryParams) -> impl Future<Output = QueryResult<u64>> + Send;
}
