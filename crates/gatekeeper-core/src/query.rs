//! Query abstractions.

use async_trait::async_trait;

use crate::error::DomainError;

/// Trait that all queries implement. Queries never change state.
pub trait Query: Send + Sync + std::fmt::Debug + 'static {
    /// Value the query resolves to.
    type Output: Send + 'static;

    /// The type name for this query (for logging/routing).
    fn query_type(&self) -> &'static str;
}

/// Answers exactly one query type.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Resolves the query.
    async fn handle(&self, query: Q) -> Result<Q::Output, DomainError>;
}
