//! Re-reading aggregates from the event store.

use gatekeeper_core::dispatcher::Dispatcher;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_identity::domain::queries::{GetUserById, UserView};

/// Reconstitutes each user in `ids` from its history, in order.
///
/// Failures are reported per id; one unreadable history does not stop the
/// others from being inspected.
pub async fn inspect_users(
    dispatcher: &Dispatcher,
    ids: &[Identifier],
) -> Vec<(Identifier, Result<UserView, DomainError>)> {
    let mut results = Vec::with_capacity(ids.len());
    for &user_id in ids {
        let result = dispatcher.dispatch_query(GetUserById { user_id }).await;
        match &result {
            Ok(view) => tracing::info!(
                aggregate_id = %user_id,
                version = view.version,
                enabled = view.enabled,
                "user reconstituted"
            ),
            Err(err) => tracing::error!(aggregate_id = %user_id, error = %err, "inspection failed"),
        }
        results.push((user_id, result));
    }
    results
}
