//! One mutation pass per category. Every call is independent: a failed
//! call becomes a failed outcome and the pass moves on.

mod groups;
mod rename;
mod sites;

use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::central_core::ApiResponse;
use crate::types::OperationOutcome;

pub use groups::move_groups;
pub use rename::rename_devices;
pub use sites::{associate_sites, association_lists};

/// Runs `f` over `items` with at most `concurrency` calls in flight.
/// Outcomes come back in input order.
async fn bounded<I, F, Fut>(items: I, concurrency: usize, f: F) -> Vec<OperationOutcome>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = OperationOutcome>,
{
    stream::iter(items)
        .map(f)
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Failed outcome for a call that answered with a non-200 code or never answered.
fn failure(target: &str, result: &anyhow::Result<ApiResponse>) -> OperationOutcome {
    match result {
        Ok(resp) => OperationOutcome::failed(target, format!("code {}: {}", resp.code, resp.detail())),
        Err(e) => OperationOutcome::failed(target, format!("transport error: {e:#}")),
    }
}
