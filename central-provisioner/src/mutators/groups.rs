use crate::central_core::CentralApi;
use crate::types::{Category, CategorySummary, OperationOutcome, ResolvedTarget};

use super::{bounded, failure};

/// One move call per resolved group.
pub async fn move_groups<C: CentralApi + ?Sized>(
    api: &C,
    targets: &[ResolvedTarget],
    concurrency: usize,
) -> CategorySummary {
    let outcomes = bounded(targets, concurrency, |t| async move {
        tracing::info!(group = %t.key, devices = t.serials.len(), "moving devices to group");
        let result = api.move_devices(&t.id, &t.serials).await;
        match &result {
            Ok(resp) if resp.is_success() => {
                tracing::info!(group = %t.key, "successfully moved devices");
                OperationOutcome::ok(&t.key, format!("{} devices moved", t.serials.len()))
            }
            _ => {
                let outcome = failure(&t.key, &result);
                tracing::warn!(group = %t.key, detail = %outcome.detail, "group move failed, continuing to next group");
                outcome
            }
        }
    })
    .await;
    CategorySummary::from_outcomes(Category::Groups, targets.len(), outcomes)
}
