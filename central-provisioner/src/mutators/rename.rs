use crate::central_core::{ApSettings, CentralApi};
use crate::types::{Category, CategorySummary, NameMapping, OperationOutcome};

use super::{bounded, failure};

/// One settings update per device with a non-empty name. Empty names count
/// toward the total but are never attempted.
pub async fn rename_devices<C: CentralApi + ?Sized>(
    api: &C,
    names: &NameMapping,
    concurrency: usize,
) -> CategorySummary {
    let pending = names.iter().filter(|(_, name)| !name.is_empty());
    let outcomes = bounded(pending, concurrency, |(serial, name)| async move {
        let settings = ApSettings::hostname_only(name.as_str());
        let result = api.update_ap_settings(serial, &settings).await;
        match &result {
            Ok(resp) if resp.is_success() => {
                tracing::info!(serial = %serial, hostname = %name, "renamed device");
                OperationOutcome::ok(serial.as_str(), format!("renamed to {name}"))
            }
            _ => {
                let outcome = failure(serial, &result);
                tracing::warn!(serial = %serial, detail = %outcome.detail, "rename failed");
                outcome
            }
        }
    })
    .await;

    let summary = CategorySummary::from_outcomes(Category::Names, names.len(), outcomes);
    tracing::info!("Renamed {} out of {} devices", summary.succeeded, summary.total);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockCentral};

    fn names() -> NameMapping {
        [("S1", "ap-1"), ("S2", ""), ("S3", "ap-3")]
            .into_iter()
            .map(|(s, n)| (s.to_string(), n.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn empty_names_are_skipped_without_counting_an_attempt() {
        let api = MockCentral::new();
        let summary = rename_devices(&api, &names(), 1).await;
        assert_eq!(api.calls().renames, 2);
        assert_eq!((summary.succeeded, summary.total, summary.attempted), (2, 3, 2));
        assert_eq!(
            api.log(),
            vec![
                Call::Rename { serial: "S1".into(), hostname: "ap-1".into() },
                Call::Rename { serial: "S3".into(), hostname: "ap-3".into() },
            ]
        );
    }

    #[tokio::test]
    async fn one_failed_rename_gives_one_out_of_three() {
        let api = MockCentral::new().failing("S3");
        let summary = rename_devices(&api, &names(), 2).await;
        assert_eq!((summary.succeeded, summary.total), (1, 3));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.outcomes[1].target, "S3");
    }
}
