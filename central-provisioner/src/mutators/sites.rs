use serde_json::Value;

use crate::central_core::{CentralApi, DEVICE_TYPE_IAP};
use crate::types::{Category, CategorySummary, OperationOutcome, ResolvedTarget};

use super::{bounded, failure};

/// Extracts the `(succeeded, failed)` serial lists from an association
/// response. Entries may be bare serials or objects naming one. `None` when
/// the payload carries neither list.
pub fn association_lists(msg: &Value) -> Option<(Vec<String>, Vec<String>)> {
    let list = |keys: &[&str]| -> Option<Vec<String>> {
        keys.iter()
            .find_map(|k| msg.get(*k))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(serial_of).collect())
    };
    match (list(&["success", "succeeded"]), list(&["failed", "failure"])) {
        (None, None) => None,
        (ok, failed) => Some((ok.unwrap_or_default(), failed.unwrap_or_default())),
    }
}

fn serial_of(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => ["device_id", "serial"]
            .iter()
            .find_map(|k| o.get(*k))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// One association call per resolved site, carrying that site's full serial list.
pub async fn associate_sites<C: CentralApi + ?Sized>(
    api: &C,
    targets: &[ResolvedTarget],
    concurrency: usize,
) -> CategorySummary {
    let outcomes = bounded(targets, concurrency, |t| async move {
        tracing::info!(site = %t.key, site_id = %t.id, devices = t.serials.len(), "assigning devices to site");
        let result = api.associate_devices(&t.id, DEVICE_TYPE_IAP, &t.serials).await;
        match &result {
            Ok(resp) if resp.is_success() => {
                let Some((ok, rejected)) = association_lists(&resp.msg) else {
                    tracing::info!(site = %t.key, "devices submitted, no per-device result returned");
                    return OperationOutcome::ok(&t.key, format!("{} devices submitted", t.serials.len()));
                };
                if rejected.is_empty() {
                    tracing::info!(site = %t.key, "successfully assigned devices");
                } else {
                    tracing::warn!(site = %t.key, failed = ?rejected, "some devices were not assigned");
                }
                let mut outcome = OperationOutcome::ok(
                    &t.key,
                    format!("{} succeeded, {} failed", ok.len(), rejected.len()),
                );
                outcome.rejected = rejected;
                outcome
            }
            _ => {
                let outcome = failure(&t.key, &result);
                tracing::warn!(site = %t.key, detail = %outcome.detail, "site assignment failed, continuing to next site");
                outcome
            }
        }
    })
    .await;
    CategorySummary::from_outcomes(Category::Sites, targets.len(), outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockCentral};
    use serde_json::json;

    fn target(key: &str, id: &str, serials: &[&str]) -> ResolvedTarget {
        ResolvedTarget {
            key: key.into(),
            id: id.into(),
            serials: serials.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn association_lists_accepts_strings_and_objects() {
        let msg = json!({"success": ["A1", {"device_id": "A2"}], "failed": [{"serial": "A3", "reason": "x"}]});
        let (ok, failed) = association_lists(&msg).unwrap();
        assert_eq!(ok, vec!["A1", "A2"]);
        assert_eq!(failed, vec!["A3"]);
        assert_eq!(association_lists(&json!({"success": []})), Some((vec![], vec![])));
        assert_eq!(association_lists(&json!("done")), None);
        assert_eq!(association_lists(&json!({"status": "ok"})), None);
    }

    #[tokio::test]
    async fn payload_without_lists_reports_devices_submitted() {
        let api = MockCentral::new().associate_reply(json!("done"));
        let summary = associate_sites(&api, &[target("Lobby", "1", &["A1", "A2", "A3"])], 1).await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.devices_failed, 0);
        assert_eq!(summary.outcomes[0].detail, "3 devices submitted");
        assert!(summary.outcomes[0].rejected.is_empty());
    }

    #[tokio::test]
    async fn partial_success_is_recorded_not_failed() {
        let api = MockCentral::new().rejecting("A2");
        let summary = associate_sites(&api, &[target("Lobby", "1", &["A1", "A2"])], 1).await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.devices_failed, 1);
        assert_eq!(summary.outcomes[0].rejected, vec!["A2"]);
        assert_eq!(summary.outcomes[0].detail, "1 succeeded, 1 failed");
    }

    #[tokio::test]
    async fn one_failing_site_does_not_stop_the_next() {
        let api = MockCentral::new().failing("1").unreachable("2");
        let targets = [
            target("Lobby", "1", &["A1"]),
            target("Roof", "2", &["A2"]),
            target("Yard", "3", &["A3"]),
        ];
        let summary = associate_sites(&api, &targets, 1).await;
        assert_eq!((summary.attempted, summary.succeeded, summary.failed), (3, 1, 2));
        assert!(summary.outcomes[0].detail.starts_with("code 500"));
        assert!(summary.outcomes[1].detail.starts_with("transport error"));
        assert_eq!(api.calls().associate, 3);
        assert!(api.log().iter().all(|c| matches!(c, Call::Associate { device_type, .. } if device_type == "IAP")));
    }

    #[tokio::test]
    async fn concurrent_pass_keeps_outcome_order() {
        let api = MockCentral::new();
        let targets: Vec<_> = (0..6).map(|i| target(&format!("s{i}"), &i.to_string(), &["X"])).collect();
        let summary = associate_sites(&api, &targets, 4).await;
        let keys: Vec<_> = summary.outcomes.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(keys, vec!["s0", "s1", "s2", "s3", "s4", "s5"]);
        assert!(summary.is_clean());
    }
}
