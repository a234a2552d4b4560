//! End-to-end runs of manifest -> resolve -> mutate against the in-memory Central.

use central_provisioner::central::DryRun;
use central_provisioner::manifest::{normalize, reader::read_csv};
use central_provisioner::mock::{Call, MockCentral};
use central_provisioner::{execute, Category, CategoryError, NormalizedManifest, PhaseOutcome, RunOptions};

fn manifest(csv: &str) -> NormalizedManifest {
    let rows = read_csv(csv.as_bytes()).expect("manifest parses");
    normalize(&rows).expect("manifest normalizes")
}

fn inventory() -> MockCentral {
    MockCentral::new()
        .with_site("Lobby", "id-1")
        .with_site("Roof", "id-2")
        .with_group("eng")
        .with_group("sales")
}

// ---------------------------------------------------------------------------
// Site association
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_sites_yield_exactly_two_tagged_association_calls() {
    let m = manifest("serial,site\nA1,Lobby\nA2,Lobby\nA3,Roof\n");
    let api = inventory();

    let report = execute(&api, &m, &RunOptions::default()).await;

    assert_eq!(
        api.log(),
        vec![
            Call::Associate {
                site_id: "id-1".into(),
                device_type: "IAP".into(),
                serials: vec!["A1".into(), "A2".into()],
            },
            Call::Associate {
                site_id: "id-2".into(),
                device_type: "IAP".into(),
                serials: vec!["A3".into()],
            },
        ]
    );
    let sites = report.sites.summary().expect("sites completed");
    assert_eq!((sites.attempted, sites.succeeded), (2, 2));
    assert_eq!(report.groups, PhaseOutcome::Skipped);
    assert_eq!(report.names, PhaseOutcome::Skipped);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn unknown_site_aborts_sites_only() {
    let m = manifest(
        "serial,site,group,name\n\
         A1,Lobby,eng,ap-1\n\
         A2,Annex,sales,ap-2\n",
    );
    let api = inventory();

    let report = execute(&api, &m, &RunOptions::default()).await;

    assert_eq!(
        report.sites,
        PhaseOutcome::Aborted(CategoryError::NotFound {
            category: Category::Sites,
            missing: vec!["Annex".into()],
        })
    );
    assert_eq!(api.calls().associate, 0);
    assert_eq!(api.calls().moves, 2);
    assert_eq!(api.calls().renames, 2);
    assert!(report.groups.is_clean());
    assert!(report.names.is_clean());
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn failed_site_inventory_does_not_block_groups() {
    let m = manifest("serial,site,group\nA1,Lobby,eng\n");
    let api = inventory().failing_site_fetch(401);

    let report = execute(&api, &m, &RunOptions::default()).await;

    assert!(matches!(
        report.sites,
        PhaseOutcome::Aborted(CategoryError::InventoryFetch { code: 401, .. })
    ));
    assert_eq!(api.calls().associate, 0);
    assert_eq!(report.groups.summary().map(|s| s.succeeded), Some(1));
}

// ---------------------------------------------------------------------------
// Skipping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_mappings_issue_no_calls_at_all() {
    let m = manifest("serial,name\nA1,ap-1\n");
    let api = inventory();

    execute(&api, &m, &RunOptions::default()).await;

    let calls = api.calls();
    assert_eq!(calls.list_sites, 0);
    assert_eq!(calls.list_groups, 0);
    assert_eq!(calls.associate, 0);
    assert_eq!(calls.moves, 0);
    assert_eq!(calls.renames, 1);
}

#[tokio::test]
async fn blank_name_column_skips_renames() {
    let m = manifest("serial,name\nA1,\nA2,\n");
    let api = inventory();

    let report = execute(&api, &m, &RunOptions::default()).await;

    assert_eq!(report.names, PhaseOutcome::Skipped);
    assert_eq!(api.calls().renames, 0);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn category_filter_limits_the_run() {
    let m = manifest("serial,site,group,name\nA1,Lobby,eng,ap-1\n");
    let api = inventory();
    let opts = RunOptions {
        categories: Category::parse_list("groups"),
        ..RunOptions::default()
    };

    let report = execute(&api, &m, &opts).await;

    assert_eq!(report.sites, PhaseOutcome::Skipped);
    assert_eq!(report.names, PhaseOutcome::Skipped);
    assert_eq!(api.calls().mutations(), 1);
    assert_eq!(api.calls().list_sites, 0);
}

// ---------------------------------------------------------------------------
// Group moves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_group_is_reported_and_the_next_group_still_moves() {
    let m = manifest("serial,group\nA1,eng\nA2,sales\nA3,eng\n");
    let api = inventory().failing("eng");

    let report = execute(&api, &m, &RunOptions::default()).await;

    let groups = report.groups.summary().expect("groups completed");
    assert_eq!((groups.attempted, groups.succeeded, groups.failed), (2, 1, 1));
    assert_eq!(groups.outcomes[0].target, "eng");
    assert!(!groups.outcomes[0].succeeded);
    assert_eq!(
        api.log()[1],
        Call::Move {
            group: "sales".into(),
            serials: vec!["A2".into()],
        }
    );
}

// ---------------------------------------------------------------------------
// Renames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rename_ratio_counts_blank_names_in_the_total() {
    let csv = "serial,name\nS1,ap-1\nS2,\nS3,ap-3\n";

    let api = inventory();
    let report = execute(&api, &manifest(csv), &RunOptions::default()).await;
    let names = report.names.summary().expect("names completed");
    assert_eq!(api.calls().renames, 2);
    assert_eq!((names.succeeded, names.total), (2, 3));

    let api = inventory().failing("S3");
    let report = execute(&api, &manifest(csv), &RunOptions::default()).await;
    let names = report.names.summary().expect("names completed");
    assert_eq!((names.succeeded, names.total), (1, 3));
}

// ---------------------------------------------------------------------------
// Re-runs, dry runs, concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerunning_the_same_manifest_reports_the_same_way() {
    let m = manifest("serial,site,group,name\nA1,Lobby,eng,ap-1\nA2,Roof,sales,ap-2\n");
    let api = inventory();

    let first = execute(&api, &m, &RunOptions::default()).await;
    let second = execute(&api, &m, &RunOptions::default()).await;

    assert_eq!(first, second);
    assert_eq!(api.calls().associate, 4);
}

#[tokio::test]
async fn dry_run_resolves_but_sends_nothing() {
    let m = manifest("serial,site,group,name\nA1,Lobby,eng,ap-1\n");
    let api = inventory();
    let dry = DryRun::new(api.clone());

    let report = execute(&dry, &m, &RunOptions::default()).await;

    assert_eq!(report.provider, Some("dry-run"));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(api.calls().list_sites, 1);
    assert_eq!(api.calls().list_groups, 1);
    assert_eq!(api.calls().mutations(), 0);
}

#[tokio::test]
async fn concurrent_run_matches_sequential_run() {
    let mut csv = String::from("serial,site,name\n");
    for i in 0..12 {
        let site = if i % 2 == 0 { "Lobby" } else { "Roof" };
        csv.push_str(&format!("S{i},{site},ap-{i}\n"));
    }
    let m = manifest(&csv);

    let sequential = execute(&inventory().failing("S5"), &m, &RunOptions::default()).await;
    let parallel = execute(
        &inventory().failing("S5"),
        &m,
        &RunOptions {
            concurrency: 4,
            ..RunOptions::default()
        },
    )
    .await;

    assert_eq!(sequential, parallel);
    assert_eq!(parallel.names.summary().map(|s| s.failed), Some(1));
}
