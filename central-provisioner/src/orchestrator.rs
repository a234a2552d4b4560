//! Run sequencing: manifest -> credentials -> sites -> groups -> names.
//!
//! Fatal problems surface as `Err(FatalError)` before any remote call.
//! Once connected, every category ends in a [`PhaseOutcome`] and never
//! stops the categories after it.

use std::path::Path;

use serde::Serialize;

use crate::central::{DryRun, HttpCentral};
use crate::central_core::CentralApi;
use crate::config::{CentralConfig, RawConfig};
use crate::error::{CategoryError, FatalError};
use crate::manifest;
use crate::mutators;
use crate::resolver;
use crate::types::{Category, CategorySummary, NormalizedManifest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// Nothing in the manifest for this category, or it was filtered out.
    Skipped,
    Completed(CategorySummary),
    Aborted(CategoryError),
}

impl PhaseOutcome {
    pub fn summary(&self) -> Option<&CategorySummary> {
        match self {
            PhaseOutcome::Completed(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        match self {
            PhaseOutcome::Skipped => true,
            PhaseOutcome::Completed(s) => s.is_clean(),
            PhaseOutcome::Aborted(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Which [`CentralApi`] ran the phases; `None` when nothing was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    pub sites: PhaseOutcome,
    pub groups: PhaseOutcome,
    pub names: PhaseOutcome,
}

impl RunReport {
    pub fn skipped() -> Self {
        Self {
            provider: None,
            sites: PhaseOutcome::Skipped,
            groups: PhaseOutcome::Skipped,
            names: PhaseOutcome::Skipped,
        }
    }

    pub fn phase(&self, category: Category) -> &PhaseOutcome {
        match category {
            Category::Sites => &self.sites,
            Category::Groups => &self.groups,
            Category::Names => &self.names,
        }
    }

    /// 0 when every phase finished without a failed call or device, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if Category::ALL.iter().all(|c| self.phase(*c).is_clean()) {
            0
        } else {
            1
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub categories: Vec<Category>,
    /// Mutation calls in flight per category; 1 keeps the run strictly sequential.
    pub concurrency: usize,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            concurrency: 1,
            dry_run: false,
        }
    }
}

impl RunOptions {
    fn wants(&self, category: Category, manifest: &NormalizedManifest) -> bool {
        let present = match category {
            Category::Sites => !manifest.by_site.is_empty(),
            Category::Groups => !manifest.by_group.is_empty(),
            // a name column that is entirely blank has nothing to rename
            Category::Names => manifest.by_name.values().any(|n| !n.is_empty()),
        };
        present && self.categories.contains(&category)
    }
}

fn aborted(err: CategoryError) -> PhaseOutcome {
    tracing::error!(error = %err, "category aborted before any change was made");
    PhaseOutcome::Aborted(err)
}

/// Resolves and mutates each category present in `manifest`.
pub async fn execute<C: CentralApi + ?Sized>(
    api: &C,
    manifest: &NormalizedManifest,
    opts: &RunOptions,
) -> RunReport {
    let mut report = RunReport {
        provider: Some(api.name()),
        ..RunReport::skipped()
    };
    tracing::info!(provider = api.name(), "provisioning run started");

    if opts.wants(Category::Sites, manifest) {
        tracing::info!(sites = manifest.by_site.len(), "assigning devices to sites");
        report.sites = match resolver::resolve_sites(api, &manifest.by_site).await {
            Ok(targets) => {
                PhaseOutcome::Completed(mutators::associate_sites(api, &targets, opts.concurrency).await)
            }
            Err(e) => aborted(e),
        };
    }

    if opts.wants(Category::Groups, manifest) {
        tracing::info!(groups = manifest.by_group.len(), "moving devices to groups");
        report.groups = match resolver::resolve_groups(api, &manifest.by_group).await {
            Ok(targets) => {
                PhaseOutcome::Completed(mutators::move_groups(api, &targets, opts.concurrency).await)
            }
            Err(e) => aborted(e),
        };
    }

    if opts.wants(Category::Names, manifest) {
        tracing::info!(devices = manifest.by_name.len(), "renaming devices");
        report.names = PhaseOutcome::Completed(
            mutators::rename_devices(api, &manifest.by_name, opts.concurrency).await,
        );
    }

    report
}

/// Full run against the process environment. See [`provision_with_env`].
pub async fn provision(
    raw: RawConfig,
    data_file: Option<&Path>,
    opts: &RunOptions,
) -> Result<RunReport, FatalError> {
    provision_with_env(raw, data_file, opts, |k| std::env::var(k).ok()).await
}

/// Reads and normalizes the manifest, then resolves credentials through
/// `env`, logs in and runs [`execute`]. A broken manifest is reported
/// before a missing credential.
pub async fn provision_with_env<F>(
    raw: RawConfig,
    data_file: Option<&Path>,
    opts: &RunOptions,
    env: F,
) -> Result<RunReport, FatalError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = data_file
        .map(Path::to_path_buf)
        .or_else(|| raw.data_file(&env))
        .ok_or(FatalError::MissingDataFile)?;
    let rows = manifest::read_manifest(&path)?;
    let normalized = manifest::normalize(&rows)?;
    tracing::info!(
        devices = rows.len(),
        sites = normalized.by_site.len(),
        groups = normalized.by_group.len(),
        names = normalized.by_name.len(),
        "manifest parsed"
    );

    let cfg = CentralConfig::resolve(raw, &env)?;
    tracing::debug!(config = ?cfg, "credentials resolved");

    if !Category::ALL.iter().any(|c| opts.wants(*c, &normalized)) {
        tracing::info!("nothing to provision");
        return Ok(RunReport::skipped());
    }

    tracing::info!("logging into Central...");
    let central = HttpCentral::connect(&cfg).await?;
    let report = if opts.dry_run {
        execute(&DryRun::new(central), &normalized, opts).await
    } else {
        execute(&central, &normalized, opts).await
    };
    Ok(report)
}
