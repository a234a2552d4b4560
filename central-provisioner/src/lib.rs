//! Bulk device provisioning for Aruba Central.
//!
//! A manifest of serials (with optional site, group and hostname columns)
//! is normalized into per-category mappings, resolved against Central's
//! current site and group inventory, and applied as independent batch
//! calls whose per-item failures are reported rather than fatal.

pub mod central;
pub mod central_core;
pub mod config;
pub mod error;
pub mod manifest;
pub mod mock;
pub mod mutators;
pub mod orchestrator;
pub mod out;
pub mod resolver;
pub mod types;

pub use central_core::{ApiResponse, ApSettings, CentralApi};
pub use config::{CentralConfig, RawConfig};
pub use error::{CategoryError, FatalError};
pub use orchestrator::{execute, provision, provision_with_env, PhaseOutcome, RunOptions, RunReport};
pub use types::{Category, CategorySummary, ManifestRow, NormalizedManifest, OperationOutcome};
