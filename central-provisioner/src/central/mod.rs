//! Concrete [`CentralApi`](crate::central_core::CentralApi) providers.

pub mod dry_run;
pub mod http;

pub use dry_run::DryRun;
pub use http::HttpCentral;
