use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::central_core::{ApiResponse, ApSettings, CentralApi};

/// Reads inventory through `inner`, logs mutations instead of sending them.
pub struct DryRun<C> {
    inner: C,
}

impl<C: CentralApi> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: CentralApi> CentralApi for DryRun<C> {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn list_sites(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        self.inner.list_sites(offset, limit).await
    }

    async fn list_groups(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        self.inner.list_groups(offset, limit).await
    }

    async fn associate_devices(
        &self,
        site_id: &str,
        device_type: &str,
        serials: &[String],
    ) -> Result<ApiResponse> {
        tracing::info!(site_id, device_type, devices = serials.len(), "dry-run: would associate devices");
        Ok(ApiResponse::ok(json!({ "success": serials, "failed": [] })))
    }

    async fn move_devices(&self, group: &str, serials: &[String]) -> Result<ApiResponse> {
        tracing::info!(group, devices = serials.len(), "dry-run: would move devices");
        Ok(ApiResponse::ok(json!("dry-run")))
    }

    async fn update_ap_settings(&self, serial: &str, settings: &ApSettings) -> Result<ApiResponse> {
        tracing::info!(serial, hostname = %settings.hostname, "dry-run: would rename device");
        Ok(ApiResponse::ok(json!("dry-run")))
    }
}
