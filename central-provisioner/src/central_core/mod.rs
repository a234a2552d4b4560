use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device-type discriminator sent with every site association.
pub const DEVICE_TYPE_IAP: &str = "IAP";

/// Status code and decoded payload of one Central call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub msg: Value,
}

impl ApiResponse {
    pub fn new(code: u16, msg: Value) -> Self {
        Self { code, msg }
    }

    pub fn ok(msg: Value) -> Self {
        Self::new(200, msg)
    }

    /// Only 200 counts as success.
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Short, single-line rendering of the payload for log and report lines.
    pub fn detail(&self) -> String {
        let text = match &self.msg {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let text = text.replace('\n', " ");
        if text.chars().count() > 200 {
            let cut: String = text.chars().take(200).collect();
            format!("{cut}...")
        } else {
            text
        }
    }
}

/// Full AP settings object. Central requires every field on update even
/// though only `hostname` is ever changed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApSettings {
    pub hostname: String,
    pub ip_address: String,
    pub zonename: String,
    pub achannel: String,
    pub atxpower: String,
    pub gchannel: String,
    pub gtxpower: String,
    pub dot11a_radio_disable: bool,
    pub dot11g_radio_disable: bool,
    pub usb_port_disable: bool,
}

impl ApSettings {
    pub fn hostname_only(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ip_address: "0.0.0.0".into(),
            zonename: String::new(),
            achannel: String::new(),
            atxpower: String::new(),
            gchannel: String::new(),
            gtxpower: String::new(),
            dot11a_radio_disable: false,
            dot11g_radio_disable: false,
            usb_port_disable: false,
        }
    }
}

/// The calls the provisioner makes against Central.
///
/// `Err` means the call never produced a response (connection, timeout,
/// undecodable body). Any response, success or not, comes back as `Ok`.
/// Implementations are shared read-only across in-flight calls.
#[async_trait]
pub trait CentralApi: Send + Sync {
    /// Label recorded in the run report: `central`, `dry-run` or `mock`.
    fn name(&self) -> &'static str;

    async fn list_sites(&self, offset: usize, limit: usize) -> Result<ApiResponse>;

    async fn list_groups(&self, offset: usize, limit: usize) -> Result<ApiResponse>;

    async fn associate_devices(
        &self,
        site_id: &str,
        device_type: &str,
        serials: &[String],
    ) -> Result<ApiResponse>;

    async fn move_devices(&self, group: &str, serials: &[String]) -> Result<ApiResponse>;

    async fn update_ap_settings(&self, serial: &str, settings: &ApSettings) -> Result<ApiResponse>;
}
