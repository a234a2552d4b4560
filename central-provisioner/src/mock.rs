//! In-memory Central used by tests: fixed inventory, injectable failures,
//! and a log of every call made against it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::central::http::site_id_value;
use crate::central_core::{ApiResponse, ApSettings, CentralApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Associate {
        site_id: String,
        device_type: String,
        serials: Vec<String>,
    },
    Move {
        group: String,
        serials: Vec<String>,
    },
    Rename {
        serial: String,
        hostname: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_sites: usize,
    pub list_groups: usize,
    pub associate: usize,
    pub moves: usize,
    pub renames: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.associate + self.moves + self.renames
    }
}

#[derive(Default)]
struct State {
    sites: Vec<(String, String)>,
    groups: Vec<String>,
    site_fetch_code: Option<u16>,
    group_fetch_code: Option<u16>,
    failing: HashSet<String>,
    unreachable: HashSet<String>,
    rejected: HashSet<String>,
    associate_reply: Option<Value>,
    counts: CallCounts,
    log: Vec<Call>,
}

#[derive(Clone, Default)]
pub struct MockCentral {
    state: Arc<Mutex<State>>,
}

impl MockCentral {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_site(self, name: &str, id: &str) -> Self {
        self.state().sites.push((name.into(), id.into()));
        self
    }

    pub fn with_group(self, name: &str) -> Self {
        self.state().groups.push(name.into());
        self
    }

    /// Site listing answers with `code` instead of the inventory.
    pub fn failing_site_fetch(self, code: u16) -> Self {
        self.state().site_fetch_code = Some(code);
        self
    }

    pub fn failing_group_fetch(self, code: u16) -> Self {
        self.state().group_fetch_code = Some(code);
        self
    }

    /// Mutations aimed at `target` (site id, group name or serial) get a 500.
    pub fn failing(self, target: &str) -> Self {
        self.state().failing.insert(target.into());
        self
    }

    /// Mutations aimed at `target` fail before any response arrives.
    pub fn unreachable(self, target: &str) -> Self {
        self.state().unreachable.insert(target.into());
        self
    }

    /// Site associations report `serial` in their `failed` list.
    pub fn rejecting(self, serial: &str) -> Self {
        self.state().rejected.insert(serial.into());
        self
    }

    /// Successful site associations answer with `payload` verbatim.
    pub fn associate_reply(self, payload: Value) -> Self {
        self.state().associate_reply = Some(payload);
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.state().counts
    }

    pub fn log(&self) -> Vec<Call> {
        self.state().log.clone()
    }

    fn mutation(&self, target: &str, call: Call, ok: Value) -> Result<ApiResponse> {
        let mut st = self.state();
        match &call {
            Call::Associate { .. } => st.counts.associate += 1,
            Call::Move { .. } => st.counts.moves += 1,
            Call::Rename { .. } => st.counts.renames += 1,
        }
        st.log.push(call);
        if st.unreachable.contains(target) {
            return Err(anyhow!("connection reset while calling {target}"));
        }
        if st.failing.contains(target) {
            return Ok(ApiResponse::new(500, json!({ "description": "internal error" })));
        }
        Ok(ApiResponse::ok(ok))
    }
}

fn page<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl CentralApi for MockCentral {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_sites(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        let mut st = self.state();
        st.counts.list_sites += 1;
        if let Some(code) = st.site_fetch_code {
            return Ok(ApiResponse::new(code, json!("site listing unavailable")));
        }
        let sites: Vec<Value> = page(&st.sites, offset, limit)
            .into_iter()
            .map(|(name, id)| json!({ "site_id": site_id_value(&id), "site_name": name }))
            .collect();
        Ok(ApiResponse::ok(json!({ "sites": sites, "total": st.sites.len() })))
    }

    async fn list_groups(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        let mut st = self.state();
        st.counts.list_groups += 1;
        if let Some(code) = st.group_fetch_code {
            return Ok(ApiResponse::new(code, json!("group listing unavailable")));
        }
        let data: Vec<Value> = page(&st.groups, offset, limit)
            .into_iter()
            .map(|g| json!([g]))
            .collect();
        Ok(ApiResponse::ok(json!({ "data": data, "total": st.groups.len() })))
    }

    async fn associate_devices(
        &self,
        site_id: &str,
        device_type: &str,
        serials: &[String],
    ) -> Result<ApiResponse> {
        let (rejected, reply) = {
            let st = self.state();
            (st.rejected.clone(), st.associate_reply.clone())
        };
        let (failed, success): (Vec<&String>, Vec<&String>) =
            serials.iter().partition(|s| rejected.contains(*s));
        let call = Call::Associate {
            site_id: site_id.into(),
            device_type: device_type.into(),
            serials: serials.to_vec(),
        };
        let payload = reply.unwrap_or_else(|| json!({ "success": success, "failed": failed }));
        self.mutation(site_id, call, payload)
    }

    async fn move_devices(&self, group: &str, serials: &[String]) -> Result<ApiResponse> {
        let call = Call::Move {
            group: group.into(),
            serials: serials.to_vec(),
        };
        self.mutation(group, call, json!("Devices moved"))
    }

    async fn update_ap_settings(&self, serial: &str, settings: &ApSettings) -> Result<ApiResponse> {
        let call = Call::Rename {
            serial: serial.into(),
            hostname: settings.hostname.clone(),
        };
        self.mutation(serial, call, json!("Success"))
    }
}
