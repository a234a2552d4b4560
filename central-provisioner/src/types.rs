use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One manifest row. `serial` is required; everything else is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub serial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ManifestRow {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            site: None,
            group: None,
            name: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Category key (site or group name) -> serials in manifest order.
pub type CategoryMapping = IndexMap<String, Vec<String>>;

/// Serial -> target hostname, in first-seen order.
pub type NameMapping = IndexMap<String, String>;

/// Output of the normalizer: one mapping per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedManifest {
    pub by_site: CategoryMapping,
    pub by_group: CategoryMapping,
    pub by_name: NameMapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSite {
    pub name: String,
    pub id: String,
}

/// Groups carry no separate handle on the provider side; `id` equals `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    pub name: String,
    pub id: String,
}

/// A category key paired with the remote id it resolved to, plus the
/// serials that should land there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub key: String,
    pub id: String,
    pub serials: Vec<String>,
}

/// Mutation families, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sites,
    Groups,
    Names,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Sites, Category::Groups, Category::Names];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sites => "sites",
            Category::Groups => "groups",
            Category::Names => "names",
        }
    }

    /// Comma separated list, unknown entries are ignored.
    pub fn parse_list(s: &str) -> Vec<Category> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let cat = match part.trim().to_lowercase().as_str() {
                "site" | "sites" => Category::Sites,
                "group" | "groups" => Category::Groups,
                "name" | "names" | "rename" => Category::Names,
                _ => continue,
            };
            if !out.contains(&cat) {
                out.push(cat);
            }
        }
        out
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single mutation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub target: String,
    pub succeeded: bool,
    pub detail: String,
    /// Serials the provider reported as failed inside an otherwise
    /// accepted batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

impl OperationOutcome {
    pub fn ok(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            succeeded: true,
            detail: detail.into(),
            rejected: Vec::new(),
        }
    }

    pub fn failed(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            succeeded: false,
            detail: detail.into(),
            rejected: Vec::new(),
        }
    }
}

/// Per-category accounting after a mutation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    /// Entries the category considered, including ones it skipped.
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Devices reported failed inside successful batch calls.
    #[serde(default)]
    pub devices_failed: usize,
    pub outcomes: Vec<OperationOutcome>,
}

impl CategorySummary {
    pub fn from_outcomes(category: Category, total: usize, outcomes: Vec<OperationOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        let devices_failed = outcomes.iter().map(|o| o.rejected.len()).sum();
        Self {
            category,
            total,
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            devices_failed,
            outcomes,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.devices_failed == 0
    }
}
