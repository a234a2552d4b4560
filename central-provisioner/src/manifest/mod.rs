//! Device manifest: reading the tabular file and folding its rows into
//! per-category mappings.

pub mod reader;

use indexmap::IndexMap;

use crate::error::FatalError;
use crate::types::{ManifestRow, NormalizedManifest};

pub use reader::read_manifest;

/// Appends `value` to the sequence under `key`, creating the entry on first sight.
pub fn upsert_append(map: &mut IndexMap<String, Vec<String>>, key: &str, value: &str) {
    match map.get_mut(key) {
        Some(serials) => serials.push(value.to_string()),
        None => {
            map.insert(key.to_string(), vec![value.to_string()]);
        }
    }
}

/// Single pass over `rows`. Any empty serial rejects the whole manifest.
///
/// Site and group sequences keep every row in manifest order, duplicates
/// included. The name mapping is last-write-wins per serial.
pub fn normalize(rows: &[ManifestRow]) -> Result<NormalizedManifest, FatalError> {
    if let Some(idx) = rows.iter().position(|r| r.serial.trim().is_empty()) {
        return Err(FatalError::EmptySerial { row: idx + 1 });
    }

    let mut out = NormalizedManifest::default();
    for row in rows {
        let serial = row.serial.trim();
        if let Some(site) = non_empty(&row.site) {
            upsert_append(&mut out.by_site, site, serial);
        }
        if let Some(group) = non_empty(&row.group) {
            upsert_append(&mut out.by_group, group, serial);
        }
        if let Some(name) = &row.name {
            out.by_name.insert(serial.to_string(), name.trim().to_string());
        }
    }
    Ok(out)
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
