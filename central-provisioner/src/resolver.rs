//! Name -> id resolution against one inventory snapshot per category.
//!
//! The snapshot is fetched in full (all pages) before any lookup, and a
//! single missing or ambiguous name fails the whole category.

use std::collections::HashMap;
use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use crate::central_core::{ApiResponse, CentralApi};
use crate::error::CategoryError;
use crate::types::{Category, CategoryMapping, RemoteGroup, RemoteSite, ResolvedTarget};

pub const SITE_PAGE_SIZE: usize = 1000;
pub const GROUP_PAGE_SIZE: usize = 20;

struct Page<T> {
    items: Vec<T>,
    /// Raw listing entries on this page, which is what offsets count.
    consumed: usize,
    total: Option<usize>,
}

#[derive(Deserialize)]
struct SiteEntry {
    #[serde(alias = "name")]
    site_name: String,
    #[serde(alias = "id")]
    site_id: Value,
}

async fn paginate<T, F, Fut>(
    category: Category,
    page_size: usize,
    mut fetch: F,
    parse: fn(&Value) -> Result<Page<T>, String>,
) -> Result<Vec<T>, CategoryError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = anyhow::Result<ApiResponse>>,
{
    let mut out = Vec::new();
    let mut offset = 0;
    loop {
        let resp = fetch(offset, page_size)
            .await
            .map_err(|e| CategoryError::Transport {
                category,
                detail: format!("{e:#}"),
            })?;
        if !resp.is_success() {
            return Err(CategoryError::InventoryFetch {
                category,
                code: resp.code,
                detail: resp.detail(),
            });
        }
        let page = parse(&resp.msg)
            .map_err(|detail| CategoryError::MalformedInventory { category, detail })?;
        offset += page.consumed;
        out.extend(page.items);

        let more = match page.total {
            Some(total) => page.consumed > 0 && offset < total,
            None => page.consumed == page_size,
        };
        if !more {
            break;
        }
    }
    Ok(out)
}

fn total_of(msg: &Value) -> Option<usize> {
    msg.get("total").and_then(Value::as_u64).map(|t| t as usize)
}

/// Accepts `{"sites": [...]}` as well as a bare list.
fn parse_site_page(msg: &Value) -> Result<Page<RemoteSite>, String> {
    let list = match msg {
        Value::Array(_) => msg,
        Value::Object(o) => o.get("sites").ok_or("no 'sites' field in site listing")?,
        other => return Err(format!("unexpected site listing: {other}")),
    };
    let entries: Vec<SiteEntry> = serde_json::from_value(list.clone()).map_err(|e| e.to_string())?;
    let mut items = Vec::with_capacity(entries.len());
    for e in entries {
        let id = match e.site_id {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            other => return Err(format!("site '{}' has unusable id {other}", e.site_name)),
        };
        items.push(RemoteSite { name: e.site_name, id });
    }
    Ok(Page {
        consumed: items.len(),
        items,
        total: total_of(msg),
    })
}

/// Accepts `{"data": [["name"], ...]}` as well as a bare nested list.
fn parse_group_page(msg: &Value) -> Result<Page<RemoteGroup>, String> {
    let list = match msg {
        Value::Array(_) => msg,
        Value::Object(o) => o.get("data").ok_or("no 'data' field in group listing")?,
        other => return Err(format!("unexpected group listing: {other}")),
    };
    let nested: Vec<Vec<String>> = serde_json::from_value(list.clone()).map_err(|e| e.to_string())?;
    let items = flatten_group_listing(&nested)
        .into_iter()
        .map(|name| RemoteGroup {
            id: name.clone(),
            name,
        })
        .collect();
    Ok(Page {
        items,
        consumed: nested.len(),
        total: total_of(msg),
    })
}

/// Central lists groups as `[["eng"], ["sales"]]`; the first element of
/// each inner list is the group name.
pub fn flatten_group_listing(listing: &[Vec<String>]) -> Vec<String> {
    listing.iter().filter_map(|inner| inner.first().cloned()).collect()
}

pub async fn fetch_sites<C: CentralApi + ?Sized>(api: &C) -> Result<Vec<RemoteSite>, CategoryError> {
    let sites = paginate(
        Category::Sites,
        SITE_PAGE_SIZE,
        |offset, limit| api.list_sites(offset, limit),
        parse_site_page,
    )
    .await?;
    tracing::info!(count = sites.len(), "fetched site inventory");
    Ok(sites)
}

pub async fn fetch_groups<C: CentralApi + ?Sized>(api: &C) -> Result<Vec<RemoteGroup>, CategoryError> {
    let groups = paginate(
        Category::Groups,
        GROUP_PAGE_SIZE,
        |offset, limit| api.list_groups(offset, limit),
        parse_group_page,
    )
    .await?;
    tracing::info!(count = groups.len(), "fetched group inventory");
    Ok(groups)
}

/// Pairs every mapping key with its remote id, in mapping order.
pub fn match_targets<'a>(
    category: Category,
    mapping: &CategoryMapping,
    inventory: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<ResolvedTarget>, CategoryError> {
    let mut table: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, id) in inventory {
        let ids = table.entry(name).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let mut missing = Vec::new();
    let mut ambiguous = Vec::new();
    let mut targets = Vec::with_capacity(mapping.len());
    for (key, serials) in mapping {
        match table.get(key.as_str()).map(Vec::as_slice) {
            None | Some([]) => missing.push(key.clone()),
            Some([id]) => targets.push(ResolvedTarget {
                key: key.clone(),
                id: id.to_string(),
                serials: serials.clone(),
            }),
            Some(_) => ambiguous.push(key.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(CategoryError::NotFound { category, missing });
    }
    if !ambiguous.is_empty() {
        return Err(CategoryError::Ambiguous {
            category,
            names: ambiguous,
        });
    }
    Ok(targets)
}

pub async fn resolve_sites<C: CentralApi + ?Sized>(
    api: &C,
    mapping: &CategoryMapping,
) -> Result<Vec<ResolvedTarget>, CategoryError> {
    let sites = fetch_sites(api).await?;
    match_targets(
        Category::Sites,
        mapping,
        sites.iter().map(|s| (s.name.as_str(), s.id.as_str())),
    )
}

pub async fn resolve_groups<C: CentralApi + ?Sized>(
    api: &C,
    mapping: &CategoryMapping,
) -> Result<Vec<ResolvedTarget>, CategoryError> {
    let groups = fetch_groups(api).await?;
    match_targets(
        Category::Groups,
        mapping,
        groups.iter().map(|g| (g.name.as_str(), g.id.as_str())),
    )
}
