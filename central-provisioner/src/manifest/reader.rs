use std::path::Path;

use calamine::{open_workbook_auto, Reader};

use crate::error::FatalError;
use crate::types::ManifestRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Csv,
    Spreadsheet,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Result<Self, FatalError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "csv" => Ok(ManifestFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(ManifestFormat::Spreadsheet),
            _ => Err(FatalError::UnsupportedExtension { ext }),
        }
    }
}

/// Column positions found in the header row.
#[derive(Debug, Default)]
struct Columns {
    serial: usize,
    site: Option<usize>,
    group: Option<usize>,
    name: Option<usize>,
}

impl Columns {
    fn from_header<'a>(header: impl IntoIterator<Item = &'a str>) -> Result<Self, FatalError> {
        let mut serial = None;
        let mut cols = Columns::default();
        for (idx, h) in header.into_iter().enumerate() {
            match h.trim().to_lowercase().as_str() {
                "serial" => serial = serial.or(Some(idx)),
                "site" => cols.site = cols.site.or(Some(idx)),
                "group" => cols.group = cols.group.or(Some(idx)),
                "name" => cols.name = cols.name.or(Some(idx)),
                _ => {}
            }
        }
        cols.serial = serial.ok_or(FatalError::MissingSerialColumn)?;
        Ok(cols)
    }

    /// `None` for rows that are entirely blank.
    fn row(&self, cells: &[String]) -> Option<ManifestRow> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        let cell = |i: usize| cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        let opt = |i: Option<usize>| i.map(cell).filter(|v| !v.is_empty());
        Some(ManifestRow {
            serial: cell(self.serial),
            site: opt(self.site),
            group: opt(self.group),
            // empty names are kept so the rename phase can count them
            name: self.name.map(cell),
        })
    }
}

/// Reads a csv or spreadsheet manifest; the extension picks the format.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>, FatalError> {
    let format = ManifestFormat::from_path(path)?;
    let read_err = |reason: String| FatalError::ManifestRead {
        path: path.to_path_buf(),
        reason,
    };
    let rows = match format {
        ManifestFormat::Csv => {
            let file = std::fs::File::open(path).map_err(|e| read_err(e.to_string()))?;
            read_csv(file).map_err(|e| match e {
                FatalError::ManifestRead { reason, .. } => read_err(reason),
                other => other,
            })?
        }
        ManifestFormat::Spreadsheet => read_spreadsheet(path)?,
    };
    tracing::debug!(path = %path.display(), rows = rows.len(), "manifest loaded");
    Ok(rows)
}

pub fn read_csv<R: std::io::Read>(input: R) -> Result<Vec<ManifestRow>, FatalError> {
    let err = |e: csv::Error| FatalError::ManifestRead {
        path: "<csv>".into(),
        reason: e.to_string(),
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let cols = Columns::from_header(rdr.headers().map_err(err)?.iter())?;
    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(err)?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if let Some(row) = cols.row(&cells) {
            out.push(row);
        }
    }
    Ok(out)
}

fn read_spreadsheet(path: &Path) -> Result<Vec<ManifestRow>, FatalError> {
    let err = |reason: String| FatalError::ManifestRead {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| err("workbook has no sheets".into()))?
        .map_err(|e| err(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<String>>());
    let header = rows.next().ok_or(FatalError::MissingSerialColumn)?;
    let cols = Columns::from_header(header.iter().map(String::as_str))?;
    Ok(rows.filter_map(|cells| cols.row(&cells)).collect())
}
