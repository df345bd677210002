// Loader/Normalizer: source file -> Dataset

use crate::data::Dataset;
use crate::error::LoadError;
use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{Duration, NaiveDate};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Input formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Csv,
    Json,
    Stdin,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        if path.as_os_str() == "-" {
            return Some(SourceFormat::Stdin);
        }

        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Spreadsheet),
            "csv" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }
}

/// Load a dataset from disk (or CSV on stdin for `-`), trimming column names.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let format = SourceFormat::detect(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    debug!("loading {} as {:?}", path.display(), format);

    let dataset = match format {
        SourceFormat::Spreadsheet => read_spreadsheet(path)?,
        SourceFormat::Csv => Dataset::from_csv(open(path)?)?,
        SourceFormat::Json => {
            let value: serde_json::Value = serde_json::from_reader(open(path)?)?;
            Dataset::from_json(&value)?
        }
        SourceFormat::Stdin => Dataset::from_csv(io::stdin().lock())?,
    };

    info!(
        "loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.headers.len(),
        path.display()
    );
    Ok(dataset)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// First worksheet only; the first row is the header.
fn read_spreadsheet(path: &Path) -> Result<Dataset, LoadError> {
    let spreadsheet_err = |source: calamine::Error| LoadError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };
    let no_worksheet = || LoadError::NoWorksheet {
        path: PathBuf::from(path),
    };

    if !path.exists() {
        return Err(LoadError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
    }

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(no_worksheet)?
        .map_err(spreadsheet_err)?;

    let mut iter = range.rows();
    let header_row = iter.next().ok_or_else(no_worksheet)?;
    let headers: Vec<String> = header_row.iter().map(header_text).collect();
    debug!("read_spreadsheet: header: {:?}", headers);

    let mut rows = Vec::new();
    for (idx, row) in iter.enumerate() {
        let mut cells = Vec::with_capacity(row.len());
        for (col, cell) in row.iter().enumerate() {
            let text = cell_text(cell).map_err(|detail| LoadError::BadCell {
                row: idx + 1,
                column: headers.get(col).cloned().unwrap_or_default(),
                detail,
            })?;
            cells.push(text);
        }
        rows.push(cells);
    }

    Dataset::new(headers, rows)
}

fn header_text(cell: &DataType) -> String {
    cell_text(cell).unwrap_or_default()
}

fn cell_text(cell: &DataType) -> Result<String, String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::DateTime(serial) => Ok(excel_datetime(*serial).unwrap_or_else(|| serial.to_string())),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok(String::new()),
        DataType::Error(e) => Err(format!("spreadsheet error cell {:?}", e)),
        #[allow(unreachable_patterns)]
        other => Ok(format!("{:?}", other)),
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

/// ISO date (with time when not midnight) for an Excel serial date
fn excel_datetime(serial: f64) -> Option<String> {
    // 9999-12-31 is the last date Excel can store
    if !(0.0..=2_958_465.999).contains(&serial) {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY as f64).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let at = epoch.checked_add_signed(Duration::milliseconds(millis))?;

    let format = if millis % MILLIS_PER_DAY == 0 {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    Some(at.format(format).to_string())
}
