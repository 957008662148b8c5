use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{DatePolicy, SourceConfig};
use crate::error::{ReportError, Result};
use crate::normalize::normalize_decisions;
use crate::schema::{date_formats, decisions, participants};

// ── Source readers ──────────────────────────────────────────────────────────

/// Read a CSV or workbook source into a DataFrame with all columns as strings.
/// Header names are trimmed.
pub fn read_source(source: &SourceConfig) -> Result<DataFrame> {
    let ext = source
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let df = match ext.as_str() {
        "csv" | "txt" => read_csv_as_strings(&source.path, source.separator)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            read_workbook_as_strings(&source.path, source.sheet.as_deref())?
        }
        other => {
            return Err(ReportError::UnsupportedFormat(format!(
                "{} (extension '{other}')",
                source.path.display()
            )))
        }
    };

    info!(
        path = %source.path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded source"
    );
    Ok(df)
}

/// Read a CSV file with all columns as String dtype.
fn read_csv_as_strings(path: &Path, separator: u8) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|opts| opts.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

/// Read one sheet of a workbook. The first row holds the headers; every
/// cell is rendered to its string form so the frame matches the CSV shape.
fn read_workbook_as_strings(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::SheetNotFound(format!("{} has no sheets", path.display())))?,
    };

    if !workbook.sheet_names().iter().any(|s| s == &sheet_name) {
        return Err(ReportError::SheetNotFound(format!(
            "'{sheet_name}' in {}",
            path.display()
        )));
    }

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| ReportError::InvalidData(format!("sheet '{sheet_name}' is empty")))?
        .iter()
        .map(|cell| cell_to_string(cell).unwrap_or_default().trim().to_string())
        .collect();

    let mut values: Vec<Vec<Option<String>>> = vec![vec![]; headers.len()];
    for row in rows {
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i).and_then(cell_to_string));
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values)
        .map(|(name, vals)| Column::new(name.as_str().into(), vals))
        .collect();

    debug!(sheet = %sheet_name, "read workbook sheet");
    Ok(DataFrame::new(columns)?)
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        // Phone keys are stored as numbers; render whole floats without ".0"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

// ── Typed loading ───────────────────────────────────────────────────────────

/// Load the decisions log: read, validate headers, parse `Quando` and
/// `Idade`, normalize the free-text columns.
pub fn load_decisions(source: &SourceConfig, policy: DatePolicy) -> Result<DataFrame> {
    let raw = read_source(source)?;
    prepare_decisions(raw, policy)
}

/// Load the participants list. Only the join key is required.
pub fn load_participants(source: &SourceConfig) -> Result<DataFrame> {
    let raw = read_source(source)?;
    require_columns(&raw, &[participants::KEY])?;
    Ok(raw)
}

/// Turn an all-string decisions frame into the typed, normalized frame.
pub fn prepare_decisions(raw: DataFrame, policy: DatePolicy) -> Result<DataFrame> {
    require_columns(&raw, &decisions::REQUIRED)?;

    let df = parse_when_column(raw)?;
    let df = parse_age_column(df)?;
    let df = normalize_decisions(df)?;

    let missing_dates = df.column(decisions::WHEN)?.null_count();
    if missing_dates == 0 {
        return Ok(df);
    }

    match policy {
        DatePolicy::Retain => {
            warn!(
                rows = missing_dates,
                "rows without a parseable date are kept but left out of time series"
            );
            Ok(df)
        }
        DatePolicy::Drop => {
            warn!(rows = missing_dates, "dropping rows without a parseable date");
            Ok(df
                .lazy()
                .filter(col(decisions::WHEN).is_not_null())
                .collect()?)
        }
    }
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ReportError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

// ── Parse helpers ───────────────────────────────────────────────────────────

/// Parse a date cell day-first. Accepts date-time and date-only forms with
/// four- or two-digit years.
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let plausible = |dt: &NaiveDateTime| dt.year() >= date_formats::MIN_YEAR;
    date_formats::DATETIME
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .find(plausible)
        .or_else(|| {
            date_formats::DATE
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .filter_map(|d| d.and_hms_opt(0, 0, 0))
                .find(plausible)
        })
}

/// Parse an age cell. Decimal commas are accepted; non-finite values are not.
pub fn parse_age(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Replace the `Quando` string column with a microsecond Datetime column.
/// Unparseable cells become null. Parsed row by row with chrono because the
/// exports mix several day-first layouts in one column, which a single
/// strptime format cannot cover.
fn parse_when_column(mut df: DataFrame) -> Result<DataFrame> {
    let micros: Vec<Option<i64>> = df
        .column(decisions::WHEN)?
        .str()?
        .into_iter()
        .map(|v| {
            v.and_then(parse_day_first)
                .map(|dt| dt.and_utc().timestamp_micros())
        })
        .collect();

    let when = Column::new(decisions::WHEN.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    df.with_column(when)?;
    Ok(df)
}

/// Replace the `Idade` string column with Float64. Unparseable cells become null.
fn parse_age_column(mut df: DataFrame) -> Result<DataFrame> {
    let ages: Vec<Option<f64>> = df
        .column(decisions::AGE)?
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_age))
        .collect();

    df.with_column(Column::new(decisions::AGE.into(), ages))?;
    Ok(df)
}
