use std::collections::HashSet;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::events::EdaError;
use crate::table::{ColumnData, Table};

pub const DATE_COLUMN: &str = "order_date";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "order_date",
    "price",
    "quantity",
    "discount",
    "category",
    "region",
    "payment_method",
    "product_id",
];

// cells read as null, same set pandas uses by default
const NULL_TOKENS: [&str; 19] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#NA", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN", "#N/A N/A",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Require every column in `REQUIRED_COLUMNS`, not just the date column.
    pub strict: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

pub fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell)
}

pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(cell) {
        return Some(stamp.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(stamp);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Infer the narrowest column type that holds every non-null cell.
pub fn infer_column(cells: &[Option<String>]) -> ColumnData {
    let values: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
    let has_nulls = values.len() < cells.len();

    if values.is_empty() {
        return ColumnData::Float(vec![None; cells.len()]);
    }

    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        let ints = cells
            .iter()
            .map(|c| c.as_deref().and_then(|v| v.parse::<i64>().ok()));
        // an integer column with holes is upcast, as pandas does
        return if has_nulls {
            ColumnData::Float(ints.map(|x| x.map(|x| x as f64)).collect())
        } else {
            ColumnData::Int(ints.collect())
        };
    }

    if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        return ColumnData::Float(
            cells
                .iter()
                .map(|c| c.as_deref().and_then(|v| v.parse::<f64>().ok()))
                .collect(),
        );
    }

    if values.iter().all(|v| parse_bool(v).is_some()) {
        return ColumnData::Bool(
            cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_bool))
                .collect(),
        );
    }

    ColumnData::Text(cells.to_vec())
}

/// Coerce a column into timestamps; any non-null cell that fails to parse is fatal.
pub fn coerce_dates(table: &mut Table, name: &str) -> Result<(), EdaError> {
    let labels = table.labels(name)?;
    let mut stamps = Vec::with_capacity(labels.len());
    for (row, label) in labels.into_iter().enumerate() {
        match label {
            None => stamps.push(None),
            Some(cell) => match parse_timestamp(&cell) {
                Some(stamp) => stamps.push(Some(stamp)),
                None => {
                    return Err(EdaError::UnparsableDate {
                        row: row + 1,
                        value: cell,
                    })
                }
            },
        }
    }
    table.column_mut(name)?.data = ColumnData::DateTime(stamps);
    Ok(())
}

// repeated headers get a ".N" suffix
fn unique_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .map(|header| {
            let mut name = header.to_owned();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{header}.{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Parse a delimited file into a table and coerce `order_date` to timestamps.
pub fn load_table<R: Read>(input: R, options: &LoadOptions) -> Result<Table, EdaError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = unique_headers(reader.headers()?);
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for result in reader.records() {
        let record = result?;
        for (idx, column) in cells.iter_mut().enumerate() {
            let cell = record.get(idx).unwrap_or("");
            column.push(if is_null_token(cell) {
                None
            } else {
                Some(cell.to_owned())
            });
        }
    }

    let mut table = Table::new();
    for (name, column) in headers.iter().zip(cells.iter()) {
        table.push_column(name, infer_column(column));
    }
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "parsed csv"
    );

    let required: &[&str] = if options.strict {
        &REQUIRED_COLUMNS
    } else {
        &[DATE_COLUMN]
    };
    if let Some(missing) = required.iter().find(|name| !table.has_column(name)) {
        return Err(EdaError::MissingColumn((*missing).to_owned()));
    }

    coerce_dates(&mut table, DATE_COLUMN)?;
    Ok(table)
}
