use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::aggregate::{mean, quantile, std_dev, value_counts};
use crate::table::{Column, ColumnData, Table};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub position: usize,
    pub name: String,
    pub non_null: usize,
    pub dtype: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric {
        count: usize,
        mean: f64,
        std: f64,
        min: f64,
        q1: f64,
        median: f64,
        q3: f64,
        max: f64,
    },
    Temporal {
        count: usize,
        mean: Option<NaiveDateTime>,
        min: Option<NaiveDateTime>,
        q1: Option<NaiveDateTime>,
        median: Option<NaiveDateTime>,
        q3: Option<NaiveDateTime>,
        max: Option<NaiveDateTime>,
    },
    Categorical {
        count: usize,
        unique: usize,
        top: Option<String>,
        freq: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub shape: (usize, usize),
    pub missing_values: Vec<(String, usize)>,
    pub duplicate_rows: usize,
    pub info: Vec<ColumnInfo>,
    pub describe: Vec<(String, ColumnStats)>,
}

impl Summary {
    pub fn of(table: &Table) -> Self {
        Self {
            shape: shape(table),
            missing_values: missing_values(table),
            duplicate_rows: duplicate_rows(table),
            info: info(table),
            describe: describe(table),
        }
    }
}

pub fn shape(table: &Table) -> (usize, usize) {
    (table.row_count(), table.column_count())
}

pub fn missing_values(table: &Table) -> Vec<(String, usize)> {
    table
        .columns
        .iter()
        .map(|c| (c.name.clone(), c.data.null_count()))
        .collect()
}

/// Rows identical to an earlier row; the first occurrence is not counted.
pub fn duplicate_rows(table: &Table) -> usize {
    let mut seen = HashSet::new();
    (0..table.row_count())
        .filter(|row| !seen.insert(table.row_key(*row)))
        .count()
}

pub fn info(table: &Table) -> Vec<ColumnInfo> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(position, c)| ColumnInfo {
            position,
            name: c.name.clone(),
            non_null: c.data.len() - c.data.null_count(),
            dtype: c.data.dtype(),
        })
        .collect()
}

/// Fixed-width listing of the info report.
pub fn info_text(table: &Table) -> String {
    let columns = info(table);
    let name_width = columns
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("Column".len());

    let mut out = String::new();
    out.push_str(&format!("RangeIndex: {} entries\n", table.row_count()));
    out.push_str(&format!(
        "Data columns (total {} columns):\n",
        table.column_count()
    ));
    out.push_str(&format!(
        " {:>3}  {:<name_width$}  {:<14}  {}\n",
        "#", "Column", "Non-Null Count", "Dtype"
    ));
    for column in &columns {
        out.push_str(&format!(
            " {:>3}  {:<name_width$}  {:<14}  {}\n",
            column.position,
            column.name,
            format!("{} non-null", column.non_null),
            column.dtype
        ));
    }

    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for column in &columns {
        *tally.entry(column.dtype).or_insert(0) += 1;
    }
    let dtypes: Vec<String> = tally
        .iter()
        .map(|(dtype, count)| format!("{dtype}({count})"))
        .collect();
    out.push_str(&format!("dtypes: {}", dtypes.join(", ")));
    out
}

pub fn describe(table: &Table) -> Vec<(String, ColumnStats)> {
    table
        .columns
        .iter()
        .map(|c| (c.name.clone(), describe_column(c)))
        .collect()
}

fn describe_column(column: &Column) -> ColumnStats {
    match &column.data {
        ColumnData::Int(_) | ColumnData::Float(_) => {
            let mut values: Vec<f64> = match &column.data {
                ColumnData::Int(v) => v.iter().flatten().map(|x| *x as f64).collect(),
                ColumnData::Float(v) => v.iter().flatten().filter(|x| !x.is_nan()).copied().collect(),
                _ => Vec::new(),
            };
            values.sort_by(f64::total_cmp);
            numeric_stats(&values)
        }
        ColumnData::DateTime(v) => {
            let mut millis: Vec<f64> = v
                .iter()
                .flatten()
                .map(|stamp| stamp.and_utc().timestamp_millis() as f64)
                .collect();
            millis.sort_by(f64::total_cmp);
            let at = |value: f64| {
                if value.is_nan() {
                    return None;
                }
                DateTime::from_timestamp_millis(value.round() as i64).map(|d| d.naive_utc())
            };
            ColumnStats::Temporal {
                count: millis.len(),
                mean: at(mean(&millis)),
                min: at(quantile(&millis, 0.0)),
                q1: at(quantile(&millis, 0.25)),
                median: at(quantile(&millis, 0.5)),
                q3: at(quantile(&millis, 0.75)),
                max: at(quantile(&millis, 1.0)),
            }
        }
        ColumnData::Bool(_) | ColumnData::Text(_) => {
            let labels: Vec<Option<String>> =
                (0..column.data.len()).map(|row| column.data.label(row)).collect();
            let counts = value_counts(&labels);
            let (top, freq) = counts
                .first()
                .map_or((None, 0), |(label, n)| (Some(label.clone()), *n as usize));
            ColumnStats::Categorical {
                count: labels.iter().flatten().count(),
                unique: counts.len(),
                top,
                freq,
            }
        }
    }
}

fn numeric_stats(sorted: &[f64]) -> ColumnStats {
    ColumnStats::Numeric {
        count: sorted.len(),
        mean: mean(sorted),
        std: std_dev(sorted),
        min: quantile(sorted, 0.0),
        q1: quantile(sorted, 0.25),
        median: quantile(sorted, 0.5),
        q3: quantile(sorted, 0.75),
        max: quantile(sorted, 1.0),
    }
}
