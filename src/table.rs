use chrono::NaiveDateTime;

use crate::events::EdaError;

/// Column values, `None` marks a null cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    DateTime(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Float(v) => v[row].map_or(true, f64::is_nan),
            ColumnData::Bool(v) => v[row].is_none(),
            ColumnData::DateTime(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|row| self.is_null(*row)).count()
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            ColumnData::Int(_) => "int64",
            ColumnData::Float(_) => "float64",
            ColumnData::Bool(_) => "bool",
            ColumnData::DateTime(_) => "datetime64[ns]",
            ColumnData::Text(_) => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Int(_) | ColumnData::Float(_))
    }

    /// Cell rendered as text, `None` for nulls.
    pub fn label(&self, row: usize) -> Option<String> {
        if self.is_null(row) {
            return None;
        }
        match self {
            ColumnData::Int(v) => v[row].map(|x| x.to_string()),
            ColumnData::Float(v) => v[row].map(format_float),
            ColumnData::Bool(v) => v[row].map(|x| if x { "True" } else { "False" }.to_owned()),
            ColumnData::DateTime(v) => v[row].map(|x| x.to_string()),
            ColumnData::Text(v) => v[row].clone(),
        }
    }
}

// integral floats keep a trailing ".0" so 1 and 1.0 stay distinguishable
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, EdaError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EdaError::MissingColumn(name.to_owned()))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column, EdaError> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EdaError::MissingColumn(name.to_owned()))
    }

    /// Adds a column, replacing one with the same name in place.
    pub fn push_column(&mut self, name: &str, data: ColumnData) {
        if let Ok(existing) = self.column_mut(name) {
            existing.data = data;
        } else {
            self.columns.push(Column {
                name: name.to_owned(),
                data,
            });
        }
    }

    /// Numeric view of a column; bools count as 0/1.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, EdaError> {
        let column = self.column(name)?;
        match &column.data {
            ColumnData::Int(v) => Ok(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            ColumnData::Float(v) => Ok(v
                .iter()
                .map(|x| x.filter(|x| !x.is_nan()))
                .collect()),
            ColumnData::Bool(v) => Ok(v
                .iter()
                .map(|x| x.map(|x| if x { 1.0 } else { 0.0 }))
                .collect()),
            ColumnData::DateTime(_) | ColumnData::Text(_) => Err(EdaError::ColumnType {
                column: name.to_owned(),
                expected: "numeric",
            }),
        }
    }

    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>, EdaError> {
        let column = self.column(name)?;
        Ok((0..column.data.len())
            .map(|row| column.data.label(row))
            .collect())
    }

    pub fn timestamps(&self, name: &str) -> Result<&[Option<NaiveDateTime>], EdaError> {
        match &self.column(name)?.data {
            ColumnData::DateTime(v) => Ok(v),
            _ => Err(EdaError::ColumnType {
                column: name.to_owned(),
                expected: "a timestamp",
            }),
        }
    }

    /// Canonical key of a full row, nulls compare equal to each other.
    pub fn row_key(&self, row: usize) -> Vec<Option<String>> {
        self.columns.iter().map(|c| c.data.label(row)).collect()
    }
}
