//! In-memory tabular data model
//!
//! Tables are immutable once loaded: a header row, per-column inferred
//! types, and rows of typed values. Type inference mirrors header-on,
//! infer-schema CSV loading: a column is `Int` if every non-empty cell
//! parses as an integer, `Float` if every non-empty cell parses as a
//! number, otherwise `Str`. Empty cells are nulls.

use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True for empty cells
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the cell the way it is written back to CSV
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

/// Inferred column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Str,
}

impl ColumnType {
    /// True for numeric column types
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

/// An immutable in-memory table
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Parse CSV bytes (header row required) into a typed table
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| anyhow!("invalid header row: {e}"))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if columns.is_empty() {
            return Err(anyhow!("no columns found"));
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| anyhow!("invalid row: {e}"))?;
            raw_rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        let types = infer_column_types(&columns, &raw_rows);
        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                raw.iter()
                    .zip(types.iter())
                    .map(|(cell, ty)| coerce(cell, *ty))
                    .collect()
            })
            .collect();

        Ok(Table {
            columns,
            types,
            rows,
        })
    }

    /// Build a table directly from columns and rows (operation results)
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Table {
        let raw: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(Value::render).collect())
            .collect();
        let types = infer_column_types(&columns, &raw);
        Table {
            columns,
            types,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Type of the column at the given index
    pub fn column_type(&self, index: usize) -> ColumnType {
        self.types[index]
    }

    /// Names of all numeric columns, in schema order
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(self.types.iter())
            .filter(|(_, ty)| ty.is_numeric())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Non-null numeric values of one column
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row[index].as_f64())
            .collect()
    }

    /// Column names and types, for schema comparison
    pub fn schema(&self) -> Vec<(&str, ColumnType)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.types.iter().copied())
            .collect()
    }

    /// True when both tables have identical column names and types
    pub fn schema_matches(&self, other: &Table) -> bool {
        self.schema() == other.schema()
    }

    /// Rendered form of one row, used as a multiset key
    pub fn row_key(&self, row: &[Value]) -> Vec<String> {
        row.iter().map(Value::render).collect()
    }

    /// Number of distinct rows
    pub fn distinct_row_count(&self) -> usize {
        let mut seen: HashMap<Vec<String>, ()> = HashMap::new();
        for row in &self.rows {
            seen.insert(self.row_key(row), ());
        }
        seen.len()
    }

    /// Rows present in `self` but not in `other`, plus the reverse,
    /// counted with multiset semantics
    pub fn symmetric_difference_count(&self, other: &Table) -> usize {
        let mut counts: HashMap<Vec<String>, i64> = HashMap::new();
        for row in &self.rows {
            *counts.entry(self.row_key(row)).or_insert(0) += 1;
        }
        for row in &other.rows {
            *counts.entry(other.row_key(row)).or_insert(0) -= 1;
        }
        counts.values().map(|c| c.unsigned_abs() as usize).sum()
    }

    /// Serialize the table back to CSV with a header row
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Value::render))?;
        }
        Ok(writer.into_inner().map_err(|e| anyhow!("{e}"))?)
    }
}

fn infer_column_types(columns: &[String], rows: &[Vec<String>]) -> Vec<ColumnType> {
    (0..columns.len())
        .map(|i| {
            let mut ty = None;
            for row in rows {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                let cell_ty = if cell.parse::<i64>().is_ok() {
                    ColumnType::Int
                } else if cell.parse::<f64>().is_ok() {
                    ColumnType::Float
                } else {
                    ColumnType::Str
                };
                ty = Some(match (ty, cell_ty) {
                    (None, t) => t,
                    (Some(ColumnType::Str), _) | (_, ColumnType::Str) => ColumnType::Str,
                    (Some(ColumnType::Float), _) | (_, ColumnType::Float) => ColumnType::Float,
                    (Some(ColumnType::Int), ColumnType::Int) => ColumnType::Int,
                });
            }
            // All-null columns carry no evidence either way
            ty.unwrap_or(ColumnType::Str)
        })
        .collect()
}

fn coerce(cell: &str, ty: ColumnType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Int => cell
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Str(cell.to_string())),
        ColumnType::Float => cell
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Str(cell.to_string())),
        ColumnType::Str => Value::Str(cell.to_string()),
    }
}
