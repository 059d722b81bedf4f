//! Generic labelled tables.
//!
//! A [`Table`] is what a data source hands to the core: ordered column labels,
//! rows of equal width, and an optional named index (the first column of a
//! CSV read with an index, or the date index of a wide output).

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CoreError;

/// Marker written for missing values in text outputs.
pub const MISSING_MARKER: &str = "null";

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Cell {
    /// Parse a raw text field: empty and `null`/`nan` become `Null`, numbers
    /// become `Number`, everything else stays `Text`.
    pub fn parse(raw: &str) -> Cell {
        let s = raw.trim();
        if is_missing_token(s) {
            return Cell::Null;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            Ok(_) => Cell::Null,
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    /// Numeric value, if the cell holds a finite number (or numeric text).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => {
                let s = s.trim();
                if is_missing_token(s) {
                    return None;
                }
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Render for CSV/E-file output, using `missing` for null cells.
    pub fn render(&self, missing: &str) -> String {
        match self {
            Cell::Null => missing.to_string(),
            Cell::Number(v) => fmt_number(*v),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Number)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

fn is_missing_token(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nan")
}

fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A named index column.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    index: Option<Index>,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            index: None,
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, checking that every row matches the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, CoreError> {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Attach a named index. Its length must match the row count.
    pub fn with_index(mut self, name: impl Into<String>, values: Vec<Cell>) -> Result<Self, CoreError> {
        if values.len() != self.rows.len() {
            return Err(CoreError::ShapeMismatch {
                context: "index length".to_string(),
                expected: vec![self.rows.len()],
                actual: values.len(),
            });
        }
        self.index = Some(Index {
            name: name.into(),
            values,
        });
        Ok(self)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), CoreError> {
        if row.len() != self.columns.len() {
            return Err(CoreError::ShapeMismatch {
                context: format!("row {} width", self.rows.len() + 1),
                expected: vec![self.columns.len()],
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index.as_ref().map(|ix| ix.name.as_str())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Move the index (if any) to the front as a regular column.
    pub fn reset_index(&self) -> Table {
        let Some(index) = &self.index else {
            return self.clone();
        };
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(index.name.clone());
        columns.extend(self.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .zip(index.values.iter())
            .map(|(row, key)| {
                let mut out = Vec::with_capacity(row.len() + 1);
                out.push(key.clone());
                out.extend(row.iter().cloned());
                out
            })
            .collect();

        Table {
            index: None,
            columns,
            rows,
        }
    }

    /// Resolve `column` either as a column or as the index.
    ///
    /// Returns the table to read from (with the index moved into the columns
    /// if needed) and the column position.
    pub fn resolve_key(&self, column: &str) -> Result<(Cow<'_, Table>, usize), CoreError> {
        if let Some(pos) = self.position(column) {
            return Ok((Cow::Borrowed(self), pos));
        }
        if self.index_name() == Some(column) {
            return Ok((Cow::Owned(self.reset_index()), 0));
        }
        Err(self.missing_key(column))
    }

    pub fn missing_key(&self, column: &str) -> CoreError {
        let mut available: Vec<String> = self.index_name().map(str::to_string).into_iter().collect();
        available.extend(self.columns.iter().cloned());
        CoreError::MissingKeyColumn {
            column: column.to_string(),
            available,
        }
    }

    /// Drop the named columns (unknown names are ignored).
    pub fn drop_columns(&self, names: &[&str]) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.iter().any(|n| self.columns[i].eq_ignore_ascii_case(n)))
            .collect();
        self.select_positions(&keep)
    }

    /// Keep the columns at `positions`, in that order.
    pub fn select_positions(&self, positions: &[usize]) -> Table {
        let columns = positions.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table {
            index: self.index.clone(),
            columns,
            rows,
        }
    }

    /// Keep the rows for which `keep(row)` holds.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> Table {
        let mut index_values = Vec::new();
        let mut rows = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            if keep(row) {
                rows.push(row.clone());
                if let Some(ix) = &self.index {
                    index_values.push(ix.values[i].clone());
                }
            }
        }
        Table {
            index: self.index.as_ref().map(|ix| Index {
                name: ix.name.clone(),
                values: index_values,
            }),
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Replace the column labels. The count must not change.
    pub fn rename_columns(mut self, columns: Vec<String>) -> Result<Table, CoreError> {
        if columns.len() != self.columns.len() {
            return Err(CoreError::ShapeMismatch {
                context: "column relabel".to_string(),
                expected: vec![self.columns.len()],
                actual: columns.len(),
            });
        }
        self.columns = columns;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![Cell::Number(1.0), Cell::parse("x")],
                vec![Cell::Number(2.0), Cell::parse("")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse(" 3.5 "), Cell::Number(3.5));
        assert_eq!(Cell::parse("NULL"), Cell::Null);
        assert_eq!(Cell::parse("nan"), Cell::Null);
        assert_eq!(Cell::parse("2021-01-01"), Cell::Text("2021-01-01".to_string()));
        assert_eq!(Cell::Text("4".to_string()).as_f64(), Some(4.0));
        assert_eq!(Cell::Number(20210101.0).render(MISSING_MARKER), "20210101");
        assert_eq!(Cell::Null.render(MISSING_MARKER), "null");
    }

    #[test]
    fn rows_must_match_width() {
        let mut t = sample();
        assert!(t.push_row(vec![Cell::Null]).is_err());
    }

    #[test]
    fn resolve_key_from_index() {
        let t = sample()
            .with_index("DATE", vec![Cell::from("2021-01-01"), Cell::from("2021-01-02")])
            .unwrap();
        let (resolved, pos) = t.resolve_key("DATE").unwrap();
        assert_eq!(pos, 0);
        assert_eq!(resolved.columns(), &["DATE", "a", "b"]);
        assert_eq!(resolved.rows()[1][0], Cell::from("2021-01-02"));

        let err = t.resolve_key("missing").unwrap_err();
        match err {
            CoreError::MissingKeyColumn { column, available } => {
                assert_eq!(column, "missing");
                assert_eq!(available, vec!["DATE", "a", "b"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn filter_keeps_index_aligned() {
        let t = sample()
            .with_index("k", vec![Cell::from("r1"), Cell::from("r2")])
            .unwrap();
        let filtered = t.filter_rows(|row| row[0].as_f64() == Some(2.0));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.index().unwrap().values, vec![Cell::from("r2")]);
    }
}
