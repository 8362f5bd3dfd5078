//! In-memory worksheet model consumed by the conversion engine.
//!
//! Cells keep the raw text exactly as read; numeric, boolean and date/time
//! readings are derived on demand. Rows carry their 0-based coordinate so the
//! header row stays identifiable after filtering, and cells know their 1-based
//! column.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::{
    data::{parse_cell_bool, parse_cell_datetime, parse_cell_number},
    error::{StageError, StageResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    column: usize,
    text: String,
}

impl Cell {
    pub fn new(column: usize, text: impl Into<String>) -> Self {
        Self {
            column,
            text: text.into(),
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_f64(&self) -> Option<f64> {
        parse_cell_number(&self.text)
    }

    pub fn as_bool(&self) -> Option<bool> {
        parse_cell_bool(&self.text)
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        parse_cell_datetime(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    coordinate: usize,
    cells: Vec<Cell>,
}

impl Row {
    pub fn new<I, S>(coordinate: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Cell::new(idx + 1, text))
            .collect();
        Self { coordinate, cells }
    }

    pub fn coordinate(&self) -> usize {
        self.coordinate
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at a 1-based column; `None` past the end of a short row.
    pub fn cell(&self, column: usize) -> Option<&Cell> {
        column.checked_sub(1).and_then(|idx| self.cells.get(idx))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Row>,
    max_column: usize,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let max_column = rows.iter().map(Row::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            rows,
            max_column,
        }
    }

    /// Builds a sheet from raw row values, numbering rows from 0.
    pub fn from_values<R, I, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(coordinate, values)| Row::new(coordinate, values))
            .collect();
        Self::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn max_column(&self) -> usize {
        self.max_column
    }

    /// Texts of the first row, assumed to be the column headings.
    pub fn headings(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.cells().iter().map(|c| c.text().to_string()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> StageResult<&Sheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name() == name)
            .ok_or_else(|| StageError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    /// Sheet name to 0-based position.
    pub fn sheet_name_map(&self) -> BTreeMap<String, usize> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(idx, sheet)| (sheet.name().to_string(), idx))
            .collect()
    }
}
