//! Header row analysis, performed once per sheet.
//!
//! [`SheetLayout`] bundles the header index with the two pivot heading sets.
//! Everything here is computed from the first row and the schema, then only
//! read while rows are expanded.

use std::collections::HashMap;

use log::debug;

use crate::{schema::Schema, sheet::Row};

const INTEGRAL_TOLERANCE: f64 = 1e-6;

/// Header text to 1-based column. The first occurrence of a duplicate header wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
    headings: Vec<(usize, String)>,
}

impl HeaderIndex {
    pub fn position(&self, header: &str) -> Option<usize> {
        self.positions.get(header).copied()
    }

    pub fn contains(&self, header: &str) -> bool {
        self.positions.contains_key(header)
    }

    /// Header text at a 1-based column.
    pub fn heading_at(&self, column: usize) -> Option<&str> {
        self.headings
            .iter()
            .find(|(position, _)| *position == column)
            .map(|(_, text)| text.as_str())
    }

    /// Indexed headings in column order, duplicates included.
    pub fn headings(&self) -> impl Iterator<Item = (usize, &str)> {
        self.headings
            .iter()
            .map(|(position, text)| (*position, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotSets {
    pub int_col_headings: Vec<String>,
    pub melt_headings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLayout {
    pub index: HeaderIndex,
    pub pivots: PivotSets,
}

impl SheetLayout {
    pub fn analyze(header_row: &Row, schema: &Schema) -> Self {
        let index = index_headers(header_row);
        let int_col_headings = detect_int_headings(header_row);
        let melt_headings = if schema.has_melt() {
            compute_melt_headings(header_row, &index, schema, &int_col_headings)
        } else {
            Vec::new()
        };
        debug!(
            "Header layout: {} heading(s), {} numeric, {} melt",
            index.len(),
            int_col_headings.len(),
            melt_headings.len()
        );
        Self {
            index,
            pivots: PivotSets {
                int_col_headings,
                melt_headings,
            },
        }
    }

    /// Layout for headings supplied by the caller rather than read from the sheet.
    pub fn from_headings<I, S>(headings: I, schema: &Schema) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row = Row::new(0, headings);
        Self::analyze(&row, schema)
    }
}

pub fn index_headers(row: &Row) -> HeaderIndex {
    let mut index = HeaderIndex::default();
    for cell in row.cells() {
        let text = cell.text();
        if text.is_empty() {
            continue;
        }
        index.headings.push((cell.column(), text.to_string()));
        index
            .positions
            .entry(text.to_string())
            .or_insert(cell.column());
    }
    index
}

/// Whether the heading text, untrimmed, parses as a whole number.
pub fn is_integral_heading(text: &str) -> bool {
    match text.parse::<f64>() {
        Ok(f) => (f.round() - f).abs() < INTEGRAL_TOLERANCE,
        Err(_) => false,
    }
}

pub fn detect_int_headings(row: &Row) -> Vec<String> {
    row.cells()
        .iter()
        .map(|cell| cell.text())
        .filter(|text| is_integral_heading(text))
        .map(str::to_string)
        .collect()
}

pub fn compute_melt_headings(
    row: &Row,
    index: &HeaderIndex,
    schema: &Schema,
    int_col_headings: &[String],
) -> Vec<String> {
    let claimed = schema.claimed_headers();
    let claimed_by_position = schema
        .claimed_columns()
        .into_iter()
        .filter_map(|column| index.heading_at(column))
        .collect::<Vec<_>>();
    let ignored = schema.ignore_list();
    let exclude_numeric = schema.has_int_cols();

    row.cells()
        .iter()
        .map(|cell| cell.text())
        .filter(|heading| !heading.is_empty())
        .filter(|heading| !claimed.contains(heading))
        .filter(|heading| !claimed_by_position.contains(heading))
        .filter(|heading| !ignored.contains(heading))
        .filter(|heading| !(exclude_numeric && int_col_headings.iter().any(|h| h == heading)))
        .map(str::to_string)
        .collect()
}
