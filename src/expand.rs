//! Row expansion: how many records a data row produces and with which pivot headings.

use std::fmt;

use itertools::Itertools;

use crate::{header::PivotSets, schema::Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    /// One record per row.
    Flat,
    /// One record per numeric heading.
    PivotOnly,
    /// One record per melt heading.
    MeltOnly,
    /// One record per (melt heading, numeric heading) pair, melt outermost.
    Cross,
}

impl ExpansionMode {
    pub fn for_schema(schema: &Schema) -> Self {
        match (schema.has_int_cols(), schema.has_melt()) {
            (false, false) => ExpansionMode::Flat,
            (true, false) => ExpansionMode::PivotOnly,
            (false, true) => ExpansionMode::MeltOnly,
            (true, true) => ExpansionMode::Cross,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionMode::Flat => "flat",
            ExpansionMode::PivotOnly => "intcols",
            ExpansionMode::MeltOnly => "melt",
            ExpansionMode::Cross => "melt x intcols",
        }
    }
}

impl fmt::Display for ExpansionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pivot headings active while one record is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionContext<'a> {
    pub melt_heading: Option<&'a str>,
    pub int_col_heading: Option<&'a str>,
}

/// Contexts for every record of a data row, in emission order.
///
/// The list depends only on the header layout, so it is built once per sheet.
pub fn expansion_contexts(mode: ExpansionMode, pivots: &PivotSets) -> Vec<ExpansionContext<'_>> {
    match mode {
        ExpansionMode::Flat => vec![ExpansionContext::default()],
        ExpansionMode::PivotOnly => pivots
            .int_col_headings
            .iter()
            .map(|heading| ExpansionContext {
                melt_heading: None,
                int_col_heading: Some(heading.as_str()),
            })
            .collect(),
        ExpansionMode::MeltOnly => pivots
            .melt_headings
            .iter()
            .map(|heading| ExpansionContext {
                melt_heading: Some(heading.as_str()),
                int_col_heading: None,
            })
            .collect(),
        ExpansionMode::Cross => pivots
            .melt_headings
            .iter()
            .cartesian_product(pivots.int_col_headings.iter())
            .map(|(melt, int_col)| ExpansionContext {
                melt_heading: Some(melt.as_str()),
                int_col_heading: Some(int_col.as_str()),
            })
            .collect(),
    }
}
