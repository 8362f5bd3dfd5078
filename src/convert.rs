//! Sheet conversion driver.
//!
//! [`SheetPlan`] fixes everything derived from the header row (bound schema,
//! layout, expansion mode). [`convert_sheet`] then folds the data rows through
//! the expander and resolver. The first failing row stops the sheet; the
//! records produced before it are returned with the error.

use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::{
    error::{StageError, StageResult},
    expand::{ExpansionContext, ExpansionMode, expansion_contexts},
    header::SheetLayout,
    io_utils::{self, ReadOptions},
    options::ConvertOptions,
    record::StagedRecord,
    resolve::Resolver,
    schema::Schema,
    sheet::{Row, Sheet, Workbook},
};

/// Records produced from one sheet, plus the error that stopped it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion<R> {
    pub records: Vec<R>,
    pub error: Option<StageError>,
}

impl<R> Conversion<R> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops partial records when the conversion failed.
    pub fn into_result(self) -> StageResult<Vec<R>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.records),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetPlan {
    schema: Schema,
    layout: SheetLayout,
    mode: ExpansionMode,
    skip_header: bool,
}

impl SheetPlan {
    /// Derives the plan from the sheet's header row unless row 0 carries data.
    pub fn prepare(sheet: &Sheet, schema: &Schema, options: &ConvertOptions) -> Self {
        let bound = schema.bind_overrides(&options.column_overrides);
        let layout = if options.first_row_has_data {
            SheetLayout::default()
        } else {
            sheet
                .rows()
                .first()
                .filter(|row| row.coordinate() == 0)
                .map(|row| SheetLayout::analyze(row, &bound))
                .unwrap_or_default()
        };
        Self::from_bound(bound, layout, options)
    }

    /// Plan with a caller-supplied layout.
    pub fn with_layout(schema: &Schema, options: &ConvertOptions, layout: SheetLayout) -> Self {
        Self::from_bound(
            schema.bind_overrides(&options.column_overrides),
            layout,
            options,
        )
    }

    fn from_bound(schema: Schema, layout: SheetLayout, options: &ConvertOptions) -> Self {
        let mode = ExpansionMode::for_schema(&schema);
        Self {
            schema,
            layout,
            mode,
            skip_header: !options.first_row_has_data,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn mode(&self) -> ExpansionMode {
        self.mode
    }

    pub fn records_per_row(&self) -> usize {
        expansion_contexts(self.mode, &self.layout.pivots).len()
    }

    pub fn is_header(&self, row: &Row) -> bool {
        self.skip_header && row.coordinate() == 0
    }
}

/// Builds every record of one data row, or none if any field fails.
pub fn expand_row<R: StagedRecord>(
    plan: &SheetPlan,
    resolver: &Resolver<'_>,
    contexts: &[ExpansionContext<'_>],
    row: &Row,
) -> StageResult<Vec<R>> {
    let mut records = Vec::with_capacity(contexts.len());
    for context in contexts {
        let mut record = R::blank(&plan.schema);
        for field in plan.schema.fields() {
            if let Some(value) = resolver.resolve(field, row, context)? {
                record.assign(field, value)?;
            }
        }
        records.push(record);
    }
    Ok(records)
}

pub fn convert_sheet<R: StagedRecord>(
    sheet: &Sheet,
    schema: &Schema,
    options: &ConvertOptions,
) -> Conversion<R> {
    let plan = SheetPlan::prepare(sheet, schema, options);
    convert_with_plan(sheet, &plan, options)
}

pub fn convert_with_plan<R: StagedRecord>(
    sheet: &Sheet,
    plan: &SheetPlan,
    options: &ConvertOptions,
) -> Conversion<R> {
    let resolver = Resolver {
        sheet_name: sheet.name(),
        layout: &plan.layout,
        constants: &options.constants,
        max_column: sheet.max_column(),
        coercion: options.coercion(),
    };
    let contexts = expansion_contexts(plan.mode, &plan.layout.pivots);
    debug!(
        "Converting sheet '{}' with schema '{}' ({} mode, {} record(s) per row)",
        sheet.name(),
        plan.schema.name(),
        plan.mode,
        contexts.len()
    );

    let mut records = Vec::new();
    for row in sheet.rows() {
        if plan.is_header(row) {
            continue;
        }
        match expand_row::<R>(plan, &resolver, &contexts, row) {
            Ok(mut expanded) => records.append(&mut expanded),
            Err(err) => {
                debug!(
                    "Stopping sheet '{}' at row {} after {} record(s)",
                    sheet.name(),
                    row.coordinate(),
                    records.len()
                );
                return Conversion {
                    records,
                    error: Some(err),
                };
            }
        }
    }
    Conversion {
        records,
        error: None,
    }
}

pub fn convert_workbook<R: StagedRecord>(
    workbook: &Workbook,
    sheet_name: &str,
    schema: &Schema,
    options: &ConvertOptions,
) -> StageResult<Conversion<R>> {
    let sheet = workbook.sheet(sheet_name)?;
    Ok(convert_sheet(sheet, schema, options))
}

/// Converts every sheet in workbook order, each with its own plan.
///
/// The first failing sheet ends the batch. Records from earlier sheets and from
/// the completed rows of the failing sheet are kept.
pub fn convert_all<R: StagedRecord>(
    workbook: &Workbook,
    schema: &Schema,
    options: &ConvertOptions,
) -> Conversion<R> {
    let mut records = Vec::new();
    for sheet in workbook.sheets() {
        let conversion = convert_sheet::<R>(sheet, schema, options);
        debug!(
            "Sheet '{}' produced {} record(s)",
            sheet.name(),
            conversion.len()
        );
        records.extend(conversion.records);
        if let Some(err) = conversion.error {
            return Conversion {
                records,
                error: Some(err),
            };
        }
    }
    Conversion {
        records,
        error: None,
    }
}

/// Reads a sheet file or workbook directory and converts all of its sheets.
pub fn convert_path_all<R: StagedRecord>(
    path: &Path,
    schema: &Schema,
    options: &ConvertOptions,
    read: &ReadOptions,
) -> Result<Conversion<R>> {
    let workbook = io_utils::read_workbook(path, read)
        .with_context(|| format!("Reading workbook {path:?}"))?;
    Ok(convert_all(&workbook, schema, options))
}

/// Reads a sheet file or workbook directory and converts one sheet of it.
///
/// With no `sheet_name`, the first sheet is used.
pub fn convert_path<R: StagedRecord>(
    path: &Path,
    sheet_name: Option<&str>,
    schema: &Schema,
    options: &ConvertOptions,
    read: &ReadOptions,
) -> Result<Conversion<R>> {
    let workbook = io_utils::read_workbook(path, read)
        .with_context(|| format!("Reading workbook {path:?}"))?;
    let sheet = match sheet_name {
        Some(name) => workbook.sheet(name)?,
        None => workbook
            .sheets()
            .first()
            .ok_or_else(|| StageError::SheetNotFound(path.display().to_string()))?,
    };
    Ok(convert_sheet(sheet, schema, options))
}
