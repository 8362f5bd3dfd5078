//! Per-field value resolution.
//!
//! Precedence, first match wins: index override, constant, intcols heading,
//! intcols value, melt heading, melt value, fixed column, nothing. Because a
//! compiled [`MappingRule`] holds exactly one variant, the order is encoded by
//! how rules are compiled and bound; the resolver just dispatches.

use std::collections::BTreeMap;

use log::warn;

use crate::{
    coerce::{CoercionOptions, RawValue, coerce},
    data::Value,
    error::{StageError, StageResult},
    expand::ExpansionContext,
    header::SheetLayout,
    schema::{FieldSpec, MappingRule},
    sheet::Row,
};

pub struct Resolver<'a> {
    pub sheet_name: &'a str,
    pub layout: &'a SheetLayout,
    pub constants: &'a BTreeMap<String, String>,
    pub max_column: usize,
    pub coercion: CoercionOptions,
}

impl<'a> Resolver<'a> {
    /// Resolves one field; `Ok(None)` leaves the record's zero value in place.
    pub fn resolve(
        &self,
        field: &FieldSpec,
        row: &Row,
        context: &ExpansionContext<'_>,
    ) -> StageResult<Option<Value>> {
        let raw = match &field.rule {
            MappingRule::IndexOverride(column) if *column > 0 => {
                if *column > self.max_column {
                    return Err(StageError::OutOfRangeColumn {
                        field: field.name.clone(),
                        column: *column,
                        max_column: self.max_column,
                        sheet: self.sheet_name.to_string(),
                    });
                }
                RawValue::from_cell(row.cell(*column))
            }
            MappingRule::Constant(key) => {
                let constant = self.constants.get(key).map(String::as_str).unwrap_or("");
                if constant.is_empty() && !field.field_type.is_string() {
                    return Err(StageError::MissingConstant {
                        key: key.clone(),
                        field: field.name.clone(),
                        sheet: self.sheet_name.to_string(),
                    });
                }
                RawValue::Text(constant)
            }
            MappingRule::PivotHeaderName => match context.int_col_heading {
                Some(heading) => RawValue::Text(heading),
                None => return Ok(None),
            },
            MappingRule::PivotHeaderValue => match context.int_col_heading {
                Some(heading) => self.cell_under(heading, row)?,
                None => return Ok(None),
            },
            MappingRule::MeltHeaderName => match context.melt_heading {
                Some(heading) => RawValue::Text(heading),
                None => return Ok(None),
            },
            MappingRule::MeltHeaderValue => match context.melt_heading {
                Some(heading) => self.cell_under(heading, row)?,
                None => return Ok(None),
            },
            MappingRule::FixedColumn(name) => self.cell_under(name, row)?,
            MappingRule::IndexOverride(_) | MappingRule::None => return Ok(None),
        };
        coerce(raw, &field.field_type, self.coercion)
            .map(Some)
            .map_err(|err| err.at_field(row.coordinate(), &field.name))
    }

    fn cell_under<'r>(&self, header: &str, row: &'r Row) -> StageResult<RawValue<'r>> {
        match self.layout.index.position(header) {
            Some(column) => Ok(RawValue::from_cell(row.cell(column))),
            None => {
                warn!(
                    "Could not find column header '{header}' in sheet '{}'",
                    self.sheet_name
                );
                Err(StageError::MissingHeader {
                    header: header.to_string(),
                    sheet: self.sheet_name.to_string(),
                })
            }
        }
    }
}
