//! Output record targets.
//!
//! [`StagedRecord`] is how the engine builds records without inspecting types at
//! runtime: the record supplies its blank state and accepts coerced values one
//! field at a time. Statically typed output structs implement it by hand;
//! [`DynamicRecord`] covers schemas loaded from disk.

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    coerce::zero_value,
    data::Value,
    error::{StageError, StageResult},
    schema::{FieldSpec, Schema},
};

pub trait StagedRecord: Sized {
    /// A record with every field at its zero value.
    fn blank(schema: &Schema) -> Self;

    fn assign(&mut self, field: &FieldSpec, value: Value) -> StageResult<()>;
}

/// Ordered field/value pairs following the schema's field order.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    fields: Vec<(String, Value)>,
}

impl DynamicRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl StagedRecord for DynamicRecord {
    fn blank(schema: &Schema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|field| (field.name.clone(), zero_value(&field.field_type)))
            .collect();
        Self { fields }
    }

    fn assign(&mut self, field: &FieldSpec, value: Value) -> StageResult<()> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(name, _)| *name == field.name)
            .ok_or_else(|| StageError::Assign {
                field: field.name.clone(),
                message: "field is not part of the record".to_string(),
            })?;
        slot.1 = value;
        Ok(())
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
