//! Compiled output-type schemas.
//!
//! A [`Schema`] is the ordered list of output fields for one record type, each
//! with a [`FieldType`] and exactly one [`MappingRule`]. Schemas come from a
//! YAML document ([`SchemaDocument`], the on-disk form used by the CLI) or from
//! an explicit registration call through [`SchemaBuilder`]. Either way the tag
//! text is compiled once; conversion only ever sees the compiled rules.
//!
//! Column overrides (field name to 1-based column) are bound separately with
//! [`Schema::bind_overrides`] so the pivot flags keep reflecting the declared
//! tags.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StageError, StageResult},
    tag::parse_tag,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    pub fn signed_range(self) -> (i64, i64) {
        match self {
            IntWidth::W8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            IntWidth::W16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            IntWidth::W32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            IntWidth::W64 => (i64::MIN, i64::MAX),
        }
    }

    pub fn unsigned_max(self) -> u64 {
        match self {
            IntWidth::W8 => u64::from(u8::MAX),
            IntWidth::W16 => u64::from(u16::MAX),
            IntWidth::W32 => u64::from(u32::MAX),
            IntWidth::W64 => u64::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
    Signed(IntWidth),
    Unsigned(IntWidth),
    Float32,
    Float64,
    DateTime,
}

impl FieldType {
    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "bool", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
            "uint32", "uint64", "float32", "float64", "datetime",
        ]
    }

    /// Parses a declared type name; unknown names are reported against `field`.
    pub fn parse(field: &str, token: &str) -> StageResult<Self> {
        let normalized = token.trim().to_ascii_lowercase();
        let parsed = match normalized.as_str() {
            "string" | "str" | "text" => FieldType::String,
            "bool" | "boolean" => FieldType::Boolean,
            "int" | "integer" | "int64" | "i64" => FieldType::Signed(IntWidth::W64),
            "int32" | "i32" => FieldType::Signed(IntWidth::W32),
            "int16" | "i16" => FieldType::Signed(IntWidth::W16),
            "int8" | "i8" => FieldType::Signed(IntWidth::W8),
            "uint" | "unsigned" | "uint64" | "u64" => FieldType::Unsigned(IntWidth::W64),
            "uint32" | "u32" => FieldType::Unsigned(IntWidth::W32),
            "uint16" | "u16" => FieldType::Unsigned(IntWidth::W16),
            "uint8" | "u8" => FieldType::Unsigned(IntWidth::W8),
            "float32" | "f32" | "float" => FieldType::Float32,
            "float64" | "f64" | "double" => FieldType::Float64,
            "datetime" | "date-time" | "timestamp" | "date" => FieldType::DateTime,
            _ => {
                return Err(StageError::UnsupportedType {
                    field: field.to_string(),
                    type_name: token.to_string(),
                });
            }
        };
        Ok(parsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "bool",
            FieldType::Signed(IntWidth::W8) => "int8",
            FieldType::Signed(IntWidth::W16) => "int16",
            FieldType::Signed(IntWidth::W32) => "int32",
            FieldType::Signed(IntWidth::W64) => "int64",
            FieldType::Unsigned(IntWidth::W8) => "uint8",
            FieldType::Unsigned(IntWidth::W16) => "uint16",
            FieldType::Unsigned(IntWidth::W32) => "uint32",
            FieldType::Unsigned(IntWidth::W64) => "uint64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::DateTime => "datetime",
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, FieldType::String)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a field's raw value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingRule {
    Constant(String),
    FixedColumn(String),
    /// 1-based column; `0` means no override.
    IndexOverride(usize),
    PivotHeaderName,
    PivotHeaderValue,
    MeltHeaderName,
    MeltHeaderValue,
    None,
}

impl MappingRule {
    pub fn is_pivot(&self) -> bool {
        matches!(
            self,
            MappingRule::PivotHeaderName | MappingRule::PivotHeaderValue
        )
    }

    pub fn is_melt(&self) -> bool {
        matches!(
            self,
            MappingRule::MeltHeaderName | MappingRule::MeltHeaderValue
        )
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingRule::Constant(key) => write!(f, "mapConst:{key}"),
            MappingRule::FixedColumn(name) => write!(f, "col:{name}"),
            MappingRule::IndexOverride(column) => write!(f, "column #{column}"),
            MappingRule::PivotHeaderName => f.write_str("intcols:colname"),
            MappingRule::PivotHeaderValue => f.write_str("intcols:value"),
            MappingRule::MeltHeaderName => f.write_str("melt:colname"),
            MappingRule::MeltHeaderValue => f.write_str("melt:value"),
            MappingRule::None => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub rule: MappingRule,
    pub ignore: Vec<String>,
    claimed: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, rule: MappingRule) -> Self {
        let rule = match rule {
            MappingRule::IndexOverride(0) => MappingRule::None,
            other => other,
        };
        let claimed = match &rule {
            MappingRule::FixedColumn(column) => Some(column.clone()),
            _ => None,
        };
        Self {
            name: name.into(),
            field_type,
            rule,
            ignore: Vec::new(),
            claimed,
        }
    }

    /// Compiles a field from its tag text.
    pub fn from_tag(name: &str, field_type: FieldType, tag: &str) -> StageResult<Self> {
        let parsed = parse_tag(name, tag)?;
        Ok(Self {
            name: name.to_string(),
            field_type,
            rule: parsed.rule,
            ignore: parsed.ignore,
            claimed: parsed.claimed,
        })
    }

    pub fn with_ignore<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(headers.into_iter().map(Into::into));
        self
    }

    /// Header this field reads by name, whichever rule ended up active.
    pub fn claimed_header(&self) -> Option<&str> {
        self.claimed.as_deref()
    }

    pub fn index_override(&self) -> Option<usize> {
        match self.rule {
            MappingRule::IndexOverride(column) if column > 0 => Some(column),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
    has_int_cols: bool,
    has_melt: bool,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        let has_int_cols = fields.iter().any(|f| f.rule.is_pivot());
        let has_melt = fields.iter().any(|f| f.rule.is_melt());
        Self {
            name: name.into(),
            fields,
            has_int_cols,
            has_melt,
        }
    }

    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn compile(document: &SchemaDocument) -> StageResult<Self> {
        let fields = document
            .fields
            .iter()
            .map(|decl| {
                let field_type = FieldType::parse(&decl.name, &decl.field_type)?;
                FieldSpec::from_tag(&decl.name, field_type, &decl.tag)
            })
            .collect::<StageResult<Vec<_>>>()?;
        Ok(Schema::new(document.name.clone(), fields))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let document: SchemaDocument =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        let schema = Schema::compile(&document)
            .with_context(|| format!("Compiling schema '{}'", document.name))?;
        debug!(
            "Compiled schema '{}' with {} field(s) (intcols: {}, melt: {})",
            schema.name,
            schema.fields.len(),
            schema.has_int_cols,
            schema.has_melt
        );
        Ok(schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn has_int_cols(&self) -> bool {
        self.has_int_cols
    }

    pub fn has_melt(&self) -> bool {
        self.has_melt
    }

    /// Union of every field's ignore list.
    pub fn ignore_list(&self) -> BTreeSet<&str> {
        self.fields
            .iter()
            .flat_map(|f| f.ignore.iter().map(String::as_str))
            .collect()
    }

    /// Header names claimed by fixed-column rules.
    pub fn claimed_headers(&self) -> BTreeSet<&str> {
        self.fields
            .iter()
            .filter_map(FieldSpec::claimed_header)
            .collect()
    }

    /// 1-based columns claimed by index overrides.
    pub fn claimed_columns(&self) -> BTreeSet<usize> {
        self.fields
            .iter()
            .filter_map(FieldSpec::index_override)
            .collect()
    }

    /// Replaces the rule of every field named in `overrides` with an index override.
    pub fn bind_overrides(&self, overrides: &BTreeMap<String, usize>) -> Schema {
        let mut bound = self.clone();
        for (name, column) in overrides {
            if *column == 0 {
                continue;
            }
            match bound.fields.iter_mut().find(|f| &f.name == name) {
                Some(field) => field.rule = MappingRule::IndexOverride(*column),
                None => debug!(
                    "Column override for '{name}' does not match a field of '{}'",
                    self.name
                ),
            }
        }
        bound
    }
}

/// Explicit registration of an output type's fields.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: &str, field_type: FieldType, tag: &str) -> StageResult<Self> {
        self.fields.push(FieldSpec::from_tag(name, field_type, tag)?);
        Ok(self)
    }

    pub fn spec(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.name, self.fields)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDocument {
    pub name: String,
    pub fields: Vec<FieldDeclaration>,
}
