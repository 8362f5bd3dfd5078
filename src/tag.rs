//! Field tag mini-language.
//!
//! A tag is a comma-separated list of `instruction:parameter` pairs:
//!
//! | instruction | parameter            | effect                                        |
//! |-------------|----------------------|-----------------------------------------------|
//! | `col`       | header text          | read the cell under that header               |
//! | `mapConst`  | constant key         | take the caller-supplied constant             |
//! | `intcols`   | `colname` \| `value` | one record per numeric header                 |
//! | `melt`      | `colname` \| `value` | one record per unclaimed header               |
//! | `ignore`    | `a;b;c`              | headers never melted                          |
//!
//! Unknown instructions are skipped. A tag naming several rule categories is
//! collapsed to the one the resolver would honour first.

use log::{debug, warn};

use crate::{
    error::{StageError, StageResult},
    schema::MappingRule,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag {
    pub rule: MappingRule,
    pub ignore: Vec<String>,
    /// Header named by `col:`, kept even when another rule wins.
    pub claimed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PivotRole {
    HeaderName,
    HeaderValue,
}

#[derive(Debug, Default)]
struct TagFlags {
    column: Option<String>,
    constant: Option<String>,
    int_cols: Option<PivotRole>,
    melt: Option<PivotRole>,
    ignore: Vec<String>,
}

impl TagFlags {
    fn categories(&self) -> usize {
        [
            self.column.is_some(),
            self.constant.is_some(),
            self.int_cols.is_some(),
            self.melt.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    fn into_tag(self, field: &str) -> FieldTag {
        if self.categories() > 1 {
            warn!(
                "Field '{field}' declares several mapping rules; using the highest precedence one"
            );
        }
        let rule = if let Some(key) = self.constant {
            MappingRule::Constant(key)
        } else if let Some(role) = self.int_cols {
            match role {
                PivotRole::HeaderName => MappingRule::PivotHeaderName,
                PivotRole::HeaderValue => MappingRule::PivotHeaderValue,
            }
        } else if let Some(role) = self.melt {
            match role {
                PivotRole::HeaderName => MappingRule::MeltHeaderName,
                PivotRole::HeaderValue => MappingRule::MeltHeaderValue,
            }
        } else if let Some(column) = self.column.clone() {
            MappingRule::FixedColumn(column)
        } else {
            MappingRule::None
        };
        FieldTag {
            rule,
            ignore: self.ignore,
            claimed: self.column,
        }
    }
}

pub fn parse_tag(field: &str, tag: &str) -> StageResult<FieldTag> {
    let mut flags = TagFlags::default();
    if tag.trim().is_empty() {
        return Ok(flags.into_tag(field));
    }

    for sub_tag in tag.split(',') {
        let (instruction, parameter) = match sub_tag.split_once(':') {
            Some((instruction, parameter)) => (instruction.trim(), Some(parameter)),
            None => (sub_tag.trim(), None),
        };
        let parameter = parameter.filter(|p| !p.is_empty());
        match instruction {
            "col" => {
                let name = parameter.ok_or_else(|| {
                    StageError::schema(field, "column name missing, expected col:<colname>")
                })?;
                flags.column = Some(name.to_string());
            }
            "mapConst" => {
                let key = parameter.ok_or_else(|| {
                    StageError::schema(field, "constant key missing, expected mapConst:<key>")
                })?;
                flags.constant = Some(key.to_string());
            }
            "intcols" => {
                let role = parameter.ok_or_else(|| {
                    StageError::schema(
                        field,
                        "role missing, expected intcols:colname or intcols:value",
                    )
                })?;
                flags.int_cols = Some(parse_role(role));
            }
            "melt" => {
                let role = parameter.ok_or_else(|| {
                    StageError::schema(field, "role missing, expected melt:colname or melt:value")
                })?;
                flags.melt = Some(parse_role(role));
            }
            "ignore" => {
                if let Some(list) = parameter {
                    flags.ignore = list
                        .split(';')
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }
            other => debug!("Field '{field}': skipping unknown tag instruction '{other}'"),
        }
    }
    Ok(flags.into_tag(field))
}

fn parse_role(role: &str) -> PivotRole {
    if role.trim().eq_ignore_ascii_case("colname") {
        PivotRole::HeaderName
    } else {
        PivotRole::HeaderValue
    }
}
