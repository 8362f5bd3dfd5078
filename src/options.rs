use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::coerce::CoercionOptions;

/// Per-conversion settings supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConvertOptions {
    /// Field name to 1-based column; beats every tag rule for that field.
    pub column_overrides: BTreeMap<String, usize>,
    /// Values for `mapConst:<key>` fields.
    pub constants: BTreeMap<String, String>,
    /// Treat row 0 as data instead of headings.
    pub first_row_has_data: bool,
    /// Fail on unparseable floats instead of storing NaN.
    pub error_on_nan: bool,
}

impl ConvertOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening options file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file)).context("Parsing options YAML")
    }

    pub fn with_constant(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(key.into(), value.into());
        self
    }

    pub fn with_column(mut self, field: impl Into<String>, column: usize) -> Self {
        self.column_overrides.insert(field.into(), column);
        self
    }

    pub fn coercion(&self) -> CoercionOptions {
        CoercionOptions {
            error_on_nan: self.error_on_nan,
        }
    }

    /// Applies `key=value` constant assignments given on the command line.
    pub fn apply_constant_args(&mut self, args: &[String]) -> Result<()> {
        for arg in args {
            let (key, value) = split_assignment(arg)?;
            self.constants.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Applies `field=column` overrides given on the command line.
    pub fn apply_column_args(&mut self, args: &[String]) -> Result<()> {
        for arg in args {
            let (field, column) = split_assignment(arg)?;
            let column: usize = column
                .trim()
                .parse()
                .with_context(|| format!("Column override '{arg}' needs a numeric column"))?;
            self.column_overrides.insert(field.to_string(), column);
        }
        Ok(())
    }
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value but found '{arg}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Missing key in '{arg}'"));
    }
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_fills_missing_sections_with_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "constants:\n  product: apple\nerror_on_nan: true").unwrap();
        let options = ConvertOptions::load(file.path()).expect("load options");
        assert_eq!(
            options.constants.get("product").map(String::as_str),
            Some("apple")
        );
        assert!(options.error_on_nan);
        assert!(!options.first_row_has_data);
        assert!(options.column_overrides.is_empty());
    }

    #[test]
    fn command_line_assignments() {
        let mut options = ConvertOptions::default();
        options
            .apply_constant_args(&["product=apple".to_string(), "note=a=b".to_string()])
            .unwrap();
        options.apply_column_args(&["Name=1".to_string()]).unwrap();
        assert_eq!(options.constants["note"], "a=b");
        assert_eq!(options.column_overrides["Name"], 1);
        assert!(options.apply_column_args(&["Name=first".to_string()]).is_err());
        assert!(options.apply_constant_args(&["=x".to_string()]).is_err());
    }
}
