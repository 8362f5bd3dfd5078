use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::output::DEFAULT_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reshape spreadsheet rows into typed records for bulk loading",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a sheet into records using a schema file
    Convert(ConvertArgs),
    /// Print the headings (first row) of a sheet
    Headings(HeadingsArgs),
    /// List the sheets of a workbook directory
    Sheets(SheetsArgs),
    /// Show a compiled schema and, optionally, how it lays out a sheet
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Sheet file (.csv/.tsv) or workbook directory; `-` reads stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Sheet to read when the input is a workbook directory
    #[arg(short = 's', long = "sheet")]
    pub sheet: Option<String>,
    /// Delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Schema YAML describing the output record
    #[arg(short = 'm', long = "schema")]
    pub schema: PathBuf,
    /// Convert every sheet of a workbook directory, in name order
    #[arg(long = "all-sheets", conflicts_with = "sheet")]
    pub all_sheets: bool,
    /// Options YAML (column overrides, constants, flags)
    #[arg(long = "options")]
    pub options: Option<PathBuf>,
    /// Constant for mapConst fields, as `key=value`
    #[arg(long = "const", action = clap::ArgAction::Append)]
    pub constants: Vec<String>,
    /// Column override, as `field=column` (1-based)
    #[arg(long = "column", action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Treat the first row as data rather than headings
    #[arg(long = "first-row-has-data")]
    pub first_row_has_data: bool,
    /// Fail on values that cannot be read as floats instead of storing NaN
    #[arg(long = "error-on-nan")]
    pub error_on_nan: bool,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long = "format", default_value = "csv")]
    pub format: OutputFormat,
    /// Delimiter for CSV output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Records handed to the output per batch
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(Debug, Args)]
pub struct HeadingsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    /// Workbook directory or single sheet file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Schema YAML to compile
    #[arg(short = 'm', long = "schema")]
    pub schema: PathBuf,
    /// Sheet file or workbook directory to lay out against the schema
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Sheet to read when the input is a workbook directory
    #[arg(short = 's', long = "sheet")]
    pub sheet: Option<String>,
    /// Delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Column override, as `field=column` (1-based)
    #[arg(long = "column", action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Jsonl,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
