pub mod cli;
pub mod coerce;
pub mod convert;
pub mod data;
pub mod error;
pub mod expand;
pub mod header;
pub mod inspect;
pub mod io_utils;
pub mod options;
pub mod output;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod sheet;
pub mod stage;
pub mod table;
pub mod tag;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    io_utils::ReadOptions,
    table::TextTable,
};

pub use crate::{
    convert::{Conversion, SheetPlan, convert_path, convert_sheet, convert_workbook},
    data::Value,
    error::{StageError, StageResult},
    options::ConvertOptions,
    record::{DynamicRecord, StagedRecord},
    schema::{FieldSpec, FieldType, MappingRule, Schema},
    sheet::{Row, Sheet, Workbook},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_stage", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => stage::execute(&args),
        Commands::Headings(args) => handle_headings(&args),
        Commands::Sheets(args) => handle_sheets(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}

fn handle_headings(args: &cli::HeadingsArgs) -> Result<()> {
    let read = read_options(&args.input)?;
    info!(
        "Reading headings from '{}' using delimiter '{}'",
        args.input.input.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(
            &args.input.input,
            read.delimiter
        ))
    );
    let workbook = io_utils::read_workbook(&args.input.input, &read)
        .with_context(|| format!("Reading workbook {:?}", args.input.input))?;
    let sheet = match &args.input.sheet {
        Some(name) => workbook.sheet(name)?,
        None => workbook
            .sheets()
            .first()
            .ok_or_else(|| StageError::SheetNotFound(args.input.input.display().to_string()))?,
    };
    let mut table = TextTable::new(["#", "heading"]).align_right(0);
    for (idx, heading) in sheet.headings().into_iter().enumerate() {
        table.push_row([(idx + 1).to_string(), heading]);
    }
    table.print();
    Ok(())
}

fn handle_sheets(args: &cli::SheetsArgs) -> Result<()> {
    let read = build_read_options(args.delimiter, args.input_encoding.as_deref())?;
    let workbook = io_utils::read_workbook(&args.input, &read)
        .with_context(|| format!("Reading workbook {:?}", args.input))?;
    let mut table = TextTable::new(["#", "sheet", "rows", "columns"])
        .align_right(0)
        .align_right(2)
        .align_right(3);
    for (name, position) in workbook.sheet_name_map() {
        let sheet = workbook.sheet(&name)?;
        table.push_row([
            (position + 1).to_string(),
            name,
            sheet.rows().len().to_string(),
            sheet.max_column().to_string(),
        ]);
    }
    table.print();
    info!("Workbook {:?} has {} sheet(s)", args.input, table.len());
    Ok(())
}

pub(crate) fn read_options(args: &cli::InputArgs) -> Result<ReadOptions> {
    build_read_options(args.delimiter, args.input_encoding.as_deref())
}

pub(crate) fn build_read_options(
    delimiter: Option<u8>,
    encoding: Option<&str>,
) -> Result<ReadOptions> {
    Ok(ReadOptions {
        delimiter,
        encoding: io_utils::resolve_encoding(encoding)?,
    })
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
