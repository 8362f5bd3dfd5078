//! Reading sheets from delimited text and opening output streams.
//!
//! - **Sheets**: a `.csv`/`.tsv` file is one sheet named after its file stem;
//!   a directory is a workbook with one sheet per delimited file, sorted by name.
//! - **Delimiters**: extension-based (`.tsv` → tab, otherwise comma) unless given.
//! - **Encoding**: input is decoded with `encoding_rs`, defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path reads a single sheet named `stdin` and
//!   writes to standard output.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::sheet::{Row, Sheet, Workbook};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const SHEET_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Spreadsheet rows are ragged, so the reader is flexible and header-less.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads every row of a delimited stream into a sheet.
pub fn read_sheet_from<R>(
    name: &str,
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Sheet>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let mut rows = Vec::new();
    for (coordinate, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", coordinate + 1))?;
        let values = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", coordinate + 1))?;
        rows.push(Row::new(coordinate, values));
    }
    Ok(Sheet::new(name, rows))
}

pub fn read_sheet(path: &Path, options: &ReadOptions) -> Result<Sheet> {
    let delimiter = resolve_input_delimiter(path, options.delimiter);
    if is_dash(path) {
        return read_sheet_from(
            "stdin",
            std::io::stdin().lock(),
            delimiter,
            options.encoding,
        );
    }
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("Cannot derive a sheet name from {path:?}"))?;
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_sheet_from(name, BufReader::new(file), delimiter, options.encoding)
        .with_context(|| format!("Reading sheet from {path:?}"))
}

pub fn read_workbook(path: &Path, options: &ReadOptions) -> Result<Workbook> {
    if !path.is_dir() {
        return Ok(Workbook::new(vec![read_sheet(path, options)?]));
    }
    let mut files = fs::read_dir(path)
        .with_context(|| format!("Listing workbook directory {path:?}"))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Listing workbook directory {path:?}"))?;
    files.retain(|file| {
        file.is_file()
            && file
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    SHEET_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
    });
    files.sort();
    debug!("Workbook {path:?} has {} sheet file(s)", files.len());
    let sheets = files
        .iter()
        .map(|file| read_sheet(file, options))
        .collect::<Result<Vec<_>>>()?;
    Ok(Workbook::new(sheets))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(writer)
}
