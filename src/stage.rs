use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::{ConvertArgs, OutputFormat},
    convert::{self, Conversion},
    io_utils,
    options::ConvertOptions,
    output::{CsvSink, JsonLinesSink, RecordSink, persist},
    record::DynamicRecord,
    schema::Schema,
};

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let read = crate::read_options(&args.input)?;
    let schema = Schema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let options = build_options(args)?;
    let input = &args.input.input;
    info!(
        "Converting '{}' with schema '{}' (delimiter '{}', format {:?})",
        input.display(),
        schema.name(),
        crate::printable_delimiter(io_utils::resolve_input_delimiter(input, read.delimiter)),
        args.format
    );

    let conversion: Conversion<DynamicRecord> = if args.all_sheets {
        convert::convert_path_all(input, &schema, &options, &read)?
    } else {
        convert::convert_path(
            input,
            args.input.sheet.as_deref(),
            &schema,
            &options,
            &read,
        )?
    };

    let writer = io_utils::open_output(args.output.as_deref())?;
    let mut sink: Box<dyn RecordSink<DynamicRecord>> = match args.format {
        OutputFormat::Csv => Box::new(CsvSink::new(
            writer,
            &schema,
            args.output_delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
        )),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::new(writer)),
    };
    let written = persist(&conversion.records, sink.as_mut(), args.batch_size)
        .context("Writing converted records")?;

    match conversion.error {
        None => {
            info!("Wrote {written} record(s) from {:?}", input);
            Ok(())
        }
        Some(err) => {
            warn!("Conversion stopped early; {written} record(s) were written before the failure");
            Err(anyhow::Error::new(err)
                .context(format!("Converting {input:?} stopped after {written} record(s)")))
        }
    }
}

/// Options file first, then command-line assignments on top.
fn build_options(args: &ConvertArgs) -> Result<ConvertOptions> {
    let mut options = match &args.options {
        Some(path) => ConvertOptions::load(path)
            .with_context(|| format!("Loading options from {path:?}"))?,
        None => ConvertOptions::default(),
    };
    options.apply_constant_args(&args.constants)?;
    options.apply_column_args(&args.columns)?;
    options.first_row_has_data |= args.first_row_has_data;
    options.error_on_nan |= args.error_on_nan;
    Ok(options)
}
