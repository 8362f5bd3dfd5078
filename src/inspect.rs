use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::InspectArgs,
    convert::SheetPlan,
    error::StageError,
    io_utils,
    options::ConvertOptions,
    schema::Schema,
    table::TextTable,
};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let schema = Schema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    print!("{}", describe_schema(&schema));

    let Some(input) = &args.input else {
        return Ok(());
    };
    let mut options = ConvertOptions::default();
    options.apply_column_args(&args.columns)?;
    let read = crate::build_read_options(args.delimiter, args.input_encoding.as_deref())?;
    let workbook = io_utils::read_workbook(input, &read)
        .with_context(|| format!("Reading workbook {input:?}"))?;
    let sheet = match &args.sheet {
        Some(name) => workbook.sheet(name)?,
        None => workbook
            .sheets()
            .first()
            .ok_or_else(|| StageError::SheetNotFound(input.display().to_string()))?,
    };
    let plan = SheetPlan::prepare(sheet, &schema, &options);
    info!(
        "Laid out sheet '{}' against schema '{}'",
        sheet.name(),
        schema.name()
    );
    println!();
    print!("{}", describe_plan(sheet.name(), &plan));
    Ok(())
}

pub fn describe_schema(schema: &Schema) -> String {
    let mut table = TextTable::new(["#", "field", "type", "rule", "ignore"]).align_right(0);
    for (idx, field) in schema.fields().iter().enumerate() {
        table.push_row([
            (idx + 1).to_string(),
            field.name.clone(),
            field.field_type.to_string(),
            field.rule.to_string(),
            field.ignore.join(";"),
        ]);
    }
    format!("Schema '{}'\n{}", schema.name(), table.render())
}

pub fn describe_plan(sheet_name: &str, plan: &SheetPlan) -> String {
    let layout = plan.layout();
    let mut table = TextTable::new(["column", "heading"]).align_right(0);
    for (column, heading) in layout.index.headings() {
        table.push_row([column.to_string(), heading.to_string()]);
    }
    format!(
        "Sheet '{sheet_name}'\n{}\nmode: {}\nrecords per row: {}\n\
         numeric headings: {}\nmelt headings: {}\n",
        table.render(),
        plan.mode(),
        plan.records_per_row(),
        list_or_dash(&layout.pivots.int_col_headings),
        list_or_dash(&layout.pivots.melt_headings),
    )
}

fn list_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.iter().join(", ")
    }
}
