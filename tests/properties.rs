use std::collections::BTreeSet;

use proptest::prelude::*;
use sheet_stage::{
    Conversion, ConvertOptions, DynamicRecord, FieldType, Schema, Sheet, Value,
    coerce::{CoercionOptions, RawValue, coerce},
    convert_sheet,
    schema::IntWidth,
};

fn flat_schema() -> Schema {
    Schema::builder("orchard")
        .field("Variety", FieldType::String, "col:Variety")
        .unwrap()
        .build()
}

fn pivot_schema() -> Schema {
    Schema::builder("orchard")
        .field("Variety", FieldType::String, "col:Variety")
        .unwrap()
        .field("Year", FieldType::String, "intcols:colname")
        .unwrap()
        .field("Value", FieldType::Float64, "intcols:value")
        .unwrap()
        .build()
}

fn melt_schema() -> Schema {
    Schema::builder("orchard")
        .field("Variety", FieldType::String, "col:Variety")
        .unwrap()
        .field("Measure", FieldType::String, "melt:colname")
        .unwrap()
        .field("Reading", FieldType::String, "melt:value")
        .unwrap()
        .build()
}

fn cross_schema() -> Schema {
    Schema::builder("orchard")
        .field("Variety", FieldType::String, "col:Variety")
        .unwrap()
        .field("Measure", FieldType::String, "melt:colname")
        .unwrap()
        .field("Reading", FieldType::String, "melt:value")
        .unwrap()
        .field("Year", FieldType::String, "intcols:colname")
        .unwrap()
        .field("Value", FieldType::Float64, "intcols:value")
        .unwrap()
        .build()
}

/// Header with `melt` text headings and `years` numeric headings, plus `rows` data rows.
fn orchard_sheet(melt: usize, years: usize, rows: usize) -> Sheet {
    let mut header = vec!["Variety".to_string()];
    header.extend((0..melt).map(|m| format!("measure_{m}")));
    header.extend((0..years).map(year));
    let width = header.len();
    let mut values = vec![header];
    for r in 0..rows {
        let mut row = vec![format!("variety_{r}")];
        row.extend((1..width).map(|c| (r * 10 + c).to_string()));
        values.push(row);
    }
    Sheet::from_values("orchard", values)
}

fn year(offset: usize) -> String {
    (1990 + offset).to_string()
}

fn convert(sheet: &Sheet, schema: &Schema) -> Conversion<DynamicRecord> {
    convert_sheet(sheet, schema, &ConvertOptions::default())
}

fn text(record: &DynamicRecord, field: &str) -> String {
    record.get(field).map(Value::as_display).unwrap_or_default()
}

fn roundtrip(value: &Value, target: FieldType) -> Value {
    let text = value.as_display();
    coerce(RawValue::Text(&text), &target, CoercionOptions::default()).expect("coerce display")
}

proptest! {
    #[test]
    fn flat_mode_emits_one_record_per_data_row(
        melt in 0usize..4,
        years in 0usize..4,
        rows in 0usize..10,
    ) {
        let conversion = convert(&orchard_sheet(melt, years, rows), &flat_schema());
        prop_assert!(conversion.is_complete());
        prop_assert_eq!(conversion.len(), rows);
    }

    #[test]
    fn pivot_mode_follows_numeric_headings_left_to_right(
        melt in 0usize..4,
        years in 1usize..6,
        rows in 0usize..8,
    ) {
        let conversion = convert(&orchard_sheet(melt, years, rows), &pivot_schema());
        prop_assert!(conversion.is_complete());
        prop_assert_eq!(conversion.len(), rows * years);

        let expected = (0..years).map(year).collect::<Vec<_>>();
        for chunk in conversion.records.chunks(years) {
            let seen = chunk.iter().map(|record| text(record, "Year")).collect::<Vec<_>>();
            prop_assert_eq!(&seen, &expected);
        }
    }

    #[test]
    fn melt_mode_emits_one_record_per_unclaimed_heading(
        melt in 1usize..6,
        rows in 0usize..8,
    ) {
        let conversion = convert(&orchard_sheet(melt, 0, rows), &melt_schema());
        prop_assert!(conversion.is_complete());
        prop_assert_eq!(conversion.len(), rows * melt);
    }

    #[test]
    fn cross_mode_emits_melt_times_numeric_records_per_row(
        melt in 1usize..5,
        years in 1usize..6,
        rows in 0usize..8,
    ) {
        let conversion = convert(&orchard_sheet(melt, years, rows), &cross_schema());
        prop_assert!(conversion.is_complete());
        prop_assert_eq!(conversion.len(), rows * melt * years);
    }

    #[test]
    fn cross_mode_visits_each_heading_pair_once_per_row(
        melt in 1usize..5,
        years in 1usize..6,
        rows in 1usize..5,
    ) {
        let conversion = convert(&orchard_sheet(melt, years, rows), &cross_schema());
        prop_assert!(conversion.is_complete());
        let triples = conversion
            .records
            .iter()
            .map(|record| {
                (
                    text(record, "Variety"),
                    text(record, "Measure"),
                    text(record, "Year"),
                )
            })
            .collect::<BTreeSet<_>>();
        prop_assert_eq!(triples.len(), conversion.len());

        let pairs = triples
            .iter()
            .filter(|(variety, _, _)| variety == "variety_0")
            .map(|(_, measure, year)| (measure.clone(), year.clone()))
            .collect::<BTreeSet<_>>();
        let expected = (0..melt)
            .flat_map(|m| (0..years).map(move |y| (format!("measure_{m}"), year(y))))
            .collect::<BTreeSet<_>>();
        prop_assert_eq!(pairs, expected);
    }

    #[test]
    fn integer_coercion_is_stable(n in any::<i64>()) {
        let first = roundtrip(&Value::Integer(n), FieldType::Signed(IntWidth::W64));
        prop_assert_eq!(&first, &Value::Integer(n));
        prop_assert_eq!(roundtrip(&first, FieldType::Signed(IntWidth::W64)), first);
    }

    #[test]
    fn string_coercion_is_stable(text in "[A-Za-z0-9 ,.;-]{0,24}") {
        let first = roundtrip(&Value::String(text.clone()), FieldType::String);
        prop_assert_eq!(&first, &Value::String(text));
        prop_assert_eq!(roundtrip(&first, FieldType::String), first);
    }

    #[test]
    fn bool_coercion_is_stable(flag in any::<bool>()) {
        let first = roundtrip(&Value::Boolean(flag), FieldType::Boolean);
        prop_assert_eq!(&first, &Value::Boolean(flag));
        prop_assert_eq!(roundtrip(&first, FieldType::Boolean), first);
    }
}
