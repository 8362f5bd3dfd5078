mod common;

use assert_cmd::Command;
use predicates::str::contains;

use common::{TestWorkspace, YIELD_SCHEMA, YIELD_SHEET, stdout_text};

fn sheet_stage() -> Command {
    Command::cargo_bin("sheet-stage").expect("binary exists")
}

#[test]
fn convert_writes_pivoted_csv() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("yield.csv", YIELD_SHEET);
    let schema = workspace.write("yield.yaml", YIELD_SCHEMA);
    let output = workspace.path().join("out.csv");

    sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(
        workspace.read("out.csv"),
        "Name,Year,Value\nFuji,2010,500\nFuji,2011,550\n"
    );
}

#[test]
fn convert_streams_json_lines_to_stdout() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("yield.csv", YIELD_SHEET);
    let schema = workspace.write("yield.yaml", YIELD_SCHEMA);

    let assert = sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
            "--format",
            "jsonl",
        ])
        .assert()
        .success();
    let stdout = stdout_text(&assert.get_output().stdout);
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], r#"{"Name":"Fuji","Year":"2010","Value":500.0}"#);
}

#[test]
fn convert_reads_constants_and_overrides_from_flags() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("apples.tsv", "Variety\tAlias\nFuji\tMalus\n");
    let schema = workspace.write(
        "apples.yaml",
        "name: apples\nfields:\n  \
         - name: Name\n    type: string\n    tag: col:Variety\n  \
         - name: Batch\n    type: int32\n    tag: mapConst:batch\n",
    );

    sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
            "--const",
            "batch=7",
            "--column",
            "Name=2",
            "--output-delimiter",
            "pipe",
        ])
        .assert()
        .success()
        .stdout(contains("Name|Batch\nMalus|7\n"));
}

#[test]
fn convert_keeps_partial_output_and_fails_on_bad_row() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("counts.csv", "Name,Trees\nFuji,12\nGala,lots\nPink,3\n");
    let schema = workspace.write(
        "counts.yaml",
        "name: counts\nfields:\n  \
         - name: Name\n    type: string\n    tag: col:Name\n  \
         - name: Trees\n    type: uint16\n    tag: col:Trees\n",
    );
    let output = workspace.path().join("counts-out.csv");

    sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("stopped after 1 record(s)"))
        .stderr(contains("field 'Trees'"));

    assert_eq!(workspace.read("counts-out.csv"), "Name,Trees\nFuji,12\n");
}

#[test]
fn convert_reports_missing_header() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("oranges.csv", "Name\nValencia\n");
    let schema = workspace.write(
        "oranges.yaml",
        "name: oranges\nfields:\n  - name: Origin\n    type: string\n    tag: col:Origin\n",
    );

    sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Origin"));
}

#[test]
fn convert_rejects_unsupported_schema_types() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("yield.csv", YIELD_SHEET);
    let schema = workspace.write(
        "bad.yaml",
        "name: bad\nfields:\n  - name: Value\n    type: decimal\n",
    );

    sheet_stage()
        .args([
            "convert",
            "-i",
            sheet.to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("decimal"));
}

#[test]
fn convert_reads_stdin() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("yield.yaml", YIELD_SCHEMA);

    sheet_stage()
        .args(["convert", "-i", "-", "-m", schema.to_str().unwrap()])
        .write_stdin(YIELD_SHEET)
        .assert()
        .success()
        .stdout(contains("Fuji,2011,550"));
}

#[test]
fn headings_lists_first_row() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("yield.csv", YIELD_SHEET);

    sheet_stage()
        .args(["headings", "-i", sheet.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("heading"))
        .stdout(contains("2011"));
}

#[test]
fn sheets_lists_workbook_directory() {
    let workspace = TestWorkspace::new();
    workspace.write("orchard/yield.csv", YIELD_SHEET);
    workspace.write("orchard/oranges.tsv", "Name\tOrigin\nValencia\tSpain\n");

    let assert = sheet_stage()
        .args(
            ["sheets", "-i", workspace.path().join("orchard").to_str().unwrap()],
        )
        .assert()
        .success();
    let stdout = stdout_text(&assert.get_output().stdout);
    let oranges = stdout.find("oranges").expect("oranges listed");
    let yields = stdout.find("yield").expect("yield listed");
    assert!(oranges < yields);
}

#[test]
fn inspect_describes_schema_and_layout() {
    let workspace = TestWorkspace::new();
    let sheet = workspace.write("yield.csv", YIELD_SHEET);
    let schema = workspace.write("yield.yaml", YIELD_SCHEMA);

    sheet_stage()
        .args([
            "inspect",
            "-m",
            schema.to_str().unwrap(),
            "-i",
            sheet.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("intcols:colname"))
        .stdout(contains("records per row: 2"))
        .stdout(contains("numeric headings: 2010, 2011"));
}

#[test]
fn convert_all_sheets_concatenates_workbook() {
    let workspace = TestWorkspace::new();
    workspace.write("orchard/a_yield.csv", YIELD_SHEET);
    workspace.write("orchard/b_yield.csv", "Name,2012\nGala,610\n");
    let schema = workspace.write("yield.yaml", YIELD_SCHEMA);

    sheet_stage()
        .args([
            "convert",
            "-i",
            workspace.path().join("orchard").to_str().unwrap(),
            "-m",
            schema.to_str().unwrap(),
            "--all-sheets",
        ])
        .assert()
        .success()
        .stdout(contains(
            "Name,Year,Value\nFuji,2010,500\nFuji,2011,550\nGala,2012,610\n",
        ));
}

#[test]
fn listing_commands_honour_input_encoding() {
    let workspace = TestWorkspace::new();
    let book = workspace.path().join("book");
    std::fs::create_dir_all(&book).expect("create book dir");
    std::fs::write(book.join("cafes.csv"), b"Name\nCaf\xe9\n").expect("write bytes");
    let schema = workspace.write(
        "cafes.yaml",
        "name: cafes\nfields:\n  - name: Name\n    type: string\n    tag: col:Name\n",
    );

    sheet_stage()
        .args(["sheets", "-i", book.to_str().unwrap()])
        .assert()
        .failure();

    sheet_stage()
        .args([
            "sheets",
            "-i",
            book.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success()
        .stdout(contains("cafes"));

    sheet_stage()
        .args([
            "inspect",
            "-m",
            schema.to_str().unwrap(),
            "-i",
            book.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success()
        .stdout(contains("Sheet 'cafes'"));
}
