#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const YIELD_SCHEMA: &str = "\
name: yield
fields:
  - name: Name
    type: string
    tag: col:Name
  - name: Year
    type: string
    tag: intcols:colname
  - name: Value
    type: float64
    tag: intcols:value
";

pub const YIELD_SHEET: &str = "Name,2010,2011\nFuji,500,550\n";

/// Scratch directory holding sheets, workbooks and schema files for one test.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` (parent directories included) and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read temp file")
    }
}

/// Lossy UTF-8 conversion for command output assertions.
pub fn stdout_text(output: &[u8]) -> String {
    String::from_utf8_lossy(output).into_owned()
}
