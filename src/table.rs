//! Plain-text tables for the listing commands.

use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct TextTable {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect::<Vec<_>>();
        let align = vec![Align::Left; headers.len()];
        Self {
            headers,
            align,
            rows: Vec::new(),
        }
    }

    /// Right-aligns the column at `idx`, typically a position or count.
    pub fn align_right(mut self, idx: usize) -> Self {
        if let Some(slot) = self.align.get_mut(idx) {
            *slot = Align::Right;
        }
        self
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row = cells.into_iter().map(Into::into).collect::<Vec<String>>();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths = self
            .headers
            .iter()
            .map(|h| display_width(h).max(3))
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(display_width(&sanitize_cell(cell)));
            }
        }

        let mut output = String::new();
        let _ = writeln!(output, "{}", self.format_row(&self.headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", self.format_row(&rule, &widths));
        for row in &self.rows {
            let _ = writeln!(output, "{}", self.format_row(row, &widths));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn format_row(&self, values: &[String], widths: &[usize]) -> String {
        let cells = values
            .iter()
            .zip(widths)
            .zip(&self.align)
            .map(|((value, width), align)| {
                let cell = sanitize_cell(value);
                let padding = " ".repeat(width.saturating_sub(display_width(&cell)));
                match align {
                    Align::Left => format!("{cell}{padding}"),
                    Align::Right => format!("{padding}{cell}"),
                }
            })
            .collect::<Vec<_>>();
        cells.join("  ").trim_end().to_string()
    }
}

fn display_width(value: &str) -> usize {
    value.chars().filter(|ch| !ch.is_control()).count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_pad_to_widest_cell() {
        let mut table = TextTable::new(["#", "heading"]).align_right(0);
        table.push_row(["1", "Name"]);
        table.push_row(["12", "Origin\nCountry"]);
        let rendered = table.render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "  #  heading");
        assert_eq!(lines[1], "---  --------------");
        assert_eq!(lines[2], "  1  Name");
        assert_eq!(lines[3], " 12  Origin Country");
    }

    #[test]
    fn short_rows_are_padded_with_blanks() {
        let mut table = TextTable::new(["field", "type", "rule"]);
        table.push_row(["Name"]);
        assert_eq!(table.len(), 1);
        assert!(table.render().lines().nth(2).is_some_and(|line| line == "Name"));
    }
}
