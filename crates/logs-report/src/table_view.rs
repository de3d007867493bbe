//! Plain-text table rendering for report output.
//!
//! Produces a bordered, column-aligned table. Widths are measured in
//! terminal display columns so multi-byte paths line up.

use unicode_width::UnicodeWidthStr;

/// Horizontal alignment of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A titled table with one header row.
#[derive(Debug, Clone)]
pub struct TextTable {
    pub title: String,
    pub headers: Vec<String>,
    pub align: Vec<Align>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(title: impl Into<String>, headers: &[&str], align: &[Align]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            align: align.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render at most `limit` rows; the title notes when rows were cut.
    pub fn render(&self, limit: usize) -> String {
        let shown = self.rows.len().min(limit);
        let visible = &self.rows[..shown];

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in visible {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.width());
                }
            }
        }

        let separator = {
            let parts: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
            format!("+{}+", parts.join("+"))
        };

        let mut out = String::new();
        if shown < self.rows.len() {
            out.push_str(&format!(
                " {} (showing {} of {} rows)\n",
                self.title,
                shown,
                self.rows.len()
            ));
        } else {
            out.push_str(&format!(" {}\n", self.title));
        }

        out.push_str(&separator);
        out.push('\n');
        out.push_str(&self.render_line(&self.headers, &widths, true));
        out.push_str(&separator);
        out.push('\n');
        if visible.is_empty() {
            let inner = separator.width() - 2;
            out.push_str(&format!("|{}|\n", pad(" (no rows)", inner, Align::Left)));
        }
        for row in visible {
            out.push_str(&self.render_line(row, &widths, false));
        }
        out.push_str(&separator);
        out.push('\n');
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize], header: bool) -> String {
        let parts: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                // Headers are always left aligned.
                let align = if header {
                    Align::Left
                } else {
                    self.align.get(i).copied().unwrap_or(Align::Left)
                };
                format!(" {} ", pad(cell, w, align))
            })
            .collect();
        format!("|{}|\n", parts.join("|"))
    }
}

/// Pad `text` with spaces to `width` display columns.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{}{}", text, fill),
        Align::Right => format!("{}{}", fill, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TextTable {
        let mut table = TextTable::new("Lessons", &["root_path_2", "count"], &[Align::Left, Align::Right]);
        table.push_row(vec!["java-ii/arrays".into(), "1".into()]);
        table.push_row(vec!["javascript-i/loops".into(), "1,204".into()]);
        table
    }

    #[test]
    fn test_render_aligns_columns() {
        let out = sample().render(10);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], " Lessons");
        assert_eq!(lines[1], "+--------------------+-------+");
        assert_eq!(lines[2], "| root_path_2        | count |");
        assert_eq!(lines[4], "| java-ii/arrays     |     1 |");
        assert_eq!(lines[5], "| javascript-i/loops | 1,204 |");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_render_limit_notes_truncation() {
        let out = sample().render(1);
        assert!(out.starts_with(" Lessons (showing 1 of 2 rows)\n"));
        assert!(!out.contains("javascript-i/loops"));
    }

    #[test]
    fn test_render_empty_table() {
        let table = TextTable::new("Empty", &["path", "count"], &[Align::Left, Align::Right]);
        let out = table.render(5);
        assert!(out.contains("(no rows)"));
        let widths: Vec<usize> = out.lines().skip(1).map(|l| l.width()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad("é", 3, Align::Left), "é  ");
        assert_eq!(pad("7", 3, Align::Right), "  7");
        assert_eq!(pad("toolong", 3, Align::Left), "toolong");
    }
}
