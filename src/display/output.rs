use anyhow::Result;
use serde::Serialize;

/// How a command renders its report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable, colored when stdout is a terminal
    #[default]
    Terminal,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_flags(json: bool, md: bool) -> Self {
        if json {
            Self::Json
        } else if md {
            Self::Markdown
        } else {
            Self::Terminal
        }
    }
}

/// Pretty JSON on stdout, two-space indent
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn md_header(level: usize, title: &str) {
    println!("{} {}\n", "#".repeat(level), title);
}

/// Render `md_table` to a string
pub fn md_table_string(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!("| {} |\n", vec!["---"; headers.len()].join(" | ")));
    for row in rows {
        let mut cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        cells.resize(headers.len(), String::new());
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

/// Markdown table; short rows are padded with empty cells
pub fn md_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", md_table_string(headers, rows));
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}
