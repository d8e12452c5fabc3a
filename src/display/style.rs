use colored::Colorize;
use std::io::IsTerminal;

use super::OutputFormat;

/// Decide color once per process. `NO_COLOR` (any value) or a non-terminal
/// stdout turns it off, as do JSON and Markdown output.
pub fn init_color(format: OutputFormat) {
    let enabled = format == OutputFormat::Terminal
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    colored::control::set_override(enabled);
}

/// Print a titled section framed by box-drawing corners
pub fn section(title: &str, body: impl FnOnce()) {
    println!("┌ {}", title.bold());
    body();
    println!("└");
}

/// Command heading
pub fn title(text: &str) {
    println!("{}", text.bold().cyan());
}

/// Proportional bar of `width` cells
pub fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 || value == 0 {
        return "░".repeat(width).dimmed().to_string();
    }
    let filled = ((value as u128 * width as u128) / max as u128) as usize;
    let filled = filled.clamp(1, width);
    format!(
        "{}{}",
        "█".repeat(filled).green(),
        "░".repeat(width - filled).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: String) -> String {
        s.chars().filter(|c| *c == '█' || *c == '░').collect()
    }

    #[test]
    fn test_bar_proportions() {
        colored::control::set_override(false);
        assert_eq!(plain(bar(5, 10, 10)), "█████░░░░░");
        assert_eq!(plain(bar(10, 10, 4)), "████");
        assert_eq!(plain(bar(0, 10, 3)), "░░░");
        assert_eq!(plain(bar(3, 0, 3)), "░░░");
    }

    #[test]
    fn test_bar_minimum_one_cell() {
        colored::control::set_override(false);
        assert_eq!(plain(bar(1, 1000, 5)), "█░░░░");
    }
}
