//! Presentation helpers shared by all commands

mod format;
mod output;
mod style;

pub use format::{
    format_duration, format_duration_ms, format_number, format_tokens, model_short, one_line,
    relative_time, truncate,
};
pub use output::{md_header, md_table, print_json, OutputFormat};
pub use style::{bar, init_color, section, title};
