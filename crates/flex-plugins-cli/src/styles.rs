use anstyle::{AnsiColor, Color, Style};

pub const HEADER: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const LITERAL: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Shell commands the user is asked to run.
pub const COMMAND: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
    .bold();

pub const ERROR: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Red)))
    .bold();

pub const WARNING: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Yellow)))
    .bold();

pub const DIM: Style = Style::new().dimmed();

pub fn get_clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(HEADER)
        .usage(HEADER)
        .literal(LITERAL)
        .placeholder(LITERAL)
}

/// Wraps `text` in the escape codes for `style`.
pub fn paint(style: Style, text: &str) -> String {
    format!("{style}{text}{style:#}")
}
