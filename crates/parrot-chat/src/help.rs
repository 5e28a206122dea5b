//! Command reference shown by `/?`.

use colored::Colorize;

use crate::commands::CommandRegistry;

pub const HELP_TITLE: &str = "Available Commands";

pub const USAGE_NOTES: [&str; 2] = [
    "Type any message to chat with your data",
    "Commands start with '/' and provide additional functionality",
];

/// Render the help block for every registered command.
pub fn render_help(registry: &CommandRegistry) -> String {
    let rows: Vec<(&str, &str, &str)> = registry
        .entries()
        .map(|(prefix, command)| (prefix, command.description(), command.example()))
        .collect();

    let cmd_w = column_width("Command", rows.iter().map(|r| r.0));
    let desc_w = column_width("Description", rows.iter().map(|r| r.1));
    let ex_w = column_width("Example", rows.iter().map(|r| r.2));

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", HELP_TITLE.cyan().bold()));
    out.push_str(&format!(
        "  {}  {}  {}\n",
        pad("Command", cmd_w).cyan().bold(),
        pad("Description", desc_w).cyan().bold(),
        pad("Example", ex_w).cyan().bold()
    ));
    out.push_str(&format!(
        "  {}  {}  {}\n",
        "-".repeat(cmd_w).blue(),
        "-".repeat(desc_w).blue(),
        "-".repeat(ex_w).blue()
    ));
    for (prefix, description, example) in &rows {
        out.push_str(&format!(
            "  {}  {}  {}\n",
            pad(prefix, cmd_w).cyan(),
            pad(description, desc_w),
            pad(example, ex_w).dimmed()
        ));
    }

    out.push_str(&format!("\n{}\n", "Usage Notes".blue().bold()));
    for note in USAGE_NOTES {
        out.push_str(&format!("  {}\n", note.dimmed()));
    }
    out
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|cell| cell.chars().count())
        .fold(header.chars().count(), usize::max)
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.chars().count());
    format!("{}{}", text, " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_default_commands() {
        colored::control::set_override(false);
        let help = render_help(&CommandRegistry::with_defaults());

        assert!(help.starts_with("Available Commands"));
        assert!(help.contains("Command"));
        assert!(help.contains("Description"));
        assert!(help.contains("Example"));
        assert!(help.contains("/q"));
        assert!(help.contains("Quit the application"));
        assert!(help.contains("/export"));
        assert!(help.contains("Export the current chat history to a file"));
        assert!(help.contains("/?"));
        assert!(help.contains("Display this help message"));
        assert!(help.contains("Type any message to chat with your data"));
        assert!(help.contains("Commands start with '/' and provide additional functionality"));
    }

    #[test]
    fn test_help_rows_follow_registration_order() {
        colored::control::set_override(false);
        let help = render_help(&CommandRegistry::with_defaults());
        let quit = help.find("Quit the application").unwrap();
        let helpline = help.find("Display this help message").unwrap();
        let export = help.find("Export the current chat history").unwrap();
        assert!(quit < helpline && helpline < export);
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }
}
