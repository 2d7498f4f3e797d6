//! Format folder listings and messages as text.

use crate::model::Entry;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Format a listing as a table headed by the folder path.
///
/// Folders sort before files; both groups keep the server's order otherwise.
pub fn format_listing(path: &str, items: &[Entry], from_cache: bool) -> String {
    let mut out = String::new();
    let marker = if from_cache {
        format!(" {}", "(cached)".dimmed())
    } else {
        String::new()
    };
    out.push_str(&format!("{}{}\n", format_section_heading(path), marker));

    if items.is_empty() {
        out.push_str("This folder is empty.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Kind", "Size", "Modified"]);

    let (folders, files): (Vec<&Entry>, Vec<&Entry>) = items.iter().partition(|e| e.is_folder());
    for entry in folders.iter().chain(files.iter()) {
        let name = if entry.is_folder() {
            Cell::new(format!("{}/", entry.name))
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&entry.name)
        };
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            name,
            Cell::new(entry.kind_label()),
            Cell::new(entry.formatted_size()).set_alignment(CellAlignment::Right),
            Cell::new(modified),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    let folder_count = folders.len();
    out.push_str(&format!(
        "{} folder(s), {} file(s)\n",
        folder_count,
        items.len() - folder_count
    ));
    out
}

pub fn format_error(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message)
}

pub fn format_notice(message: &str) -> String {
    format!("{}", message.green())
}
