use std::fmt::Write;

use migrun_core::StatusEntry;

/// Render status entries as aligned `<status>  <id>` lines.
pub fn render(entries: &[StatusEntry]) -> String {
    if entries.is_empty() {
        return "no migrations found\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{:<8} {}", entry.status, entry.id);
    }
    out
}
