use crate::error::Result;
use crate::images::file_stamp;
use crate::message::{ConversationHistory, Role};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

pub fn render_report(title: &str, history: &ConversationHistory, at: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!("Exported: {}\n", at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Messages: {}\n", history.len()));
    out.push_str(&format!("{}\n\n", "=".repeat(50)));

    for message in history.iter() {
        out.push_str(&format!("[{}]\n{}\n\n", role_label(message.role()), message.content()));
    }
    out
}

/// Write the conversation to `<dir>/chat_export_<YYYYmmdd_HHMMSS>.txt`
pub fn export_report(
    dir: &Path,
    title: &str,
    history: &ConversationHistory,
    at: DateTime<Local>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("chat_export_{}.txt", file_stamp(at)));
    fs::write(&path, render_report(title, history, at))?;
    info!(path = %path.display(), "exported conversation");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn export_names_file_by_timestamp_and_lists_turns() {
        let dir = tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let history = ConversationHistory::new()
            .with_turn("What is 2+2?", "4")
            .with_turn("And 3+3?", "6");

        let path = export_report(dir.path(), "Teacher chat", &history, at).unwrap();

        assert_eq!(path.file_name().unwrap(), "chat_export_20250102_030405.txt");
        let body = fs::read_to_string(path).unwrap();
        assert!(body.starts_with("Teacher chat\nExported: 2025-01-02 03:04:05\nMessages: 4\n"));
        assert!(body.contains("[User]\nWhat is 2+2?\n\n[Assistant]\n4\n"));
        assert!(body.contains("[User]\nAnd 3+3?"));
    }

    #[test]
    fn empty_history_still_exports_a_header() {
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let body = render_report("Empty", &ConversationHistory::new(), at);
        assert!(body.contains("Messages: 0"));
    }
}
