//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps command result output bounded and readable while preserving signal.

use colored::Colorize;
use serde_json::Value as JsonValue;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` messages with compact formatting.
pub fn preview_messages(messages: &[String], max_items: usize, max_chars: usize) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let shown = messages
        .iter()
        .take(max_items)
        .map(|m| compact_line(m, max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    if messages.len() > max_items {
        format!("{} (+{} more)", shown, messages.len() - max_items)
    } else {
        shown
    }
}

fn status_badge(status: &str) -> String {
    match status {
        "PENDING_FEEDBACK" => status.yellow().to_string(),
        "PENDING_COMMITMENT" => status.cyan().to_string(),
        "COMPLETED" => status.green().to_string(),
        other => other.to_string(),
    }
}

fn str_field<'a>(v: &'a JsonValue, key: &str) -> &'a str {
    v.get(key).and_then(JsonValue::as_str).unwrap_or("")
}

/// One line per record: `#id STATUS call_date agent (coordinator) details`.
pub fn record_line(record: &JsonValue) -> String {
    let id = record.get("id").and_then(JsonValue::as_i64).unwrap_or_default();
    format!(
        "#{:<5} {:<18} {} {} ({}) {}",
        id,
        status_badge(str_field(record, "status")),
        str_field(record, "call_date"),
        str_field(record, "agent_name").bold(),
        str_field(record, "coordinator"),
        compact_line(str_field(record, "call_details"), 60),
    )
}

fn string_list(v: &JsonValue, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Human rendering of a command result envelope.
pub fn render_text(out: &JsonValue) -> String {
    let mut lines = Vec::new();
    if let Some(records) = out.get("records").and_then(JsonValue::as_array) {
        if records.is_empty() {
            lines.push("no records".dimmed().to_string());
        }
        for r in records {
            lines.push(record_line(r));
        }
    } else if let Some(record) = out.get("record") {
        lines.push(record_line(record));
        for (label, key) in [("feedback", "feedback"), ("commitment", "commitment")] {
            if let Some(sign) = record.get(key).filter(|s| !s.is_null()) {
                lines.push(format!(
                    "  {}: {} [{} {}]",
                    label,
                    compact_line(str_field(sign, "text"), 80),
                    str_field(sign, "signature"),
                    str_field(sign, "date"),
                ));
            }
        }
        let next = string_list(out, "allowed_next_ops");
        if !next.is_empty() {
            lines.push(format!("  next: {}", next.join(", ")));
        }
    } else if let Some(events) = out.get("events").and_then(JsonValue::as_array) {
        for e in events {
            lines.push(format!(
                "{} {} {} {}",
                str_field(e, "ts"),
                str_field(e, "event_type"),
                str_field(e, "actor"),
                compact_line(&e.get("payload").map(|p| p.to_string()).unwrap_or_default(), 60),
            ));
        }
    } else if out.get("coordinators").is_some() {
        lines.push(format!(
            "coordinators: {}",
            preview_messages(&string_list(out, "coordinators"), 10, 30)
        ));
        lines.push(format!(
            "agents: {}",
            preview_messages(&string_list(out, "agents"), 10, 30)
        ));
    } else {
        let cmd = str_field(out, "cmd");
        lines.push(format!("{} {}", "✓".green(), cmd));
        if let Some(obj) = out.as_object() {
            for (k, v) in obj.iter().filter(|(k, _)| *k != "cmd" && *k != "status") {
                lines.push(format!("  {}: {}", k, compact_line(&v.to_string(), 100)));
            }
        }
    }
    lines.join("\n")
}
