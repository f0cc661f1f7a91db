//! Plain-text helpers: length limits, button labels, activity log and
//! notification texts.

use crate::models::{ActionKind, ActivityEntry};

/// Entries shown by the log screen at most.
pub const LOG_DISPLAY_LIMIT: usize = 20;

/// Shorten `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Hard cut to `max` characters (no marker).
pub fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn exceeds(text: &str, max: usize) -> bool {
    text.chars().count() > max
}

pub fn action_label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::ListCreated => "📝 List created",
        ActionKind::ListRenamed => "✏️ List renamed",
        ActionKind::ListDeleted => "🗑️ List deleted",
        ActionKind::ItemAdded => "➕ Item added",
        ActionKind::ItemChecked => "✅ Item checked",
        ActionKind::ItemUnchecked => "⬜ Item unchecked",
        ActionKind::ItemHidden => "👁️ Item hidden",
        ActionKind::ItemShown => "👁️ Item shown",
        ActionKind::UserJoined => "👋 User joined",
        ActionKind::UserLeft => "👋 User left",
        ActionKind::UserPromoted => "⬆️ User promoted",
        ActionKind::UserDemoted => "⬇️ User demoted",
        ActionKind::UserRemoved => "🚫 User removed",
    }
}

/// Render newest-first log entries.
pub fn format_activity_log(entries: &[ActivityEntry]) -> String {
    if entries.is_empty() {
        return "📜 No recent activity.".to_string();
    }

    let mut out = String::from("📜 Recent Activity:\n");
    for e in entries.iter().take(LOG_DISPLAY_LIMIT) {
        out.push('\n');
        out.push_str(&format!(
            "[{}] {}",
            e.created_at.format("%m/%d %H:%M"),
            action_label(e.action)
        ));
        if let Some(d) = e.details.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(": ");
            out.push_str(d);
        }
        out.push_str(&format!(" ({})", e.actor_name));
    }
    out
}

/// Whether other members are told about this action.
pub fn is_notified(kind: ActionKind) -> bool {
    matches!(
        kind,
        ActionKind::ItemAdded
            | ActionKind::ItemChecked
            | ActionKind::ItemUnchecked
            | ActionKind::UserJoined
            | ActionKind::UserLeft
            | ActionKind::ListRenamed
    )
}

/// Message fanned out to the other members of `list_name`.
pub fn format_notification(
    list_name: &str,
    kind: ActionKind,
    actor: &str,
    details: Option<&str>,
) -> String {
    let action = match kind {
        ActionKind::ItemAdded => format!("➕ {actor} added"),
        ActionKind::ItemChecked => format!("✅ {actor} checked"),
        ActionKind::ItemUnchecked => format!("⬜ {actor} unchecked"),
        ActionKind::ItemHidden => format!("👁️ {actor} hid"),
        ActionKind::ItemShown => format!("👁️ {actor} showed"),
        ActionKind::UserJoined => format!("👋 {actor} joined the list"),
        ActionKind::UserLeft => format!("👋 {actor} left the list"),
        ActionKind::ListRenamed => format!("✏️ {actor} renamed the list"),
        _ => format!("🔔 {actor} made changes"),
    };

    match details.filter(|d| !d.is_empty()) {
        Some(d) => format!("[{list_name}] {action}: {d}"),
        None => format!("[{list_name}] {action}"),
    }
}
