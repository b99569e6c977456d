//! CLI command implementations.

pub mod contacts;
pub mod send;
pub mod status;
pub mod watch;

use relaychat_types::{ChatMessage, Identity};

/// Current Unix time in seconds.
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Format a Unix timestamp relative to `now`.
pub fn format_age(ts: i64, now: i64) -> String {
    let diff = now.saturating_sub(ts).max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

/// One line per message: direction, counterparty, age and text.
pub fn format_message(message: &ChatMessage, me: &Identity, now: i64) -> String {
    let arrow = if &message.sender == me { "->" } else { "<-" };
    format!(
        "{} {} ({}): {}",
        arrow,
        message.counterparty(me),
        format_age(message.display_time(), now),
        message.message
    )
}
