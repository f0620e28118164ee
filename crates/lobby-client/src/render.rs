//! Plain-text rendering of the sync view

use lobby_common::Notice;
use lobby_core::Message;
use lobby_sync::{RosterEntry, SyncView};

/// `[14:03] Ada Lovelace: hello`, with `you` for own messages
pub fn message_line(view: &SyncView, message: &Message) -> String {
    let author = if message.is_from(&view.self_id) {
        "you".to_string()
    } else {
        view.author(message).display_name
    };
    format!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M"),
        author,
        message.content
    )
}

/// `Ada is typing...`, `Ada and Bob are typing...`, `Ada, Bob and Cy are typing...`
pub fn typing_line(names: &[&str]) -> Option<String> {
    let line = match names {
        [] => return None,
        [one] => format!("{one} is typing..."),
        [init @ .., last] => format!("{} and {last} are typing...", init.join(", ")),
    };
    Some(line)
}

/// `* AL Ada Lovelace` for online users, `  AL ...` otherwise
pub fn roster_line(entry: &RosterEntry) -> String {
    let marker = if entry.online { '*' } else { ' ' };
    let suffix = if entry.is_self { " (you)" } else { "" };
    format!(
        "{marker} {:<2} {}{suffix}",
        entry.profile.initials(),
        entry.profile.display_name
    )
}

pub fn notice_line(notice: &Notice) -> String {
    format!("! {}: {}", notice.title, notice.message)
}
