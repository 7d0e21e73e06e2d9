use crate::forum::Topic;

/// Which kind of alert a message announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// A topic newer than the watermark.
    NewTopic,
    /// Forced preview of the newest topic; state is not consulted.
    Preview,
}

/// Render the Telegram message for one topic.
///
/// Three lines: a bold header, the escaped title, and the topic URL.
#[must_use]
pub fn format_alert(kind: AlertKind, forum_name: &str, base_url: &str, topic: &Topic) -> String {
    let header = match kind {
        AlertKind::NewTopic => format!("*New {forum_name} thread*"),
        AlertKind::Preview => format!(
            "*[TEST]* Latest topic on {}",
            escape_markdown(forum_name)
        ),
    };

    format!(
        "{header}\n{}\n{}",
        escape_markdown(&topic.title),
        topic.url(base_url)
    )
}

/// Escape the characters Telegram's legacy Markdown treats as entity markers.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
