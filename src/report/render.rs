use std::fmt::Write;

use crate::pr::PullRequestDetail;

/// Render one PR as the indented text block used inside each section.
pub fn render_pr_block(detail: &PullRequestDetail, commit_messages: &[String]) -> String {
    format!(
        "\n        PR #{}\n        Title: {}\n        Status: {}\n        Owner: {}\n        PR Branches: {} --> {}\n        PR Link: {}\n        Commit Messages: {}\n    ",
        detail.number,
        detail.title,
        detail.state,
        detail.user.login,
        detail.head.name,
        detail.base.name,
        detail.html_url,
        format_message_list(commit_messages),
    )
}

/// Format messages as a bracketed, quoted list: `['fix bug', 'add test']`.
pub fn format_message_list(messages: &[String]) -> String {
    let quoted: Vec<String> = messages.iter().map(|m| quote_message(m)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Quote a single message, escaping so the result stays on one line.
///
/// Single quotes are used unless the text contains a single quote and no
/// double quote.
fn quote_message(message: &str) -> String {
    let quote = if message.contains('\'') && !message.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(message.len() + 2);
    out.push(quote);
    for ch in message.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
