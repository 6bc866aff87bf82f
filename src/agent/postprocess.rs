//! Reply post-processing
//!
//! The system prompt forbids markdown, but models still slip it in. Every
//! generated reply passes through here before fragmentation so the customer
//! only ever sees plain WhatsApp-style text.

use std::sync::LazyLock;

use regex::Regex;

static DASH_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*-\s+").unwrap());
static STAR_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\*\s+").unwrap());
static DOT_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*•\s+").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\d+\.\s+").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static EXCESS_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip markdown artifacts and literal escapes from a generated reply
#[must_use]
pub fn clean_reply(raw: &str) -> String {
    let text = DASH_BULLET.replace_all(raw, "\n");
    let text = STAR_BULLET.replace_all(&text, "\n");
    let text = DOT_BULLET.replace_all(&text, "\n");
    let text = NUMBERED.replace_all(&text, "\n");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");

    // Models sometimes write the escape sequence itself instead of a newline
    let text = text.replace("\\n\\n", "\n\n").replace("\\n", "\n");

    let text = EXCESS_BREAKS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
