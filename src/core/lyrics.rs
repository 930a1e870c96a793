//! Lyrics text processing
//!
//! Stanza segmentation for paginated verse reads and normalization of the
//! raw text returned by the lyrics provider.

/// Split lyrics into stanzas.
///
/// A stanza is a run of consecutive non-blank lines; blank (whitespace-only)
/// lines separate stanzas. Lines within a stanza are joined with `\n` and
/// the stanza's outer edges are trimmed. Empty or all-blank input yields no
/// stanzas.
pub fn split_stanzas(text: &str) -> Vec<String> {
    let mut stanzas = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        stanzas.push(current.join("\n").trim().to_string());
    }

    stanzas
}

/// Number of stanzas in `text`
pub fn stanza_count(text: &str) -> usize {
    split_stanzas(text).len()
}

/// Pick the stanza for a 1-based `page`.
///
/// Returns `None` when the page is out of range. Page 1 of a text with no
/// stanzas is an empty verse rather than a missing one.
pub fn stanza_for_page(stanzas: &[String], page: i64) -> Option<String> {
    if page == 1 && stanzas.is_empty() {
        return Some(String::new());
    }

    if page < 1 {
        return None;
    }

    usize::try_from(page - 1)
        .ok()
        .and_then(|index| stanzas.get(index))
        .cloned()
}

/// Clean up provider lyrics before they are stored.
///
/// Escaped newline sequences (`\n` written as two characters) are decoded,
/// every line is trimmed, runs of blank lines collapse to a single blank
/// line and leading/trailing blank lines are dropped.
pub fn normalize_lyrics(raw: &str) -> String {
    let decoded = raw.replace("\\r\\n", "\n").replace("\\n", "\n");

    let mut lines: Vec<&str> = Vec::new();
    let mut pending_blank = false;

    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }

        if pending_blank {
            lines.push("");
            pending_blank = false;
        }
        lines.push(trimmed);
    }

    lines.join("\n")
}
