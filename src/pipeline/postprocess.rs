//! Post-processing: deterministic cleanup of the model's CSV reply.
//!
//! Even with "no code fences" in the prompt, models occasionally wrap the
//! row in ` ```csv ... ``` ` or leak zero-width characters copied from the
//! screenshot's text layer. These rules fix that without touching the
//! values themselves. Embedded commas and quoting are *not* handled; a
//! comma inside a field still shifts the columns and is caught only by the
//! row builder's field count.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw reply.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (with or without a language tag, multi-line
///    or on one line) or single backticks around the whole reply
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, …)
/// 4. Trim surrounding whitespace
pub fn clean_reply(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Triple backticks around a single line. No language tag is recognised
/// here: the first word could be a name.
static RE_INLINE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```([^`\r\n]*)```$").unwrap());

/// Single backticks around the whole line.
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^`([^`\r\n]*)`$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    [&RE_OUTER_FENCES, &RE_INLINE_FENCE, &RE_INLINE_CODE]
        .iter()
        .find_map(|re| re.captures(trimmed))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| input.to_string())
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip invisible Unicode ──────────────────────────────────────────

const INVISIBLE: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_is_untouched() {
        let reply = "Jane Doe, +1234567890 , HQ ,Telegram";
        assert_eq!(clean_reply(reply), reply);
    }

    #[test]
    fn csv_fence_is_stripped() {
        let reply = "```csv\nKaran Patel,+918954687354,Jagatpura,WhatsApp\n```";
        assert_eq!(clean_reply(reply), "Karan Patel,+918954687354,Jagatpura,WhatsApp");
    }

    #[test]
    fn bare_fence_with_crlf_is_stripped() {
        let reply = "```\r\na,b,c,d\r\n```\r\n";
        assert_eq!(clean_reply(reply), "a,b,c,d");
    }

    #[test]
    fn single_line_fence_is_stripped() {
        let reply = "```Jane Doe,+1,HQ,Telegram```";
        assert_eq!(clean_reply(reply), "Jane Doe,+1,HQ,Telegram");
    }

    #[test]
    fn single_backtick_wrapper_is_stripped() {
        let reply = " `Jane Doe,+1,HQ,Telegram`\n";
        assert_eq!(clean_reply(reply), "Jane Doe,+1,HQ,Telegram");
    }

    #[test]
    fn single_line_fence_yields_clean_row() {
        let row = crate::pipeline::row::build_row(&clean_reply("```Jane Doe,+1,HQ,Telegram```"), "l")
            .unwrap();
        assert_eq!(row.name, "Jane Doe");
        assert_eq!(row.source, "Telegram");
    }

    #[test]
    fn invisible_chars_are_removed() {
        let reply = "\u{FEFF}Jane\u{200B} Doe,1,HQ,Telegram";
        assert_eq!(clean_reply(reply), "Jane Doe,1,HQ,Telegram");
    }

    #[test]
    fn inner_backticks_survive() {
        let reply = "a,`b`,c,d";
        assert_eq!(clean_reply(reply), reply);
    }
}
