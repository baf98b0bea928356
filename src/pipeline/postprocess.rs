//! Post-processing: deterministic cleanup of generated text.
//!
//! Remote inference servers normally decode with special tokens skipped, but
//! not all of them do, and LLM providers occasionally echo markup. The rules
//! here make the output of every backend look the same: plain text, no
//! control tokens, bounded length.
//!
//! ## Rule Order
//!
//! Pegasus newline markers become real newlines before whitespace is
//! normalised; control tokens are removed before the length clamp so they
//! never count against the budget.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model output.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Turn Pegasus `<n>` markers into newlines
/// 3. Strip special control tokens (`<pad>`, `</s>`, `<unk>`, `__es__`, …)
/// 4. Strip outer quotes and fences an LLM sometimes wraps around its answer
/// 5. Remove invisible Unicode
/// 6. Collapse runs of spaces and blank lines, trim the ends
pub fn clean_generated_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = RE_PEGASUS_NEWLINE.replace_all(&s, "\n").to_string();
    let s = strip_special_tokens(&s);
    let s = strip_wrapping(&s);
    let s = remove_invisible_chars(&s);
    normalise_whitespace(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Pegasus newline marker ───────────────────────────────────────────

static RE_PEGASUS_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*<n>\s*").unwrap());

// ── Rule 3: Special tokens ───────────────────────────────────────────────────

static RE_SPECIAL_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?s>|<pad>|<unk(?:_\d+)?>|<mask_\d+>|<mask>|<cls>|<sep>|__[a-z]{2,3}__").unwrap()
});

/// Remove tokenizer control tokens, including M2M100 language tokens.
pub fn strip_special_tokens(input: &str) -> String {
    RE_SPECIAL_TOKENS.replace_all(input, "").to_string()
}

// ── Rule 4: Outer quotes / fences ────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:text|plaintext)?\n(.*)\n```$").unwrap());

fn strip_wrapping(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        return caps[1].to_string();
    }
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('“') && trimmed.ends_with('”')));
    if !quoted {
        return trimmed.to_string();
    }
    let first = trimmed.chars().next().map_or(0, char::len_utf8);
    let last = trimmed.chars().next_back().map_or(0, char::len_utf8);
    if first + last > trimmed.len() {
        return trimmed.to_string();
    }
    let inner = &trimmed[first..trimmed.len() - last];
    if inner.contains(['"', '“', '”']) {
        return trimmed.to_string();
    }
    inner.to_string()
}

// ── Rule 5: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Whitespace ───────────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());

fn normalise_whitespace(input: &str) -> String {
    let s = RE_SPACES.replace_all(input, " ");
    let s: String = s
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_LINES.replace_all(&s, "\n\n").trim().to_string()
}

// ── Token budget ─────────────────────────────────────────────────────────────
//
// Token counts here are whitespace-delimited words, a lower bound on what a
// subword tokenizer produces. The word cut only keeps the request small; the
// model limit itself is enforced server-side (`truncation` on the inference
// API) and the output length by `max_length` / `max_tokens`.

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// Number of whitespace-delimited tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    RE_TOKEN.find_iter(text).count()
}

/// Cut `text` after its first `max_tokens` tokens.
///
/// Returns the (possibly shortened) text and whether anything was cut. The
/// cut is not sentence-aware; the original spacing of the kept prefix is
/// preserved.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> (&str, bool) {
    if max_tokens == 0 {
        return ("", !text.trim().is_empty());
    }
    match RE_TOKEN.find_iter(text).nth(max_tokens - 1) {
        Some(last) => {
            let kept = &text[..last.end()];
            let cut = !text[last.end()..].trim().is_empty();
            (kept, cut)
        }
        None => (text, false),
    }
}
