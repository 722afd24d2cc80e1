//! Post-processing: deterministic cleanup of vision-model caption output.
//!
//! Even well-prompted vision models occasionally return more than the single
//! sentence asked for:
//!
//! - An option menu: "Here are a few options for alt text:" followed by a
//!   numbered or bulleted list
//! - "Option 1:" style labels in front of each candidate
//! - Multi-line output where only the first line is the description
//! - The caption wrapped in quotation marks
//!
//! This module applies cheap, deterministic regex/string rules that reduce
//! such output to one clean sentence without touching its content. Keeping
//! them here rather than in the prompt means the prompt stays focused on
//! *what to describe*, not on formatting edge-cases. Each rule is
//! independently testable.
//!
//! ## Rule Order
//!
//! Preamble and list markers must be stripped before the first-line pass so
//! that the first surviving line is the description itself, not a header;
//! quote stripping runs last so it sees the final single-line text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Reduce raw model output to a single clean caption line.
///
/// Rules (applied in order):
/// 1. Strip an "options" preamble line ("Here are a few options…:")
/// 2. Strip "Option N:" labels
/// 3. Strip list bullets (`- `) and list numbering (`1. `)
/// 4. Keep the first substantial (non-empty) line
/// 5. Collapse whitespace runs into single spaces
/// 6. Strip one layer of wrapping quotes
///
/// Length enforcement is separate (see [`truncate_caption`]) because only
/// some prompt presets carry a hard cap.
pub fn clean_caption(input: &str) -> String {
    let s = strip_option_preamble(input.trim());
    let s = strip_option_labels(&s);
    let s = strip_list_markers(&s);
    let s = first_substantial_line(&s);
    let s = collapse_whitespace(&s);
    strip_wrapping_quotes(&s)
}

// ── Rule 1: Strip "options" preamble ─────────────────────────────────────────

static RE_OPTIONS_PREAMBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^here are(?: a few)? (?:some )?options[^:\n]*:").unwrap());

fn strip_option_preamble(input: &str) -> String {
    RE_OPTIONS_PREAMBLE.replace(input, "").to_string()
}

// ── Rule 2: Strip "Option N:" labels ─────────────────────────────────────────

static RE_OPTION_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^option \d+:\s*").unwrap());

fn strip_option_labels(input: &str) -> String {
    RE_OPTION_LABEL.replace_all(input, "").to_string()
}

// ── Rule 3: Strip list bullets and numbering ─────────────────────────────────

static RE_LIST_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[-*]\s*").unwrap());
static RE_LIST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\d+\.\s*").unwrap());

fn strip_list_markers(input: &str) -> String {
    let s = RE_LIST_BULLET.replace_all(input, "");
    RE_LIST_NUMBER.replace_all(&s, "").to_string()
}

// ── Rule 4: First substantial line ───────────────────────────────────────────

/// Captions are single sentences by prompt contract; when the model returns
/// several lines, the first non-empty one is the description and the rest is
/// commentary or alternatives.
fn first_substantial_line(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

// ── Rule 5: Collapse whitespace ──────────────────────────────────────────────

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE_RUN.replace_all(input.trim(), " ").to_string()
}

// ── Rule 6: Strip wrapping quotes ────────────────────────────────────────────

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')];

fn strip_wrapping_quotes(input: &str) -> String {
    let mut s = input.trim();
    loop {
        let stripped = QUOTE_PAIRS.iter().find_map(|(open, close)| {
            s.strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        });
        match stripped {
            Some(inner) if !inner.is_empty() => s = inner.trim(),
            _ => return s.to_string(),
        }
    }
}

// ── Length enforcement ───────────────────────────────────────────────────────

/// Enforce a maximum caption length in characters.
///
/// Over-long captions are cut to `max − 3` characters and suffixed with
/// `"..."`, so the result is exactly `max` characters. Counts are `char`s,
/// not bytes, so multi-byte text never splits mid-character. Caps below four
/// characters degrade to a plain cut with no ellipsis.
pub fn truncate_caption(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    if max_chars < 4 {
        return input.chars().take(max_chars).collect();
    }
    let mut out: String = input.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
