//! Parser for the sed-style recall and substitute commands.
//!
//! Two forms are recognized, anchored at the start of a line:
//!
//! - recall:     `pDsearchD[target][~N]`
//! - substitute: `sDsearchDreplace[D[target|g][~N]]`
//!
//! where `D` is any single non-alphanumeric delimiter other than backslash
//! and space. Inside `search` and `replace`, `\D` is an escaped literal
//! delimiter; any other backslash sequence passes through verbatim. Text
//! after a complete command is ignored.
//!
//! The delimiter is user-chosen, so the grammar cannot be one fixed regex
//! without backreferences; it is scanned in a single bounded left-to-right
//! pass instead.

use serde::Serialize;

/// Who a command applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TargetSpec {
    /// No explicit target: the addressed user if the line was addressed,
    /// otherwise the speaker.
    Contextual,
    /// The `g` flag (substitute only): the speaker, replacing all occurrences.
    SelfGlobal,
    /// A nickname prefix to resolve against the channel roster.
    Named(String),
}

/// A successfully parsed recall or substitute command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// Search pattern text, delimiter-unescaped but otherwise verbatim.
    pub search: String,
    /// Replacement text; `None` for recall commands.
    pub replace: Option<String>,
    pub target: TargetSpec,
    /// How many qualifying matches to skip, from most recent.
    pub skip: u32,
}

/// Parse outcome. `Rejected` is distinct from `NoMatch`: a rejected line is
/// command-shaped but invalid, and must be consumed without a reply and
/// without being recorded to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Parse {
    NoMatch,
    Rejected,
    Command(Command),
}

/// Parse a `p`-form recall command.
pub fn parse_print(text: &str) -> Parse {
    let chars: Vec<char> = text.chars().collect();
    let Some(delim) = lead_delimiter(&chars, 'p') else {
        return Parse::NoMatch;
    };
    if delim == '\\' || delim == ' ' {
        return Parse::Rejected;
    }

    let mut pos = 2;
    let (search, closed) = scan_segment(&chars, &mut pos, delim);
    if !closed {
        return Parse::NoMatch;
    }

    let Some((target, skip)) = scan_tail(&chars, pos) else {
        return Parse::Rejected;
    };

    let target = if target.is_empty() {
        TargetSpec::Contextual
    } else {
        TargetSpec::Named(target)
    };

    Parse::Command(Command { search, replace: None, target, skip })
}

/// Parse an `s`-form substitute command.
pub fn parse_substitute(text: &str) -> Parse {
    let chars: Vec<char> = text.chars().collect();
    let Some(delim) = lead_delimiter(&chars, 's') else {
        return Parse::NoMatch;
    };
    if delim == '\\' || delim == ' ' {
        return Parse::Rejected;
    }

    let mut pos = 2;
    let (search, closed) = scan_segment(&chars, &mut pos, delim);
    if !closed {
        return Parse::NoMatch;
    }

    // The replacement may run to end-of-input; the target/skip segment only
    // exists behind a third delimiter.
    let (replace, closed) = scan_segment(&chars, &mut pos, delim);
    if !closed {
        if replace.is_empty() {
            // The bare `s/foo/` form, ambiguous with a forgotten trailing
            // delimiter.
            return Parse::Rejected;
        }
        return Parse::Command(Command {
            search,
            replace: Some(replace),
            target: TargetSpec::Contextual,
            skip: 0,
        });
    }

    let Some((target, skip)) = scan_tail(&chars, pos) else {
        return Parse::Rejected;
    };

    let target = if target.is_empty() {
        TargetSpec::Contextual
    } else if target == "g" {
        TargetSpec::SelfGlobal
    } else {
        TargetSpec::Named(target)
    };

    Parse::Command(Command { search, replace: Some(replace), target, skip })
}

/// Check the leading command letter and return the delimiter character.
/// The delimiter may be anything outside the word class `[A-Za-z0-9_]`;
/// validity of backslash and space is the caller's concern.
fn lead_delimiter(chars: &[char], lead: char) -> Option<char> {
    if chars.len() < 2 || !chars[0].eq_ignore_ascii_case(&lead) {
        return None;
    }
    let delim = chars[1];
    if delim.is_ascii_alphanumeric() || delim == '_' {
        return None;
    }
    Some(delim)
}

/// Scan one delimited segment starting at `*pos`, unescaping `\D` pairs.
/// Returns the segment text and whether a closing delimiter was found;
/// `*pos` ends up just past the closing delimiter, or at end-of-input.
fn scan_segment(chars: &[char], pos: &mut usize, delim: char) -> (String, bool) {
    let mut out = String::new();
    let mut i = *pos;

    while i < chars.len() {
        if chars[i] == delim {
            *pos = i + 1;
            return (out, true);
        }
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == delim {
            out.push(delim);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    *pos = i;
    (out, false)
}

/// Scan the `[target][~N]` tail. The target is everything up to a space or
/// tilde; a tilde must be followed by a valid `u32` numeral (`None` on a
/// malformed or overflowing skip count). Trailing text is ignored.
fn scan_tail(chars: &[char], pos: usize) -> Option<(String, u32)> {
    let mut i = pos;
    let mut target = String::new();

    while i < chars.len() && chars[i] != ' ' && chars[i] != '~' {
        target.push(chars[i]);
        i += 1;
    }

    let mut skip = 0;
    if i < chars.len() && chars[i] == '~' {
        i += 1;
        let digits_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let digits: String = chars[digits_start..i].iter().collect();
        skip = digits.parse().ok()?;
    }

    Some((target, skip))
}
