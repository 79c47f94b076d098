use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

const ESC: char = '\u{1b}';
const ELLIPSIS: char = '…';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AnsiState {
    Normal,
    Escape,
    Csi,
    Osc,
    OscEsc,
}

/// Advances the escape-sequence state machine by one character and reports
/// whether that character belongs to an escape sequence.
fn advance(state: &mut AnsiState, ch: char) -> bool {
    match *state {
        AnsiState::Normal => {
            if ch == ESC {
                *state = AnsiState::Escape;
                true
            } else {
                false
            }
        }
        AnsiState::Escape => {
            *state = match ch {
                '[' => AnsiState::Csi,
                ']' => AnsiState::Osc,
                _ => AnsiState::Normal,
            };
            true
        }
        AnsiState::Csi => {
            if ('\u{40}'..='\u{7e}').contains(&ch) {
                *state = AnsiState::Normal;
            }
            true
        }
        AnsiState::Osc => {
            if ch == '\u{07}' {
                *state = AnsiState::Normal;
            } else if ch == ESC {
                *state = AnsiState::OscEsc;
            }
            true
        }
        AnsiState::OscEsc => {
            *state = if ch == '\\' {
                AnsiState::Normal
            } else {
                AnsiState::Osc
            };
            true
        }
    }
}

/// Removes ANSI escape sequences (CSI and OSC) from `input`.
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.contains(ESC) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut state = AnsiState::Normal;
    for ch in input.chars() {
        if !advance(&mut state, ch) {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Terminal-cell width of `input` with escape sequences excluded.
pub fn visible_width(input: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(input).as_ref())
}

/// Right-pads `input` with spaces to a visible width of at least `width`.
/// Never truncates.
pub fn pad_end(input: &str, width: usize) -> String {
    let current = visible_width(input);
    if current >= width {
        return input.to_string();
    }
    format!("{input}{}", " ".repeat(width - current))
}

/// Truncates `input` to at most `max_cols` visible columns, appending an
/// ellipsis marker when anything was cut.
///
/// Escape sequences pass through untouched, including ones after the cut
/// point, so styled text keeps its closing resets.
pub fn truncate_visible(input: &str, max_cols: usize) -> Cow<'_, str> {
    if visible_width(input) <= max_cols {
        return Cow::Borrowed(input);
    }
    if max_cols == 0 {
        return Cow::Owned(String::new());
    }

    let budget = max_cols - 1;
    let mut out = String::with_capacity(input.len());
    let mut used = 0usize;
    let mut cut = false;
    let mut state = AnsiState::Normal;

    for ch in input.chars() {
        if advance(&mut state, ch) {
            out.push(ch);
            continue;
        }
        if cut {
            continue;
        }
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            out.push(ELLIPSIS);
            cut = true;
            continue;
        }
        out.push(ch);
        used += w;
    }

    Cow::Owned(out)
}
