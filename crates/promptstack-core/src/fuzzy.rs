/// Score handicap applied to label matches relative to kind matches.
const LABEL_HANDICAP: i32 = 250;
/// Score handicap applied to help-text matches.
const HELP_HANDICAP: i32 = 500;

const WORD_START_BONUS: i32 = 15;
const CONSECUTIVE_BONUS: i32 = 10;
const GAP_PENALTY: i32 = 1;

/// The searchable fields of one entry. Kind matches outrank label matches,
/// which outrank help-text matches.
#[derive(Clone, Copy, Debug, Default)]
pub struct Candidate<'a> {
    pub label: &'a str,
    pub help: Option<&'a str>,
    pub kind: Option<&'a str>,
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/' | ':')
}

/// Scores `needle` as an in-order subsequence of `haystack`.
///
/// Matches at word starts and runs of consecutive matches score higher;
/// skipped characters cost a small penalty. `None` means the needle does not
/// appear as a subsequence at all.
pub fn score(needle: &str, haystack: &str) -> Option<i32> {
    if needle.is_empty() {
        return Some(0);
    }

    let mut needle_chars = needle.chars().peekable();
    let mut total = 0i32;
    let mut prev_matched = false;
    let mut prev_char: Option<char> = None;

    for h in haystack.chars() {
        let Some(&n) = needle_chars.peek() else {
            break;
        };
        if chars_eq(n, h) {
            needle_chars.next();
            if prev_matched {
                total += CONSECUTIVE_BONUS;
            }
            if prev_char.is_none() || prev_char.is_some_and(is_word_separator) {
                total += WORD_START_BONUS;
            }
            prev_matched = true;
        } else {
            total -= GAP_PENALTY;
            prev_matched = false;
        }
        prev_char = Some(h);
    }

    if needle_chars.peek().is_some() {
        None
    } else {
        Some(total)
    }
}

/// Best combined score for a candidate:
/// `max(kind − 0, label − 250, help − 500)`, or `None` when no field matches.
pub fn score_candidate(needle: &str, candidate: &Candidate<'_>) -> Option<i32> {
    let mut best: Option<i32> = None;
    if let Some(kind) = candidate.kind {
        best = max_score(best, score(needle, kind));
    }
    best = max_score(
        best,
        score(needle, candidate.label).map(|s| s - LABEL_HANDICAP),
    );
    if let Some(help) = candidate.help {
        best = max_score(best, score(needle, help).map(|s| s - HELP_HANDICAP));
    }
    best
}

fn max_score(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Ranks `candidates` against `needle`, returning the indices of matching
/// entries in descending score order; ties keep original order.
///
/// An empty needle is the identity transform: every index, original order.
/// No matches yields an empty vec; callers fall back to the unfiltered list
/// so navigation remains possible.
pub fn rank(needle: &str, candidates: &[Candidate<'_>]) -> Vec<usize> {
    if needle.is_empty() {
        return (0..candidates.len()).collect();
    }
    let mut scored: Vec<(i32, usize)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, c)| score_candidate(needle, c).map(|s| (s, idx)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, idx)| idx).collect()
}
