//! Left-to-right ordering of terminals and splitword parts
//!
//! Node IDs encode sentence position: a terminal's ID ends in a number
//! counting words left to right, and a splitword part's ID ends in
//! `N_sM` where `N` orders terminals and `M` orders the parts within
//! one terminal.

use regex::Regex;
use std::sync::LazyLock;

static LAST_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());
static LAST_DIGITS_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\w$").unwrap());
static SPLITWORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)_s\d*").unwrap());

/// Final number in a node ID, tolerating one trailing letter.
pub fn last_index(id: &str) -> Option<u64> {
    LAST_DIGITS_RE
        .captures(id)
        .or_else(|| LAST_DIGITS_LETTER_RE.captures(id))
        .and_then(|c| c[1].parse().ok())
}

/// For a splitword part ID of the form `..N_sM`, the terminal number `N`.
pub fn splitword_terminal_index(id: &str) -> Option<u64> {
    SPLITWORD_RE.captures(id).and_then(|c| c[1].parse().ok())
}

/// Sort key placing terminals and splitword parts left to right.
///
/// A terminal sorts by its final number; a splitword part sorts by its
/// terminal number first and its part number second, so it lands right
/// after its own terminal. IDs that carry no position number sort last,
/// by raw ID.
pub fn position_key(id: &str, is_splitword: bool) -> (u64, u64, String) {
    if is_splitword {
        if let Some(n) = splitword_terminal_index(id) {
            return (n, last_index(id).unwrap_or(0), id.to_string());
        }
    } else if let Some(n) = last_index(id) {
        return (n, 0, id.to_string());
    }
    (u64::MAX, u64::MAX, id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_index() {
        assert_eq!(last_index("s1_5"), Some(5));
        assert_eq!(last_index("s1_503"), Some(503));
        assert_eq!(last_index("s1_5a"), Some(5));
        assert_eq!(last_index("s1_x"), None);
    }

    #[test]
    fn test_splitword_terminal_index() {
        assert_eq!(splitword_terminal_index("s1_5_s2"), Some(5));
        assert_eq!(splitword_terminal_index("s1_5"), None);
    }

    #[test]
    fn test_position_keys_sort_left_to_right() {
        let mut ids = vec![
            ("s1_3", false),
            ("s1_1", false),
            ("s1_2_s2", true),
            ("s1_2", false),
            ("s1_2_s1", true),
        ];
        ids.sort_by_key(|(id, sw)| position_key(id, *sw));
        let sorted: Vec<&str> = ids.iter().map(|(id, _)| *id).collect();
        assert_eq!(sorted, vec!["s1_1", "s1_2", "s1_2_s1", "s1_2_s2", "s1_3"]);
    }

    #[test]
    fn test_unnumbered_ids_sort_last() {
        let mut ids = vec![("weird", false), ("s1_1", false)];
        ids.sort_by_key(|(id, sw)| position_key(id, *sw));
        assert_eq!(ids[0].0, "s1_1");
    }
}
