//! Nickname validation
//!
//! The format check alone decides whether a name is accepted; uniqueness is
//! deliberately not checked, so two connections may register the same name.

use crate::protocol::MAX_NICKNAME_LEN;

/// Check a candidate nickname against `^[A-Za-z0-9_]{1,12}$`
///
/// Accepts iff every character is an ASCII letter, digit, or underscore and
/// the length is between 1 and [`MAX_NICKNAME_LEN`] bytes.
pub fn is_valid_nickname(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_NICKNAME_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_names() {
        for name in ["alice", "Bob", "user_42", "_", "x", "abcdefghijkl"] {
            assert!(is_valid_nickname(name), "{name:?} should be accepted");
        }
    }

    #[test]
    fn test_rejects_empty_name() {
        assert!(!is_valid_nickname(""));
    }

    #[test]
    fn test_rejects_overlong_name() {
        assert!(!is_valid_nickname("abcdefghijklm")); // 13 chars
    }

    #[test]
    fn test_rejects_forbidden_characters() {
        for name in ["a!ice", "a b", "na-me", "héllo", "nick\n", "a.b"] {
            assert!(!is_valid_nickname(name), "{name:?} should be rejected");
        }
    }
}
