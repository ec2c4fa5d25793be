//! Context window trimming. Pure, no I/O: given the full history and a
//! configured window size, decide which messages are replayed to the
//! provider on the next exchange.

use crate::models::{Message, Role};

/// Keep the most recent `limit` non-system messages, preserving order. A
/// leading system message is always retained and does not count against the
/// limit. `limit == 0` means unlimited. Idempotent: trimming an already
/// trimmed sequence with the same limit is a no-op.
pub fn trim(history: &[Message], limit: usize) -> Vec<Message> {
    if limit == 0 {
        return history.to_vec();
    }

    let (system, rest) = match history.first() {
        Some(m) if m.role == Role::System => (Some(m), &history[1..]),
        _ => (None, history),
    };

    let start = rest.len().saturating_sub(limit);
    let mut trimmed = Vec::with_capacity(limit + 1);
    if let Some(system) = system {
        trimmed.push(system.clone());
    }
    trimmed.extend_from_slice(&rest[start..]);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn zero_limit_returns_history_unchanged() {
        let h = history(6);
        assert_eq!(trim(&h, 0), h);
    }

    #[test]
    fn keeps_most_recent_messages_in_order() {
        let h = history(6);
        let trimmed = trim(&h, 2);
        assert_eq!(trimmed, h[4..].to_vec());
    }

    #[test]
    fn leading_system_message_does_not_count_against_limit() {
        let mut h = vec![Message::system("rules")];
        h.extend(history(6));
        let trimmed = trim(&h, 2);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[0].role, Role::System);
        assert_eq!(trimmed[1..], h[5..]);
    }

    #[test]
    fn trimming_is_idempotent() {
        let mut h = vec![Message::system("rules")];
        h.extend(history(10));
        let once = trim(&h, 4);
        let twice = trim(&once, 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn never_exceeds_limit_plus_system() {
        for n in 0..8 {
            for limit in 1..5 {
                let mut h = vec![Message::system("rules")];
                h.extend(history(n));
                assert!(trim(&h, limit).len() <= limit + 1);
                assert!(trim(&h[1..], limit).len() <= limit);
            }
        }
    }

    #[test]
    fn short_history_passes_through() {
        let h = history(2);
        assert_eq!(trim(&h, 10), h);
    }
}
