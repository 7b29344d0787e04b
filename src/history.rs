//! Bounded per-user message history with edit revision tracking.

use std::collections::VecDeque;

use regex::Regex;

/// One recorded channel line. The identifier is stable across edits; the
/// revision counts the successful edits applied so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u64,
    text: String,
    is_action: bool,
    revision: u32,
    next_revision: u32,
}

impl Message {
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn is_action(&self) -> bool {
        self.is_action
    }

    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// Produce the next revision of this message: same identifier, new text,
    /// revision bumped to the pending `next_revision`.
    pub fn revise(&self, new_text: String) -> Self {
        Self {
            id: self.id,
            text: new_text,
            is_action: self.is_action,
            revision: self.next_revision,
            next_revision: self.next_revision + 1,
        }
    }
}

/// Newest-first message sequence for one user in one channel. Capacity is
/// fixed at construction; the oldest entry is evicted on overflow.
#[derive(Debug)]
pub struct UserHistory {
    entries: VecDeque<Message>,
    next_id: u64,
    capacity: usize,
}

impl UserHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            next_id: 0,
            capacity,
        }
    }

    /// Record a fresh line at revision 0.
    pub fn push(&mut self, text: impl Into<String>, is_action: bool) {
        let msg = Message {
            id: self.next_id,
            text: text.into(),
            is_action,
            revision: 0,
            next_revision: 1,
        };
        self.next_id += 1;

        self.entries.push_front(msg);
        if self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Position of the `skip`-th (0-indexed) entry, newest first, whose text
    /// is non-empty and matches the pattern anywhere.
    pub fn find_match_idx(&self, pattern: &Regex, skip: u32) -> Option<usize> {
        let mut remaining = skip;
        for (idx, msg) in self.entries.iter().enumerate() {
            if msg.text.is_empty() || !pattern.is_match(&msg.text) {
                continue;
            }
            if remaining > 0 {
                remaining -= 1;
            } else {
                return Some(idx);
            }
        }
        None
    }

    pub fn find_match(&self, pattern: &Regex, skip: u32) -> Option<&Message> {
        self.find_match_idx(pattern, skip).map(|idx| &self.entries[idx])
    }

    pub fn get(&self, idx: usize) -> Option<&Message> {
        self.entries.get(idx)
    }

    /// Store a revised message in place of the entry at `idx`, preserving
    /// history ordering. There is exactly one live entry per identifier.
    pub fn replace_at(&mut self, idx: usize, revised: Message) {
        if let Some(slot) = self.entries.get_mut(idx) {
            *slot = revised;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(pat: &str) -> Regex {
        Regex::new(pat).unwrap()
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut hist = UserHistory::new(3);
        for text in ["one", "two", "three", "four"] {
            hist.push(text, false);
        }
        assert_eq!(hist.len(), 3);
        // "one" fell off the end; "two" is now the oldest surviving line.
        assert!(hist.find_match(&re("one"), 0).is_none());
        assert_eq!(hist.find_match(&re("two"), 0).unwrap().text(), "two");
    }

    #[test]
    fn identifiers_increase_monotonically() {
        let mut hist = UserHistory::new(2);
        hist.push("a", false);
        hist.push("b", false);
        hist.push("c", false);
        let newest = hist.find_match(&re("c"), 0).unwrap().id();
        let older = hist.find_match(&re("b"), 0).unwrap().id();
        assert!(newest > older);
    }

    #[test]
    fn skip_counts_qualifying_matches_only() {
        let mut hist = UserHistory::new(10);
        hist.push("foo2", false);
        hist.push("bar", false);
        hist.push("foo1", false);
        let pat = re("foo");
        assert_eq!(hist.find_match(&pat, 0).unwrap().text(), "foo1");
        assert_eq!(hist.find_match(&pat, 1).unwrap().text(), "foo2");
        assert!(hist.find_match(&pat, 2).is_none());
    }

    #[test]
    fn match_is_substring_not_full_line() {
        let mut hist = UserHistory::new(4);
        hist.push("well hello there", false);
        assert!(hist.find_match(&re("hello"), 0).is_some());
    }

    #[test]
    fn revise_keeps_id_and_bumps_revision() {
        let mut hist = UserHistory::new(4);
        hist.push("teh typo", false);
        let idx = hist.find_match_idx(&re("teh"), 0).unwrap();
        let old = hist.get(idx).unwrap().clone();
        let revised = old.revise("the typo".to_string());
        assert_eq!(revised.id(), old.id());
        assert_eq!(revised.revision(), 1);

        hist.replace_at(idx, revised);
        assert_eq!(hist.len(), 1);
        let current = hist.find_match(&re("typo"), 0).unwrap();
        assert_eq!(current.text(), "the typo");
        assert_eq!(current.revision(), 1);
        // The pre-edit text is gone for matching purposes.
        assert!(hist.find_match(&re("teh"), 0).is_none());
    }
}
