//! Per-channel roster of known users and their histories.

use std::collections::BTreeMap;

use crate::history::UserHistory;

/// One known user: display nickname plus their recorded lines.
#[derive(Debug)]
pub struct UserEntry {
    nick: String,
    pub history: UserHistory,
}

impl UserEntry {
    pub fn nick(&self) -> &str {
        &self.nick
    }
}

/// State for one joined channel: a case-insensitively keyed user map and the
/// one-shot roster initialization flag. Join events arrive before the full
/// names list does, so bulk population is deferred to the first roster
/// snapshot and happens exactly once.
#[derive(Debug)]
pub struct ChannelState {
    users: BTreeMap<String, UserEntry>,
    initialized: bool,
    capacity: usize,
}

fn key(nick: &str) -> String {
    nick.to_lowercase()
}

impl ChannelState {
    pub fn new(capacity: usize) -> Self {
        Self {
            users: BTreeMap::new(),
            initialized: false,
            capacity,
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Bulk-add users from a roster snapshot. Idempotent: once a channel is
    /// initialized, further snapshots are no-ops, and users already seen
    /// keep their histories.
    pub fn populate(&mut self, nicks: &[String]) {
        if self.initialized {
            return;
        }
        for nick in nicks {
            self.ensure_user(nick);
        }
        self.initialized = true;
    }

    /// Add a user with a fresh history. A re-join resets any previous state
    /// under the same nick.
    pub fn add_user(&mut self, nick: &str) {
        self.users.insert(
            key(nick),
            UserEntry {
                nick: nick.to_string(),
                history: UserHistory::new(self.capacity),
            },
        );
    }

    /// Look up a user, creating an empty entry on first sight.
    pub fn ensure_user(&mut self, nick: &str) -> &mut UserEntry {
        let capacity = self.capacity;
        self.users.entry(key(nick)).or_insert_with(|| UserEntry {
            nick: nick.to_string(),
            history: UserHistory::new(capacity),
        })
    }

    pub fn remove_user(&mut self, nick: &str) {
        self.users.remove(&key(nick));
    }

    /// Rekey a user's history under a new nickname, contents preserved.
    pub fn rename_user(&mut self, old: &str, new: &str) {
        if let Some(mut entry) = self.users.remove(&key(old)) {
            entry.nick = new.to_string();
            self.users.insert(key(new), entry);
        }
    }

    /// Exact case-insensitive lookup.
    pub fn user(&self, nick: &str) -> Option<&UserEntry> {
        self.users.get(&key(nick))
    }

    pub fn user_mut(&mut self, nick: &str) -> Option<&mut UserEntry> {
        self.users.get_mut(&key(nick))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Resolve a typed prefix to a single known nickname. An exact
    /// case-insensitive match wins immediately, which covers one nick being
    /// a prefix of another; otherwise the prefix must match exactly one
    /// nickname.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        let want = key(prefix);
        let mut found = None;
        let mut matches = 0;

        for (k, entry) in &self.users {
            if *k == want {
                return Some(entry.nick());
            }
            if k.starts_with(&want) {
                found = Some(entry.nick());
                matches += 1;
            }
        }

        if matches == 1 { found } else { None }
    }
}
