//! Recall and substitute execution against a channel's histories.
//!
//! Every failure mode past a successful parse -- an uncompilable search
//! pattern, an unknown or ambiguous target, an invalid replacement, no
//! qualifying history entry -- consumes the command silently. The silent
//! outcomes are deliberately indistinguishable from outside.

use regex::Regex;
use tracing::{debug, info};

use crate::grammar::{Command, TargetSpec};
use crate::roster::ChannelState;

/// Result of running a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Command consumed with no reply and no history mutation.
    Consumed,
    Reply(String),
}

/// Who spoke, and who (if anyone) the line was addressed to.
#[derive(Debug, Clone, Copy)]
pub struct CommandCtx<'a> {
    pub speaker: &'a str,
    pub addressee: Option<&'a str>,
}

/// Recall the Nth-most-recent matching line of the target without
/// modifying it.
pub fn recall(chan: &ChannelState, cmd: &Command, ctx: CommandCtx) -> Outcome {
    let Some(pattern) = compile(&cmd.search) else {
        return Outcome::Consumed;
    };
    let Some(nick) = resolve_target(chan, &cmd.target, ctx) else {
        return Outcome::Consumed;
    };
    let Some(entry) = chan.user(&nick) else {
        return Outcome::Consumed;
    };
    let Some(msg) = entry.history.find_match(&pattern, cmd.skip) else {
        return Outcome::Consumed;
    };

    info!(target = %entry.nick(), "recall matched");
    Outcome::Reply(render(entry.nick(), msg.revision(), msg.text(), msg.is_action()))
}

/// Apply a search-and-replace to the Nth-most-recent matching line of the
/// target, producing and storing a new revision.
pub fn substitute(chan: &mut ChannelState, cmd: &Command, ctx: CommandCtx) -> Outcome {
    let Some(replacement) = cmd.replace.as_deref() else {
        return Outcome::Consumed;
    };
    let Some(pattern) = compile(&cmd.search) else {
        return Outcome::Consumed;
    };
    if !replacement_refs_valid(&pattern, replacement) {
        debug!("replacement references a missing capture group");
        return Outcome::Consumed;
    }

    let global = matches!(cmd.target, TargetSpec::SelfGlobal);
    let Some(nick) = resolve_target(chan, &cmd.target, ctx) else {
        return Outcome::Consumed;
    };
    let Some(entry) = chan.user_mut(&nick) else {
        return Outcome::Consumed;
    };
    let Some(idx) = entry.history.find_match_idx(&pattern, cmd.skip) else {
        return Outcome::Consumed;
    };
    let Some(old) = entry.history.get(idx) else {
        return Outcome::Consumed;
    };

    let new_text = if global {
        pattern.replace_all(old.text(), replacement).into_owned()
    } else {
        pattern.replace(old.text(), replacement).into_owned()
    };

    let revised = old.revise(new_text);
    let line = render(entry.nick(), revised.revision(), revised.text(), revised.is_action());
    entry.history.replace_at(idx, revised);

    info!(target = %nick, "substitute applied");
    Outcome::Reply(line)
}

fn compile(search: &str) -> Option<Regex> {
    match Regex::new(search) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            debug!(error = %err, "search pattern failed to compile");
            None
        }
    }
}

/// Resolve a target spec to the display nick of a known user.
fn resolve_target(chan: &ChannelState, target: &TargetSpec, ctx: CommandCtx) -> Option<String> {
    match target {
        TargetSpec::Contextual => {
            let nick = ctx.addressee.unwrap_or(ctx.speaker);
            chan.user(nick).map(|e| e.nick().to_string())
        }
        TargetSpec::SelfGlobal => chan.user(ctx.speaker).map(|e| e.nick().to_string()),
        TargetSpec::Named(prefix) => chan.resolve_prefix(prefix).map(str::to_string),
    }
}

/// Validate the `$`-references in a replacement against the pattern's
/// capture groups, using the regex crate's expansion syntax (`$$`, `$name`,
/// `${name}`). The crate expands unknown groups to the empty string; the
/// command contract instead rejects them outright.
fn replacement_refs_valid(pattern: &Regex, replacement: &str) -> bool {
    let names: Vec<&str> = pattern.capture_names().flatten().collect();
    let chars: Vec<char> = replacement.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            i += 1;
            continue;
        }
        i += 1;
        if i >= chars.len() {
            break;
        }
        if chars[i] == '$' {
            i += 1;
            continue;
        }

        let name: String;
        if chars[i] == '{' {
            let Some(close) = chars[i + 1..].iter().position(|&c| c == '}') else {
                return false;
            };
            name = chars[i + 1..i + 1 + close].iter().collect();
            i += close + 2;
        } else {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i == start {
                continue;
            }
            name = chars[start..i].iter().collect();
        }

        if let Ok(num) = name.parse::<usize>() {
            if num >= pattern.captures_len() {
                return false;
            }
        } else if !names.contains(&name.as_str()) {
            return false;
        }
    }

    true
}

/// Render a history line for the channel: the revision star count, the
/// nickname, and the text, with the action form for CTCP-style lines.
fn render(nick: &str, revision: u32, text: &str, is_action: bool) -> String {
    let stars = "*".repeat(revision as usize);
    if is_action {
        format!("* {stars}{nick} {text}")
    } else {
        format!("<{stars}{nick}> {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Parse, parse_print, parse_substitute};

    fn channel() -> ChannelState {
        let mut chan = ChannelState::new(8);
        chan.add_user("alice");
        chan.add_user("bob");
        chan
    }

    fn ctx(speaker: &str) -> CommandCtx<'_> {
        CommandCtx { speaker, addressee: None }
    }

    fn parsed(text: &str) -> Command {
        let parse = if text.starts_with(['s', 'S']) {
            parse_substitute(text)
        } else {
            parse_print(text)
        };
        match parse {
            Parse::Command(c) => c,
            other => panic!("expected a command from {text:?}, got {other:?}"),
        }
    }

    fn say(chan: &mut ChannelState, nick: &str, text: &str) {
        chan.user_mut(nick).unwrap().history.push(text, false);
    }

    #[test]
    fn recall_renders_plain_line() {
        let mut chan = channel();
        say(&mut chan, "alice", "hello world");
        let out = recall(&chan, &parsed("p/hello/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<alice> hello world".to_string()));
    }

    #[test]
    fn recall_is_idempotent() {
        let mut chan = channel();
        say(&mut chan, "alice", "hello world");
        let first = recall(&chan, &parsed("p/hello/"), ctx("alice"));
        let second = recall(&chan, &parsed("p/hello/"), ctx("alice"));
        assert_eq!(first, second);
    }

    #[test]
    fn recall_renders_action_line() {
        let mut chan = channel();
        chan.user_mut("alice").unwrap().history.push("waves goodbye", true);
        let out = recall(&chan, &parsed("p/waves/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("* alice waves goodbye".to_string()));
    }

    #[test]
    fn substitute_replaces_first_occurrence_only() {
        let mut chan = channel();
        say(&mut chan, "alice", "aaa");
        let out = substitute(&mut chan, &parsed("s/a/b/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<*alice> baa".to_string()));
    }

    #[test]
    fn global_flag_replaces_all_occurrences() {
        let mut chan = channel();
        say(&mut chan, "alice", "aaa");
        let out = substitute(&mut chan, &parsed("s/a/b/g"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<*alice> bbb".to_string()));
    }

    #[test]
    fn repeated_edits_accumulate_stars() {
        let mut chan = channel();
        say(&mut chan, "alice", "one fish");
        let first = substitute(&mut chan, &parsed("s/fish/dish/"), ctx("alice"));
        assert_eq!(first, Outcome::Reply("<*alice> one dish".to_string()));
        let second = substitute(&mut chan, &parsed("s/dish/wish/"), ctx("alice"));
        assert_eq!(second, Outcome::Reply("<**alice> one wish".to_string()));
    }

    #[test]
    fn recall_shows_current_revision_stars() {
        let mut chan = channel();
        say(&mut chan, "alice", "teh best");
        substitute(&mut chan, &parsed("s/teh/the/"), ctx("alice"));
        let out = recall(&chan, &parsed("p/best/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<*alice> the best".to_string()));
    }

    #[test]
    fn capture_group_replacement() {
        let mut chan = channel();
        say(&mut chan, "alice", "ab");
        let out = substitute(&mut chan, &parsed("s/(a)(b)/$2$1/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<*alice> ba".to_string()));
    }

    #[test]
    fn out_of_range_backreference_is_consumed() {
        let mut chan = channel();
        say(&mut chan, "alice", "ab");
        let out = substitute(&mut chan, &parsed("s/(a)/$3/"), ctx("alice"));
        assert_eq!(out, Outcome::Consumed);
        let entry = chan.user("alice").unwrap();
        assert_eq!(entry.history.get(0).unwrap().text(), "ab");
    }

    #[test]
    fn unknown_named_group_is_consumed() {
        let mut chan = channel();
        say(&mut chan, "alice", "ab");
        let out = substitute(&mut chan, &parsed("s/(a)/${nope}/"), ctx("alice"));
        assert_eq!(out, Outcome::Consumed);
    }

    #[test]
    fn dollar_dollar_is_a_literal() {
        let mut chan = channel();
        say(&mut chan, "alice", "cost: 5");
        let out = substitute(&mut chan, &parsed("s/5/$$5/"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<*alice> cost: $5".to_string()));
    }

    #[test]
    fn invalid_search_pattern_is_consumed() {
        let mut chan = channel();
        say(&mut chan, "alice", "hello");
        let out = substitute(&mut chan, &parsed("s/(unclosed/x/"), ctx("alice"));
        assert_eq!(out, Outcome::Consumed);
        assert_eq!(recall(&chan, &parsed("p/(unclosed/"), ctx("alice")), Outcome::Consumed);
    }

    #[test]
    fn named_target_resolves_by_prefix() {
        let mut chan = channel();
        say(&mut chan, "bob", "my line");
        let out = recall(&chan, &parsed("p/line/bo"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<bob> my line".to_string()));
    }

    #[test]
    fn ambiguous_target_is_consumed() {
        let mut chan = channel();
        chan.add_user("bobby");
        say(&mut chan, "bob", "my line");
        let out = recall(&chan, &parsed("p/line/bo"), ctx("alice"));
        assert_eq!(out, Outcome::Consumed);
    }

    #[test]
    fn addressee_is_the_contextual_target() {
        let mut chan = channel();
        say(&mut chan, "bob", "teh thing");
        let cmd = parsed("s/teh/the/");
        let out = substitute(&mut chan, &cmd, CommandCtx { speaker: "alice", addressee: Some("bob") });
        assert_eq!(out, Outcome::Reply("<*bob> the thing".to_string()));
    }

    #[test]
    fn global_flag_targets_the_speaker_even_when_addressed() {
        let mut chan = channel();
        say(&mut chan, "alice", "aaa");
        say(&mut chan, "bob", "aaa");
        let cmd = parsed("s/a/b/g");
        let out = substitute(&mut chan, &cmd, CommandCtx { speaker: "alice", addressee: Some("bob") });
        assert_eq!(out, Outcome::Reply("<*alice> bbb".to_string()));
        assert_eq!(chan.user("bob").unwrap().history.get(0).unwrap().text(), "aaa");
    }

    #[test]
    fn skip_selects_older_match() {
        let mut chan = channel();
        say(&mut chan, "alice", "foo old");
        say(&mut chan, "alice", "foo new");
        let out = recall(&chan, &parsed("p/foo/~1"), ctx("alice"));
        assert_eq!(out, Outcome::Reply("<alice> foo old".to_string()));
        assert_eq!(recall(&chan, &parsed("p/foo/~2"), ctx("alice")), Outcome::Consumed);
    }

    #[test]
    fn no_qualifying_entry_is_consumed() {
        let chan = channel();
        assert_eq!(recall(&chan, &parsed("p/foo/"), ctx("alice")), Outcome::Consumed);
    }
}
