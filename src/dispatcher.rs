//! Event sequencing and the message trigger chain.
//!
//! All shared state lives behind `&mut self`, so exactly one event mutates
//! it at a time; callers feed events in arrival order and get back at most
//! one reply each.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::engine::{self, CommandCtx, Outcome};
use crate::event::{Event, Reply};
use crate::grammar::{self, Parse};
use crate::roster::ChannelState;

const BOTSNACK_RESPONSE: &str = ":D";

// Self-documentation, served on "<botnick>: docs" or "<botnick>: source".
const SOURCE_URL: &str = "https://github.com/rewindbot/rewind";

fn re_botsnack() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*botsnack\s*$").expect("valid pattern"))
}

/// An address prefix: a token followed by `,`/`:`/`;` and whitespace, as in
/// "bob: s/foo/bar/". Slashes are excluded from the token so URLs never
/// look addressed.
fn re_addressed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([^,:;\s/]+)[,:;]\s+").expect("valid pattern"))
}

/// The command-and-history engine: per-channel rosters and histories plus
/// the trigger chain over inbound channel text.
#[derive(Debug)]
pub struct Dispatcher {
    nick: String,
    recall_limit: usize,
    ignore: BTreeSet<String>,
    channels: BTreeMap<String, ChannelState>,
}

impl Dispatcher {
    pub fn new(nick: impl Into<String>, recall_limit: usize) -> Self {
        info!("engine initialised");
        Self {
            nick: nick.into(),
            recall_limit,
            ignore: BTreeSet::new(),
            channels: BTreeMap::new(),
        }
    }

    /// Drop all further events from a nick. Goes through `&mut self` like
    /// every other mutation, so admin updates serialize with event handling.
    pub fn ignore_nick(&mut self, nick: &str) {
        self.ignore.insert(nick.to_lowercase());
    }

    pub fn unignore_nick(&mut self, nick: &str) -> bool {
        self.ignore.remove(&nick.to_lowercase())
    }

    /// Apply one event and produce at most one reply. Lifecycle events
    /// never reply.
    pub fn handle(&mut self, event: &Event) -> Option<Reply> {
        match event {
            Event::ChannelText { channel, user, text, is_action } => {
                self.on_text(channel, user, text, *is_action)
            }
            Event::RosterSnapshot { channel, nicknames } => {
                if let Some(chan) = self.channels.get_mut(&channel.to_lowercase()) {
                    chan.populate(nicknames);
                }
                None
            }
            Event::UserJoined { channel, nick } => {
                if let Some(chan) = self.channels.get_mut(&channel.to_lowercase()) {
                    chan.add_user(nick);
                }
                None
            }
            Event::UserLeft { channel, nick } => {
                if let Some(chan) = self.channels.get_mut(&channel.to_lowercase()) {
                    chan.remove_user(nick);
                }
                None
            }
            Event::NickChanged { old_nick, new_nick } => {
                self.on_nick_changed(old_nick, new_nick);
                None
            }
            Event::SelfJoined { channel } => {
                info!(%channel, "joined channel");
                self.channels.insert(channel.to_lowercase(), ChannelState::new(self.recall_limit));
                None
            }
            Event::SelfLeft { channel } => {
                info!(%channel, "left channel");
                self.channels.remove(&channel.to_lowercase());
                None
            }
        }
    }

    fn on_nick_changed(&mut self, old_nick: &str, new_nick: &str) {
        // Our own nick changes are the transport's business.
        if old_nick.to_lowercase() == self.nick.to_lowercase()
            || new_nick.to_lowercase() == self.nick.to_lowercase()
        {
            return;
        }
        for chan in self.channels.values_mut() {
            chan.rename_user(old_nick, new_nick);
        }
    }

    fn on_text(&mut self, channel: &str, user: &str, text: &str, is_action: bool) -> Option<Reply> {
        if self.ignore.contains(&user.to_lowercase()) {
            debug!(%user, "dropping text from ignored user");
            return None;
        }

        let own_nick = self.nick.clone();
        let Some(chan) = self.channels.get_mut(&channel.to_lowercase()) else {
            debug!(%channel, "dropping text for unjoined channel");
            return None;
        };

        if !is_action && re_botsnack().is_match(text) {
            info!("sending botsnack response");
            return Some(Reply { channel: channel.to_string(), text: BOTSNACK_RESPONSE.to_string() });
        }

        // Addressed lines ("bob: s/foo/bar/") parse without the prefix, and
        // the addressee becomes the contextual target. Actions carry no
        // address prefix.
        let mut addressee = None;
        let mut body = text;
        if !is_action
            && let Some(caps) = re_addressed().captures(text)
            && let Some(whole) = caps.get(0)
            && let Some(name) = caps.get(1)
        {
            addressee = Some(name.as_str().to_string());
            body = &text[whole.end()..];
        }

        if let Some(addr) = &addressee
            && addr.to_lowercase() == own_nick.to_lowercase()
            && (body.eq_ignore_ascii_case("docs") || body.eq_ignore_ascii_case("source"))
        {
            info!("sending docs url");
            return Some(Reply { channel: channel.to_string(), text: SOURCE_URL.to_string() });
        }

        let ctx = CommandCtx { speaker: user, addressee: addressee.as_deref() };

        match grammar::parse_substitute(body) {
            Parse::Command(cmd) => {
                info!("substitute command triggered");
                return match engine::substitute(chan, &cmd, ctx) {
                    Outcome::Reply(line) => Some(Reply { channel: channel.to_string(), text: line }),
                    Outcome::Consumed => None,
                };
            }
            Parse::Rejected => {
                debug!("substitute command rejected");
                return None;
            }
            Parse::NoMatch => {}
        }

        match grammar::parse_print(body) {
            Parse::Command(cmd) => {
                info!("recall command triggered");
                return match engine::recall(chan, &cmd, ctx) {
                    Outcome::Reply(line) => Some(Reply { channel: channel.to_string(), text: line }),
                    Outcome::Consumed => None,
                };
            }
            Parse::Rejected => {
                debug!("recall command rejected");
                return None;
            }
            Parse::NoMatch => {}
        }

        // Ordinary text: record the original full line, creating the user's
        // history on first sight.
        chan.ensure_user(user).history.push(text, is_action);
        None
    }
}
