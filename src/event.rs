//! Normalized event shapes consumed and produced by the dispatcher.
//!
//! These are the engine's whole world: the transport layer (whatever chat
//! protocol it speaks) translates wire traffic into these and translates
//! replies back out. Part, kick, and quit all arrive as per-channel
//! `UserLeft` events.

use serde::{Deserialize, Serialize};

/// One inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ChannelText {
        channel: String,
        user: String,
        text: String,
        #[serde(default)]
        is_action: bool,
    },
    RosterSnapshot {
        channel: String,
        nicknames: Vec<String>,
    },
    UserJoined {
        channel: String,
        nick: String,
    },
    UserLeft {
        channel: String,
        nick: String,
    },
    NickChanged {
        old_nick: String,
        new_nick: String,
    },
    SelfJoined {
        channel: String,
    },
    SelfLeft {
        channel: String,
    },
}

/// The only outbound effect: at most one channel message per inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub channel: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_text_round_trips_with_default_action_flag() {
        let json = r##"{"type":"channel_text","channel":"#rust","user":"alice","text":"hi"}"##;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            Event::ChannelText {
                channel: "#rust".to_string(),
                user: "alice".to_string(),
                text: "hi".to_string(),
                is_action: false,
            }
        );
    }

    #[test]
    fn lifecycle_events_deserialize() {
        let json = r##"{"type":"roster_snapshot","channel":"#rust","nicknames":["a","b"]}"##;
        assert!(matches!(
            serde_json::from_str::<Event>(json).unwrap(),
            Event::RosterSnapshot { .. }
        ));
        let json = r##"{"type":"self_joined","channel":"#rust"}"##;
        assert!(matches!(serde_json::from_str::<Event>(json).unwrap(), Event::SelfJoined { .. }));
    }
}
