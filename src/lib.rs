//! Rewind - recall and edit engine for chat channels.
//!
//! Channel participants recall or amend recent lines with a compact
//! stream-editor syntax (`s/search/replace/target~skip`,
//! `p/search/target~skip`). The engine consumes normalized chat events and
//! produces at most one reply per event; the wire protocol lives elsewhere.

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod grammar;
pub mod history;
pub mod roster;
pub mod telemetry;
