//! The `run` subcommand: drive the dispatcher from an NDJSON event stream.
//!
//! One JSON event per stdin line, one JSON reply per stdout line. stderr
//! carries logs only, so the two streams can be piped independently by the
//! transport process.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::config::{self, Config};
use crate::dispatcher::Dispatcher;
use crate::error::ExitError;
use crate::event::Event;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to rewind.toml (default: ./rewind.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bot nickname (overrides the config file)
    #[arg(long)]
    pub nick: Option<String>,

    /// Lines of history kept per user per channel (overrides the config file)
    #[arg(long)]
    pub recall_limit: Option<usize>,

    /// Nick to drop all events from (repeatable, appended to the config list)
    #[arg(long)]
    pub ignore: Vec<String>,
}

impl RunArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = self.resolve_config()?;

        let mut dispatcher = Dispatcher::new(&config.nick, config.recall_limit);
        for nick in &config.ignore {
            dispatcher.ignore_nick(nick);
        }

        info!(nick = %config.nick, recall_limit = config.recall_limit, "engine ready");

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout().lock();

        for line in stdin.lock().lines() {
            let line = line.map_err(|e| ExitError::Input(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "skipping malformed event line");
                    continue;
                }
            };
            if let Some(reply) = dispatcher.handle(&event) {
                serde_json::to_writer(&mut stdout, &reply).context("writing reply")?;
                stdout.write_all(b"\n").context("writing reply")?;
                stdout.flush().context("flushing reply")?;
            }
        }

        info!("event stream closed");
        Ok(())
    }

    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = if let Some(path) = &self.config {
            config::load(path)?
        } else if let Some(path) = config::discover() {
            config::load(&path)?
        } else if let Some(nick) = &self.nick {
            Config::with_nick(nick)
        } else {
            return Err(
                ExitError::Config("no rewind.toml found and no --nick given".to_string()).into()
            );
        };

        if let Some(nick) = &self.nick {
            config.nick = nick.clone();
        }
        if let Some(limit) = self.recall_limit {
            config.recall_limit = limit;
        }
        config.ignore.extend(self.ignore.iter().cloned());

        config.validate()?;
        Ok(config)
    }
}
