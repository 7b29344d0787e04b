//! The `parse` subcommand: run both command grammars over a string and show
//! what they make of it. Development aid for grammar questions like "is
//! `s,a/b,c,` one command or two typos".

use clap::Args;
use serde::Serialize;

use crate::grammar::{self, Parse};

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Command text to parse, e.g. "s/foo/bar/" or "p#baz#bob~2"
    pub text: String,
}

#[derive(Debug, Serialize)]
struct Report {
    substitute: Parse,
    print: Parse,
}

impl ParseArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let report = Report {
            substitute: grammar::parse_substitute(&self.text),
            print: grammar::parse_print(&self.text),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
