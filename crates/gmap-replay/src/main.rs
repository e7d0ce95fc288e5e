// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Replays an mmap/munmap script against the guest address-space manager.
//!
//! The manager runs over the in-memory mock host, so scripts exercise
//! region bookkeeping without a hypervisor. Results go to stdout, logs to
//! stderr.

mod replay;
mod script;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, anyhow};
use argh::FromArgs;
use gmap::{AddressSpaceConfig, GuestAddr, MemoryManager, MockHost};
use tracing_subscriber::EnvFilter;

use crate::replay::Replayer;

#[derive(FromArgs)]
/// Replay an mmap/munmap script and print each result.
struct Options {
    #[argh(positional)]
    /// script file, or `-` to read stdin
    script: PathBuf,

    #[argh(option, from_str_fn(parse_address))]
    /// first address handed to mappings without MAP_FIXED
    mmap_base: Option<u64>,

    #[argh(option, from_str_fn(parse_address))]
    /// bytes the mock host may have reserved at once
    host_budget: Option<u64>,

    #[argh(option, default = "String::from(\"info\")")]
    /// log filter used when RUST_LOG is unset (default: info)
    log: String,
}

fn parse_address(value: &str) -> Result<u64, String> {
    script::parse_number(value).map_err(|err| err.to_string())
}

/// Installs the stderr log subscriber.
fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("log subscriber already installed")
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading script from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    init_logging(&options.log)?;

    let text = read_script(&options.script)?;
    let lines = script::parse_script(&text)
        .map_err(|(line, err)| anyhow!("{}:{line}: {err}", options.script.display()))?;

    let config = match options.mmap_base {
        Some(base) => AddressSpaceConfig::new(GuestAddr::new(base))?,
        None => AddressSpaceConfig::default(),
    };
    let allocator = options
        .host_budget
        .map_or_else(MockHost::new, MockHost::with_budget);
    let mm = MemoryManager::with_config(config, allocator, MockHost::new());

    let stdout = io::stdout();
    let mut replayer = Replayer::new(mm, stdout.lock());
    replayer.run(&lines)?;

    let cursor = replayer.manager().mmap_cursor()?;
    tracing::info!(
        version = gmap::VERSION,
        commands = lines.len(),
        %cursor,
        "replay finished"
    );
    io::stdout().flush().context("flushing stdout")
}
