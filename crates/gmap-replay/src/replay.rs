// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Executes parsed script commands against a memory manager.
//!
//! Each command prints one result line in the shape of an strace line,
//! `<command> = <result>`. Recoverable errors print the negated errno and
//! replay continues. A fatal error stops the replay.

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use std::io::Write;

use anyhow::Context as _;
use gmap::{MemoryManager, MmError, MockHost, RegionInfo};

use crate::script::{Command, Line};

/// Manager type driven by the replay tool.
pub type ReplayManager = MemoryManager<MockHost, MockHost>;

/// Replays commands and writes results to `out`.
pub struct Replayer<W> {
    mm: ReplayManager,
    out: W,
}

impl<W: Write> Replayer<W> {
    /// Creates a replayer over `mm`.
    pub const fn new(mm: ReplayManager, out: W) -> Self {
        Self { mm, out }
    }

    /// Runs every line in order.
    ///
    /// # Errors
    ///
    /// Fails on the first fatal address-space error or output error.
    pub fn run(&mut self, lines: &[Line]) -> anyhow::Result<()> {
        for line in lines {
            self.execute(&line.command)
                .with_context(|| format!("line {}: {}", line.number, line.command))?;
        }
        Ok(())
    }

    /// Runs one command.
    ///
    /// # Errors
    ///
    /// Fails on a fatal address-space error or an output error.
    pub fn execute(&mut self, command: &Command) -> anyhow::Result<()> {
        tracing::debug!(%command, "replaying");
        match *command {
            Command::Map(request) => {
                let result = self.mm.map(&request).map(|addr| format!("{addr}"));
                self.report(command, result)
            }
            Command::Unmap { addr, len } => {
                let result = self.mm.unmap(addr, len).map(|()| String::from("0"));
                self.report(command, result)
            }
            Command::Lookup(addr) => match self.mm.lookup(addr)? {
                Some(info) => {
                    writeln!(self.out, "{command} = {info}")?;
                    Ok(())
                }
                None => {
                    writeln!(self.out, "{command} = unmapped")?;
                    Ok(())
                }
            },
            Command::Dump => {
                let regions = self.mm.regions()?;
                writeln!(self.out, "{command} = {} regions", regions.len())?;
                self.write_regions(&regions)
            }
            Command::Teardown => {
                let result = self.mm.teardown().map(|()| String::from("0"));
                self.report(command, result)
            }
        }
    }

    /// The manager being driven.
    pub const fn manager(&self) -> &ReplayManager {
        &self.mm
    }

    fn report(&mut self, command: &Command, result: Result<String, MmError>) -> anyhow::Result<()> {
        match result {
            Ok(value) => {
                writeln!(self.out, "{command} = {value}")?;
                Ok(())
            }
            Err(err) => {
                writeln!(self.out, "{command} = -{} ({err})", err.errno())?;
                if err.is_fatal() {
                    return Err(anyhow::Error::new(err).context("address space poisoned"));
                }
                Ok(())
            }
        }
    }

    fn write_regions(&mut self, regions: &[RegionInfo]) -> anyhow::Result<()> {
        for region in regions {
            writeln!(self.out, "  {region}")?;
        }
        Ok(())
    }
}
