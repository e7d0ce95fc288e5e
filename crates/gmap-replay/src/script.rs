// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Replay script parser.
//!
//! One command per line; `#` starts a comment.
//!
//! ```text
//! mmap   <addr|-> <len> <prot> <flags> [<fd> <offset>]
//! munmap <addr> <len>
//! lookup <addr>
//! dump
//! teardown
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hex. `prot` is either `rwx`-style
//! (`rw-`, `r-x`, `---`) or a raw `PROT_*` number. `flags` is a
//! comma-separated list of `MAP_*` names without the prefix (`private`,
//! `anonymous` or `anon`, `fixed`, ...) and may include raw numbers.

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use core::fmt;

use gmap::{GuestAddr, MapFlags, MapRequest, Protection};

/// Error while parsing one script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First word is not a known command.
    UnknownCommand(String),
    /// A required argument is missing.
    MissingArgument(&'static str),
    /// Extra words after the last argument.
    TrailingArgument(String),
    /// Not a decimal or hex number.
    BadNumber(String),
    /// Neither `rwx`-style nor numeric.
    BadProtection(String),
    /// Unknown `MAP_*` name.
    BadFlag(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(word) => write!(f, "unknown command `{word}`"),
            Self::MissingArgument(name) => write!(f, "missing argument <{name}>"),
            Self::TrailingArgument(word) => write!(f, "unexpected argument `{word}`"),
            Self::BadNumber(word) => write!(f, "invalid number `{word}`"),
            Self::BadProtection(word) => write!(f, "invalid protection `{word}`"),
            Self::BadFlag(word) => write!(f, "invalid mapping flag `{word}`"),
        }
    }
}

impl std::error::Error for ParseError {}

/// One script command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `mmap`.
    Map(MapRequest),
    /// `munmap`.
    Unmap {
        /// Start of the range.
        addr: GuestAddr,
        /// Length of the range.
        len: u64,
    },
    /// Print the region containing an address.
    Lookup(GuestAddr),
    /// Print every live region.
    Dump,
    /// Release every region.
    Teardown,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(request) => {
                write!(
                    f,
                    "mmap {:#x} {:#x} {} {}",
                    request.addr.as_u64(),
                    request.length,
                    request.prot,
                    FlagList(request.flags)
                )?;
                if let Some(fd) = request.fd {
                    write!(f, " {fd} {:#x}", request.offset)?;
                }
                Ok(())
            }
            Self::Unmap { addr, len } => write!(f, "munmap {:#x} {len:#x}", addr.as_u64()),
            Self::Lookup(addr) => write!(f, "lookup {:#x}", addr.as_u64()),
            Self::Dump => write!(f, "dump"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// Formats mapping flags as a comma-separated name list.
struct FlagList(MapFlags);

impl fmt::Display for FlagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, _) in self.0.iter_names() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", name.to_ascii_lowercase())?;
            first = false;
        }
        let unknown = self.0.unrecognized_bits();
        if unknown != 0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{unknown:#x}")?;
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

/// Parses a decimal or `0x`-prefixed hex number. Underscores are ignored.
pub fn parse_number(word: &str) -> Result<u64, ParseError> {
    let digits: String = word.chars().filter(|&c| c != '_').collect();
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|_| ParseError::BadNumber(word.to_owned()))
}

fn parse_protection(word: &str) -> Result<Protection, ParseError> {
    let bad = || ParseError::BadProtection(word.to_owned());
    if word.starts_with(|c: char| c.is_ascii_digit()) {
        let raw = parse_number(word).map_err(|_| bad())?;
        let raw = u32::try_from(raw).map_err(|_| bad())?;
        // Unknown bits are kept so the manager gets to reject them
        return Ok(Protection::from_bits_retain(raw));
    }

    let mut prot = Protection::empty();
    let bytes = word.as_bytes();
    if bytes.len() != 3 {
        return Err(bad());
    }
    for (byte, (letter, bit)) in bytes.iter().zip([
        (b'r', Protection::READ),
        (b'w', Protection::WRITE),
        (b'x', Protection::EXEC),
    ]) {
        if *byte == letter {
            prot |= bit;
        } else if *byte != b'-' {
            return Err(bad());
        }
    }
    Ok(prot)
}

fn parse_flags(word: &str) -> Result<MapFlags, ParseError> {
    let mut flags = MapFlags::empty();
    for part in word.split(',') {
        let flag = if part.starts_with(|c: char| c.is_ascii_digit()) {
            let raw = parse_number(part).map_err(|_| ParseError::BadFlag(part.to_owned()))?;
            let raw = u32::try_from(raw).map_err(|_| ParseError::BadFlag(part.to_owned()))?;
            MapFlags::from_linux(raw)
        } else if part.eq_ignore_ascii_case("anon") {
            MapFlags::ANONYMOUS
        } else {
            MapFlags::from_name(&part.to_ascii_uppercase())
                .ok_or_else(|| ParseError::BadFlag(part.to_owned()))?
        };
        flags |= flag;
    }
    Ok(flags)
}

/// Pulls the next whitespace-separated argument.
fn next_arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<&'a str, ParseError> {
    words.next().ok_or(ParseError::MissingArgument(name))
}

fn parse_map<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<Command, ParseError> {
    let addr = match next_arg(words, "addr")? {
        "-" => 0,
        word => parse_number(word)?,
    };
    let len = parse_number(next_arg(words, "len")?)?;
    let prot = parse_protection(next_arg(words, "prot")?)?;
    let flags = parse_flags(next_arg(words, "flags")?)?;

    let mut request = MapRequest::new(GuestAddr::new(addr), len, prot, flags);
    if let Some(fd) = words.next() {
        let fd = i32::try_from(parse_number(fd)?).map_err(|_| ParseError::BadNumber(fd.to_owned()))?;
        let offset = parse_number(next_arg(words, "offset")?)?;
        request = request.with_file(fd, offset);
    }
    Ok(Command::Map(request))
}

/// Parses one line. Blank lines and comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let code = line.split('#').next().unwrap_or_default();
    let mut words = code.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "mmap" => parse_map(&mut words)?,
        "munmap" => Command::Unmap {
            addr: GuestAddr::new(parse_number(next_arg(&mut words, "addr")?)?),
            len: parse_number(next_arg(&mut words, "len")?)?,
        },
        "lookup" => Command::Lookup(GuestAddr::new(parse_number(next_arg(&mut words, "addr")?)?)),
        "dump" => Command::Dump,
        "teardown" => Command::Teardown,
        other => return Err(ParseError::UnknownCommand(other.to_owned())),
    };

    match words.next() {
        Some(extra) => Err(ParseError::TrailingArgument(extra.to_owned())),
        None => Ok(Some(command)),
    }
}

/// A parsed command with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// Line number in the script.
    pub number: usize,
    /// The command on that line.
    pub command: Command,
}

/// Parses a whole script.
///
/// # Errors
///
/// Returns the first failing line number with its error.
pub fn parse_script(text: &str) -> Result<Vec<Line>, (usize, ParseError)> {
    let mut lines = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if let Some(command) = parse_line(line).map_err(|err| (number, err))? {
            lines.push(Line { number, command });
        }
    }
    Ok(lines)
}
