// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the replay script parser.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

fn parse(line: &str) -> Command {
    parse_line(line).unwrap().unwrap()
}

#[test]
fn numbers() {
    assert_eq!(parse_number("4096").unwrap(), 4096);
    assert_eq!(parse_number("0x1000").unwrap(), 0x1000);
    assert_eq!(parse_number("0XC000_0000").unwrap(), 0xc000_0000);
    assert_eq!(parse_number("1_000").unwrap(), 1000);
    assert_eq!(
        parse_number("0xZZ"),
        Err(ParseError::BadNumber("0xZZ".into()))
    );
    assert!(parse_number("-1").is_err());
}

#[test]
fn blank_and_comment_lines() {
    assert_eq!(parse_line("").unwrap(), None);
    assert_eq!(parse_line("   ").unwrap(), None);
    assert_eq!(parse_line("# just a comment").unwrap(), None);
}

#[test]
fn anonymous_mmap() {
    let Command::Map(request) = parse("mmap - 8192 rw- private,anon") else {
        panic!("expected mmap");
    };
    assert_eq!(request.addr, GuestAddr::null());
    assert_eq!(request.length, 8192);
    assert_eq!(request.prot, Protection::READ | Protection::WRITE);
    assert_eq!(request.flags, MapFlags::PRIVATE | MapFlags::ANONYMOUS);
    assert_eq!(request.fd, None);
}

#[test]
fn fixed_mmap_with_trailing_comment() {
    let Command::Map(request) = parse("mmap 0x1000 0x3000 r-x private,anonymous,fixed  # text") else {
        panic!("expected mmap");
    };
    assert_eq!(request.addr, GuestAddr::new(0x1000));
    assert!(request.flags.is_fixed());
    assert_eq!(request.prot, Protection::READ | Protection::EXEC);
}

#[test]
fn mmap_with_file() {
    let Command::Map(request) = parse("mmap - 0x1000 r-- private 3 0x2000") else {
        panic!("expected mmap");
    };
    assert_eq!(request.fd, Some(3));
    assert_eq!(request.offset, 0x2000);
}

#[test]
fn raw_protection_and_flags() {
    let Command::Map(request) = parse("mmap - 4096 3 0x22,0x8000") else {
        panic!("expected mmap");
    };
    assert_eq!(request.prot, Protection::READ | Protection::WRITE);
    assert_eq!(request.flags.unrecognized_bits(), 0x8000);

    let Command::Map(request) = parse("mmap - 4096 0x9 private,anon") else {
        panic!("expected mmap");
    };
    assert_eq!(request.prot.bits(), 0x9);
}

#[test]
fn mmap_errors() {
    assert_eq!(
        parse_line("mmap - 4096 rw-"),
        Err(ParseError::MissingArgument("flags"))
    );
    assert_eq!(
        parse_line("mmap - 4096 rw private"),
        Err(ParseError::BadProtection("rw".into()))
    );
    assert_eq!(
        parse_line("mmap - 4096 rwz private"),
        Err(ParseError::BadProtection("rwz".into()))
    );
    assert_eq!(
        parse_line("mmap - 4096 rw- private,populate"),
        Err(ParseError::BadFlag("populate".into()))
    );
    assert_eq!(
        parse_line("mmap - 4096 rw- private 3"),
        Err(ParseError::MissingArgument("offset"))
    );
}

#[test]
fn munmap_lookup_dump_teardown() {
    assert_eq!(
        parse("munmap 0x2000 0x1000"),
        Command::Unmap {
            addr: GuestAddr::new(0x2000),
            len: 0x1000,
        }
    );
    assert_eq!(
        parse("lookup 0xc0000000"),
        Command::Lookup(GuestAddr::new(0xc000_0000))
    );
    assert_eq!(parse("dump"), Command::Dump);
    assert_eq!(parse("teardown"), Command::Teardown);
}

#[test]
fn unknown_and_trailing_words() {
    assert_eq!(
        parse_line("mprotect 0x1000 0x1000 r--"),
        Err(ParseError::UnknownCommand("mprotect".into()))
    );
    assert_eq!(
        parse_line("dump now"),
        Err(ParseError::TrailingArgument("now".into()))
    );
    assert_eq!(
        parse_line("munmap 0x1000"),
        Err(ParseError::MissingArgument("len"))
    );
}

#[test]
fn display_is_canonical() {
    assert_eq!(
        parse("mmap - 8192 rw- anon,private").to_string(),
        "mmap 0x0 0x2000 rw- private,anonymous"
    );
    assert_eq!(
        parse("mmap 0x1000 4096 --- fixed,private,anon,0x8000").to_string(),
        "mmap 0x1000 0x1000 --- private,fixed,anonymous,0x8000"
    );
    assert_eq!(
        parse("munmap 4096 4096").to_string(),
        "munmap 0x1000 0x1000"
    );
}

#[test]
fn script_keeps_line_numbers() {
    let script = "# setup\nmmap - 4096 rw- private,anon\n\nmunmap 0xc0000000 4096\ndump\n";
    let lines = parse_script(script).unwrap();
    let numbers: Vec<usize> = lines.iter().map(|l| l.number).collect();
    assert_eq!(numbers, vec![2, 4, 5]);
}

#[test]
fn script_reports_failing_line() {
    let script = "dump\nbogus\n";
    assert_eq!(
        parse_script(script),
        Err((2, ParseError::UnknownCommand("bogus".into())))
    );
}
