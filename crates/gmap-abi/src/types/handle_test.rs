// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the host handle type.

#![allow(clippy::unwrap_used, clippy::expect_used)]

extern crate std;

use std::format;

use super::handle::HostHandle;

#[test]
fn null_handle() {
    assert!(HostHandle::NULL.is_null());
    assert!(!HostHandle::new(1).is_null());
    assert_eq!(HostHandle::default(), HostHandle::NULL);
}

#[test]
fn handle_round_trips_raw_value() {
    assert_eq!(HostHandle::new(42).as_u64(), 42);
}

#[test]
fn handle_formatting() {
    let handle = HostHandle::new(7);
    assert_eq!(format!("{handle:?}"), "HostHandle(7)");
    assert_eq!(format!("{handle}"), "handle:7");
}
