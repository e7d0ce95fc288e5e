// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core type definitions for addresses and host handles.
//!
//! These newtypes prevent accidentally mixing guest addresses, host
//! addresses, and reservation handles at compile time.

mod addr;
mod handle;

#[cfg(test)]
mod handle_test;

pub use addr::{GuestAddr, HostAddr};
pub use handle::HostHandle;
