// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared definitions between the gmap address-space manager and the
//! syscall layer that feeds it.
//!
//! This crate defines the contract at the syscall boundary:
//! - Guest and host address newtypes and the host reservation handle
//! - Page layout constants (page size, default mmap base)
//! - Linux `PROT_*` / `MAP_*` flag sets and their host-native translation
//!
//! # Design Principles
//!
//! - **No runtime dependencies**: Pure data types, 100% host-testable
//! - **Linux bit values**: Flag sets carry the raw Linux ABI bits so the
//!   manager can detect bits it does not recognize
//! - **64-bit only**: Guest and host addresses are `u64`
//!
//! # Modules
//!
//! - [`types`]: Address and handle newtypes (`GuestAddr`, `HostAddr`, `HostHandle`)
//! - [`layout`]: Page size and address-space layout constants
//! - [`mman`]: Protection and mapping flags
//! - [`errno`]: Linux errno values the manager reports

#![no_std]

pub mod errno;
pub mod layout;
pub mod mman;
pub mod types;

// Re-export commonly used types at crate root
pub use layout::{MMAP_BASE, PAGE_SIZE};
pub use mman::{HostMapFlags, HostPerms, MapFlags, Protection};
pub use types::{GuestAddr, HostAddr, HostHandle};
