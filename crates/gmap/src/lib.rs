// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # gmap
//!
//! Guest address-space manager for running Linux binaries under emulation.
//!
//! This crate owns the authoritative map of a guest process's live memory
//! mappings. It:
//! - Accepts `mmap`/`munmap` requests already decoded by the syscall layer
//! - Chooses guest addresses for mappings that do not pin one
//! - Reserves and releases backing memory through a [`HostAllocator`]
//! - Makes mappings visible to the guest through a [`PageTableInstaller`]
//! - Splits, displaces and removes regions so that live regions never overlap
//!
//! The entry point is [`MemoryManager`], one per emulated process. The
//! lower-level [`AddressSpace`] is the unlocked state it serializes.

pub mod config;
pub mod cursor;
pub mod directory;
pub mod error;
pub mod host;
pub mod manager;
pub mod region;
pub mod space;

// Re-export commonly used types at crate root
pub use config::AddressSpaceConfig;
pub use error::MmError;
pub use gmap_abi::{GuestAddr, HostAddr, HostHandle, MapFlags, PAGE_SIZE, Protection};
pub use host::{HostAllocator, HostError, PageTableInstaller};
#[cfg(feature = "mock")]
pub use host::MockHost;
pub use manager::MemoryManager;
pub use region::{FileBacking, RegionInfo};
pub use space::{AddressSpace, MapRequest};

/// Crate version, reported by tools embedding the manager.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
