// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Host capability interfaces.
//!
//! The address-space manager never touches host memory or the guest page
//! tables directly. It drives two capabilities:
//!
//! - [`HostAllocator`] reserves and releases host memory that backs guest
//!   mappings
//! - [`PageTableInstaller`] makes guest ranges visible (or invisible) to the
//!   executing guest
//!
//! Both are called while the address-space lock is held, so implementations
//! may block but must not call back into the manager.


#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHost, PageEntry};

use core::fmt;
use gmap_abi::{GuestAddr, HostAddr, HostHandle, HostMapFlags, HostPerms};

/// Errors reported by host capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// Host memory could not be reserved.
    OutOfMemory,
    /// Guest range is already installed.
    AlreadyMapped,
    /// Guest range is not installed.
    NotMapped,
    /// Released range is not part of a live reservation.
    InvalidRange,
    /// Handle does not name a live reservation.
    UnknownHandle,
    /// Address or length is not page-aligned.
    MisalignedAddress,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "host out of memory"),
            Self::AlreadyMapped => write!(f, "guest range already installed"),
            Self::NotMapped => write!(f, "guest range not installed"),
            Self::InvalidRange => write!(f, "range outside live reservation"),
            Self::UnknownHandle => write!(f, "unknown reservation handle"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
        }
    }
}

impl std::error::Error for HostError {}

/// Reserves and releases host memory backing guest mappings.
pub trait HostAllocator {
    /// Reserve `length` bytes of zeroed host memory.
    ///
    /// Returns the host address of the reservation and a handle naming it.
    fn reserve(
        &mut self,
        length: u64,
        perms: HostPerms,
        flags: HostMapFlags,
    ) -> Result<(HostAddr, HostHandle), HostError>;

    /// Release `length` bytes starting at `ptr` from reservation `handle`.
    ///
    /// The range may be any page-aligned sub-range of the reservation that
    /// has not been released yet. A reservation split across several guest
    /// regions is released piecewise, one call per region.
    fn release(&mut self, ptr: HostAddr, handle: HostHandle, length: u64)
    -> Result<(), HostError>;
}

/// Installs and removes guest page-table mappings.
pub trait PageTableInstaller {
    /// Map `length` bytes at `guest` onto host memory at `host`.
    fn install(
        &mut self,
        guest: GuestAddr,
        length: u64,
        perms: HostPerms,
        host: HostAddr,
    ) -> Result<(), HostError>;

    /// Remove the mapping of `length` bytes at `guest`.
    fn uninstall(&mut self, guest: GuestAddr, length: u64) -> Result<(), HostError>;
}
