// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-process address-space configuration.

use crate::MmError;
use gmap_abi::GuestAddr;
use gmap_abi::layout::{GUEST_ADDRESS_LIMIT, MMAP_BASE, is_page_aligned};

/// Configuration for one guest address space.
///
/// Controls the window the mmap cursor hands addresses out of. The cursor
/// starts at `mmap_base` and refuses allocations that would end past
/// `mmap_limit`. `MAP_FIXED` requests are bounded by `mmap_limit` too.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressSpaceConfig {
    mmap_base: GuestAddr,
    mmap_limit: GuestAddr,
}

impl AddressSpaceConfig {
    /// Creates a configuration with the cursor starting at `mmap_base`.
    pub const fn new(mmap_base: GuestAddr) -> Result<Self, MmError> {
        Self::with_limit(mmap_base, GuestAddr::new(GUEST_ADDRESS_LIMIT))
    }

    /// Creates a configuration with an explicit upper bound.
    ///
    /// Both addresses must be page-aligned and `mmap_base` must lie below
    /// `mmap_limit`.
    pub const fn with_limit(mmap_base: GuestAddr, mmap_limit: GuestAddr) -> Result<Self, MmError> {
        if !is_page_aligned(mmap_base.as_u64()) || !is_page_aligned(mmap_limit.as_u64()) {
            return Err(MmError::InvalidArgument("mmap window must be page-aligned"));
        }
        if mmap_base.as_u64() >= mmap_limit.as_u64() {
            return Err(MmError::InvalidArgument("mmap base must lie below its limit"));
        }
        Ok(Self {
            mmap_base,
            mmap_limit,
        })
    }

    /// First address handed out by the mmap cursor.
    #[inline]
    #[must_use]
    pub const fn mmap_base(&self) -> GuestAddr {
        self.mmap_base
    }

    /// One past the highest address any mapping may cover.
    #[inline]
    #[must_use]
    pub const fn mmap_limit(&self) -> GuestAddr {
        self.mmap_limit
    }
}

impl Default for AddressSpaceConfig {
    fn default() -> Self {
        Self {
            mmap_base: GuestAddr::new(MMAP_BASE),
            mmap_limit: GuestAddr::new(GUEST_ADDRESS_LIMIT),
        }
    }
}
