// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Guest and host address types.
//!
//! These newtypes prevent accidentally mixing address spaces at compile time.

use core::fmt;
use core::ops::{Add, Sub};

use crate::layout::{PAGE_MASK, is_page_aligned, page_round_up};

/// A guest virtual address (what the emulated Linux process sees).
///
/// Guest addresses are used for:
/// - `mmap`/`munmap` arguments and results
/// - Region directory keys
/// - Guest page-table installation
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct GuestAddr(u64);

impl GuestAddr {
    /// Create a new guest address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Create a null (zero) guest address.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Check if this is a null address.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Add an offset to this address, wrapping on overflow.
    #[inline]
    #[must_use]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Add an offset to this address.
    ///
    /// Returns `None` if the result would overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Calculate the difference between two addresses.
    #[inline]
    #[must_use]
    pub const fn diff(self, other: Self) -> u64 {
        self.0.wrapping_sub(other.0)
    }

    /// Check if this address lies on a page boundary.
    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        is_page_aligned(self.0)
    }

    /// Round this address up to the next page boundary.
    ///
    /// Returns `None` if the result would overflow.
    #[inline]
    #[must_use]
    pub const fn page_align_up(self) -> Option<Self> {
        match page_round_up(self.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Round this address down to its page boundary.
    #[inline]
    #[must_use]
    pub const fn page_align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }
}

impl fmt::Debug for GuestAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestAddr({:#x})", self.0)
    }
}

impl fmt::Display for GuestAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for GuestAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl Add<u64> for GuestAddr {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        self.add(rhs)
    }
}

impl Sub<u64> for GuestAddr {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.wrapping_sub(rhs))
    }
}

/// A host address backing guest memory.
///
/// The host allocator returns one of these for every reservation. Byte
/// offsets inside a reservation correspond 1:1 to offsets inside the guest
/// range it backs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct HostAddr(u64);

impl HostAddr {
    /// Create a new host address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Create a null (zero) host address.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Check if this is a null address.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Convert to a raw pointer (for use by host allocators).
    #[inline]
    #[must_use]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// Convert to a raw mutable pointer (for use by host allocators).
    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Add an offset to this address, wrapping on overflow.
    #[inline]
    #[must_use]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Calculate the difference between two addresses.
    #[inline]
    #[must_use]
    pub const fn diff(self, other: Self) -> u64 {
        self.0.wrapping_sub(other.0)
    }
}

impl fmt::Debug for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostAddr({:#x})", self.0)
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for HostAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl Add<u64> for HostAddr {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        self.add(rhs)
    }
}
