// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Host reservation handle.

use core::fmt;

/// Opaque identifier for one host memory reservation.
///
/// The host allocator returns a handle together with the host address of
/// every reservation. The address-space manager never interprets it; it
/// only passes it back when releasing some or all of the reservation.
///
/// Handle 0 is reserved/invalid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct HostHandle(u64);

impl HostHandle {
    /// The invalid/null handle.
    pub const NULL: Self = Self(0);

    /// Creates a new handle.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is the null/invalid handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({})", self.0)
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}
