// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bump allocator for guest addresses of unpinned mappings.
//!
//! The cursor hands out `[next, next + length)` and advances. It never
//! consults the region directory and never moves backwards, so a range
//! freed by `munmap` is only reachable again through `MAP_FIXED`. Long
//! running guests that map and unmap in a loop walk the cursor up to its
//! limit and then fail with `ResourceExhausted`.


use crate::AddressSpaceConfig;
use gmap_abi::GuestAddr;
use gmap_abi::layout::is_page_aligned;

/// Monotonic guest address allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MmapCursor {
    /// Next address to hand out.
    next: GuestAddr,
    /// Allocations must end at or below this address.
    limit: GuestAddr,
}

impl MmapCursor {
    /// Creates a cursor over the window described by `config`.
    #[must_use]
    pub const fn new(config: &AddressSpaceConfig) -> Self {
        Self {
            next: config.mmap_base(),
            limit: config.mmap_limit(),
        }
    }

    /// Next address to hand out.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> GuestAddr {
        self.next
    }

    /// Upper bound of the window.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> GuestAddr {
        self.limit
    }

    /// Bytes left before the limit.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.as_u64().saturating_sub(self.next.as_u64())
    }

    /// Allocates `length` bytes of guest address space.
    ///
    /// `length` must already be page-rounded. Returns `None` if the window
    /// is exhausted; the cursor does not move in that case.
    pub const fn allocate(&mut self, length: u64) -> Option<GuestAddr> {
        if length == 0 || !is_page_aligned(length) || length > self.remaining() {
            return None;
        }
        let base = self.next;
        self.next = base.add(length);
        Some(base)
    }
}
