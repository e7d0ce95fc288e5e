// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Guest address-space layout constants.
//!
//! The guest sees a Linux `x86_64` user address space. Anonymous mappings
//! without `MAP_FIXED` are placed by a bump cursor that starts at
//! [`MMAP_BASE`] and only ever moves upward.
//!
//! # Guest Layout (64-bit)
//!
//! ```text
//! 0x0000_0000_0000_0000  NULL page (never handed out by the cursor)
//! 0x0000_0000_0040_0000  Typical ELF load address (FIXED mappings)
//! 0x0000_0000_c000_0000  mmap cursor start (grows upward)
//! 0x0000_8000_0000_0000  End of guest user space
//! ```

/// One kilobyte in bytes.
const KB: u64 = 1024;

/// Standard page size (4 KB).
pub const PAGE_SIZE: u64 = 4 * KB;

/// Page size shift (log2 of `PAGE_SIZE`).
pub const PAGE_SHIFT: u32 = 12;

/// Mask of the in-page offset bits.
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Start of the region used for mappings that do not pin an address.
pub const MMAP_BASE: u64 = 0x0000_0000_c000_0000;

/// One past the highest guest user-space address.
///
/// Mappings may not extend beyond this address.
pub const GUEST_ADDRESS_LIMIT: u64 = 0x0000_8000_0000_0000;

// =============================================================================
// Helper Functions
// =============================================================================

/// Returns true if `value` is a multiple of [`PAGE_SIZE`].
#[inline]
#[must_use]
pub const fn is_page_aligned(value: u64) -> bool {
    value & PAGE_MASK == 0
}

/// Rounds `len` up to the next multiple of [`PAGE_SIZE`].
///
/// Returns `None` if the rounded value does not fit in a `u64`.
#[inline]
#[must_use]
pub const fn page_round_up(len: u64) -> Option<u64> {
    match len.checked_add(PAGE_MASK) {
        Some(v) => Some(v & !PAGE_MASK),
        None => None,
    }
}

/// Rounds `value` down to a multiple of [`PAGE_SIZE`].
#[inline]
#[must_use]
pub const fn page_round_down(value: u64) -> u64 {
    value & !PAGE_MASK
}

/// Number of pages covered by `len` bytes, rounding up.
#[inline]
#[must_use]
pub const fn page_count(len: u64) -> u64 {
    len.div_ceil(PAGE_SIZE)
}

// Compile-time verification of the layout
const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
    assert!(is_page_aligned(MMAP_BASE));
    assert!(is_page_aligned(GUEST_ADDRESS_LIMIT));
    assert!(MMAP_BASE < GUEST_ADDRESS_LIMIT);
    assert!(MMAP_BASE > PAGE_SIZE);
};
