// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared helpers for gmap integration tests.
//!
//! This module is **not** a test file, so it must comply with full clippy
//! rules. Helpers report problems through `Result` and leave the unwrapping
//! to the `*_test.rs` files.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use gmap::{GuestAddr, MapRequest, MemoryManager, MmError, MockHost, PAGE_SIZE, Protection};

/// Manager over two independent mock hosts.
pub type TestManager = MemoryManager<MockHost, MockHost>;

/// Read-write protection.
pub const RW: Protection = Protection::READ.union(Protection::WRITE);

/// Creates a manager with the default mmap window.
pub fn manager() -> TestManager {
    MemoryManager::new(MockHost::new(), MockHost::new())
}

/// Private anonymous read-write mapping at a manager-chosen address.
pub const fn anon(len: u64) -> MapRequest {
    MapRequest::anonymous(len, RW)
}

/// Private anonymous read-write mapping pinned at `addr`.
pub const fn fixed(addr: u64, len: u64) -> MapRequest {
    MapRequest::fixed(GuestAddr::new(addr), len, RW)
}

/// `(base, end)` of every live region.
pub fn spans(mm: &TestManager) -> Result<Vec<(u64, u64)>, MmError> {
    Ok(mm
        .regions()?
        .iter()
        .map(|r| (r.base.as_u64(), r.end().as_u64()))
        .collect())
}

/// Cross-checks the directory against the mock allocator and page table.
pub fn check_consistency(mm: &TestManager) -> Result<(), String> {
    mm.inspect(|space, alloc, pt| {
        space
            .directory()
            .check_invariants()
            .map_err(|err| err.to_string())?;

        let regions = space.regions();
        let total: u64 = regions.iter().map(|r| r.len).sum();
        if alloc.live_host_bytes() != total {
            return Err(format!(
                "host holds {:#x} bytes, directory {total:#x}",
                alloc.live_host_bytes()
            ));
        }
        if pt.installed_pages() as u64 != total / PAGE_SIZE {
            return Err(format!(
                "{} pages installed, directory covers {}",
                pt.installed_pages(),
                total / PAGE_SIZE
            ));
        }
        for r in &regions {
            if pt.translate(r.base) != Some(r.host_ptr) {
                return Err(format!("{} does not translate to its host pointer", r.base));
            }
        }
        Ok(())
    })
}
