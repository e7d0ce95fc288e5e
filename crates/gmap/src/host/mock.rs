// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock host implementation for testing.
//!
//! This module provides an in-memory host allocator and guest page table,
//! allowing the address-space manager to be tested without a hypervisor.
//! No memory is actually reserved: the mock hands out host addresses from a
//! bump pointer and tracks which byte ranges of each reservation are live.

use crate::host::{HostAllocator, HostError, PageTableInstaller};
use gmap_abi::layout::{PAGE_SIZE, is_page_aligned};
use gmap_abi::{GuestAddr, HostAddr, HostHandle, HostMapFlags, HostPerms};
use std::collections::BTreeMap;

/// First host address handed out by the mock.
const MOCK_HOST_BASE: u64 = 0x0000_7f00_0000_0000;

/// One entry of the mock guest page table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageEntry {
    /// Host address backing the guest page.
    pub host: HostAddr,
    /// Permissions the page was installed with.
    pub perms: HostPerms,
}

/// In-memory host allocator and page-table installer.
///
/// The page table is tracked per 4 KB page, so the mock is only suitable
/// for mappings of modest size.
pub struct MockHost {
    /// Next host address to hand out.
    next_ptr: u64,
    /// Last handle handed out.
    last_handle: u64,
    /// Live byte spans (start -> end) of every reservation.
    spans: BTreeMap<HostHandle, BTreeMap<u64, u64>>,
    /// Bytes that may still be reserved, or `None` for unlimited.
    budget: Option<u64>,
    /// Fail the next `install` call.
    fail_install: bool,
    /// Installed guest pages.
    page_table: BTreeMap<GuestAddr, PageEntry>,
    reserve_calls: usize,
    release_calls: usize,
}

impl MockHost {
    /// Create a mock host with unlimited memory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_ptr: MOCK_HOST_BASE,
            last_handle: 0,
            spans: BTreeMap::new(),
            budget: None,
            fail_install: false,
            page_table: BTreeMap::new(),
            reserve_calls: 0,
            release_calls: 0,
        }
    }

    /// Create a mock host that can reserve at most `bytes` at a time.
    #[must_use]
    pub const fn with_budget(bytes: u64) -> Self {
        let mut host = Self::new();
        host.budget = Some(bytes);
        host
    }

    /// Make the next `install` call fail.
    pub const fn fail_next_install(&mut self) {
        self.fail_install = true;
    }

    /// Total bytes reserved and not yet released.
    #[must_use]
    pub fn live_host_bytes(&self) -> u64 {
        self.spans
            .values()
            .flat_map(BTreeMap::iter)
            .map(|(start, end)| end - start)
            .sum()
    }

    /// Number of reservations with at least one live byte.
    #[must_use]
    pub fn live_reservations(&self) -> usize {
        self.spans.len()
    }

    /// Number of guest pages currently installed.
    #[must_use]
    pub fn installed_pages(&self) -> usize {
        self.page_table.len()
    }

    /// Page-table entry for the page containing `guest`.
    #[must_use]
    pub fn page_entry(&self, guest: GuestAddr) -> Option<PageEntry> {
        self.page_table.get(&guest.page_align_down()).copied()
    }

    /// Translate a guest address through the installed page table.
    #[must_use]
    pub fn translate(&self, guest: GuestAddr) -> Option<HostAddr> {
        let page = guest.page_align_down();
        self.page_table
            .get(&page)
            .map(|entry| entry.host.add(guest.diff(page)))
    }

    /// Number of successful `reserve` calls.
    #[must_use]
    pub const fn reserve_calls(&self) -> usize {
        self.reserve_calls
    }

    /// Number of successful `release` calls.
    #[must_use]
    pub const fn release_calls(&self) -> usize {
        self.release_calls
    }

    /// Checks that `[guest, guest + length)` is a non-empty page-aligned range.
    const fn check_guest_range(guest: GuestAddr, length: u64) -> Result<u64, HostError> {
        if length == 0 || !is_page_aligned(length) || !guest.is_page_aligned() {
            return Err(HostError::MisalignedAddress);
        }
        if guest.checked_add(length).is_none() {
            return Err(HostError::InvalidRange);
        }
        Ok(length / PAGE_SIZE)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAllocator for MockHost {
    fn reserve(
        &mut self,
        length: u64,
        _perms: HostPerms,
        _flags: HostMapFlags,
    ) -> Result<(HostAddr, HostHandle), HostError> {
        if length == 0 || !is_page_aligned(length) {
            return Err(HostError::MisalignedAddress);
        }
        if let Some(budget) = self.budget {
            if length > budget {
                return Err(HostError::OutOfMemory);
            }
        }

        let ptr = self.next_ptr;
        // Keep an unused page between reservations
        let next = ptr
            .checked_add(length)
            .and_then(|end| end.checked_add(PAGE_SIZE))
            .ok_or(HostError::OutOfMemory)?;

        if let Some(budget) = self.budget.as_mut() {
            *budget -= length;
        }
        self.next_ptr = next;
        self.last_handle += 1;
        let handle = HostHandle::new(self.last_handle);
        self.spans
            .entry(handle)
            .or_default()
            .insert(ptr, ptr + length);
        self.reserve_calls += 1;

        Ok((HostAddr::new(ptr), handle))
    }

    fn release(
        &mut self,
        ptr: HostAddr,
        handle: HostHandle,
        length: u64,
    ) -> Result<(), HostError> {
        if length == 0 || !is_page_aligned(length) || !is_page_aligned(ptr.as_u64()) {
            return Err(HostError::MisalignedAddress);
        }
        let spans = self
            .spans
            .get_mut(&handle)
            .ok_or(HostError::UnknownHandle)?;

        let start = ptr.as_u64();
        let end = start.checked_add(length).ok_or(HostError::InvalidRange)?;
        let (&span_start, &span_end) = spans
            .range(..=start)
            .next_back()
            .ok_or(HostError::InvalidRange)?;
        if end > span_end {
            return Err(HostError::InvalidRange);
        }

        spans.remove(&span_start);
        if span_start < start {
            spans.insert(span_start, start);
        }
        if end < span_end {
            spans.insert(end, span_end);
        }
        if spans.is_empty() {
            self.spans.remove(&handle);
        }

        if let Some(budget) = self.budget.as_mut() {
            *budget = budget.saturating_add(length);
        }
        self.release_calls += 1;
        Ok(())
    }
}

impl PageTableInstaller for MockHost {
    fn install(
        &mut self,
        guest: GuestAddr,
        length: u64,
        perms: HostPerms,
        host: HostAddr,
    ) -> Result<(), HostError> {
        if self.fail_install {
            self.fail_install = false;
            return Err(HostError::OutOfMemory);
        }
        let pages = Self::check_guest_range(guest, length)?;

        for i in 0..pages {
            if self.page_table.contains_key(&guest.add(i * PAGE_SIZE)) {
                return Err(HostError::AlreadyMapped);
            }
        }
        for i in 0..pages {
            let offset = i * PAGE_SIZE;
            self.page_table.insert(
                guest.add(offset),
                PageEntry {
                    host: host.add(offset),
                    perms,
                },
            );
        }
        Ok(())
    }

    fn uninstall(&mut self, guest: GuestAddr, length: u64) -> Result<(), HostError> {
        let pages = Self::check_guest_range(guest, length)?;

        for i in 0..pages {
            if !self.page_table.contains_key(&guest.add(i * PAGE_SIZE)) {
                return Err(HostError::NotMapped);
            }
        }
        for i in 0..pages {
            self.page_table.remove(&guest.add(i * PAGE_SIZE));
        }
        Ok(())
    }
}
