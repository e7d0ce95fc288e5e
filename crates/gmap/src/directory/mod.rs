// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Region directory.
//!
//! The directory is the ordered set of live regions of one address space,
//! keyed by base address. A single `BTreeMap` serves both as the in-order
//! view used by `munmap` sweeps and as the index for overlap queries.
//!
//! Overlap queries look at the entry preceding the query start too: a
//! region that begins below `base` may still reach into `[base, end)`.
//!
//! The directory does no locking and never calls the host.


use std::collections::BTreeMap;
use std::ops::Bound;

use crate::MmError;
use crate::region::Region;
use gmap_abi::GuestAddr;
use gmap_abi::layout::is_page_aligned;

/// Ordered collection of non-overlapping regions.
#[derive(Debug, Default)]
pub struct RegionDirectory {
    regions: BTreeMap<GuestAddr, Region>,
}

/// End of `[base, base + length)`, clamped to the top of the address space.
const fn range_end(base: GuestAddr, length: u64) -> GuestAddr {
    GuestAddr::new(base.as_u64().saturating_add(length))
}

impl RegionDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
        }
    }

    /// Number of live regions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if no region is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Adds a region.
    ///
    /// # Errors
    ///
    /// Hands the region back with `InvariantViolation` if it is empty,
    /// misaligned, wraps the address space or overlaps a live region.
    pub fn insert(&mut self, region: Region) -> Result<(), (MmError, Region)> {
        let aligned = region.base().is_page_aligned() && is_page_aligned(region.len());
        if region.is_empty() || !aligned {
            return Err((MmError::InvariantViolation("misaligned region"), region));
        }
        if region.base().checked_add(region.len()).is_none() {
            return Err((MmError::InvariantViolation("region wraps"), region));
        }
        if self.find_overlap(region.base(), region.len()).is_some() {
            return Err((MmError::InvariantViolation("overlapping region"), region));
        }
        self.regions.insert(region.base(), region);
        Ok(())
    }

    /// Removes and returns the region starting exactly at `base`.
    pub fn remove(&mut self, base: GuestAddr) -> Option<Region> {
        self.regions.remove(&base)
    }

    /// Removes and returns the lowest region.
    pub fn pop_first(&mut self) -> Option<Region> {
        self.regions.pop_first().map(|(_, region)| region)
    }

    /// Lowest region intersecting `[base, base + length)`.
    #[must_use]
    pub fn find_overlap(&self, base: GuestAddr, length: u64) -> Option<&Region> {
        self.overlapping(base, length).next()
    }

    /// All regions intersecting `[base, base + length)`, in address order.
    pub fn overlapping(&self, base: GuestAddr, length: u64) -> impl Iterator<Item = &Region> {
        let end = range_end(base, length);
        let start = match self.regions.range(..base).next_back() {
            Some((&key, region)) if region.end() > base => key,
            _ => base,
        };
        self.regions
            .range(start..)
            .map(|(_, region)| region)
            .take_while(move |region| region.base() < end)
            .filter(move |region| region.overlaps(base, end))
    }

    /// Region containing `addr`.
    #[must_use]
    pub fn get(&self, addr: GuestAddr) -> Option<&Region> {
        self.regions
            .range(..=addr)
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.contains(addr))
    }

    /// First region starting strictly above `base`.
    #[must_use]
    pub fn next_after(&self, base: GuestAddr) -> Option<&Region> {
        self.regions
            .range((Bound::Excluded(base), Bound::Unbounded))
            .next()
            .map(|(_, region)| region)
    }

    /// Last region starting strictly below `base`.
    #[must_use]
    pub fn prev_before(&self, base: GuestAddr) -> Option<&Region> {
        self.regions
            .range(..base)
            .next_back()
            .map(|(_, region)| region)
    }

    /// Lowest region.
    #[must_use]
    pub fn first(&self) -> Option<&Region> {
        self.regions.values().next()
    }

    /// All regions in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Validates alignment, keying and disjointness of every region.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` naming the first broken property.
    pub fn check_invariants(&self) -> Result<(), MmError> {
        let mut prev_end: Option<GuestAddr> = None;
        for (&key, region) in &self.regions {
            if key != region.base() {
                return Err(MmError::InvariantViolation("region keyed under wrong base"));
            }
            if region.is_empty()
                || !region.base().is_page_aligned()
                || !is_page_aligned(region.len())
            {
                return Err(MmError::InvariantViolation("misaligned region"));
            }
            if region.base().checked_add(region.len()).is_none() {
                return Err(MmError::InvariantViolation("region wraps"));
            }
            if prev_end.is_some_and(|end| end > region.base()) {
                return Err(MmError::InvariantViolation("regions overlap"));
            }
            prev_end = Some(region.end());
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RegionDirectory {
    type Item = &'a Region;
    type IntoIter = std::collections::btree_map::Values<'a, GuestAddr, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.values()
    }
}
