// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Region mutation: range removal and displacing insertion.
//!
//! Removal trims partially covered regions by splitting them and keeps the
//! outside halves live. Fully covered regions leave the directory, are
//! uninstalled from the guest page table and have their host memory
//! released, in that order.

use crate::MmError;
use crate::directory::RegionDirectory;
use crate::host::{HostAllocator, PageTableInstaller};
use crate::region::Region;
use gmap_abi::GuestAddr;

/// Removes every byte of `[base, base + length)` from the directory.
///
/// `base` and `length` must be page-aligned and must not wrap. Returns the
/// number of regions (or region pieces) released. An empty range is not an
/// error.
pub(crate) fn remove_range<A, P>(
    directory: &mut RegionDirectory,
    allocator: &mut A,
    installer: &mut P,
    base: GuestAddr,
    length: u64,
) -> Result<usize, MmError>
where
    A: HostAllocator + ?Sized,
    P: PageTableInstaller + ?Sized,
{
    let end = base.add(length);
    let mut released = 0;

    while let Some(hit) = directory.find_overlap(base, length).map(Region::base) {
        let Some(mut region) = directory.remove(hit) else {
            return Err(MmError::InvariantViolation("overlapping region vanished"));
        };

        if region.base() < base {
            let inside = region.split_off(base)?;
            tracing::trace!(at = %base, "split region below range");
            reinsert(directory, region)?;
            region = inside;
        }
        if region.end() > end {
            let above = region.split_off(end)?;
            tracing::trace!(at = %end, "split region above range");
            reinsert(directory, above)?;
        }

        release(allocator, installer, region)?;
        released += 1;
    }

    Ok(released)
}

/// Inserts `region`, first removing whatever overlaps its range.
///
/// On failure the region's host memory has been released.
pub(crate) fn insert_displacing<A, P>(
    directory: &mut RegionDirectory,
    allocator: &mut A,
    installer: &mut P,
    region: Region,
) -> Result<(), MmError>
where
    A: HostAllocator + ?Sized,
    P: PageTableInstaller + ?Sized,
{
    let displaced = match remove_range(directory, allocator, installer, region.base(), region.len())
    {
        Ok(count) => count,
        Err(err) => {
            discard(allocator, region);
            return Err(err);
        }
    };
    if displaced > 0 {
        tracing::debug!(base = %region.base(), displaced, "fixed mapping displaced regions");
    }

    directory.insert(region).map_err(|(err, region)| {
        discard(allocator, region);
        err
    })
}

/// Uninstalls and releases a region that has left the directory.
pub(crate) fn release<A, P>(allocator: &mut A, installer: &mut P, region: Region) -> Result<(), MmError>
where
    A: HostAllocator + ?Sized,
    P: PageTableInstaller + ?Sized,
{
    let (base, len) = (region.base(), region.len());
    installer.uninstall(base, len).map_err(|err| {
        tracing::error!(%base, len, %err, "page-table uninstall failed");
        MmError::InvariantViolation("page-table uninstall failed")
    })?;

    let backing = region.into_backing();
    allocator
        .release(backing.ptr(), backing.handle(), backing.len())
        .map_err(|err| {
            tracing::error!(%base, len, handle = %backing.handle(), %err, "host release failed");
            MmError::InvariantViolation("host release failed")
        })
}

/// Releases the host memory of a region that never became visible.
///
/// Only used on paths that already fail with a fatal error, so a release
/// failure here is logged and otherwise ignored.
pub(crate) fn discard<A>(allocator: &mut A, region: Region)
where
    A: HostAllocator + ?Sized,
{
    let backing = region.into_backing();
    if let Err(err) = allocator.release(backing.ptr(), backing.handle(), backing.len()) {
        tracing::error!(handle = %backing.handle(), %err, "releasing discarded region failed");
    }
}

/// Puts a split-off remnant back into the directory.
fn reinsert(directory: &mut RegionDirectory, region: Region) -> Result<(), MmError> {
    directory.insert(region).map_err(|(err, region)| {
        tracing::error!(base = %region.base(), len = region.len(), "remnant reinsert failed");
        err
    })
}
