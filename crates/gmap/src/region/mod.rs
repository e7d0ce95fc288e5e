// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Guest memory regions.
//!
//! A [`Region`] is one contiguous, page-aligned range of guest addresses
//! together with the host memory that backs it. Each region exclusively
//! owns a [`HostSlice`]: a byte range of some host reservation. Splitting a
//! region splits its slice, so every live host byte belongs to exactly one
//! region.


use core::fmt;

use crate::MmError;
use gmap_abi::{GuestAddr, HostAddr, HostHandle, HostPerms, MapFlags, Protection};

/// A byte range of one host reservation.
///
/// Deliberately neither `Clone` nor `Copy`: releasing a slice twice would
/// corrupt the host allocator.
#[derive(Debug, PartialEq, Eq)]
pub struct HostSlice {
    handle: HostHandle,
    ptr: HostAddr,
    len: u64,
}

impl HostSlice {
    /// Create a slice covering `len` bytes at `ptr` in reservation `handle`.
    pub(crate) const fn new(handle: HostHandle, ptr: HostAddr, len: u64) -> Self {
        Self { handle, ptr, len }
    }

    /// Reservation this slice belongs to.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> HostHandle {
        self.handle
    }

    /// First host byte of the slice.
    #[inline]
    #[must_use]
    pub const fn ptr(&self) -> HostAddr {
        self.ptr
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the slice covers no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split off the bytes from `offset` onward into a new slice.
    ///
    /// `self` keeps `[0, offset)`. The caller guarantees `offset <= len`.
    const fn split_off(&mut self, offset: u64) -> Self {
        let tail = Self {
            handle: self.handle,
            ptr: self.ptr.add(offset),
            len: self.len - offset,
        };
        self.len = offset;
        tail
    }
}

/// File descriptor and offset a mapping was requested with.
///
/// Recorded for bookkeeping only; file contents are never read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileBacking {
    /// Guest file descriptor.
    pub fd: i32,
    /// Byte offset into the file of the region's first byte.
    pub offset: u64,
}

impl FileBacking {
    /// The same file, `by` bytes further in.
    #[inline]
    #[must_use]
    pub const fn advanced(self, by: u64) -> Self {
        Self {
            fd: self.fd,
            offset: self.offset.wrapping_add(by),
        }
    }
}

/// A live guest mapping.
#[derive(Debug)]
pub struct Region {
    base: GuestAddr,
    prot: Protection,
    perms: HostPerms,
    flags: MapFlags,
    backing: HostSlice,
    file: Option<FileBacking>,
}

impl Region {
    /// Create a region at `base` backed by `backing`.
    ///
    /// The region covers `backing.len()` bytes.
    pub(crate) const fn new(
        base: GuestAddr,
        prot: Protection,
        perms: HostPerms,
        flags: MapFlags,
        backing: HostSlice,
        file: Option<FileBacking>,
    ) -> Self {
        Self {
            base,
            prot,
            perms,
            flags,
            backing,
            file,
        }
    }

    /// First guest address of the region.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> GuestAddr {
        self.base
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.backing.len()
    }

    /// Returns true if the region covers no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    /// One past the last guest address of the region.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> GuestAddr {
        self.base.add(self.len())
    }

    /// Guest-visible protection.
    #[inline]
    #[must_use]
    pub const fn prot(&self) -> Protection {
        self.prot
    }

    /// Permissions the region is installed with in the guest page table.
    #[inline]
    #[must_use]
    pub const fn perms(&self) -> HostPerms {
        self.perms
    }

    /// Mapping flags, advisory bits stripped.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> MapFlags {
        self.flags
    }

    /// Host memory backing the region.
    #[inline]
    #[must_use]
    pub const fn backing(&self) -> &HostSlice {
        &self.backing
    }

    /// Host address backing the region's first byte.
    #[inline]
    #[must_use]
    pub const fn host_ptr(&self) -> HostAddr {
        self.backing.ptr()
    }

    /// File the region was mapped from, if any.
    #[inline]
    #[must_use]
    pub const fn file(&self) -> Option<FileBacking> {
        self.file
    }

    /// Returns true if `addr` lies inside the region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, addr: GuestAddr) -> bool {
        addr.as_u64() >= self.base.as_u64() && addr.as_u64() < self.end().as_u64()
    }

    /// Returns true if the region intersects `[start, end)`.
    ///
    /// An empty range overlaps nothing.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, start: GuestAddr, end: GuestAddr) -> bool {
        start.as_u64() < end.as_u64()
            && self.base.as_u64() < end.as_u64()
            && start.as_u64() < self.end().as_u64()
    }

    /// Split the region at guest address `at`.
    ///
    /// `self` keeps `[base, at)` and the returned region covers `[at, end)`.
    /// The tail keeps the protection, flags and host reservation; its host
    /// pointer and file offset advance by the same distance as its base.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` unless `at` is page-aligned and lies
    /// strictly inside the region. The region is left untouched.
    pub fn split_off(&mut self, at: GuestAddr) -> Result<Self, MmError> {
        if !at.is_page_aligned() || at <= self.base || at >= self.end() {
            return Err(MmError::InvariantViolation(
                "split point outside region or unaligned",
            ));
        }
        let offset = at.diff(self.base);
        let backing = self.backing.split_off(offset);
        Ok(Self {
            base: at,
            prot: self.prot,
            perms: self.perms,
            flags: self.flags,
            backing,
            file: self.file.map(|file| file.advanced(offset)),
        })
    }

    /// Give up the region, returning the host memory it owned.
    #[must_use]
    pub fn into_backing(self) -> HostSlice {
        self.backing
    }

    /// Copyable snapshot of the region.
    #[must_use]
    pub const fn info(&self) -> RegionInfo {
        RegionInfo {
            base: self.base,
            len: self.len(),
            prot: self.prot,
            flags: self.flags,
            host_ptr: self.backing.ptr(),
            host_handle: self.backing.handle(),
            file: self.file,
        }
    }
}

/// Snapshot of a region, detached from the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionInfo {
    /// First guest address.
    pub base: GuestAddr,
    /// Length in bytes.
    pub len: u64,
    /// Guest-visible protection.
    pub prot: Protection,
    /// Mapping flags, advisory bits stripped.
    pub flags: MapFlags,
    /// Host address backing `base`.
    pub host_ptr: HostAddr,
    /// Host reservation the backing belongs to.
    pub host_handle: HostHandle,
    /// File the region was mapped from, if any.
    pub file: Option<FileBacking>,
}

impl RegionInfo {
    /// One past the last guest address.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> GuestAddr {
        self.base.add(self.len)
    }
}

/// Formats like a line of `/proc/<pid>/maps`.
impl fmt::Display for RegionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sharing = if self.flags.contains(MapFlags::SHARED) {
            's'
        } else {
            'p'
        };
        write!(
            f,
            "{:012x}-{:012x} {}{} ",
            self.base.as_u64(),
            self.end().as_u64(),
            self.prot,
            sharing
        )?;
        match self.file {
            Some(file) => write!(f, "{:08x} fd:{}", file.offset, file.fd),
            None => write!(f, "{:08x} [anon]", 0),
        }
    }
}
