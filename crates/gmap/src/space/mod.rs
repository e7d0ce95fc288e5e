// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Address space of one guest process.
//!
//! [`AddressSpace`] ties the region directory and the mmap cursor together
//! and implements `mmap`/`munmap` on top of them. It is not synchronized;
//! [`MemoryManager`](crate::MemoryManager) wraps it in a lock.
//!
//! # Mapping
//!
//! A request is validated completely before any state changes. Then:
//!
//! 1. The guest address comes from the request (`MAP_FIXED`) or the cursor
//! 2. Host memory is reserved
//! 3. Whatever overlaps the new range is removed (Linux `MAP_FIXED`
//!    replaces existing mappings)
//! 4. The region enters the directory
//! 5. The range is installed in the guest page table
//!
//! A failure after validation is fatal: the operation is not rolled back.

#[cfg(test)]
mod invariants_test;
mod mutate;

use crate::config::AddressSpaceConfig;
use crate::cursor::MmapCursor;
use crate::directory::RegionDirectory;
use crate::host::{HostAllocator, PageTableInstaller};
use crate::region::{HostSlice, Region, RegionInfo};
use crate::MmError;
use gmap_abi::layout::page_round_up;
use gmap_abi::{GuestAddr, HostPerms, MapFlags, Protection};

/// A decoded `mmap` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapRequest {
    /// Requested address; only binding with `MAP_FIXED`.
    pub addr: GuestAddr,
    /// Length in bytes, rounded up to pages by the manager.
    pub length: u64,
    /// Guest-visible protection.
    pub prot: Protection,
    /// Permissions for the host reservation.
    pub host_perms: HostPerms,
    /// Linux mapping flags, possibly including advisory or unknown bits.
    pub flags: MapFlags,
    /// File descriptor for file-backed mappings.
    pub fd: Option<i32>,
    /// Offset into `fd`.
    pub offset: u64,
}

impl MapRequest {
    /// Creates a request with host permissions derived from `prot`.
    #[must_use]
    pub const fn new(addr: GuestAddr, length: u64, prot: Protection, flags: MapFlags) -> Self {
        Self {
            addr,
            length,
            prot,
            host_perms: prot.to_host_perms(),
            flags,
            fd: None,
            offset: 0,
        }
    }

    /// Private anonymous mapping at an address chosen by the manager.
    #[must_use]
    pub const fn anonymous(length: u64, prot: Protection) -> Self {
        Self::new(
            GuestAddr::null(),
            length,
            prot,
            MapFlags::PRIVATE.union(MapFlags::ANONYMOUS),
        )
    }

    /// Private anonymous mapping pinned at `addr`.
    #[must_use]
    pub const fn fixed(addr: GuestAddr, length: u64, prot: Protection) -> Self {
        Self::new(
            addr,
            length,
            prot,
            MapFlags::PRIVATE
                .union(MapFlags::ANONYMOUS)
                .union(MapFlags::FIXED),
        )
    }

    /// Overrides the host reservation permissions.
    #[must_use]
    pub const fn with_host_perms(mut self, perms: HostPerms) -> Self {
        self.host_perms = perms;
        self
    }

    /// Attaches a file descriptor and offset.
    #[must_use]
    pub const fn with_file(mut self, fd: i32, offset: u64) -> Self {
        self.fd = Some(fd);
        self.offset = offset;
        self
    }

    /// Decodes raw `mmap` syscall arguments.
    ///
    /// A negative `fd` means no file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `prot` carries bits other than
    /// `PROT_READ`, `PROT_WRITE` and `PROT_EXEC`. Flag bits are kept as
    /// given and checked when the request is mapped.
    pub fn from_linux(
        addr: u64,
        length: u64,
        prot: u32,
        flags: u32,
        fd: i32,
        offset: u64,
    ) -> Result<Self, MmError> {
        let prot = Protection::from_linux(prot)
            .ok_or(MmError::InvalidArgument("unknown protection bits"))?;
        let request = Self::new(GuestAddr::new(addr), length, prot, MapFlags::from_linux(flags));
        Ok(if fd >= 0 {
            request.with_file(fd, offset)
        } else {
            request
        })
    }
}

/// A validated request, ready to be carried out.
struct Placement {
    length: u64,
    flags: MapFlags,
}

/// Region directory and mmap cursor of one guest process.
#[derive(Debug)]
pub struct AddressSpace {
    directory: RegionDirectory,
    cursor: MmapCursor,
    config: AddressSpaceConfig,
}

impl AddressSpace {
    /// Creates an empty address space.
    #[must_use]
    pub const fn new(config: &AddressSpaceConfig) -> Self {
        Self {
            directory: RegionDirectory::new(),
            cursor: MmapCursor::new(config),
            config: *config,
        }
    }

    /// Live regions.
    #[inline]
    #[must_use]
    pub const fn directory(&self) -> &RegionDirectory {
        &self.directory
    }

    /// The mmap cursor.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> &MmapCursor {
        &self.cursor
    }

    /// Configuration the space was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &AddressSpaceConfig {
        &self.config
    }

    /// Snapshot of the region containing `addr`.
    #[must_use]
    pub fn lookup(&self, addr: GuestAddr) -> Option<RegionInfo> {
        self.directory.get(addr).map(Region::info)
    }

    /// Snapshot of all live regions in address order.
    #[must_use]
    pub fn regions(&self) -> Vec<RegionInfo> {
        self.directory.iter().map(Region::info).collect()
    }

    /// Maps `request` and returns the guest base address.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: unaligned fixed address, not exactly one of
    ///   `MAP_SHARED`/`MAP_PRIVATE`, unknown protection bits, zero length,
    ///   or a range that overflows or ends past the mmap limit
    /// - `UnrecognizedFlags`: flag bits outside the supported set (fatal)
    /// - `Unsupported`: a mapping without `MAP_ANONYMOUS`
    /// - `ResourceExhausted`: cursor window or host memory exhausted (fatal)
    /// - `InvariantViolation`: directory and host disagree (fatal)
    pub fn map<A, P>(
        &mut self,
        allocator: &mut A,
        installer: &mut P,
        request: &MapRequest,
    ) -> Result<GuestAddr, MmError>
    where
        A: HostAllocator + ?Sized,
        P: PageTableInstaller + ?Sized,
    {
        let Placement { length, flags } = validate(request)?;

        let base = if flags.is_fixed() {
            let end = request
                .addr
                .checked_add(length)
                .ok_or(MmError::InvalidArgument("fixed range overflows"))?;
            if end > self.config.mmap_limit() {
                return Err(MmError::InvalidArgument("fixed range beyond address limit"));
            }
            request.addr
        } else {
            self.cursor
                .allocate(length)
                .ok_or(MmError::ResourceExhausted("mmap window exhausted"))?
        };

        let (host_ptr, handle) = allocator
            .reserve(length, request.host_perms, flags.to_host_flags())
            .map_err(|err| {
                tracing::error!(%base, length, %err, "host reservation failed");
                MmError::ResourceExhausted("host reservation failed")
            })?;

        let perms = request.prot.to_host_perms();
        // Anonymous mappings never carry a file
        let region = Region::new(
            base,
            request.prot,
            perms,
            flags,
            HostSlice::new(handle, host_ptr, length),
            None,
        );
        mutate::insert_displacing(&mut self.directory, allocator, installer, region)?;

        installer
            .install(base, length, perms, host_ptr)
            .map_err(|err| {
                tracing::error!(%base, length, %err, "page-table install failed");
                MmError::InvariantViolation("page-table install failed")
            })?;

        tracing::debug!(%base, length, prot = %request.prot, fixed = flags.is_fixed(), "mapped");
        Ok(base)
    }

    /// Unmaps every page in `[addr, addr + length)`.
    ///
    /// Regions partly inside the range are trimmed; regions around it are
    /// left alone.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: unaligned address, zero length or a range that
    ///   overflows
    /// - `NoSuchMapping`: no live region intersects the range; nothing
    ///   changes
    /// - `InvariantViolation`: the host refused an uninstall or release (fatal)
    pub fn unmap<A, P>(
        &mut self,
        allocator: &mut A,
        installer: &mut P,
        addr: GuestAddr,
        length: u64,
    ) -> Result<(), MmError>
    where
        A: HostAllocator + ?Sized,
        P: PageTableInstaller + ?Sized,
    {
        if !addr.is_page_aligned() {
            return Err(MmError::InvalidArgument("unaligned address"));
        }
        if length == 0 {
            return Err(MmError::InvalidArgument("zero length"));
        }
        let length =
            page_round_up(length).ok_or(MmError::InvalidArgument("length overflows"))?;
        if addr.checked_add(length).is_none() {
            return Err(MmError::InvalidArgument("range overflows"));
        }

        if self.directory.find_overlap(addr, length).is_none() {
            return Err(MmError::NoSuchMapping);
        }
        let released =
            mutate::remove_range(&mut self.directory, allocator, installer, addr, length)?;

        tracing::debug!(%addr, length, released, "unmapped");
        Ok(())
    }

    /// Uninstalls and releases every region, lowest first.
    ///
    /// Stops at the first host failure and reports it; the failing region
    /// is gone from the directory, later regions stay.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the host refuses an uninstall or
    /// release.
    pub fn teardown<A, P>(&mut self, allocator: &mut A, installer: &mut P) -> Result<(), MmError>
    where
        A: HostAllocator + ?Sized,
        P: PageTableInstaller + ?Sized,
    {
        let count = self.directory.len();
        while let Some(region) = self.directory.pop_first() {
            mutate::release(allocator, installer, region)?;
        }
        tracing::debug!(regions = count, "address space torn down");
        Ok(())
    }
}

/// Checks a request without touching any state.
fn validate(request: &MapRequest) -> Result<Placement, MmError> {
    let flags = request.flags;
    if flags.is_fixed() && !request.addr.is_page_aligned() {
        return Err(MmError::InvalidArgument("unaligned fixed address"));
    }
    if flags.sharing().is_none() {
        return Err(MmError::InvalidArgument(
            "exactly one of MAP_SHARED and MAP_PRIVATE required",
        ));
    }
    if !Protection::all().contains(request.prot) {
        return Err(MmError::InvalidArgument("unknown protection bits"));
    }
    if request.length == 0 {
        return Err(MmError::InvalidArgument("zero length"));
    }

    let flags = flags.without_advisory();
    let unknown = flags.unrecognized_bits();
    if unknown != 0 {
        tracing::error!(bits = unknown, "unrecognized mmap flags");
        return Err(MmError::UnrecognizedFlags(unknown));
    }

    let length =
        page_round_up(request.length).ok_or(MmError::InvalidArgument("length overflows"))?;

    if !flags.is_anonymous() {
        return Err(MmError::Unsupported("file-backed mappings"));
    }

    Ok(Placement { length, flags })
}
