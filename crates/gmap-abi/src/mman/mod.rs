// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Memory-mapping protection and flag definitions.
//!
//! Guest-facing flag sets carry the raw Linux `x86_64` bit values from
//! `<asm-generic/mman-common.h>`. Host-facing permissions are plain structs,
//! translated from the guest bits at the capability boundary.
//!
//! # Recognized `mmap` flags
//!
//! | Flag | Value | Handling |
//! |------|-------|----------|
//! | `MAP_SHARED` | `0x01` | bookkeeping |
//! | `MAP_PRIVATE` | `0x02` | bookkeeping |
//! | `MAP_FIXED` | `0x10` | bookkeeping |
//! | `MAP_ANONYMOUS` | `0x20` | bookkeeping |
//! | `MAP_DENYWRITE` | `0x0800` | ignored (obsolete) |
//! | `MAP_EXECUTABLE` | `0x1000` | ignored (obsolete) |
//! | `MAP_NORESERVE` | `0x4000` | ignored |
//! | `MAP_STACK` | `0x20000` | ignored (Linux does nothing either) |
//!
//! Any other bit is unrecognized.


use bitflags::bitflags;
use core::fmt;

// =============================================================================
// Guest Protection
// =============================================================================

bitflags! {
    /// Guest page protection (`PROT_*`).
    ///
    /// An empty set is `PROT_NONE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Protection: u32 {
        /// `PROT_READ`.
        const READ = 0x1;
        /// `PROT_WRITE`.
        const WRITE = 0x2;
        /// `PROT_EXEC`.
        const EXEC = 0x4;
    }
}

impl Protection {
    /// Decode raw Linux `PROT_*` bits.
    ///
    /// Returns `None` if any bit is outside `PROT_READ | PROT_WRITE | PROT_EXEC`.
    #[inline]
    #[must_use]
    pub const fn from_linux(raw: u32) -> Option<Self> {
        Self::from_bits(raw)
    }

    /// Translate to host-native page permissions.
    #[inline]
    #[must_use]
    pub const fn to_host_perms(self) -> HostPerms {
        HostPerms {
            read: self.contains(Self::READ),
            write: self.contains(Self::WRITE),
            execute: self.contains(Self::EXEC),
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.contains(Self::READ) { 'r' } else { '-' };
        let w = if self.contains(Self::WRITE) { 'w' } else { '-' };
        let x = if self.contains(Self::EXEC) { 'x' } else { '-' };
        write!(f, "{r}{w}{x}")
    }
}

// =============================================================================
// Guest Mapping Flags
// =============================================================================

bitflags! {
    /// Guest `mmap` flags (`MAP_*`).
    ///
    /// Built with [`MapFlags::from_linux`], which retains unknown bits so
    /// the manager can refuse them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        /// `MAP_SHARED`.
        const SHARED = 0x01;
        /// `MAP_PRIVATE`.
        const PRIVATE = 0x02;
        /// `MAP_FIXED`.
        const FIXED = 0x10;
        /// `MAP_ANONYMOUS`.
        const ANONYMOUS = 0x20;
        /// `MAP_DENYWRITE` (obsolete).
        const DENYWRITE = 0x0800;
        /// `MAP_EXECUTABLE` (obsolete).
        const EXECUTABLE = 0x1000;
        /// `MAP_NORESERVE`.
        const NORESERVE = 0x4000;
        /// `MAP_STACK`.
        const STACK = 0x2_0000;

        /// Bits accepted and discarded without effect.
        const ADVISORY = Self::DENYWRITE.bits()
            | Self::EXECUTABLE.bits()
            | Self::NORESERVE.bits()
            | Self::STACK.bits();
    }
}

/// Whether a mapping is private (copy-on-write) or shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sharing {
    /// `MAP_PRIVATE`.
    Private,
    /// `MAP_SHARED`.
    Shared,
}

impl MapFlags {
    /// Wrap raw Linux `MAP_*` bits, keeping unknown bits.
    #[inline]
    #[must_use]
    pub const fn from_linux(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Returns the flags with the advisory bits cleared.
    #[inline]
    #[must_use]
    pub const fn without_advisory(self) -> Self {
        self.difference(Self::ADVISORY)
    }

    /// Returns the bits this crate does not know about.
    #[inline]
    #[must_use]
    pub const fn unrecognized_bits(self) -> u32 {
        self.bits() & !Self::all().bits()
    }

    /// Returns the sharing mode if exactly one of `SHARED`/`PRIVATE` is set.
    #[inline]
    #[must_use]
    pub const fn sharing(self) -> Option<Sharing> {
        match (self.contains(Self::SHARED), self.contains(Self::PRIVATE)) {
            (true, false) => Some(Sharing::Shared),
            (false, true) => Some(Sharing::Private),
            _ => None,
        }
    }

    /// Returns true if `MAP_FIXED` is set.
    #[inline]
    #[must_use]
    pub const fn is_fixed(self) -> bool {
        self.contains(Self::FIXED)
    }

    /// Returns true if `MAP_ANONYMOUS` is set.
    #[inline]
    #[must_use]
    pub const fn is_anonymous(self) -> bool {
        self.contains(Self::ANONYMOUS)
    }

    /// Translate to host-native reservation flags.
    #[inline]
    #[must_use]
    pub const fn to_host_flags(self) -> HostMapFlags {
        HostMapFlags {
            shared: self.contains(Self::SHARED),
            anonymous: self.contains(Self::ANONYMOUS),
        }
    }
}

// =============================================================================
// Host-Native Representation
// =============================================================================

/// Host page permissions for reservations and guest page-table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPerms {
    /// Allow reads.
    pub read: bool,
    /// Allow writes.
    pub write: bool,
    /// Allow execution.
    pub execute: bool,
}

impl HostPerms {
    /// No access.
    pub const NONE: Self = Self {
        read: false,
        write: false,
        execute: false,
    };

    /// Read-only permissions.
    pub const RO: Self = Self {
        read: true,
        write: false,
        execute: false,
    };

    /// Read-write permissions.
    pub const RW: Self = Self {
        read: true,
        write: true,
        execute: false,
    };

    /// Read-execute permissions.
    pub const RX: Self = Self {
        read: true,
        write: false,
        execute: true,
    };

    /// Read-write-execute permissions.
    pub const RWX: Self = Self {
        read: true,
        write: true,
        execute: true,
    };
}

/// Host reservation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostMapFlags {
    /// Memory is shared with other mappings of the same object.
    pub shared: bool,
    /// Memory is fresh and zero-filled rather than file-backed.
    pub anonymous: bool,
}

impl HostMapFlags {
    /// Private anonymous memory.
    pub const PRIVATE_ANON: Self = Self {
        shared: false,
        anonymous: true,
    };

    /// Shared anonymous memory.
    pub const SHARED_ANON: Self = Self {
        shared: true,
        anonymous: true,
    };
}
