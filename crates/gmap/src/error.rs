// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error kinds returned by the address-space manager.
//!
//! Errors fall into two classes:
//!
//! | Class | Kinds | Caller action |
//! |-------|-------|---------------|
//! | Recoverable | `InvalidArgument`, `Unsupported`, `NoSuchMapping` | Translate to a guest errno |
//! | Fatal | `ResourceExhausted`, `InvariantViolation`, `UnrecognizedFlags` | Stop emulating the process |
//!
//! A fatal error poisons the [`MemoryManager`](crate::MemoryManager) that
//! produced it. Whether the guest process is then killed is up to the
//! integration layer.

use core::fmt;

use gmap_abi::errno::{EFAULT, EINVAL, ENOMEM};

/// Error from an address-space operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmError {
    /// Unaligned address, zero length, contradictory flags or an address
    /// range that overflows.
    InvalidArgument(&'static str),
    /// Recognized request that this manager does not implement.
    Unsupported(&'static str),
    /// `munmap` on a range with no live mapping in it.
    NoSuchMapping,
    /// The host allocator or the guest address window is out of space.
    ResourceExhausted(&'static str),
    /// Region bookkeeping disagrees with itself or with the host.
    InvariantViolation(&'static str),
    /// `mmap` flag bits outside the recognized set.
    UnrecognizedFlags(u32),
}

impl MmError {
    /// Returns true if the owning address space must not be used again.
    #[inline]
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted(_) | Self::InvariantViolation(_) | Self::UnrecognizedFlags(_)
        )
    }

    /// Linux errno the syscall layer reports for this error.
    ///
    /// File-backed mappings and unrecognized flags both surface as
    /// `EINVAL`; an empty `munmap` range surfaces as `ENOMEM`.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Unsupported(_) | Self::UnrecognizedFlags(_) => EINVAL,
            Self::NoSuchMapping | Self::ResourceExhausted(_) => ENOMEM,
            Self::InvariantViolation(_) => EFAULT,
        }
    }
}

impl fmt::Display for MmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
            Self::NoSuchMapping => write!(f, "no mapping in range"),
            Self::ResourceExhausted(what) => write!(f, "resource exhausted: {what}"),
            Self::InvariantViolation(what) => write!(f, "invariant violation: {what}"),
            Self::UnrecognizedFlags(bits) => write!(f, "unrecognized mmap flags: {bits:#x}"),
        }
    }
}

impl std::error::Error for MmError {}
