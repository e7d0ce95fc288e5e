// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Serialized per-process memory manager.
//!
//! [`MemoryManager`] owns an [`AddressSpace`] together with the host
//! capabilities that back it, behind one mutex. Every operation holds the
//! lock for its whole duration, host calls included, so concurrent guest
//! threads observe `mmap`/`munmap` as atomic.
//!
//! # Poisoning
//!
//! The first fatal error (see [`MmError::is_fatal`]) is recorded. From
//! then on every operation returns that error without touching the
//! address space. Recoverable errors leave the manager usable.


use parking_lot::Mutex;

use crate::config::AddressSpaceConfig;
use crate::host::{HostAllocator, PageTableInstaller};
use crate::region::RegionInfo;
use crate::space::{AddressSpace, MapRequest};
use crate::MmError;
use gmap_abi::GuestAddr;

/// State guarded by the manager lock.
struct Inner<A, P> {
    space: AddressSpace,
    allocator: A,
    installer: P,
    poisoned: Option<MmError>,
}

/// Address-space manager for one emulated process.
///
/// `MemoryManager` is `Send + Sync` when both capabilities are `Send`.
pub struct MemoryManager<A, P> {
    inner: Mutex<Inner<A, P>>,
}

impl<A, P> MemoryManager<A, P>
where
    A: HostAllocator,
    P: PageTableInstaller,
{
    /// Creates a manager with the default mmap window.
    pub fn new(allocator: A, installer: P) -> Self {
        Self::with_config(AddressSpaceConfig::default(), allocator, installer)
    }

    /// Creates a manager with an explicit configuration.
    pub fn with_config(config: AddressSpaceConfig, allocator: A, installer: P) -> Self {
        tracing::debug!(
            mmap_base = %config.mmap_base(),
            mmap_limit = %config.mmap_limit(),
            "address space created"
        );
        Self {
            inner: Mutex::new(Inner {
                space: AddressSpace::new(&config),
                allocator,
                installer,
                poisoned: None,
            }),
        }
    }

    /// Handles `mmap`. See [`AddressSpace::map`].
    pub fn map(&self, request: &MapRequest) -> Result<GuestAddr, MmError> {
        self.run(|inner| {
            inner
                .space
                .map(&mut inner.allocator, &mut inner.installer, request)
        })
    }

    /// Handles `munmap`. See [`AddressSpace::unmap`].
    pub fn unmap(&self, addr: GuestAddr, length: u64) -> Result<(), MmError> {
        self.run(|inner| {
            inner
                .space
                .unmap(&mut inner.allocator, &mut inner.installer, addr, length)
        })
    }

    /// Returns the region containing `addr`, if any.
    pub fn lookup(&self, addr: GuestAddr) -> Result<Option<RegionInfo>, MmError> {
        self.run(|inner| Ok(inner.space.lookup(addr)))
    }

    /// Returns every live region in address order.
    pub fn regions(&self) -> Result<Vec<RegionInfo>, MmError> {
        self.run(|inner| Ok(inner.space.regions()))
    }

    /// Returns the next address the mmap cursor will hand out.
    pub fn mmap_cursor(&self) -> Result<GuestAddr, MmError> {
        self.run(|inner| Ok(inner.space.cursor().position()))
    }

    /// Releases every region. Called when the process exits.
    pub fn teardown(&self) -> Result<(), MmError> {
        self.run(|inner| {
            inner
                .space
                .teardown(&mut inner.allocator, &mut inner.installer)
        })
    }

    /// The fatal error that poisoned the manager, if any.
    #[must_use]
    pub fn poison_cause(&self) -> Option<MmError> {
        self.inner.lock().poisoned
    }

    /// Returns true once a fatal error has been recorded.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poison_cause().is_some()
    }

    /// Runs `f` on the address space and both capabilities under the lock.
    ///
    /// Read-only access for diagnostics; works on a poisoned manager.
    pub fn inspect<R>(&self, f: impl FnOnce(&AddressSpace, &A, &P) -> R) -> R {
        let inner = self.inner.lock();
        f(&inner.space, &inner.allocator, &inner.installer)
    }

    /// Consumes the manager, returning its parts.
    pub fn into_parts(self) -> (AddressSpace, A, P) {
        let inner = self.inner.into_inner();
        (inner.space, inner.allocator, inner.installer)
    }

    /// Runs `op` under the lock unless poisoned, recording fatal errors.
    fn run<T>(
        &self,
        op: impl FnOnce(&mut Inner<A, P>) -> Result<T, MmError>,
    ) -> Result<T, MmError> {
        let mut inner = self.inner.lock();
        if let Some(cause) = inner.poisoned {
            return Err(cause);
        }

        let result = op(&mut *inner);
        if let Err(err) = &result {
            if err.is_fatal() {
                tracing::error!(%err, "address space poisoned");
                inner.poisoned = Some(*err);
            }
        }
        result
    }
}
