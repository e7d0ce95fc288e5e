// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Linux errno values returned to the guest by `mmap`/`munmap`.
//!
//! Only the values the address-space manager can produce are listed.
//! Syscalls return the negated value.

/// Bad address.
pub const EFAULT: i32 = 14;

/// Invalid argument.
pub const EINVAL: i32 = 22;

/// Out of memory, or no mapping in the `munmap` range.
pub const ENOMEM: i32 = 12;
