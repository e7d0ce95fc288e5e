// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Poisoning and teardown through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{anon, check_consistency, fixed, manager};
use gmap::{AddressSpaceConfig, GuestAddr, MemoryManager, MmError, MockHost, PAGE_SIZE};

#[test]
fn host_exhaustion_poisons_manager() {
    let mm = MemoryManager::new(MockHost::with_budget(4 * PAGE_SIZE), MockHost::new());
    let addr = mm.map(&anon(4 * PAGE_SIZE)).unwrap();

    let cause = mm.map(&anon(PAGE_SIZE)).unwrap_err();
    assert!(matches!(cause, MmError::ResourceExhausted(_)));
    assert!(cause.is_fatal());
    assert_eq!(mm.poison_cause(), Some(cause));

    // Nothing runs any more, not even a valid unmap
    assert_eq!(mm.unmap(addr, PAGE_SIZE), Err(cause));
    mm.inspect(|space, _, _| assert_eq!(space.directory().len(), 1));
}

#[test]
fn install_failure_poisons_manager() {
    let mm = manager();
    mm.map(&fixed(0x1000, PAGE_SIZE)).unwrap();

    // Hand the hosts to a fresh manager whose next install fails
    let (_, alloc, mut pt) = mm.into_parts();
    pt.fail_next_install();
    let mm = MemoryManager::new(alloc, pt);

    let cause = mm.map(&fixed(0x8000, PAGE_SIZE)).unwrap_err();
    assert!(matches!(cause, MmError::InvariantViolation(_)));
    assert!(mm.is_poisoned());
}

#[test]
fn cursor_window_exhaustion_is_fatal() {
    let config =
        AddressSpaceConfig::with_limit(GuestAddr::new(0x40_0000), GuestAddr::new(0x40_4000))
            .unwrap();
    let mm = MemoryManager::with_config(config, MockHost::new(), MockHost::new());
    mm.map(&anon(4 * PAGE_SIZE)).unwrap();

    let cause = mm.map(&anon(PAGE_SIZE)).unwrap_err();
    assert!(matches!(cause, MmError::ResourceExhausted(_)));
    assert!(mm.is_poisoned());
}

#[test]
fn teardown_after_mixed_operations() {
    let mm = manager();
    let a = mm.map(&anon(0x4000)).unwrap();
    mm.map(&fixed(0x1000, 0x3000)).unwrap();
    mm.map(&fixed(0x2000, 0x1000)).unwrap();
    mm.unmap(a.add(0x1000), 0x1000).unwrap();
    check_consistency(&mm).unwrap();

    mm.teardown().unwrap();

    assert!(mm.regions().unwrap().is_empty());
    mm.inspect(|_, alloc, pt| {
        assert_eq!(alloc.live_host_bytes(), 0);
        assert_eq!(alloc.live_reservations(), 0);
        assert_eq!(pt.installed_pages(), 0);
    });

    // The space stays usable after teardown
    mm.map(&anon(PAGE_SIZE)).unwrap();
}

#[test]
fn recoverable_errors_keep_manager_usable() {
    let mm = manager();
    assert_eq!(
        mm.unmap(GuestAddr::new(0x1000), PAGE_SIZE),
        Err(MmError::NoSuchMapping)
    );
    assert!(matches!(
        mm.map(&anon(0)),
        Err(MmError::InvalidArgument(_))
    ));
    assert!(mm.poison_cause().is_none());
    mm.map(&anon(PAGE_SIZE)).unwrap();
}

#[test]
fn version_is_package_version() {
    assert_eq!(gmap::VERSION, env!("CARGO_PKG_VERSION"));
}
