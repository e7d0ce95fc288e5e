// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property tests for address-space invariants.
//!
//! Random sequences of anonymous maps, fixed maps and unmaps are replayed
//! against an address space and against a page-set model. After every
//! step the directory must match the model exactly and agree with the
//! mock host on live bytes, installed pages and translations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use super::space_test::Fixture;
use super::*;
use gmap_abi::{MMAP_BASE, PAGE_SIZE};
use proptest::prelude::*;

/// Fixed maps and unmaps land in this window or in the one at the cursor
/// start, where they collide with anonymous maps.
const WINDOW_BASE: u64 = 0x10_0000;
const WINDOW_PAGES: u64 = 48;

#[derive(Clone, Debug)]
enum Op {
    Anon { len: u64 },
    Fixed { addr: u64, pages: u64 },
    Unmap { addr: u64, len: u64 },
}

fn arb_addr() -> impl Strategy<Value = u64> {
    (prop_oneof![Just(WINDOW_BASE), Just(MMAP_BASE)], 0..WINDOW_PAGES)
        .prop_map(|(window, page)| window + page * PAGE_SIZE)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=0x5000).prop_map(|len| Op::Anon { len }),
        (arb_addr(), 1u64..=8).prop_map(|(addr, pages)| Op::Fixed { addr, pages }),
        (arb_addr(), 1u64..=0xA000).prop_map(|(addr, len)| Op::Unmap { addr, len }),
    ]
}

fn page_addr(page: u64) -> u64 {
    WINDOW_BASE + page * PAGE_SIZE
}

fn pages_of(base: u64, len: u64) -> impl Iterator<Item = u64> {
    let rounded = len.div_ceil(PAGE_SIZE) * PAGE_SIZE;
    (base..base + rounded).step_by(PAGE_SIZE as usize)
}

fn directory_pages(fx: &Fixture) -> BTreeSet<u64> {
    fx.space
        .regions()
        .iter()
        .flat_map(|r| pages_of(r.base.as_u64(), r.len))
        .collect()
}

proptest! {
    #[test]
    fn directory_matches_page_model(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut fx = Fixture::new();
        let mut model = BTreeSet::new();
        let mut cursor = fx.space.cursor().position();

        for op in ops {
            match op {
                Op::Anon { len } => {
                    let base = fx.map(MapRequest::anonymous(len, Protection::READ)).unwrap();
                    prop_assert!(base >= cursor);
                    prop_assert!(base.is_page_aligned());
                    model.extend(pages_of(base.as_u64(), len));
                }
                Op::Fixed { addr, pages } => {
                    let len = pages * PAGE_SIZE;
                    let base = fx
                        .map(MapRequest::fixed(GuestAddr::new(addr), len, Protection::all()))
                        .unwrap();
                    prop_assert_eq!(base.as_u64(), addr);
                    model.extend(pages_of(addr, len));
                }
                Op::Unmap { addr, len } => {
                    let hit = pages_of(addr, len).any(|p| model.contains(&p));
                    let before = fx.spans();
                    let result = fx.unmap(addr, len);
                    if hit {
                        prop_assert_eq!(result, Ok(()));
                        for p in pages_of(addr, len) {
                            model.remove(&p);
                        }
                    } else {
                        prop_assert_eq!(result, Err(MmError::NoSuchMapping));
                        prop_assert_eq!(fx.spans(), before);
                    }
                }
            }

            prop_assert!(fx.space.cursor().position() >= cursor);
            cursor = fx.space.cursor().position();
            prop_assert_eq!(directory_pages(&fx), model.clone());
            fx.assert_consistent();
        }
    }

    #[test]
    fn split_by_unmap_partitions_host_backing(
        pages in 3u64..16,
        hole_start in 1u64..15,
        hole_pages in 1u64..4,
    ) {
        prop_assume!(hole_start + hole_pages < pages);

        let mut fx = Fixture::new();
        fx.map_fixed(WINDOW_BASE, pages * PAGE_SIZE).unwrap();
        let original = fx.space.lookup(GuestAddr::new(WINDOW_BASE)).unwrap();

        fx.unmap(page_addr(hole_start), hole_pages * PAGE_SIZE).unwrap();

        let regions = fx.space.regions();
        prop_assert_eq!(regions.len(), 2);
        let (left, right) = (regions[0], regions[1]);
        prop_assert_eq!(left.len + hole_pages * PAGE_SIZE + right.len, original.len);
        prop_assert_eq!(left.host_ptr, original.host_ptr);
        prop_assert_eq!(
            right.host_ptr,
            original.host_ptr.add(right.base.diff(original.base))
        );
        prop_assert_eq!(left.host_handle, right.host_handle);
        prop_assert_eq!(
            fx.alloc.live_host_bytes(),
            original.len - hole_pages * PAGE_SIZE
        );
        fx.assert_consistent();
    }
}
