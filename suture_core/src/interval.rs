// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change intervals produced by the upstream diff pass.
//!
//! A change interval brackets a sub-range of the drawable list that differs
//! between the previous and current frame. The bracketing drawables
//! ([`drawable_before`](ChangeInterval::drawable_before) and
//! [`drawable_after`](ChangeInterval::drawable_after)) are themselves
//! unchanged and present in both frames; `None` means the interval is open at
//! that end of the list.
//!
//! Intervals of one frame form a singly linked list in paint order. They are
//! pairwise disjoint, and any two of them are separated by at least one
//! unchanged drawable, so only the first interval may be open at the start and
//! only the last one open at the end.

use alloc::vec::Vec;
use core::fmt;

use crate::drawable::DrawableId;

/// A handle to a change interval in a [`ChangeIntervals`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeIntervalId(pub(crate) u32);

impl ChangeIntervalId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ChangeIntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeIntervalId({})", self.0)
    }
}

/// One changed range of the drawable list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeInterval {
    /// The unchanged drawable just before the range, or `None` if the range
    /// starts at the beginning of the list.
    pub drawable_before: Option<DrawableId>,
    /// The unchanged drawable just after the range, or `None` if the range
    /// extends to the end of the list.
    pub drawable_after: Option<DrawableId>,
    /// The next interval in paint order.
    pub next_change_interval: Option<ChangeIntervalId>,
}

/// Per-frame arena of change intervals.
///
/// The upstream diff pass fills the arena for one frame and clears it after
/// the stitch.
#[derive(Clone, Debug, Default)]
pub struct ChangeIntervals {
    intervals: Vec<ChangeInterval>,
}

impl ChangeIntervals {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interval, linking it after the previously pushed one.
    pub fn push(
        &mut self,
        drawable_before: Option<DrawableId>,
        drawable_after: Option<DrawableId>,
    ) -> ChangeIntervalId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "interval count per frame is far below u32::MAX"
        )]
        let id = ChangeIntervalId(self.intervals.len() as u32);
        if let Some(last) = self.intervals.last_mut() {
            last.next_change_interval = Some(id);
        }
        self.intervals.push(ChangeInterval {
            drawable_before,
            drawable_after,
            next_change_interval: None,
        });
        id
    }

    /// Returns the interval behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this arena.
    #[must_use]
    pub fn get(&self, id: ChangeIntervalId) -> &ChangeInterval {
        &self.intervals[id.0 as usize]
    }

    /// Returns the first pushed interval.
    #[must_use]
    pub fn first(&self) -> Option<ChangeIntervalId> {
        (!self.intervals.is_empty()).then_some(ChangeIntervalId(0))
    }

    /// Returns the last pushed interval.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "interval count per frame is far below u32::MAX"
    )]
    pub fn last(&self) -> Option<ChangeIntervalId> {
        self.intervals
            .len()
            .checked_sub(1)
            .map(|i| ChangeIntervalId(i as u32))
    }

    /// Returns the number of intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Returns whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Removes all intervals.
    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// Iterates the linked list from `first` through `last` inclusive.
    #[must_use]
    pub fn iter_from(
        &self,
        first: Option<ChangeIntervalId>,
        last: Option<ChangeIntervalId>,
    ) -> Intervals<'_> {
        Intervals {
            arena: self,
            current: first,
            last,
        }
    }
}

/// An iterator over a linked run of change intervals.
///
/// Created by [`ChangeIntervals::iter_from`].
#[derive(Debug)]
pub struct Intervals<'a> {
    arena: &'a ChangeIntervals,
    current: Option<ChangeIntervalId>,
    last: Option<ChangeIntervalId>,
}

impl Iterator for Intervals<'_> {
    type Item = (ChangeIntervalId, ChangeInterval);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let interval = *self.arena.get(id);
        self.current = if Some(id) == self.last {
            None
        } else {
            interval.next_change_interval
        };
        Some((id, interval))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn push_links_in_order() {
        let mut arena = ChangeIntervals::new();
        let a = arena.push(None, None);
        let b = arena.push(None, None);
        assert_eq!(arena.get(a).next_change_interval, Some(b));
        assert_eq!(arena.get(b).next_change_interval, None);
        assert_eq!(arena.first(), Some(a));
        assert_eq!(arena.last(), Some(b));
    }

    #[test]
    fn iter_from_respects_last() {
        let mut arena = ChangeIntervals::new();
        let a = arena.push(None, None);
        let b = arena.push(None, None);
        arena.push(None, None);
        let ids: Vec<_> = arena.iter_from(Some(a), Some(b)).map(|(id, _)| id).collect();
        assert_eq!(ids, [a, b]);
    }

    #[test]
    fn empty_arena_has_no_ends() {
        let arena = ChangeIntervals::new();
        assert!(arena.is_empty());
        assert_eq!(arena.first(), None);
        assert_eq!(arena.last(), None);
        assert_eq!(arena.iter_from(None, None).count(), 0);
    }
}
