// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable storage with dual-frame links.
//!
//! A *drawable* is one leaf render unit. Drawables form a doubly linked list
//! in back-to-front paint order. Each drawable carries two independent sets
//! of links:
//!
//! - **Current links** ([`next`](DrawableStore::next) /
//!   [`prev`](DrawableStore::prev)) describe the frame being stitched. The
//!   upstream tree rewrites them with [`connect`](DrawableStore::connect) or
//!   [`link_run`](DrawableStore::link_run).
//! - **Old links** ([`old_next`](DrawableStore::old_next) /
//!   [`old_prev`](DrawableStore::old_prev)) describe the previous frame. They
//!   are only updated by [`commit_links`](DrawableStore::commit_links) once a
//!   frame is done, so the stitcher can walk both lists side by side.
//!
//! Drawables are stored in struct-of-arrays layout and addressed by
//! generational [`DrawableId`] handles. The upstream tree creates and destroys
//! them; the stitcher only reads links and records pending block changes.
//!
//! # Pending block changes
//!
//! While stitching, ownership changes are recorded rather than applied:
//!
//! - *addition*: the drawable is inside a change interval and will be
//!   attached to a block;
//! - *removal*: the drawable was inside a change interval in the previous
//!   frame and will be detached from its block;
//! - *move*: the drawable is outside every change interval but must change
//!   blocks because two blocks were glued or one was split.
//!
//! Addition and removal may be combined (the drawable is reassigned). A move
//! is exclusive with both. [`apply_block_changes`](DrawableStore::apply_block_changes)
//! commits the records after the stitch.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::block::BlockId;
use crate::renderer::Renderer;

/// Sentinel value indicating "no drawable" in link fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a drawable in a [`DrawableStore`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a drawable is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawableId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl DrawableId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Rebuilds a handle from its raw parts.
    ///
    /// Intended for decoding recorded diagnostics; the handle is only valid if
    /// the store still holds that generation in that slot.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }
}

impl fmt::Debug for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrawableId({}@gen{})", self.idx, self.generation)
    }
}

/// Pending block-change markers for one drawable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PendingFlags {
    /// The drawable will be attached to its pending block.
    pub addition: bool,
    /// The drawable will be detached from its current block.
    pub removal: bool,
    /// The drawable moves from its current block to its pending block.
    pub moved: bool,
}

impl PendingFlags {
    /// Returns whether any change is pending.
    #[inline]
    #[must_use]
    pub const fn any(self) -> bool {
        self.addition || self.removal || self.moved
    }
}

/// Struct-of-arrays storage for all drawables.
#[derive(Debug)]
pub struct DrawableStore {
    // -- Identity --
    pub(crate) renderer: Vec<Renderer>,
    pub(crate) bounds: Vec<Rect>,

    // -- Current-frame links --
    pub(crate) prev: Vec<u32>,
    pub(crate) next: Vec<u32>,

    // -- Previous-frame links --
    pub(crate) old_prev: Vec<u32>,
    pub(crate) old_next: Vec<u32>,

    // -- Block ownership --
    pub(crate) block: Vec<Option<BlockId>>,
    pub(crate) pending_block: Vec<Option<BlockId>>,
    pub(crate) pending: Vec<PendingFlags>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Frame bookkeeping --
    pub(crate) links_changed: Vec<u32>,
    pub(crate) links_changed_flag: Vec<bool>,
    pub(crate) pending_changed: Vec<u32>,
}

impl Default for DrawableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawableStore {
    /// Creates an empty drawable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            renderer: Vec::new(),
            bounds: Vec::new(),
            prev: Vec::new(),
            next: Vec::new(),
            old_prev: Vec::new(),
            old_next: Vec::new(),
            block: Vec::new(),
            pending_block: Vec::new(),
            pending: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            links_changed: Vec::new(),
            links_changed_flag: Vec::new(),
            pending_changed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new unlinked drawable painted by `renderer`.
    pub fn create_drawable(&mut self, renderer: Renderer, bounds: Rect) -> DrawableId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.renderer[i] = renderer;
            self.bounds[i] = bounds;
            self.prev[i] = INVALID;
            self.next[i] = INVALID;
            self.old_prev[i] = INVALID;
            self.old_next[i] = INVALID;
            self.block[i] = None;
            self.pending_block[i] = None;
            self.pending[i] = PendingFlags::default();
            self.links_changed_flag[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.renderer.push(renderer);
            self.bounds.push(bounds);
            self.prev.push(INVALID);
            self.next.push(INVALID);
            self.old_prev.push(INVALID);
            self.old_next.push(INVALID);
            self.block.push(None);
            self.pending_block.push(None);
            self.pending.push(PendingFlags::default());
            self.links_changed_flag.push(false);
            self.generation.push(0);
            idx
        };

        DrawableId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a drawable, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, if the drawable is still owned by a
    /// block, or if it has pending block changes.
    pub fn destroy_drawable(&mut self, id: DrawableId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.block[i].is_none(),
            "cannot destroy drawable still owned by a block"
        );
        assert!(
            !self.pending[i].any(),
            "cannot destroy drawable with pending block changes"
        );
        self.generation[i] += 1;
        self.prev[i] = INVALID;
        self.next[i] = INVALID;
        self.old_prev[i] = INVALID;
        self.old_next[i] = INVALID;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live drawable.
    #[must_use]
    pub fn is_alive(&self, id: DrawableId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Link API --

    /// Links `a` directly before `b` in the current frame.
    ///
    /// Either side may be `None` to terminate the list at that end.
    pub fn connect(&mut self, a: Option<DrawableId>, b: Option<DrawableId>) {
        if let Some(a) = a {
            self.validate(a);
            self.next[a.idx as usize] = b.map_or(INVALID, |b| b.idx);
            self.note_links_changed(a.idx);
        }
        if let Some(b) = b {
            self.validate(b);
            self.prev[b.idx as usize] = a.map_or(INVALID, |a| a.idx);
            self.note_links_changed(b.idx);
        }
    }

    /// Relinks the current frame so that `order` is a complete list.
    ///
    /// The first entry gets no predecessor and the last no successor.
    pub fn link_run(&mut self, order: &[DrawableId]) {
        let Some((&first, rest)) = order.split_first() else {
            return;
        };
        self.connect(None, Some(first));
        let mut prev = first;
        for &d in rest {
            self.connect(Some(prev), Some(d));
            prev = d;
        }
        self.connect(Some(prev), None);
    }

    /// Unlinks a drawable from the current frame.
    ///
    /// Neighbors are left pointing at it; relink them with
    /// [`connect`](Self::connect) or [`link_run`](Self::link_run).
    pub fn disconnect(&mut self, id: DrawableId) {
        self.validate(id);
        self.prev[id.idx as usize] = INVALID;
        self.next[id.idx as usize] = INVALID;
        self.note_links_changed(id.idx);
    }

    /// Copies current-frame links into the previous-frame links for every
    /// drawable relinked since the last commit.
    ///
    /// Call once per frame after the stitch, so that the next frame diffs
    /// against this one.
    pub fn commit_links(&mut self) {
        for idx in self.links_changed.drain(..) {
            let i = idx as usize;
            self.old_prev[i] = self.prev[i];
            self.old_next[i] = self.next[i];
            self.links_changed_flag[i] = false;
        }
    }

    /// Returns the next drawable in the current frame.
    #[must_use]
    pub fn next(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.handle(self.next[id.idx as usize])
    }

    /// Returns the previous drawable in the current frame.
    #[must_use]
    pub fn prev(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.handle(self.prev[id.idx as usize])
    }

    /// Returns the next drawable in the previous frame.
    #[must_use]
    pub fn old_next(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.handle(self.old_next[id.idx as usize])
    }

    /// Returns the previous drawable in the previous frame.
    #[must_use]
    pub fn old_prev(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.handle(self.old_prev[id.idx as usize])
    }

    /// Returns an iterator over the current frame from `first` through `last`
    /// inclusive.
    ///
    /// Iteration also stops at the end of the list if `last` is never reached.
    #[must_use]
    pub fn run(&self, first: Option<DrawableId>, last: Option<DrawableId>) -> Run<'_> {
        Run {
            store: self,
            current: first,
            last,
        }
    }

    // -- Property API --

    /// Returns the renderer that paints a drawable.
    #[must_use]
    pub fn renderer(&self, id: DrawableId) -> Renderer {
        self.validate(id);
        self.renderer[id.idx as usize]
    }

    /// Returns the layout bounds of a drawable.
    #[must_use]
    pub fn bounds(&self, id: DrawableId) -> Rect {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Sets the layout bounds of a drawable.
    pub fn set_bounds(&mut self, id: DrawableId, bounds: Rect) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
    }

    /// Returns the block that currently owns a drawable.
    #[must_use]
    pub fn block(&self, id: DrawableId) -> Option<BlockId> {
        self.validate(id);
        self.block[id.idx as usize]
    }

    /// Returns the block a drawable is pending attachment to, if any.
    #[must_use]
    pub fn pending_block(&self, id: DrawableId) -> Option<BlockId> {
        self.validate(id);
        self.pending_block[id.idx as usize]
    }

    /// Returns the pending block-change markers of a drawable.
    #[must_use]
    pub fn pending(&self, id: DrawableId) -> PendingFlags {
        self.validate(id);
        self.pending[id.idx as usize]
    }

    /// Returns whether any drawable has unapplied block changes.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.pending_changed.is_empty()
    }

    /// Returns the block a drawable will belong to once pending changes are
    /// applied.
    #[must_use]
    pub fn target_block(&self, id: DrawableId) -> Option<BlockId> {
        self.validate(id);
        let i = id.idx as usize;
        let p = self.pending[i];
        if p.addition || p.moved {
            self.pending_block[i]
        } else if p.removal {
            None
        } else {
            self.block[i]
        }
    }

    // -- Pending block changes --

    /// Records that `id` will be attached to `block`.
    ///
    /// # Panics
    ///
    /// Panics if the drawable already has a pending move.
    pub(crate) fn note_pending_addition(&mut self, id: DrawableId, block: BlockId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            !self.pending[i].moved,
            "pending addition conflicts with a pending move for {id:?}"
        );
        self.note_pending_changed(id.idx);
        self.pending[i].addition = true;
        self.pending_block[i] = Some(block);
    }

    /// Records that `id` will be detached from its block.
    ///
    /// # Panics
    ///
    /// Panics if the drawable already has a pending move.
    pub(crate) fn note_pending_removal(&mut self, id: DrawableId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            !self.pending[i].moved,
            "pending removal conflicts with a pending move for {id:?}"
        );
        self.note_pending_changed(id.idx);
        self.pending[i].removal = true;
    }

    /// Records that `id` moves to `block`.
    ///
    /// # Panics
    ///
    /// Panics if the drawable already has any pending change.
    pub(crate) fn note_pending_move(&mut self, id: DrawableId, block: BlockId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            !self.pending[i].any(),
            "pending move conflicts with an earlier change for {id:?}"
        );
        self.note_pending_changed(id.idx);
        self.pending[i].moved = true;
        self.pending_block[i] = Some(block);
    }

    /// Applies every pending block change recorded during the last stitch.
    ///
    /// Returns the number of drawables whose records were applied.
    pub fn apply_block_changes(&mut self) -> usize {
        let count = self.pending_changed.len();
        for idx in self.pending_changed.drain(..) {
            let i = idx as usize;
            let p = self.pending[i];
            if p.addition || p.moved {
                self.block[i] = self.pending_block[i];
            } else if p.removal {
                self.block[i] = None;
            }
            self.pending[i] = PendingFlags::default();
            self.pending_block[i] = None;
        }
        count
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: DrawableId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale DrawableId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Converts a raw link value into a handle.
    fn handle(&self, idx: u32) -> Option<DrawableId> {
        if idx == INVALID {
            None
        } else {
            Some(DrawableId {
                idx,
                generation: self.generation[idx as usize],
            })
        }
    }

    fn note_links_changed(&mut self, idx: u32) {
        if !self.links_changed_flag[idx as usize] {
            self.links_changed_flag[idx as usize] = true;
            self.links_changed.push(idx);
        }
    }

    fn note_pending_changed(&mut self, idx: u32) {
        if !self.pending[idx as usize].any() {
            self.pending_changed.push(idx);
        }
    }
}

/// An iterator over a run of the current frame.
///
/// Created by [`DrawableStore::run`].
#[derive(Debug)]
pub struct Run<'a> {
    store: &'a DrawableStore,
    current: Option<DrawableId>,
    last: Option<DrawableId>,
}

impl Iterator for Run<'_> {
    type Item = DrawableId;

    fn next(&mut self) -> Option<DrawableId> {
        let id = self.current?;
        self.current = if Some(id) == self.last {
            None
        } else {
            self.store.next(id)
        };
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::block::BlockId;

    fn store_with(n: usize) -> (DrawableStore, Vec<DrawableId>) {
        let mut store = DrawableStore::new();
        let ids = (0..n)
            .map(|_| store.create_drawable(Renderer::Canvas, Rect::ZERO))
            .collect();
        (store, ids)
    }

    #[test]
    fn create_and_destroy() {
        let mut store = DrawableStore::new();
        let id = store.create_drawable(Renderer::Vector, Rect::new(0.0, 0.0, 4.0, 4.0));
        assert!(store.is_alive(id));
        assert_eq!(store.renderer(id), Renderer::Vector);
        store.destroy_drawable(id);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = DrawableStore::new();
        let id1 = store.create_drawable(Renderer::Canvas, Rect::ZERO);
        store.destroy_drawable(id1);
        let id2 = store.create_drawable(Renderer::Gpu, Rect::ZERO);
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    #[should_panic(expected = "stale DrawableId")]
    fn destroyed_handle_panics_on_renderer() {
        let mut store = DrawableStore::new();
        let id = store.create_drawable(Renderer::Canvas, Rect::ZERO);
        store.destroy_drawable(id);
        let _ = store.renderer(id);
    }

    #[test]
    fn link_run_sets_current_links_only() {
        let (mut store, ids) = store_with(3);
        store.link_run(&ids);

        assert_eq!(store.prev(ids[0]), None);
        assert_eq!(store.next(ids[0]), Some(ids[1]));
        assert_eq!(store.next(ids[2]), None);
        assert_eq!(store.old_next(ids[0]), None, "old links untouched");

        let walked: Vec<_> = store.run(Some(ids[0]), Some(ids[2])).collect();
        assert_eq!(walked, ids);
    }

    #[test]
    fn commit_links_copies_into_old_frame() {
        let (mut store, ids) = store_with(3);
        store.link_run(&ids);
        store.commit_links();
        assert_eq!(store.old_next(ids[0]), Some(ids[1]));
        assert_eq!(store.old_prev(ids[2]), Some(ids[1]));

        // Drop the middle drawable from the current frame only.
        store.link_run(&[ids[0], ids[2]]);
        assert_eq!(store.next(ids[0]), Some(ids[2]));
        assert_eq!(store.old_next(ids[0]), Some(ids[1]));
    }

    #[test]
    fn disconnect_leaves_old_links() {
        let (mut store, ids) = store_with(2);
        store.link_run(&ids);
        store.commit_links();
        store.disconnect(ids[1]);
        store.connect(Some(ids[0]), None);
        assert_eq!(store.prev(ids[1]), None);
        assert_eq!(store.next(ids[0]), None);
        assert_eq!(store.old_next(ids[0]), Some(ids[1]));
        store.commit_links();
        assert_eq!(store.old_prev(ids[1]), None);
    }

    #[test]
    fn run_stops_at_last() {
        let (mut store, ids) = store_with(4);
        store.link_run(&ids);
        let walked: Vec<_> = store.run(Some(ids[1]), Some(ids[2])).collect();
        assert_eq!(walked, vec![ids[1], ids[2]]);
        assert_eq!(store.run(None, None).count(), 0);
    }

    #[test]
    fn removal_and_addition_reassign() {
        let (mut store, ids) = store_with(1);
        let a = BlockId::from_raw(0, 0);
        let b = BlockId::from_raw(1, 0);
        store.block[0] = Some(a);

        store.note_pending_removal(ids[0]);
        store.note_pending_addition(ids[0], b);
        assert_eq!(store.target_block(ids[0]), Some(b));
        assert_eq!(store.apply_block_changes(), 1);
        assert_eq!(store.block(ids[0]), Some(b));
        assert!(!store.pending(ids[0]).any());
    }

    #[test]
    fn removal_only_detaches() {
        let (mut store, ids) = store_with(1);
        store.block[0] = Some(BlockId::from_raw(0, 0));
        store.note_pending_removal(ids[0]);
        assert_eq!(store.target_block(ids[0]), None);
        store.apply_block_changes();
        assert_eq!(store.block(ids[0]), None);
    }

    #[test]
    #[should_panic(expected = "pending move conflicts")]
    fn move_after_removal_panics() {
        let (mut store, ids) = store_with(1);
        store.note_pending_removal(ids[0]);
        store.note_pending_move(ids[0], BlockId::from_raw(0, 0));
    }

    #[test]
    #[should_panic(expected = "still owned by a block")]
    fn destroy_owned_drawable_panics() {
        let (mut store, ids) = store_with(1);
        store.block[0] = Some(BlockId::from_raw(0, 0));
        store.destroy_drawable(ids[0]);
    }
}
