// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocks: native surfaces owning contiguous drawable runs.
//!
//! A block has exactly one [`Renderer`], fixed at creation, and owns the run
//! of drawables from its first to its last drawable in the current frame.
//! Boundaries are updated in two steps:
//!
//! 1. The stitcher writes the *pending* first/last drawable as it discovers
//!    the block's new extent. Several change intervals may touch the same
//!    block, so these writes are tentative.
//! 2. [`update_interval`](Block::update_interval) runs once per touched block
//!    at the end of the stitch, committing the pending pair and calling
//!    [`notify_interval`](Block::notify_interval), which refreshes the
//!    back-end state.
//!
//! Back-end state is a [`BackendState`] with one variant per renderer.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::backbone::BackboneId;
use crate::drawable::{DrawableId, DrawableStore};
use crate::host::SurfaceHandle;
use crate::renderer::Renderer;

/// A handle to a block in a [`Backbone`](crate::backbone::Backbone).
///
/// Generational like [`DrawableId`]: a handle to a released block never
/// aliases a block created later in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl BlockId {
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
    /// Intended for decoding recorded diagnostics.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}@gen{})", self.idx, self.generation)
    }
}

/// Raster surface state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanvasState {
    /// Region the surface must cover: the union of owned drawable bounds.
    pub fit_bounds: Rect,
}

/// Vector-markup state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VectorState {
    /// Number of markup groups, one per owned drawable.
    pub groups: u32,
}

/// Platform element state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementState {
    /// The only drawable this block can ever own.
    pub drawable: DrawableId,
}

/// GPU surface state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GpuState {
    /// Region the surface must cover.
    pub fit_bounds: Rect,
    /// Number of sprites, one per owned drawable.
    pub sprites: u32,
}

/// Per-back-end block state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackendState {
    /// Immediate-mode raster surface.
    Canvas(CanvasState),
    /// Vector-markup tree.
    Vector(VectorState),
    /// Dedicated platform element.
    Element(ElementState),
    /// GPU surface.
    Gpu(GpuState),
}

impl BackendState {
    /// Creates the initial state for a block created for `representative`.
    #[must_use]
    pub fn new(renderer: Renderer, representative: DrawableId) -> Self {
        match renderer {
            Renderer::Canvas => Self::Canvas(CanvasState::default()),
            Renderer::Vector => Self::Vector(VectorState::default()),
            Renderer::Element => Self::Element(ElementState {
                drawable: representative,
            }),
            Renderer::Gpu => Self::Gpu(GpuState::default()),
        }
    }

    /// Returns the renderer this state belongs to.
    #[must_use]
    pub const fn renderer(&self) -> Renderer {
        match self {
            Self::Canvas(_) => Renderer::Canvas,
            Self::Vector(_) => Renderer::Vector,
            Self::Element(_) => Renderer::Element,
            Self::Gpu(_) => Renderer::Gpu,
        }
    }

    /// Refreshes the state for a new drawable range.
    fn notify_interval(&mut self, first: DrawableId, last: DrawableId, count: u32, bounds: Rect) {
        match self {
            Self::Canvas(state) => state.fit_bounds = bounds,
            Self::Vector(state) => state.groups = count,
            Self::Element(state) => assert!(
                first == state.drawable && last == state.drawable,
                "element block for {:?} cannot own {first:?}..{last:?}",
                state.drawable
            ),
            Self::Gpu(state) => {
                state.fit_bounds = bounds;
                state.sprites = count;
            }
        }
    }
}

/// A native surface owning a contiguous drawable run of one renderer.
#[derive(Clone, Debug)]
pub struct Block {
    pub(crate) renderer: Renderer,
    pub(crate) surface: SurfaceHandle,
    pub(crate) backbone: Option<BackboneId>,

    // -- Committed and pending interval --
    pub(crate) first_drawable: Option<DrawableId>,
    pub(crate) last_drawable: Option<DrawableId>,
    pub(crate) pending_first_drawable: Option<DrawableId>,
    pub(crate) pending_last_drawable: Option<DrawableId>,

    // -- Lifecycle --
    pub(crate) disposed: bool,
    pub(crate) index: u32,

    // -- Derived from the committed interval --
    pub(crate) bounds: Rect,
    pub(crate) drawable_count: u32,
    pub(crate) interval_updates: u64,
    pub(crate) state: BackendState,
}

impl Block {
    /// Creates a live block with an empty interval.
    pub(crate) fn new(renderer: Renderer, surface: SurfaceHandle, representative: DrawableId) -> Self {
        Self {
            renderer,
            surface,
            backbone: None,
            first_drawable: None,
            last_drawable: None,
            pending_first_drawable: None,
            pending_last_drawable: None,
            disposed: false,
            index: 0,
            bounds: Rect::ZERO,
            drawable_count: 0,
            interval_updates: 0,
            state: BackendState::new(renderer, representative),
        }
    }

    /// Returns the renderer of this block.
    #[must_use]
    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    /// Returns the native surface of this block.
    #[must_use]
    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    /// Returns whether this block owns its surface.
    ///
    /// Element blocks borrow the element of their drawable, which outlives
    /// the block.
    #[must_use]
    pub fn owns_surface(&self) -> bool {
        self.renderer.is_shareable()
    }

    /// Returns the backbone this block is bound to.
    #[must_use]
    pub fn backbone(&self) -> Option<BackboneId> {
        self.backbone
    }

    /// Returns the committed first drawable.
    #[must_use]
    pub fn first_drawable(&self) -> Option<DrawableId> {
        self.first_drawable
    }

    /// Returns the committed last drawable.
    #[must_use]
    pub fn last_drawable(&self) -> Option<DrawableId> {
        self.last_drawable
    }

    /// Returns the tentative first drawable written during a stitch.
    #[must_use]
    pub fn pending_first_drawable(&self) -> Option<DrawableId> {
        self.pending_first_drawable
    }

    /// Returns the tentative last drawable written during a stitch.
    #[must_use]
    pub fn pending_last_drawable(&self) -> Option<DrawableId> {
        self.pending_last_drawable
    }

    /// Returns whether the block is live (created and not disposed).
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.disposed
    }

    /// Returns whether the block was marked for disposal.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns the position of the block in its backbone after the last
    /// reindex.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the union of the owned drawables' bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Returns the number of owned drawables.
    #[must_use]
    pub fn drawable_count(&self) -> u32 {
        self.drawable_count
    }

    /// Returns how many times the interval has been notified over the
    /// block's lifetime.
    #[must_use]
    pub fn interval_updates(&self) -> u64 {
        self.interval_updates
    }

    /// Returns the back-end state.
    #[must_use]
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Binds the block to a backbone.
    pub fn set_block_backbone(&mut self, backbone: BackboneId) {
        self.backbone = Some(backbone);
    }

    /// Immediately sets the block's interval and refreshes its back-end
    /// state.
    ///
    /// Walks the range once in the current frame to recompute the drawable
    /// count and bounds.
    ///
    /// # Panics
    ///
    /// Panics if `last` is not reachable from `first`, or if an element
    /// block is given any range other than its own drawable.
    pub fn notify_interval(&mut self, drawables: &DrawableStore, first: DrawableId, last: DrawableId) {
        let mut count = 0_u32;
        let mut bounds: Option<Rect> = None;
        let mut reached_last = false;
        for d in drawables.run(Some(first), Some(last)) {
            count += 1;
            let b = drawables.bounds(d);
            bounds = Some(bounds.map_or(b, |u| u.union(b)));
            reached_last = d == last;
        }
        assert!(
            reached_last,
            "{last:?} is not reachable from {first:?} in the current frame"
        );

        self.first_drawable = Some(first);
        self.last_drawable = Some(last);
        self.pending_first_drawable = Some(first);
        self.pending_last_drawable = Some(last);
        self.drawable_count = count;
        self.bounds = bounds.unwrap_or(Rect::ZERO);
        self.interval_updates += 1;
        self.state.notify_interval(first, last, count, self.bounds);
    }

    /// Commits the pending interval written during the stitch.
    ///
    /// # Panics
    ///
    /// Panics if either pending boundary is missing.
    pub fn update_interval(&mut self, drawables: &DrawableStore) {
        let (Some(first), Some(last)) = (self.pending_first_drawable, self.pending_last_drawable)
        else {
            panic!(
                "block has no pending interval: {:?}..{:?}",
                self.pending_first_drawable, self.pending_last_drawable
            );
        };
        self.notify_interval(drawables, first, last);
    }

    /// Flags the block as disposed.
    ///
    /// The surface stays valid until the display layer releases it.
    pub fn mark_for_disposal(&mut self) {
        self.disposed = true;
        self.pending_first_drawable = None;
        self.pending_last_drawable = None;
    }
}

/// Generational slot arena for blocks.
#[derive(Clone, Debug, Default)]
pub(crate) struct BlockStore {
    slots: Vec<Option<Block>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
}

impl BlockStore {
    pub(crate) fn insert(&mut self, block: Block) -> BlockId {
        if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.slots[idx as usize] = Some(block);
            BlockId {
                idx,
                generation: self.generation[idx as usize],
            }
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "block count is far below u32::MAX"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Some(block));
            self.generation.push(0);
            BlockId { idx, generation: 0 }
        }
    }

    /// Frees the slot behind `id`, returning the block.
    pub(crate) fn remove(&mut self, id: BlockId) -> Block {
        self.validate(id);
        self.free_list.push(id.idx);
        self.slots[id.idx as usize]
            .take()
            .unwrap_or_else(|| unreachable!("validated slot is occupied"))
    }

    pub(crate) fn contains(&self, id: BlockId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    pub(crate) fn get(&self, id: BlockId) -> &Block {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_ref()
            .unwrap_or_else(|| unreachable!("validated slot is occupied"))
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> &mut Block {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_mut()
            .unwrap_or_else(|| unreachable!("validated slot is occupied"))
    }

    /// Returns the handle for an occupied raw slot.
    pub(crate) fn id_at(&self, idx: u32) -> Option<BlockId> {
        self.slots
            .get(idx as usize)
            .and_then(Option::as_ref)
            .map(|_| BlockId {
                idx,
                generation: self.generation[idx as usize],
            })
    }

    /// Returns the number of slots ever allocated.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: BlockId) {
        assert!(self.contains(id), "stale BlockId: {id:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_run(renderer: Renderer, n: usize) -> (DrawableStore, alloc::vec::Vec<DrawableId>) {
        let mut store = DrawableStore::new();
        let ids: alloc::vec::Vec<_> = (0..n)
            .map(|i| {
                let x = i as f64 * 10.0;
                store.create_drawable(renderer, Rect::new(x, 0.0, x + 5.0, 5.0))
            })
            .collect();
        store.link_run(&ids);
        (store, ids)
    }

    #[test]
    fn notify_interval_updates_derived_state() {
        let (drawables, ids) = store_with_run(Renderer::Gpu, 3);
        let mut block = Block::new(Renderer::Gpu, SurfaceHandle(1), ids[0]);
        block.notify_interval(&drawables, ids[0], ids[2]);

        assert_eq!(block.first_drawable(), Some(ids[0]));
        assert_eq!(block.last_drawable(), Some(ids[2]));
        assert_eq!(block.drawable_count(), 3);
        assert_eq!(block.bounds(), Rect::new(0.0, 0.0, 25.0, 5.0));
        assert_eq!(
            block.state(),
            &BackendState::Gpu(GpuState {
                fit_bounds: Rect::new(0.0, 0.0, 25.0, 5.0),
                sprites: 3,
            })
        );
        assert_eq!(block.interval_updates(), 1);
    }

    #[test]
    fn update_interval_commits_pending() {
        let (drawables, ids) = store_with_run(Renderer::Vector, 3);
        let mut block = Block::new(Renderer::Vector, SurfaceHandle(1), ids[0]);
        block.pending_first_drawable = Some(ids[1]);
        block.pending_last_drawable = Some(ids[2]);
        block.update_interval(&drawables);
        assert_eq!(block.first_drawable(), Some(ids[1]));
        assert_eq!(
            block.state(),
            &BackendState::Vector(VectorState { groups: 2 })
        );
    }

    #[test]
    #[should_panic(expected = "block has no pending interval")]
    fn update_without_pending_panics() {
        let (drawables, ids) = store_with_run(Renderer::Canvas, 1);
        let mut block = Block::new(Renderer::Canvas, SurfaceHandle(1), ids[0]);
        block.update_interval(&drawables);
    }

    #[test]
    #[should_panic(expected = "element block for")]
    fn element_block_rejects_foreign_range() {
        let (drawables, ids) = store_with_run(Renderer::Element, 2);
        let mut block = Block::new(Renderer::Element, SurfaceHandle(1), ids[0]);
        block.notify_interval(&drawables, ids[0], ids[1]);
    }

    #[test]
    fn store_recycles_slots_with_new_generation() {
        let mut store = BlockStore::default();
        let a = store.insert(Block::new(
            Renderer::Canvas,
            SurfaceHandle(1),
            DrawableId::from_raw(0, 0),
        ));
        store.remove(a);
        let b = store.insert(Block::new(
            Renderer::Canvas,
            SurfaceHandle(2),
            DrawableId::from_raw(0, 0),
        ));
        assert_eq!(a.index(), b.index());
        assert!(!store.contains(a));
        assert!(store.contains(b));
        assert_eq!(store.get(b).surface(), SurfaceHandle(2));
    }
}
