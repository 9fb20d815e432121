// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stitch session state and primitives.
//!
//! The primitives here are the only places a stitch mutates the backbone,
//! the drawable store or the host. The algorithm in `algorithm.rs` composes
//! them; they are public so integrations can drive a custom pass.

use crate::backbone::Backbone;
use crate::block::{Block, BlockId};
use crate::drawable::{DrawableId, DrawableStore};
use crate::host::{self, SurfaceHost};
use crate::interval::ChangeIntervals;
use crate::renderer::Renderer;
use crate::trace::{
    BlockCreatedEvent, BlockDisposedEvent, IntervalUpdatedEvent, PendingAdditionEvent,
    PendingRemovalEvent, ReindexEvent, StitchBeginEvent, StitchSummary, Tracer,
};

use super::{BlockFlags, Scratch, StitchFrame};

/// One reconciliation pass over a backbone.
///
/// Created by [`Stitcher::begin`](super::Stitcher::begin). Dropping the
/// session releases its per-stitch state.
pub struct Stitch<'a, 't> {
    pub(super) scratch: &'a mut Scratch,
    pub(super) backbone: &'a mut Backbone,
    pub(super) drawables: &'a mut DrawableStore,
    pub(super) host: &'a mut dyn SurfaceHost,
    pub(super) intervals: &'a ChangeIntervals,
    pub(super) tracer: &'a mut Tracer<'t>,
    pub(super) frame: StitchFrame,
    pub(super) old_first_drawable: Option<DrawableId>,
    pub(super) old_last_drawable: Option<DrawableId>,
    pub(super) order_dirty: bool,
    pub(super) boundaries_recorded: bool,
    pub(super) summary: StitchSummary,
}

impl core::fmt::Debug for Stitch<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stitch")
            .field("backbone", &self.backbone.id())
            .field("frame", &self.frame)
            .field("order_dirty", &self.order_dirty)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<'a, 't> Stitch<'a, 't> {
    #[expect(
        clippy::too_many_arguments,
        reason = "a session borrows every collaborator of the pass"
    )]
    pub(super) fn new(
        scratch: &'a mut Scratch,
        stitch_index: u64,
        backbone: &'a mut Backbone,
        drawables: &'a mut DrawableStore,
        host: &'a mut dyn SurfaceHost,
        intervals: &'a ChangeIntervals,
        tracer: &'a mut Tracer<'t>,
        frame: StitchFrame,
    ) -> Self {
        Self {
            scratch,
            old_first_drawable: backbone.previous_first_drawable(),
            old_last_drawable: backbone.previous_last_drawable(),
            backbone,
            drawables,
            host,
            intervals,
            tracer,
            frame,
            order_dirty: false,
            boundaries_recorded: false,
            summary: StitchSummary {
                stitch_index,
                ..StitchSummary::default()
            },
        }
    }
}

impl Stitch<'_, '_> {
    // ---- lifecycle ----

    /// Checks the frame preconditions and resets per-stitch state.
    ///
    /// # Panics
    ///
    /// Panics if there is no change interval, if a boundary drawable of
    /// either frame has a neighbor beyond it, or if pending drawable changes
    /// from an earlier stitch were never applied.
    pub(super) fn initialize(&mut self) {
        let frame = self.frame;
        assert!(
            frame.first_change_interval.is_some(),
            "stitch requires at least one change interval"
        );
        if let Some(first) = frame.first_drawable {
            assert!(
                self.drawables.prev(first).is_none(),
                "first drawable {first:?} has a predecessor"
            );
        }
        if let Some(last) = frame.last_drawable {
            assert!(
                self.drawables.next(last).is_none(),
                "last drawable {last:?} has a successor"
            );
        }
        if let Some(old_first) = self.old_first_drawable {
            assert!(
                self.drawables.old_prev(old_first).is_none(),
                "previous first drawable {old_first:?} has a predecessor"
            );
        }
        if let Some(old_last) = self.old_last_drawable {
            assert!(
                self.drawables.old_next(old_last).is_none(),
                "previous last drawable {old_last:?} has a successor"
            );
        }
        assert!(
            !self.drawables.has_pending_changes(),
            "drawable changes from an earlier stitch were never applied"
        );

        self.scratch.clear();
        self.scratch
            .flags
            .resize(self.backbone.store.slot_count(), BlockFlags::default());

        #[expect(
            clippy::cast_possible_truncation,
            reason = "interval and block counts are far below u32::MAX"
        )]
        let begin = StitchBeginEvent {
            stitch_index: self.summary.stitch_index,
            backbone: self.backbone.id(),
            intervals: self
                .intervals
                .iter_from(frame.first_change_interval, frame.last_change_interval)
                .count() as u32,
            blocks_before: self.backbone.len() as u32,
        };
        self.summary.intervals = begin.intervals;
        self.tracer.stitch_begin(&begin);
    }

    /// Releases per-stitch state so nothing leaks into the next stitch.
    fn clean(&mut self) {
        self.scratch.clear();
    }

    // ---- pending drawable changes ----

    /// Records that `drawable` will be attached to `block`.
    ///
    /// # Panics
    ///
    /// Panics if the renderers differ, or if the drawable has a pending move.
    pub fn note_pending_addition(&mut self, drawable: DrawableId, block: BlockId) {
        self.assert_renderer_matches(drawable, block);
        self.drawables.note_pending_addition(drawable, block);
        self.flags(block).received = true;
        self.summary.additions += 1;
        self.tracer.pending_addition(&PendingAdditionEvent {
            stitch_index: self.summary.stitch_index,
            drawable,
            block,
        });
    }

    /// Records that `drawable` will be detached from its block.
    ///
    /// # Panics
    ///
    /// Panics if the drawable has no block, or if it has a pending move.
    pub fn note_pending_removal(&mut self, drawable: DrawableId) {
        let Some(block) = self.drawables.block(drawable) else {
            panic!("{drawable:?} has no block to leave");
        };
        self.drawables.note_pending_removal(drawable);
        self.summary.removals += 1;
        self.tracer.pending_removal(&PendingRemovalEvent {
            stitch_index: self.summary.stitch_index,
            drawable,
            block,
        });
    }

    /// Records that an unchanged `drawable` moves into `block`.
    ///
    /// # Panics
    ///
    /// Panics if the renderers differ, or if the drawable already has a
    /// pending change.
    pub fn note_pending_move(&mut self, drawable: DrawableId, block: BlockId) {
        self.assert_renderer_matches(drawable, block);
        #[cfg(feature = "trace-rich")]
        let from = self.drawables.block(drawable);
        self.drawables.note_pending_move(drawable, block);
        self.flags(block).received = true;
        self.summary.moves += 1;
        #[cfg(feature = "trace-rich")]
        self.tracer.pending_move(&crate::trace::PendingMoveEvent {
            stitch_index: self.summary.stitch_index,
            drawable,
            from,
            to: block,
        });
    }

    fn assert_renderer_matches(&self, drawable: DrawableId, block: BlockId) {
        let drawable_renderer = self.drawables.renderer(drawable);
        let block_renderer = self.backbone.block(block).renderer();
        assert!(
            drawable_renderer == block_renderer,
            "renderer mismatch: {drawable:?} is {drawable_renderer:?} but {block:?} is {block_renderer:?}"
        );
    }

    // ---- block lifecycle ----

    /// Creates a block for `renderer`, attaches its surface to the backbone
    /// container and claims it for this stitch.
    ///
    /// # Panics
    ///
    /// Panics if the host does not support `renderer`.
    pub fn create_block(&mut self, renderer: Renderer, representative: DrawableId) -> BlockId {
        let Some(surface) = host::create_surface(&mut *self.host, renderer, representative) else {
            panic!("unsupported renderer {renderer:?}: the surface host cannot create it");
        };
        let id = self
            .backbone
            .insert_block(Block::new(renderer, surface, representative));
        let backbone_id = self.backbone.id();
        self.backbone.block_mut(id).set_block_backbone(backbone_id);
        self.host.append_child(self.backbone.container(), surface);

        self.claim(id);
        self.order_dirty = true;
        self.summary.blocks_created += 1;
        self.tracer.block_created(&BlockCreatedEvent {
            stitch_index: self.summary.stitch_index,
            block: id,
            renderer,
            surface,
            representative,
            #[cfg(feature = "trace-rich")]
            bounds: self.drawables.bounds(representative),
        });
        id
    }

    /// Detaches a block's surface, removes the block from the array and
    /// queues it for release.
    ///
    /// The surface is only detached if it is still a child of this
    /// backbone's container and no other live block presents it.
    ///
    /// # Panics
    ///
    /// Panics if the block was already disposed.
    pub fn mark_block_for_disposal(&mut self, id: BlockId) {
        let block = self.backbone.block(id);
        assert!(!block.is_disposed(), "{id:?} is already disposed");
        let renderer = block.renderer();
        let surface = block.surface();
        let container = self.backbone.container();

        // Only element surfaces can be presented by more than one block.
        let shared = !renderer.is_shareable()
            && self
                .backbone
                .blocks()
                .iter()
                .any(|&other| other != id && self.backbone.block(other).surface() == surface);
        if !shared && self.host.parent_of(surface) == Some(container) {
            self.host.remove_child(container, surface);
        }

        self.remove_block(id);
        self.backbone.dispose(id);
        self.summary.blocks_disposed += 1;
        self.tracer.block_disposed(&BlockDisposedEvent {
            stitch_index: self.summary.stitch_index,
            block: id,
            renderer,
            surface,
        });
    }

    // ---- block array ----

    /// Appends a block to the backbone's array.
    pub fn append_block(&mut self, id: BlockId) {
        self.backbone.blocks.push(id);
        self.order_dirty = true;
    }

    /// Removes a block from the backbone's array.
    pub fn remove_block(&mut self, id: BlockId) {
        let before = self.backbone.blocks.len();
        self.backbone.blocks.retain(|&b| b != id);
        if self.backbone.blocks.len() != before {
            self.order_dirty = true;
        }
    }

    /// Empties the backbone's array.
    pub fn use_no_blocks(&mut self) {
        if !self.backbone.blocks.is_empty() {
            self.backbone.blocks.clear();
            self.order_dirty = true;
        }
    }

    /// Reorders native surfaces and refreshes block indices, if the array
    /// changed since the last reindex.
    pub fn reindex(&mut self) {
        if !self.order_dirty {
            return;
        }
        self.backbone.reindex_blocks(&mut *self.host);
        self.order_dirty = false;
        self.summary.reindexed = true;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "block count is far below u32::MAX"
        )]
        let blocks = self.backbone.len() as u32;
        self.tracer.reindex(&ReindexEvent {
            stitch_index: self.summary.stitch_index,
            blocks,
        });
    }

    // ---- boundaries ----

    /// Tentatively sets the first drawable of `block`.
    pub fn mark_before_block(&mut self, block: BlockId, first: DrawableId) {
        self.touch(block);
        self.backbone.block_mut(block).pending_first_drawable = Some(first);
    }

    /// Tentatively sets the last drawable of `block`.
    pub fn mark_after_block(&mut self, block: BlockId, last: DrawableId) {
        self.touch(block);
        self.backbone.block_mut(block).pending_last_drawable = Some(last);
    }

    /// Commits the pending interval of every touched live block, exactly once
    /// per block, and schedules each for repaint.
    pub fn update_block_intervals(&mut self) {
        let touched = core::mem::take(&mut self.scratch.touched);
        for &id in &touched {
            self.flags(id).touched = false;
            if !self.backbone.is_live(id) {
                continue;
            }
            let block = self.backbone.block_mut(id);
            block.update_interval(self.drawables);
            let (first, last, count) = (
                block.first_drawable,
                block.last_drawable,
                block.drawable_count,
            );
            self.backbone.mark_dirty_block(id);
            self.backbone.mark_interval_changed(id);
            self.summary.interval_updates += 1;
            if let (Some(first), Some(last)) = (first, last) {
                self.tracer.interval_updated(&IntervalUpdatedEvent {
                    stitch_index: self.summary.stitch_index,
                    block: id,
                    first,
                    last,
                    drawable_count: count,
                });
            }
        }
        self.scratch.touched = touched;
        self.scratch.touched.clear();
    }

    /// Persists the frame's first and last drawable on the backbone.
    ///
    /// # Panics
    ///
    /// Panics if called twice in one stitch.
    pub fn record_backbone_boundaries(&mut self) {
        assert!(
            !self.boundaries_recorded,
            "backbone boundaries already recorded for this stitch"
        );
        self.boundaries_recorded = true;
        self.backbone.previous_first_drawable = self.frame.first_drawable;
        self.backbone.previous_last_drawable = self.frame.last_drawable;
        debug_assert_eq!(
            self.backbone
                .blocks()
                .first()
                .and_then(|&b| self.backbone.block(b).first_drawable()),
            self.frame.first_drawable,
            "first block does not start the frame"
        );
        debug_assert_eq!(
            self.backbone
                .blocks()
                .last()
                .and_then(|&b| self.backbone.block(b).last_drawable()),
            self.frame.last_drawable,
            "last block does not end the frame"
        );
    }

    // ---- scratch flags ----

    pub(super) fn flags(&mut self, id: BlockId) -> &mut BlockFlags {
        let idx = id.index() as usize;
        if idx >= self.scratch.flags.len() {
            self.scratch.flags.resize(idx + 1, BlockFlags::default());
        }
        &mut self.scratch.flags[idx]
    }

    pub(super) fn is_claimed(&self, id: BlockId) -> bool {
        self.scratch
            .flags
            .get(id.index() as usize)
            .is_some_and(|f| f.claimed)
    }

    pub(super) fn claim(&mut self, id: BlockId) {
        self.flags(id).claimed = true;
    }

    pub(super) fn release_claim(&mut self, id: BlockId) {
        self.flags(id).claimed = false;
    }

    /// Puts a block on the touched worklist, seeding its pending interval
    /// from the committed one.
    pub(super) fn touch(&mut self, id: BlockId) {
        let flags = self.flags(id);
        if flags.touched {
            return;
        }
        flags.touched = true;
        self.scratch.touched.push(id);
        let block = self.backbone.block_mut(id);
        block.pending_first_drawable = block.first_drawable;
        block.pending_last_drawable = block.last_drawable;
    }

    pub(super) fn is_touched(&self, id: BlockId) -> bool {
        self.scratch
            .flags
            .get(id.index() as usize)
            .is_some_and(|f| f.touched)
    }
}

impl Drop for Stitch<'_, '_> {
    fn drop(&mut self) {
        self.clean();
    }
}
