// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation for the stitcher.
//!
//! This module provides a [`StitchSink`] trait with one method per stitch
//! event. All method bodies default to no-ops, so implementing only the events
//! you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn StitchSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When **on**,
//! each method performs a single `Option` branch before dispatching.
//!
//! [`StitchSummary`] is produced by every stitch regardless of features; the
//! sink receives it through [`StitchSink::on_stitch_end`].
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-drawable [`PendingMoveEvent`]s
//!   and representative bounds in [`BlockCreatedEvent`].

use crate::backbone::BackboneId;
use crate::block::BlockId;
use crate::drawable::DrawableId;
use crate::host::SurfaceHandle;
use crate::renderer::Renderer;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why an existing block was picked for a group instead of a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReuseSource {
    /// An element drawable got its own previous block back.
    Element,
    /// The block of the interval's trailing boundary drawable.
    After,
    /// A block freed by the removed run.
    Pool,
}

/// How a seam between a change interval and its trailing chunk was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeamKind {
    /// The chunk joined the block on its left.
    Glue,
    /// The chunk left a block that is kept elsewhere.
    Unglue,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once a stitch session has been initialized.
#[derive(Clone, Copy, Debug)]
pub struct StitchBeginEvent {
    /// Monotonic stitch counter of the stitcher.
    pub stitch_index: u64,
    /// Backbone being stitched.
    pub backbone: BackboneId,
    /// Number of change intervals.
    pub intervals: u32,
    /// Number of live blocks before the stitch.
    pub blocks_before: u32,
}

/// Emitted when a drawable is recorded for attachment to a block.
#[derive(Clone, Copy, Debug)]
pub struct PendingAdditionEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The drawable.
    pub drawable: DrawableId,
    /// The block it will belong to.
    pub block: BlockId,
}

/// Emitted when a drawable is recorded for detachment from its block.
#[derive(Clone, Copy, Debug)]
pub struct PendingRemovalEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The drawable.
    pub drawable: DrawableId,
    /// The block it leaves.
    pub block: BlockId,
}

/// Emitted when an unchanged drawable is recorded to move blocks.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct PendingMoveEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The drawable.
    pub drawable: DrawableId,
    /// The block it leaves.
    pub from: Option<BlockId>,
    /// The block it joins.
    pub to: BlockId,
}

/// Emitted when a new block and its surface are created.
#[derive(Clone, Copy, Debug)]
pub struct BlockCreatedEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The new block.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// Its native surface.
    pub surface: SurfaceHandle,
    /// The drawable the block was created for.
    pub representative: DrawableId,
    /// Bounds of the representative drawable.
    #[cfg(feature = "trace-rich")]
    pub bounds: kurbo::Rect,
}

/// Emitted when an existing block is picked for a group.
#[derive(Clone, Copy, Debug)]
pub struct BlockReusedEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The reused block.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// Where it came from.
    pub source: ReuseSource,
}

/// Emitted when a block is marked for disposal.
#[derive(Clone, Copy, Debug)]
pub struct BlockDisposedEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The disposed block.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// Its native surface.
    pub surface: SurfaceHandle,
}

/// Emitted when a seam is resolved by gluing or ungluing.
#[derive(Clone, Copy, Debug)]
pub struct SeamEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// Glue or unglue.
    pub kind: SeamKind,
    /// The block the chunk ends up in.
    pub block: BlockId,
    /// First drawable of the moved chunk.
    pub chunk_first: DrawableId,
    /// Number of drawables moved.
    pub moved: u32,
}

/// Emitted when a block's interval is committed.
#[derive(Clone, Copy, Debug)]
pub struct IntervalUpdatedEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// The block.
    pub block: BlockId,
    /// New first drawable.
    pub first: DrawableId,
    /// New last drawable.
    pub last: DrawableId,
    /// Number of drawables in the range.
    pub drawable_count: u32,
}

/// Emitted when the block array is reindexed.
#[derive(Clone, Copy, Debug)]
pub struct ReindexEvent {
    /// Stitch counter.
    pub stitch_index: u64,
    /// Number of blocks after reindexing.
    pub blocks: u32,
}

/// Per-stitch counters, returned by every stitch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StitchSummary {
    /// Stitch counter.
    pub stitch_index: u64,
    /// Number of change intervals processed.
    pub intervals: u32,
    /// Blocks created.
    pub blocks_created: u32,
    /// Existing blocks picked for new groups.
    pub blocks_reused: u32,
    /// Blocks marked for disposal.
    pub blocks_disposed: u32,
    /// Pending additions recorded.
    pub additions: u32,
    /// Pending removals recorded.
    pub removals: u32,
    /// Pending moves recorded.
    pub moves: u32,
    /// Blocks whose interval was committed.
    pub interval_updates: u32,
    /// Whether the block array was rebuilt and reindexed.
    pub reindexed: bool,
    /// Number of live blocks after the stitch.
    pub blocks_after: u32,
}

// ---------------------------------------------------------------------------
// StitchSink trait
// ---------------------------------------------------------------------------

/// Receives events from the stitcher.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait StitchSink {
    /// Called once the session is initialized.
    fn on_stitch_begin(&mut self, e: &StitchBeginEvent) {
        _ = e;
    }

    /// Called for every recorded addition.
    fn on_pending_addition(&mut self, e: &PendingAdditionEvent) {
        _ = e;
    }

    /// Called for every recorded removal.
    fn on_pending_removal(&mut self, e: &PendingRemovalEvent) {
        _ = e;
    }

    /// Called for every recorded move (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_pending_move(&mut self, e: &PendingMoveEvent) {
        _ = e;
    }

    /// Called when a block is created.
    fn on_block_created(&mut self, e: &BlockCreatedEvent) {
        _ = e;
    }

    /// Called when an existing block is reused.
    fn on_block_reused(&mut self, e: &BlockReusedEvent) {
        _ = e;
    }

    /// Called when a block is marked for disposal.
    fn on_block_disposed(&mut self, e: &BlockDisposedEvent) {
        _ = e;
    }

    /// Called when a seam is glued or unglued.
    fn on_seam(&mut self, e: &SeamEvent) {
        _ = e;
    }

    /// Called when a block's interval is committed.
    fn on_interval_updated(&mut self, e: &IntervalUpdatedEvent) {
        _ = e;
    }

    /// Called when the block array is reindexed.
    fn on_reindex(&mut self, e: &ReindexEvent) {
        _ = e;
    }

    /// Called with the summary at the end of the stitch.
    fn on_stitch_end(&mut self, s: &StitchSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`StitchSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl StitchSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`StitchSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn StitchSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn StitchSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Expands to a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $hook:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$hook(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn StitchSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`StitchBeginEvent`].
        stitch_begin => on_stitch_begin(StitchBeginEvent)
    );
    forward!(
        /// Emits a [`PendingAdditionEvent`].
        pending_addition => on_pending_addition(PendingAdditionEvent)
    );
    forward!(
        /// Emits a [`PendingRemovalEvent`].
        pending_removal => on_pending_removal(PendingRemovalEvent)
    );
    forward!(
        /// Emits a [`BlockCreatedEvent`].
        block_created => on_block_created(BlockCreatedEvent)
    );
    forward!(
        /// Emits a [`BlockReusedEvent`].
        block_reused => on_block_reused(BlockReusedEvent)
    );
    forward!(
        /// Emits a [`BlockDisposedEvent`].
        block_disposed => on_block_disposed(BlockDisposedEvent)
    );
    forward!(
        /// Emits a [`SeamEvent`].
        seam => on_seam(SeamEvent)
    );
    forward!(
        /// Emits an [`IntervalUpdatedEvent`].
        interval_updated => on_interval_updated(IntervalUpdatedEvent)
    );
    forward!(
        /// Emits a [`ReindexEvent`].
        reindex => on_reindex(ReindexEvent)
    );
    forward!(
        /// Emits the [`StitchSummary`].
        stitch_end => on_stitch_end(StitchSummary)
    );

    /// Emits a [`PendingMoveEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn pending_move(&mut self, e: &PendingMoveEvent) {
        if let Some(s) = &mut self.sink {
            s.on_pending_move(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> StitchBeginEvent {
        StitchBeginEvent {
            stitch_index: 3,
            backbone: BackboneId(0),
            intervals: 2,
            blocks_before: 5,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_stitch_begin(&sample_begin());
        sink.on_stitch_end(&StitchSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.stitch_begin(&sample_begin());
        tracer.stitch_end(&StitchSummary::default());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            begins: Vec<u64>,
            disposed: Vec<BlockId>,
        }
        impl StitchSink for RecordingSink {
            fn on_stitch_begin(&mut self, e: &StitchBeginEvent) {
                self.begins.push(e.stitch_index);
            }
            fn on_block_disposed(&mut self, e: &BlockDisposedEvent) {
                self.disposed.push(e.block);
            }
        }

        let mut sink = RecordingSink {
            begins: Vec::new(),
            disposed: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.stitch_begin(&sample_begin());
        tracer.block_disposed(&BlockDisposedEvent {
            stitch_index: 3,
            block: BlockId::from_raw(1, 2),
            renderer: Renderer::Vector,
            surface: SurfaceHandle(9),
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.begins, &[3]);
        assert_eq!(sink.disposed, &[BlockId::from_raw(1, 2)]);
    }
}
