// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block reconciliation.
//!
//! A [`Stitcher`] turns one frame's change intervals into block edits on a
//! [`Backbone`]: which blocks are created, which are disposed, and which
//! drawables move between them. It holds only reusable scratch buffers; all
//! frame state lives in a [`Stitch`] session that borrows the backbone, the
//! drawable store and the surface host for the duration of one pass.
//!
//! ```text
//!  upstream diff ──► ChangeIntervals ─┐
//!                                     ▼
//!  DrawableStore ◄── pending ops ── Stitch ──► Backbone (blocks, dirty set)
//!  (old + new links)                  │
//!                                     └──► SurfaceHost (create / attach)
//! ```
//!
//! The pass runs in three phases:
//!
//! 1. **Removals.** Every drawable of the previous frame inside a change
//!    interval is recorded for removal. Blocks lying entirely inside a removed
//!    run enter a reuse pool.
//! 2. **Seams.** Walking the new frame left to right, each interval's new run
//!    is split into same-renderer groups. A group extends the open block when
//!    it can; otherwise it takes a reusable block or a new one. The unchanged
//!    chunk after each interval is then glued to the open block (the smaller
//!    side moves), kept in its own block, or unglued into a fresh one.
//! 3. **Commit.** Unclaimed blocks are disposed, the block array is rebuilt
//!    and reindexed if membership changed, and every touched block commits
//!    its interval exactly once.
//!
//! Dropping the session releases per-stitch state, whichever way the pass
//! ends. Applying the recorded drawable changes is left to the display layer
//! ([`DrawableStore::apply_block_changes`]).

mod algorithm;
mod session;

pub use session::Stitch;

use alloc::vec::Vec;

use crate::backbone::Backbone;
use crate::block::BlockId;
use crate::drawable::{DrawableId, DrawableStore};
use crate::host::SurfaceHost;
use crate::interval::{ChangeIntervalId, ChangeIntervals};
use crate::trace::{StitchSummary, Tracer};

/// Boundaries of the frame being stitched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StitchFrame {
    /// First drawable of the current frame.
    pub first_drawable: Option<DrawableId>,
    /// Last drawable of the current frame.
    pub last_drawable: Option<DrawableId>,
    /// First change interval to process.
    pub first_change_interval: Option<ChangeIntervalId>,
    /// Last change interval to process.
    pub last_change_interval: Option<ChangeIntervalId>,
}

impl StitchFrame {
    /// Creates a frame covering every interval in `intervals`.
    #[must_use]
    pub fn new(
        first_drawable: Option<DrawableId>,
        last_drawable: Option<DrawableId>,
        intervals: &ChangeIntervals,
    ) -> Self {
        Self {
            first_drawable,
            last_drawable,
            first_change_interval: intervals.first(),
            last_change_interval: intervals.last(),
        }
    }
}

/// Per-block flags that only live for one stitch.
#[derive(Clone, Copy, Debug, Default)]
struct BlockFlags {
    /// Picked to own drawables in the new frame.
    claimed: bool,
    /// On the touched worklist.
    touched: bool,
    /// In the reuse pool.
    pooled: bool,
    /// Must be disposed unless claimed.
    at_risk: bool,
    /// Gained drawables through an addition or a move.
    received: bool,
}

/// Buffers reused across stitches.
#[derive(Debug, Default)]
struct Scratch {
    flags: Vec<BlockFlags>,
    touched: Vec<BlockId>,
    pool: Vec<BlockId>,
    at_risk: Vec<BlockId>,
    run: Vec<DrawableId>,
    order: Vec<BlockId>,
}

impl Scratch {
    fn clear(&mut self) {
        self.flags.clear();
        self.touched.clear();
        self.pool.clear();
        self.at_risk.clear();
        self.run.clear();
        self.order.clear();
    }
}

/// Reusable reconciliation engine.
///
/// Keep one stitcher per backbone (or per thread) and call
/// [`stitch`](Self::stitch) once per frame.
#[derive(Debug, Default)]
pub struct Stitcher {
    stitch_count: u64,
    scratch: Scratch,
}

impl Stitcher {
    /// Creates a stitcher with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many stitches have been started.
    #[must_use]
    pub fn stitch_count(&self) -> u64 {
        self.stitch_count
    }

    /// Starts a stitch session.
    ///
    /// The session is initialized and ready for either the full algorithm
    /// ([`Stitch::run`]) or manual use of its primitives.
    ///
    /// # Panics
    ///
    /// Panics if `frame` has no change interval, if a frame boundary drawable
    /// has a neighbor beyond it, or if drawable changes from an earlier stitch
    /// were never applied.
    pub fn begin<'a, 't>(
        &'a mut self,
        backbone: &'a mut Backbone,
        drawables: &'a mut DrawableStore,
        host: &'a mut dyn SurfaceHost,
        intervals: &'a ChangeIntervals,
        tracer: &'a mut Tracer<'t>,
        frame: StitchFrame,
    ) -> Stitch<'a, 't> {
        self.stitch_count += 1;
        let mut session = Stitch::new(
            &mut self.scratch,
            self.stitch_count,
            backbone,
            drawables,
            host,
            intervals,
            tracer,
            frame,
        );
        session.initialize();
        session
    }

    /// Reconciles `backbone` with the current frame.
    ///
    /// # Panics
    ///
    /// See [`begin`](Self::begin).
    pub fn stitch(
        &mut self,
        backbone: &mut Backbone,
        drawables: &mut DrawableStore,
        host: &mut dyn SurfaceHost,
        intervals: &ChangeIntervals,
        tracer: &mut Tracer<'_>,
        frame: StitchFrame,
    ) -> StitchSummary {
        self.begin(backbone, drawables, host, intervals, tracer, frame)
            .run()
    }
}
