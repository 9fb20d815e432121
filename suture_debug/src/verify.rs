// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post-stitch verification.
//!
//! [`VerificationLog`] implements [`StitchSink`] and remembers what the last
//! stitch did: blocks created and disposed, pending drawable changes and
//! interval commits. After the display layer has applied the stitch,
//! [`VerificationLog::verify`] checks that log against the resulting backbone:
//!
//! - every created block is in the block array and committed its interval
//!   exactly once;
//! - no block committed its interval more than once;
//! - every disposed block is gone from the array and owns no drawable;
//! - no drawable both moved and was added or removed, or moved twice;
//! - the summary counters agree with the recorded events.
//!
//! Structural checks of the frame itself live in
//! [`suture_core::audit`]; this log checks the stitch's own bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use suture_core::backbone::Backbone;
use suture_core::block::BlockId;
use suture_core::drawable::{DrawableId, DrawableStore};
use suture_core::trace::{
    BlockCreatedEvent, BlockDisposedEvent, IntervalUpdatedEvent, PendingAdditionEvent,
    PendingMoveEvent, PendingRemovalEvent, StitchBeginEvent, StitchSink, StitchSummary,
};

/// A discrepancy between a stitch's log and the backbone it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// No stitch has ended since the log was last reset.
    #[error("no finished stitch was recorded")]
    Unfinished,
    /// A created block is not in the block array.
    #[error("created {block:?} is missing from the block array")]
    CreatedMissing {
        /// The block.
        block: BlockId,
    },
    /// A block committed its interval an unexpected number of times.
    #[error("{block:?} committed its interval {count} times")]
    UpdateCount {
        /// The block.
        block: BlockId,
        /// Number of commits recorded.
        count: u32,
    },
    /// A disposed block is still live or in the block array.
    #[error("disposed {block:?} is still present")]
    DisposedPresent {
        /// The block.
        block: BlockId,
    },
    /// A drawable is owned by a disposed block.
    #[error("{drawable:?} is still owned by disposed {block:?}")]
    DisposedOwner {
        /// The drawable.
        drawable: DrawableId,
        /// The disposed block.
        block: BlockId,
    },
    /// A moved drawable also had another pending change.
    #[error("{drawable:?} moved and had another pending change")]
    ConflictingMove {
        /// The drawable.
        drawable: DrawableId,
    },
    /// A summary counter disagrees with the recorded events.
    #[error("summary reports {reported} {what}, log recorded {recorded}")]
    Summary {
        /// Name of the counter.
        what: &'static str,
        /// Value in the summary.
        reported: u32,
        /// Number of recorded events.
        recorded: u32,
    },
}

/// A [`StitchSink`] that records one stitch for later verification.
///
/// The log resets itself at the start of every stitch, so one log can follow
/// a long-running backbone frame after frame.
#[derive(Debug, Default)]
pub struct VerificationLog {
    created: Vec<BlockId>,
    disposed: Vec<BlockId>,
    updates: BTreeMap<BlockId, u32>,
    additions: Vec<(DrawableId, BlockId)>,
    removals: Vec<(DrawableId, BlockId)>,
    moves: Vec<(DrawableId, BlockId)>,
    summary: Option<StitchSummary>,
}

impl VerificationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blocks created by the last stitch.
    #[must_use]
    pub fn created(&self) -> &[BlockId] {
        &self.created
    }

    /// Returns the blocks disposed by the last stitch.
    #[must_use]
    pub fn disposed(&self) -> &[BlockId] {
        &self.disposed
    }

    /// Returns the drawables recorded to move, with their target blocks.
    #[must_use]
    pub fn moves(&self) -> &[(DrawableId, BlockId)] {
        &self.moves
    }

    /// Returns the summary of the last finished stitch.
    #[must_use]
    pub fn summary(&self) -> Option<&StitchSummary> {
        self.summary.as_ref()
    }

    fn reset(&mut self) {
        self.created.clear();
        self.disposed.clear();
        self.updates.clear();
        self.additions.clear();
        self.removals.clear();
        self.moves.clear();
        self.summary = None;
    }

    /// Checks the last stitch against `backbone` and `drawables`.
    ///
    /// Call after [`DrawableStore::apply_block_changes`], either before or
    /// after the disposed blocks have been released.
    ///
    /// # Errors
    ///
    /// Returns the first discrepancy found.
    pub fn verify(
        &self,
        backbone: &Backbone,
        drawables: &DrawableStore,
    ) -> Result<(), VerifyError> {
        let Some(summary) = self.summary else {
            return Err(VerifyError::Unfinished);
        };
        self.verify_summary(&summary)?;

        for &block in &self.created {
            if !backbone.blocks().contains(&block) {
                return Err(VerifyError::CreatedMissing { block });
            }
            let count = self.updates.get(&block).copied().unwrap_or(0);
            if count != 1 {
                return Err(VerifyError::UpdateCount { block, count });
            }
        }
        if let Some((&block, &count)) = self.updates.iter().find(|&(_, &count)| count > 1) {
            return Err(VerifyError::UpdateCount { block, count });
        }

        let disposed: BTreeSet<BlockId> = self.disposed.iter().copied().collect();
        for &block in &disposed {
            if backbone.is_live(block) || backbone.blocks().contains(&block) {
                return Err(VerifyError::DisposedPresent { block });
            }
        }
        let frame = drawables.run(
            backbone.previous_first_drawable(),
            backbone.previous_last_drawable(),
        );
        let touched = self
            .additions
            .iter()
            .chain(&self.removals)
            .chain(&self.moves)
            .map(|&(d, _)| d);
        for drawable in frame.chain(touched) {
            if !drawables.is_alive(drawable) {
                continue;
            }
            if let Some(block) = drawables.block(drawable)
                && disposed.contains(&block)
            {
                return Err(VerifyError::DisposedOwner { drawable, block });
            }
        }

        let mut moved = BTreeSet::new();
        for &(drawable, _) in &self.moves {
            let elsewhere = self
                .additions
                .iter()
                .chain(&self.removals)
                .any(|&(d, _)| d == drawable);
            if elsewhere || !moved.insert(drawable) {
                return Err(VerifyError::ConflictingMove { drawable });
            }
        }

        Ok(())
    }

    fn verify_summary(&self, summary: &StitchSummary) -> Result<(), VerifyError> {
        let update_total: u32 = self.updates.values().sum();
        let checks = [
            ("created blocks", summary.blocks_created, self.created.len()),
            ("disposed blocks", summary.blocks_disposed, self.disposed.len()),
            ("additions", summary.additions, self.additions.len()),
            ("removals", summary.removals, self.removals.len()),
            ("moves", summary.moves, self.moves.len()),
            (
                "interval updates",
                summary.interval_updates,
                update_total as usize,
            ),
        ];
        for (what, reported, recorded) in checks {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "per-stitch event counts are far below u32::MAX"
            )]
            let recorded = recorded as u32;
            if reported != recorded {
                return Err(VerifyError::Summary {
                    what,
                    reported,
                    recorded,
                });
            }
        }
        Ok(())
    }
}

impl StitchSink for VerificationLog {
    fn on_stitch_begin(&mut self, e: &StitchBeginEvent) {
        _ = e;
        self.reset();
    }

    fn on_pending_addition(&mut self, e: &PendingAdditionEvent) {
        self.additions.push((e.drawable, e.block));
    }

    fn on_pending_removal(&mut self, e: &PendingRemovalEvent) {
        self.removals.push((e.drawable, e.block));
    }

    fn on_pending_move(&mut self, e: &PendingMoveEvent) {
        self.moves.push((e.drawable, e.to));
    }

    fn on_block_created(&mut self, e: &BlockCreatedEvent) {
        self.created.push(e.block);
    }

    fn on_block_disposed(&mut self, e: &BlockDisposedEvent) {
        self.disposed.push(e.block);
    }

    fn on_interval_updated(&mut self, e: &IntervalUpdatedEvent) {
        *self.updates.entry(e.block).or_insert(0) += 1;
    }

    fn on_stitch_end(&mut self, s: &StitchSummary) {
        self.summary = Some(*s);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
