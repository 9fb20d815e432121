// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable stitch output.
//!
//! [`PrettyPrintSink`] implements [`StitchSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Handles are
//! printed as `index@generation`.

use std::io::Write;

use suture_core::block::BlockId;
use suture_core::drawable::DrawableId;
use suture_core::trace::{
    BlockCreatedEvent, BlockDisposedEvent, BlockReusedEvent, IntervalUpdatedEvent,
    PendingAdditionEvent, PendingMoveEvent, PendingRemovalEvent, ReindexEvent, ReuseSource,
    SeamEvent, SeamKind, StitchBeginEvent, StitchSink, StitchSummary,
};

/// Writes human-readable stitch lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints per-drawable additions, removals and moves.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct Block(BlockId);

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}@{}", self.0.index(), self.0.generation())
    }
}

struct Drawable(DrawableId);

impl std::fmt::Display for Drawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}@{}", self.0.index(), self.0.generation())
    }
}

fn source_name(source: ReuseSource) -> &'static str {
    match source {
        ReuseSource::Element => "element",
        ReuseSource::After => "after",
        ReuseSource::Pool => "pool",
    }
}

fn seam_name(kind: SeamKind) -> &'static str {
    match kind {
        SeamKind::Glue => "glue",
        SeamKind::Unglue => "unglue",
    }
}

impl<W: Write> StitchSink for PrettyPrintSink<W> {
    fn on_stitch_begin(&mut self, e: &StitchBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[begin] stitch={} backbone={} intervals={} blocks={}",
            e.stitch_index, e.backbone.0, e.intervals, e.blocks_before,
        );
    }

    fn on_pending_addition(&mut self, e: &PendingAdditionEvent) {
        if self.verbose {
            let _ = writeln!(
                self.writer,
                "[add] stitch={} {} -> {}",
                e.stitch_index,
                Drawable(e.drawable),
                Block(e.block),
            );
        }
    }

    fn on_pending_removal(&mut self, e: &PendingRemovalEvent) {
        if self.verbose {
            let _ = writeln!(
                self.writer,
                "[remove] stitch={} {} <- {}",
                e.stitch_index,
                Drawable(e.drawable),
                Block(e.block),
            );
        }
    }

    fn on_pending_move(&mut self, e: &PendingMoveEvent) {
        if self.verbose {
            let from = e
                .from
                .map_or_else(|| "none".to_owned(), |b| Block(b).to_string());
            let _ = writeln!(
                self.writer,
                "[move] stitch={} {} {from} -> {}",
                e.stitch_index,
                Drawable(e.drawable),
                Block(e.to),
            );
        }
    }

    fn on_block_created(&mut self, e: &BlockCreatedEvent) {
        let _ = writeln!(
            self.writer,
            "[create] stitch={} {} {} surface={} for {} bounds=({:.0}, {:.0}, {:.0}, {:.0})",
            e.stitch_index,
            Block(e.block),
            e.renderer.name(),
            e.surface.0,
            Drawable(e.representative),
            e.bounds.x0,
            e.bounds.y0,
            e.bounds.x1,
            e.bounds.y1,
        );
    }

    fn on_block_reused(&mut self, e: &BlockReusedEvent) {
        let _ = writeln!(
            self.writer,
            "[reuse] stitch={} {} {} from {}",
            e.stitch_index,
            Block(e.block),
            e.renderer.name(),
            source_name(e.source),
        );
    }

    fn on_block_disposed(&mut self, e: &BlockDisposedEvent) {
        let _ = writeln!(
            self.writer,
            "[dispose] stitch={} {} {} surface={}",
            e.stitch_index,
            Block(e.block),
            e.renderer.name(),
            e.surface.0,
        );
    }

    fn on_seam(&mut self, e: &SeamEvent) {
        let _ = writeln!(
            self.writer,
            "[{}] stitch={} {} drawables from {} into {}",
            seam_name(e.kind),
            e.stitch_index,
            e.moved,
            Drawable(e.chunk_first),
            Block(e.block),
        );
    }

    fn on_interval_updated(&mut self, e: &IntervalUpdatedEvent) {
        let _ = writeln!(
            self.writer,
            "[interval] stitch={} {} [{}..{}] count={}",
            e.stitch_index,
            Block(e.block),
            Drawable(e.first),
            Drawable(e.last),
            e.drawable_count,
        );
    }

    fn on_reindex(&mut self, e: &ReindexEvent) {
        let _ = writeln!(
            self.writer,
            "[reindex] stitch={} blocks={}",
            e.stitch_index, e.blocks,
        );
    }

    fn on_stitch_end(&mut self, s: &StitchSummary) {
        let reindexed = if s.reindexed { "yes" } else { "no" };
        let _ = writeln!(
            self.writer,
            "[summary] stitch={} intervals={} created={} reused={} disposed={} \
             add={} remove={} move={} updates={} reindexed={reindexed} blocks={}",
            s.stitch_index,
            s.intervals,
            s.blocks_created,
            s.blocks_reused,
            s.blocks_disposed,
            s.additions,
            s.removals,
            s.moves,
            s.interval_updates,
            s.blocks_after,
        );
    }
}
