// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`StitchSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each starting with a one-byte tag.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`].
//!
//! Handles are stored as `(index, generation)` pairs and surfaces as raw
//! `u64` values, so a recording can be decoded without the stores that
//! produced it.

use kurbo::Rect;
use suture_core::backbone::BackboneId;
use suture_core::block::BlockId;
use suture_core::drawable::DrawableId;
use suture_core::host::SurfaceHandle;
use suture_core::renderer::Renderer;
use suture_core::trace::{
    BlockCreatedEvent, BlockDisposedEvent, BlockReusedEvent, IntervalUpdatedEvent,
    PendingAdditionEvent, PendingMoveEvent, PendingRemovalEvent, ReindexEvent, ReuseSource,
    SeamEvent, SeamKind, StitchBeginEvent, StitchSink, StitchSummary,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_STITCH_BEGIN: u8 = 1;
const TAG_PENDING_ADDITION: u8 = 2;
const TAG_PENDING_REMOVAL: u8 = 3;
const TAG_PENDING_MOVE: u8 = 4;
const TAG_BLOCK_CREATED: u8 = 5;
const TAG_BLOCK_REUSED: u8 = 6;
const TAG_BLOCK_DISPOSED: u8 = 7;
const TAG_SEAM: u8 = 8;
const TAG_INTERVAL_UPDATED: u8 = 9;
const TAG_REINDEX: u8 = 10;
const TAG_STITCH_END: u8 = 11;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`StitchSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_drawable(&mut self, d: DrawableId) {
        self.write_u32(d.index());
        self.write_u32(d.generation());
    }

    fn write_block(&mut self, b: BlockId) {
        self.write_u32(b.index());
        self.write_u32(b.generation());
    }

    fn write_option_block(&mut self, b: Option<BlockId>) {
        match b {
            Some(b) => {
                self.write_u8(1);
                self.write_block(b);
            }
            None => {
                self.write_u8(0);
                self.write_block(BlockId::from_raw(0, 0));
            }
        }
    }

    fn write_renderer(&mut self, r: Renderer) {
        self.write_u8(r as u8);
    }

    fn write_rect(&mut self, r: Rect) {
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }
}

impl StitchSink for RecorderSink {
    fn on_stitch_begin(&mut self, e: &StitchBeginEvent) {
        self.write_u8(TAG_STITCH_BEGIN);
        self.write_u64(e.stitch_index);
        self.write_u32(e.backbone.0);
        self.write_u32(e.intervals);
        self.write_u32(e.blocks_before);
    }

    fn on_pending_addition(&mut self, e: &PendingAdditionEvent) {
        self.write_u8(TAG_PENDING_ADDITION);
        self.write_u64(e.stitch_index);
        self.write_drawable(e.drawable);
        self.write_block(e.block);
    }

    fn on_pending_removal(&mut self, e: &PendingRemovalEvent) {
        self.write_u8(TAG_PENDING_REMOVAL);
        self.write_u64(e.stitch_index);
        self.write_drawable(e.drawable);
        self.write_block(e.block);
    }

    fn on_pending_move(&mut self, e: &PendingMoveEvent) {
        self.write_u8(TAG_PENDING_MOVE);
        self.write_u64(e.stitch_index);
        self.write_drawable(e.drawable);
        self.write_option_block(e.from);
        self.write_block(e.to);
    }

    fn on_block_created(&mut self, e: &BlockCreatedEvent) {
        self.write_u8(TAG_BLOCK_CREATED);
        self.write_u64(e.stitch_index);
        self.write_block(e.block);
        self.write_renderer(e.renderer);
        self.write_u64(e.surface.0);
        self.write_drawable(e.representative);
        self.write_rect(e.bounds);
    }

    fn on_block_reused(&mut self, e: &BlockReusedEvent) {
        self.write_u8(TAG_BLOCK_REUSED);
        self.write_u64(e.stitch_index);
        self.write_block(e.block);
        self.write_renderer(e.renderer);
        self.write_u8(match e.source {
            ReuseSource::Element => 0,
            ReuseSource::After => 1,
            ReuseSource::Pool => 2,
        });
    }

    fn on_block_disposed(&mut self, e: &BlockDisposedEvent) {
        self.write_u8(TAG_BLOCK_DISPOSED);
        self.write_u64(e.stitch_index);
        self.write_block(e.block);
        self.write_renderer(e.renderer);
        self.write_u64(e.surface.0);
    }

    fn on_seam(&mut self, e: &SeamEvent) {
        self.write_u8(TAG_SEAM);
        self.write_u64(e.stitch_index);
        self.write_u8(match e.kind {
            SeamKind::Glue => 0,
            SeamKind::Unglue => 1,
        });
        self.write_block(e.block);
        self.write_drawable(e.chunk_first);
        self.write_u32(e.moved);
    }

    fn on_interval_updated(&mut self, e: &IntervalUpdatedEvent) {
        self.write_u8(TAG_INTERVAL_UPDATED);
        self.write_u64(e.stitch_index);
        self.write_block(e.block);
        self.write_drawable(e.first);
        self.write_drawable(e.last);
        self.write_u32(e.drawable_count);
    }

    fn on_reindex(&mut self, e: &ReindexEvent) {
        self.write_u8(TAG_REINDEX);
        self.write_u64(e.stitch_index);
        self.write_u32(e.blocks);
    }

    fn on_stitch_end(&mut self, s: &StitchSummary) {
        self.write_u8(TAG_STITCH_END);
        self.write_u64(s.stitch_index);
        self.write_u32(s.intervals);
        self.write_u32(s.blocks_created);
        self.write_u32(s.blocks_reused);
        self.write_u32(s.blocks_disposed);
        self.write_u32(s.additions);
        self.write_u32(s.removals);
        self.write_u32(s.moves);
        self.write_u32(s.interval_updates);
        self.write_u8(u8::from(s.reindexed));
        self.write_u32(s.blocks_after);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`StitchBeginEvent`].
    StitchBegin(StitchBeginEvent),
    /// A [`PendingAdditionEvent`].
    PendingAddition(PendingAdditionEvent),
    /// A [`PendingRemovalEvent`].
    PendingRemoval(PendingRemovalEvent),
    /// A [`PendingMoveEvent`].
    PendingMove(PendingMoveEvent),
    /// A [`BlockCreatedEvent`].
    BlockCreated(BlockCreatedEvent),
    /// A [`BlockReusedEvent`].
    BlockReused(BlockReusedEvent),
    /// A [`BlockDisposedEvent`].
    BlockDisposed(BlockDisposedEvent),
    /// A [`SeamEvent`].
    Seam(SeamEvent),
    /// An [`IntervalUpdatedEvent`].
    IntervalUpdated(IntervalUpdatedEvent),
    /// A [`ReindexEvent`].
    Reindex(ReindexEvent),
    /// A [`StitchSummary`].
    StitchEnd(StitchSummary),
}

impl RecordedEvent {
    /// Returns the stitch counter the event belongs to.
    #[must_use]
    pub fn stitch_index(&self) -> u64 {
        match self {
            Self::StitchBegin(e) => e.stitch_index,
            Self::PendingAddition(e) => e.stitch_index,
            Self::PendingRemoval(e) => e.stitch_index,
            Self::PendingMove(e) => e.stitch_index,
            Self::BlockCreated(e) => e.stitch_index,
            Self::BlockReused(e) => e.stitch_index,
            Self::BlockDisposed(e) => e.stitch_index,
            Self::Seam(e) => e.stitch_index,
            Self::IntervalUpdated(e) => e.stitch_index,
            Self::Reindex(e) => e.stitch_index,
            Self::StitchEnd(s) => s.stitch_index,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(f64::from_le_bytes)
    }

    fn read_drawable(&mut self) -> Option<DrawableId> {
        Some(DrawableId::from_raw(self.read_u32()?, self.read_u32()?))
    }

    fn read_block(&mut self) -> Option<BlockId> {
        Some(BlockId::from_raw(self.read_u32()?, self.read_u32()?))
    }

    fn read_option_block(&mut self) -> Option<Option<BlockId>> {
        let present = self.read_u8()?;
        let block = self.read_block()?;
        Some((present != 0).then_some(block))
    }

    fn read_renderer(&mut self) -> Option<Renderer> {
        Renderer::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_rect(&mut self) -> Option<Rect> {
        Some(Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    fn decode_stitch_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StitchBegin(StitchBeginEvent {
            stitch_index: self.read_u64()?,
            backbone: BackboneId(self.read_u32()?),
            intervals: self.read_u32()?,
            blocks_before: self.read_u32()?,
        }))
    }

    fn decode_pending_addition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PendingAddition(PendingAdditionEvent {
            stitch_index: self.read_u64()?,
            drawable: self.read_drawable()?,
            block: self.read_block()?,
        }))
    }

    fn decode_pending_removal(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PendingRemoval(PendingRemovalEvent {
            stitch_index: self.read_u64()?,
            drawable: self.read_drawable()?,
            block: self.read_block()?,
        }))
    }

    fn decode_pending_move(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PendingMove(PendingMoveEvent {
            stitch_index: self.read_u64()?,
            drawable: self.read_drawable()?,
            from: self.read_option_block()?,
            to: self.read_block()?,
        }))
    }

    fn decode_block_created(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BlockCreated(BlockCreatedEvent {
            stitch_index: self.read_u64()?,
            block: self.read_block()?,
            renderer: self.read_renderer()?,
            surface: SurfaceHandle(self.read_u64()?),
            representative: self.read_drawable()?,
            bounds: self.read_rect()?,
        }))
    }

    fn decode_block_reused(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BlockReused(BlockReusedEvent {
            stitch_index: self.read_u64()?,
            block: self.read_block()?,
            renderer: self.read_renderer()?,
            source: match self.read_u8()? {
                0 => ReuseSource::Element,
                1 => ReuseSource::After,
                _ => ReuseSource::Pool,
            },
        }))
    }

    fn decode_block_disposed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BlockDisposed(BlockDisposedEvent {
            stitch_index: self.read_u64()?,
            block: self.read_block()?,
            renderer: self.read_renderer()?,
            surface: SurfaceHandle(self.read_u64()?),
        }))
    }

    fn decode_seam(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Seam(SeamEvent {
            stitch_index: self.read_u64()?,
            kind: match self.read_u8()? {
                0 => SeamKind::Glue,
                _ => SeamKind::Unglue,
            },
            block: self.read_block()?,
            chunk_first: self.read_drawable()?,
            moved: self.read_u32()?,
        }))
    }

    fn decode_interval_updated(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::IntervalUpdated(IntervalUpdatedEvent {
            stitch_index: self.read_u64()?,
            block: self.read_block()?,
            first: self.read_drawable()?,
            last: self.read_drawable()?,
            drawable_count: self.read_u32()?,
        }))
    }

    fn decode_reindex(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reindex(ReindexEvent {
            stitch_index: self.read_u64()?,
            blocks: self.read_u32()?,
        }))
    }

    fn decode_stitch_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StitchEnd(StitchSummary {
            stitch_index: self.read_u64()?,
            intervals: self.read_u32()?,
            blocks_created: self.read_u32()?,
            blocks_reused: self.read_u32()?,
            blocks_disposed: self.read_u32()?,
            additions: self.read_u32()?,
            removals: self.read_u32()?,
            moves: self.read_u32()?,
            interval_updates: self.read_u32()?,
            reindexed: self.read_u8()? != 0,
            blocks_after: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_STITCH_BEGIN => self.decode_stitch_begin(),
            TAG_PENDING_ADDITION => self.decode_pending_addition(),
            TAG_PENDING_REMOVAL => self.decode_pending_removal(),
            TAG_PENDING_MOVE => self.decode_pending_move(),
            TAG_BLOCK_CREATED => self.decode_block_created(),
            TAG_BLOCK_REUSED => self.decode_block_reused(),
            TAG_BLOCK_DISPOSED => self.decode_block_disposed(),
            TAG_SEAM => self.decode_seam(),
            TAG_INTERVAL_UPDATED => self.decode_interval_updated(),
            TAG_REINDEX => self.decode_reindex(),
            TAG_STITCH_END => self.decode_stitch_end(),
            _ => None, // unknown tag
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
