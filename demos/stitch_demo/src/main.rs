// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scene edits that exercise the stitcher and its diagnostics.
//!
//! Runs a scripted sequence of frames against a
//! [`HeadlessHost`](suture_core::host::HeadlessHost), recording events to a
//! [`PrettyPrintSink`](suture_debug::pretty::PrettyPrintSink), a
//! [`RecorderSink`](suture_debug::recorder::RecorderSink) and a
//! [`VerificationLog`](suture_debug::verify::VerificationLog). Every frame is
//! audited and verified, and the recording is exported as JSON.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use kurbo::Rect;
use suture_core::audit;
use suture_core::backbone::{Backbone, BackboneId};
use suture_core::drawable::{DrawableId, DrawableStore};
use suture_core::host::HeadlessHost;
use suture_core::interval::ChangeIntervals;
use suture_core::renderer::Renderer;
use suture_core::stitch::{StitchFrame, Stitcher};
use suture_core::trace::{
    BlockCreatedEvent, BlockDisposedEvent, BlockReusedEvent, IntervalUpdatedEvent,
    PendingAdditionEvent, PendingMoveEvent, PendingRemovalEvent, ReindexEvent, SeamEvent,
    StitchBeginEvent, StitchSink, StitchSummary, Tracer,
};

use suture_debug::pretty::PrettyPrintSink;
use suture_debug::recorder::RecorderSink;
use suture_debug::verify::VerificationLog;

type Interval = (Option<DrawableId>, Option<DrawableId>);

/// Forwards every event to all diagnostics sinks.
struct Sinks {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
    log: VerificationLog,
}

macro_rules! fan_out {
    ($($hook:ident($ty:ty)),* $(,)?) => {
        $(
            fn $hook(&mut self, e: &$ty) {
                self.pretty.$hook(e);
                self.recorder.$hook(e);
                self.log.$hook(e);
            }
        )*
    };
}

impl StitchSink for Sinks {
    fan_out!(
        on_stitch_begin(StitchBeginEvent),
        on_pending_addition(PendingAdditionEvent),
        on_pending_removal(PendingRemovalEvent),
        on_pending_move(PendingMoveEvent),
        on_block_created(BlockCreatedEvent),
        on_block_reused(BlockReusedEvent),
        on_block_disposed(BlockDisposedEvent),
        on_seam(SeamEvent),
        on_interval_updated(IntervalUpdatedEvent),
        on_reindex(ReindexEvent),
        on_stitch_end(StitchSummary),
    );
}

/// One backbone and everything needed to stitch it.
struct Display {
    drawables: DrawableStore,
    backbone: Backbone,
    host: HeadlessHost,
    stitcher: Stitcher,
    order: Vec<DrawableId>,
}

impl Display {
    fn new() -> Self {
        let mut host = HeadlessHost::new();
        let container = host.create_container();
        Self {
            drawables: DrawableStore::new(),
            backbone: Backbone::new(BackboneId(0), container),
            host,
            stitcher: Stitcher::new(),
            order: Vec::new(),
        }
    }

    /// Links `order` as the new frame, stitches it and applies the result.
    fn frame(
        &mut self,
        sinks: &mut Sinks,
        order: &[DrawableId],
        intervals: &[Interval],
    ) -> Result<StitchSummary, Box<dyn Error>> {
        for &d in &self.order {
            if !order.contains(&d) {
                self.drawables.disconnect(d);
            }
        }
        self.drawables.link_run(order);
        self.order = order.to_vec();

        let mut arena = ChangeIntervals::new();
        for &(before, after) in intervals {
            arena.push(before, after);
        }
        let first = order.first().copied();
        let last = order.last().copied();
        let summary = self.stitcher.stitch(
            &mut self.backbone,
            &mut self.drawables,
            &mut self.host,
            &arena,
            &mut Tracer::new(sinks),
            StitchFrame::new(first, last, &arena),
        );

        self.drawables.apply_block_changes();
        self.drawables.commit_links();
        audit::check_consistency(&self.backbone, &self.drawables, first, last)?;
        sinks.log.verify(&self.backbone, &self.drawables)?;
        self.backbone.release_disposed(&mut self.host);
        Ok(summary)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut sinks = Sinks {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())).verbose(),
        recorder: RecorderSink::new(),
        log: VerificationLog::new(),
    };
    let mut display = Display::new();

    let mut x = 0.0;
    let mut add = |display: &mut Display, renderer: Renderer| {
        x += 40.0;
        display
            .drawables
            .create_drawable(renderer, Rect::new(x, 0.0, x + 32.0, 24.0))
    };
    let title = add(&mut display, Renderer::Element);
    let background = add(&mut display, Renderer::Canvas);
    let chart = add(&mut display, Renderer::Vector);
    let legend = add(&mut display, Renderer::Vector);
    let video = add(&mut display, Renderer::Gpu);
    let caption = add(&mut display, Renderer::Canvas);
    let badge = add(&mut display, Renderer::Element);

    let steps: [(&str, Vec<DrawableId>, Vec<Interval>); 6] = [
        (
            "initial scene",
            vec![background, chart, legend, caption],
            vec![(None, None)],
        ),
        (
            "title in front, video before the caption",
            vec![title, background, chart, legend, video, caption],
            vec![(None, Some(background)), (Some(legend), Some(caption))],
        ),
        (
            "chart removed",
            vec![title, background, video, caption],
            vec![(Some(background), Some(video))],
        ),
        (
            "badge appended",
            vec![title, background, video, caption, badge],
            vec![(Some(caption), None)],
        ),
        (
            "video removed, canvases glue",
            vec![title, background, caption, badge],
            vec![(Some(background), Some(caption))],
        ),
        ("scene cleared", vec![], vec![(None, None)]),
    ];

    for (label, order, intervals) in &steps {
        println!("== {label}");
        let summary = display.frame(&mut sinks, order, intervals)?;
        let dirty = display.backbone.take_dirty_blocks();
        println!(
            "   {} blocks, {} repainted, {} surfaces released so far",
            summary.blocks_after,
            dirty.len(),
            display.host.released().len(),
        );
    }

    // -- export JSON -------------------------------------------------------
    let path = "stitch.json";
    let mut writer = BufWriter::new(File::create(path)?);
    suture_debug::json::export(sinks.recorder.as_bytes(), &mut writer)?;

    println!("Wrote {path} ({} stitches)", display.stitcher.stitch_count());
    Ok(())
}
