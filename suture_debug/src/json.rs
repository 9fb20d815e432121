// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes them as a JSON array of instant events in the
//! [Chrome Trace Event Format][format], so a stitch history can be loaded
//! into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
//!
//! Stitch events carry no clock. Each stitch is laid out on its own track
//! (`tid` = stitch counter) and `ts` is the event's position in the
//! recording.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use suture_core::block::BlockId;
use suture_core::drawable::DrawableId;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as a JSON array.
///
/// # Errors
///
/// Returns any error from writing to `writer`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes)
        .enumerate()
        .map(|(ts, recorded)| {
            let (name, cat, args) = describe(&recorded);
            json!({
                "ph": "i",
                "name": name,
                "cat": cat,
                "ts": ts,
                "pid": 0,
                "tid": recorded.stitch_index(),
                "s": "t",
                "args": args,
            })
        })
        .collect();

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn block(b: BlockId) -> String {
    format!("{}@{}", b.index(), b.generation())
}

fn drawable(d: DrawableId) -> String {
    format!("{}@{}", d.index(), d.generation())
}

/// Returns the name, category and arguments of one event.
fn describe(recorded: &RecordedEvent) -> (&'static str, &'static str, Value) {
    match recorded {
        RecordedEvent::StitchBegin(e) => (
            "StitchBegin",
            "Stitch",
            json!({
                "backbone": e.backbone.0,
                "intervals": e.intervals,
                "blocks_before": e.blocks_before,
            }),
        ),
        RecordedEvent::PendingAddition(e) => (
            "PendingAddition",
            "Drawable",
            json!({ "drawable": drawable(e.drawable), "block": block(e.block) }),
        ),
        RecordedEvent::PendingRemoval(e) => (
            "PendingRemoval",
            "Drawable",
            json!({ "drawable": drawable(e.drawable), "block": block(e.block) }),
        ),
        RecordedEvent::PendingMove(e) => (
            "PendingMove",
            "Drawable",
            json!({
                "drawable": drawable(e.drawable),
                "from": e.from.map(block),
                "to": block(e.to),
            }),
        ),
        RecordedEvent::BlockCreated(e) => (
            "BlockCreated",
            "Block",
            json!({
                "block": block(e.block),
                "renderer": e.renderer.name(),
                "surface": e.surface.0,
                "representative": drawable(e.representative),
                "bounds": [e.bounds.x0, e.bounds.y0, e.bounds.x1, e.bounds.y1],
            }),
        ),
        RecordedEvent::BlockReused(e) => (
            "BlockReused",
            "Block",
            json!({
                "block": block(e.block),
                "renderer": e.renderer.name(),
                "source": format!("{:?}", e.source),
            }),
        ),
        RecordedEvent::BlockDisposed(e) => (
            "BlockDisposed",
            "Block",
            json!({
                "block": block(e.block),
                "renderer": e.renderer.name(),
                "surface": e.surface.0,
            }),
        ),
        RecordedEvent::Seam(e) => (
            "Seam",
            "Block",
            json!({
                "kind": format!("{:?}", e.kind),
                "block": block(e.block),
                "chunk_first": drawable(e.chunk_first),
                "moved": e.moved,
            }),
        ),
        RecordedEvent::IntervalUpdated(e) => (
            "IntervalUpdated",
            "Block",
            json!({
                "block": block(e.block),
                "first": drawable(e.first),
                "last": drawable(e.last),
                "drawable_count": e.drawable_count,
            }),
        ),
        RecordedEvent::Reindex(e) => ("Reindex", "Stitch", json!({ "blocks": e.blocks })),
        RecordedEvent::StitchEnd(s) => (
            "StitchEnd",
            "Summary",
            json!({
                "intervals": s.intervals,
                "blocks_created": s.blocks_created,
                "blocks_reused": s.blocks_reused,
                "blocks_disposed": s.blocks_disposed,
                "additions": s.additions,
                "removals": s.removals,
                "moves": s.moves,
                "interval_updates": s.interval_updates,
                "reindexed": s.reindexed,
                "blocks_after": s.blocks_after,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use suture_core::backbone::BackboneId;
    use suture_core::trace::{PendingMoveEvent, StitchBeginEvent, StitchSink, StitchSummary};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_stitch_begin(&StitchBeginEvent {
            stitch_index: 3,
            backbone: BackboneId(1),
            intervals: 2,
            blocks_before: 4,
        });
        rec.on_pending_move(&PendingMoveEvent {
            stitch_index: 3,
            drawable: DrawableId::from_raw(6, 0),
            from: None,
            to: BlockId::from_raw(2, 1),
        });
        rec.on_stitch_end(&StitchSummary {
            stitch_index: 3,
            moves: 1,
            ..StitchSummary::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["name"], "StitchBegin");
        assert_eq!(parsed[0]["tid"], 3);
        assert_eq!(parsed[0]["args"]["blocks_before"], 4);

        assert_eq!(parsed[1]["name"], "PendingMove");
        assert_eq!(parsed[1]["ts"], 1);
        assert_eq!(parsed[1]["args"]["from"], Value::Null);
        assert_eq!(parsed[1]["args"]["to"], "2@1");

        assert_eq!(parsed[2]["name"], "StitchEnd");
        assert_eq!(parsed[2]["args"]["moves"], 1);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
