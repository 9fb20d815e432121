// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block reconciliation for multi-back-end retained-mode scene graphs.
//!
//! `suture_core` decides which native rendering surfaces ("blocks") a frame
//! needs. A scene graph flattens its visible leaves into an ordered list of
//! [drawables](drawable); each drawable is painted by one of four back ends
//! ([`Renderer`](renderer::Renderer)). Adjacent drawables that share a back
//! end are painted into one shared block, so the block list is a run-length
//! encoding of the drawable list by renderer.
//!
//! When the drawable list changes, an upstream diff pass describes the
//! differences as [change intervals](interval). The [`Stitcher`](stitch::Stitcher)
//! walks those intervals and computes the smallest set of block creations,
//! disposals and drawable reassignments that restores the run-length
//! invariant, reusing existing surfaces wherever it can.
//!
//! # Architecture
//!
//! ```text
//!   upstream diff ──► DrawableStore (current links) + ChangeIntervals
//!                                   │
//!                                   ▼
//!                 Stitcher::stitch(backbone, drawables, host, …)
//!                                   │
//!        ┌──────────────────────────┼────────────────────────────┐
//!        ▼                          ▼                            ▼
//!   pending drawable          block create/dispose        Backbone block
//!   additions/removals/       via SurfaceHost             order + interval
//!   moves                                                 flush + repaint marks
//!        │                                                       │
//!        ▼                                                       ▼
//!   DrawableStore::apply_block_changes()          Backbone::release_disposed()
//!   DrawableStore::commit_links()                 Backbone::take_dirty_blocks()
//! ```
//!
//! **[`drawable`]** — Struct-of-arrays drawable storage with generational
//! handles and separate current-frame and previous-frame links.
//!
//! **[`interval`]** — Arena of change intervals produced by the upstream diff.
//!
//! **[`block`]** — Blocks and their per-back-end state.
//!
//! **[`backbone`]** — The ordered block container and its native attachment
//! point.
//!
//! **[`host`]** — The [`SurfaceHost`](host::SurfaceHost) trait that platform
//! backends implement to create and attach native surfaces, plus an in-memory
//! [`HeadlessHost`](host::HeadlessHost).
//!
//! **[`stitch`]** — The reconciliation algorithm.
//!
//! **[`trace`]** — [`StitchSink`](trace::StitchSink) trait and event types for
//! stitch instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! **[`audit`]** — Structural consistency checks over a finished frame.
//!
//! **[`dirty`]** — Dirty-tracking channels for blocks that need repainting.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-drawable
//!   move events and representative bounds on block creation.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod audit;
pub mod backbone;
pub mod block;
pub mod dirty;
pub mod drawable;
pub mod host;
pub mod interval;
pub mod renderer;
pub mod stitch;
pub mod trace;
