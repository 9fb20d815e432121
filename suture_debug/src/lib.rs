// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, JSON export and verification for suture
//! stitches.
//!
//! This crate provides [`StitchSink`](suture_core::trace::StitchSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`json::export`]: writes a JSON array of events from recorded bytes.
//! - [`verify::VerificationLog`]: remembers what a stitch did and checks it
//!   against the resulting backbone.

pub mod json;
pub mod pretty;
pub mod recorder;
pub mod verify;
