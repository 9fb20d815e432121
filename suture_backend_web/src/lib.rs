// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for suture.
//!
//! [`DomSurfaceHost`] implements [`SurfaceHost`] over the browser DOM:
//!
//! - canvas blocks get a `<canvas>` element;
//! - vector blocks get an `<svg>` root;
//! - element blocks present a DOM element registered for their drawable;
//! - GPU blocks get a `<canvas>` tagged for a WebGL or WebGPU context.
//!
//! All surfaces are absolutely positioned children of one container element
//! per backbone.

#![no_std]

extern crate alloc;

mod host;

pub use host::DomSurfaceHost;
pub use suture_core::host::SurfaceHost;
