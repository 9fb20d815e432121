// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The [`Backbone`](crate::backbone::Backbone) tracks which blocks need work
//! from the paint layer using [`understory_dirty`]. Keys are raw block slot
//! indices. Neither channel propagates, since blocks have no dependency
//! edges between them.
//!
//! - [`REPAINT`] — the block's contents must be repainted. Marked by
//!   [`Backbone::mark_dirty_block`](crate::backbone::Backbone::mark_dirty_block),
//!   including once for every block whose interval was flushed.
//! - [`INTERVAL`] — the block's drawable range or bounds changed, so the
//!   back end may need to resize or re-fit its surface before repainting.
//!
//! Disposed blocks are removed from the tracker, so drained keys always name
//! live blocks.

use understory_dirty::Channel;

/// Block contents must be repainted.
pub const REPAINT: Channel = Channel::new(0);

/// Block range or bounds changed.
pub const INTERVAL: Channel = Channel::new(1);
