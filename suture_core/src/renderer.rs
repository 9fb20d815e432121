// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer identification.
//!
//! Every drawable is painted by exactly one back end. The renderer tag is
//! fixed for the drawable's lifetime and decides which kind of block can own
//! it.

use core::fmt;

/// The back end that paints a drawable or owns a block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Renderer {
    /// Immediate-mode raster surface (e.g. a 2D canvas).
    Canvas,
    /// Retained vector-markup tree (e.g. an SVG document).
    Vector,
    /// A platform element placed directly in the native tree.
    ///
    /// Element drawables are never shared: each one owns a dedicated block.
    Element,
    /// GPU-accelerated surface.
    Gpu,
}

impl Renderer {
    /// All renderers, in declaration order.
    pub const ALL: [Self; 4] = [Self::Canvas, Self::Vector, Self::Element, Self::Gpu];

    /// Returns whether several drawables with this renderer may share one
    /// block.
    #[inline]
    #[must_use]
    pub const fn is_shareable(self) -> bool {
        !matches!(self, Self::Element)
    }

    /// Returns whether drawables with `self` and `other` must share a block
    /// when adjacent.
    #[inline]
    #[must_use]
    pub const fn joins(self, other: Self) -> bool {
        self.is_shareable() && self as u8 == other as u8
    }

    /// Returns a short lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Vector => "vector",
            Self::Element => "element",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
