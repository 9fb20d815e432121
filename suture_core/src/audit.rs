// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backbone consistency checks.
//!
//! [`check_consistency`] verifies, after a stitch has been applied, that the
//! block array exactly tiles the current frame:
//!
//! - the blocks' committed ranges, concatenated in array order, reproduce the
//!   drawable list with no gaps and no overlap;
//! - every drawable is owned by the block whose range contains it, and shares
//!   its renderer;
//! - element blocks own exactly one drawable;
//! - no two neighboring blocks could have been one block;
//! - the backbone's recorded boundaries match the frame.
//!
//! Intended for tests and debug tooling; a full check walks every drawable.

use kurbo::Rect;

use crate::backbone::Backbone;
use crate::block::BlockId;
use crate::drawable::{DrawableId, DrawableStore};
use crate::renderer::Renderer;

/// A violated backbone invariant.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum AuditError {
    /// The frame is empty but blocks remain.
    #[error("empty frame still has {count} blocks")]
    BlocksWithoutDrawables {
        /// Number of remaining blocks.
        count: usize,
    },
    /// A disposed block is still in the array.
    #[error("{block:?} is disposed but still in the block array")]
    DisposedBlock {
        /// The block.
        block: BlockId,
    },
    /// A block has no committed interval.
    #[error("{block:?} has no committed interval")]
    EmptyBlock {
        /// The block.
        block: BlockId,
    },
    /// A block does not start where the previous one ended.
    #[error("{block:?} starts at {found:?}, expected {expected:?}")]
    Gap {
        /// The block.
        block: BlockId,
        /// The drawable following the previous block.
        expected: Option<DrawableId>,
        /// The block's first drawable.
        found: DrawableId,
    },
    /// A block's last drawable is not reachable from its first.
    #[error("{block:?} range does not reach {last:?}")]
    BrokenRange {
        /// The block.
        block: BlockId,
        /// The unreachable last drawable.
        last: DrawableId,
    },
    /// A drawable inside a block's range is owned by something else.
    #[error("{drawable:?} lies in {block:?} but is owned by {owner:?}")]
    Ownership {
        /// The drawable.
        drawable: DrawableId,
        /// The block whose range contains it.
        block: BlockId,
        /// Its recorded owner.
        owner: Option<BlockId>,
    },
    /// A drawable is painted by another renderer than its block.
    #[error("{drawable:?} is {drawable_renderer:?} but {block:?} is {block_renderer:?}")]
    RendererMismatch {
        /// The drawable.
        drawable: DrawableId,
        /// Its renderer.
        drawable_renderer: Renderer,
        /// The block.
        block: BlockId,
        /// The block's renderer.
        block_renderer: Renderer,
    },
    /// An element block owns more than one drawable.
    #[error("element {block:?} owns {count} drawables")]
    SharedElement {
        /// The block.
        block: BlockId,
        /// Number of owned drawables.
        count: u32,
    },
    /// Two neighboring blocks share a renderer that must be merged.
    #[error("{left:?} and {right:?} are adjacent {renderer:?} blocks")]
    Unmerged {
        /// The earlier block.
        left: BlockId,
        /// The later block.
        right: BlockId,
        /// Their shared renderer.
        renderer: Renderer,
    },
    /// A block's derived state disagrees with its range.
    #[error("{block:?} reports {reported} drawables but owns {actual}")]
    StaleInterval {
        /// The block.
        block: BlockId,
        /// The recorded drawable count.
        reported: u32,
        /// The counted drawables.
        actual: u32,
    },
    /// Drawables after the last block are not covered.
    #[error("drawables from {first:?} are not covered by any block")]
    Uncovered {
        /// The first uncovered drawable.
        first: DrawableId,
    },
    /// The recorded backbone boundaries differ from the frame.
    #[error("backbone records {recorded:?}, frame is {frame:?}")]
    Boundaries {
        /// Recorded first and last drawable.
        recorded: (Option<DrawableId>, Option<DrawableId>),
        /// The frame's first and last drawable.
        frame: (Option<DrawableId>, Option<DrawableId>),
    },
}

/// Checks that `backbone` tiles the frame `first..=last` of `drawables`.
///
/// Call after [`DrawableStore::apply_block_changes`].
///
/// # Errors
///
/// Returns the first violated invariant found, walking blocks in order.
pub fn check_consistency(
    backbone: &Backbone,
    drawables: &DrawableStore,
    first: Option<DrawableId>,
    last: Option<DrawableId>,
) -> Result<(), AuditError> {
    let recorded = (
        backbone.previous_first_drawable(),
        backbone.previous_last_drawable(),
    );
    if recorded != (first, last) {
        return Err(AuditError::Boundaries {
            recorded,
            frame: (first, last),
        });
    }
    if first.is_none() && !backbone.is_empty() {
        return Err(AuditError::BlocksWithoutDrawables {
            count: backbone.len(),
        });
    }

    let mut cursor = first;
    let mut previous: Option<(BlockId, Renderer)> = None;
    for &id in backbone.blocks() {
        let block = backbone.block(id);
        if block.is_disposed() {
            return Err(AuditError::DisposedBlock { block: id });
        }
        let (Some(block_first), Some(block_last)) = (block.first_drawable(), block.last_drawable())
        else {
            return Err(AuditError::EmptyBlock { block: id });
        };
        if cursor != Some(block_first) {
            return Err(AuditError::Gap {
                block: id,
                expected: cursor,
                found: block_first,
            });
        }

        let renderer = block.renderer();
        if let Some((left, left_renderer)) = previous
            && left_renderer.joins(renderer)
        {
            return Err(AuditError::Unmerged {
                left,
                right: id,
                renderer,
            });
        }

        let mut count = 0_u32;
        let mut reached = false;
        let mut bounds: Option<Rect> = None;
        for d in drawables.run(Some(block_first), Some(block_last)) {
            let owner = drawables.block(d);
            if owner != Some(id) {
                return Err(AuditError::Ownership {
                    drawable: d,
                    block: id,
                    owner,
                });
            }
            let drawable_renderer = drawables.renderer(d);
            if drawable_renderer != renderer {
                return Err(AuditError::RendererMismatch {
                    drawable: d,
                    drawable_renderer,
                    block: id,
                    block_renderer: renderer,
                });
            }
            count += 1;
            let b = drawables.bounds(d);
            bounds = Some(bounds.map_or(b, |u| u.union(b)));
            reached = d == block_last;
        }
        if !reached {
            return Err(AuditError::BrokenRange {
                block: id,
                last: block_last,
            });
        }
        if !renderer.is_shareable() && count != 1 {
            return Err(AuditError::SharedElement { block: id, count });
        }
        if block.drawable_count() != count || Some(block.bounds()) != bounds {
            return Err(AuditError::StaleInterval {
                block: id,
                reported: block.drawable_count(),
                actual: count,
            });
        }

        previous = Some((id, renderer));
        cursor = drawables.next(block_last);
    }

    match cursor {
        Some(first) => Err(AuditError::Uncovered { first }),
        None => Ok(()),
    }
}

/// Panics if `backbone` does not tile the frame `first..=last`.
///
/// # Panics
///
/// Panics with the [`AuditError`] found by [`check_consistency`].
pub fn assert_consistent(
    backbone: &Backbone,
    drawables: &DrawableStore,
    first: Option<DrawableId>,
    last: Option<DrawableId>,
) {
    if let Err(err) = check_consistency(backbone, drawables, first, last) {
        panic!("inconsistent backbone: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::BackboneId;
    use crate::block::Block;
    use crate::host::SurfaceHandle;

    fn scene(renderers: &[Renderer]) -> (DrawableStore, alloc::vec::Vec<DrawableId>) {
        let mut drawables = DrawableStore::new();
        let ids: alloc::vec::Vec<_> = renderers
            .iter()
            .map(|&r| drawables.create_drawable(r, Rect::new(0.0, 0.0, 1.0, 1.0)))
            .collect();
        drawables.link_run(&ids);
        (drawables, ids)
    }

    /// Builds a backbone whose blocks cover the given index ranges.
    fn backbone(
        drawables: &mut DrawableStore,
        ids: &[DrawableId],
        ranges: &[(usize, usize)],
    ) -> Backbone {
        let mut backbone = Backbone::new(BackboneId(0), SurfaceHandle(0));
        for (n, &(a, b)) in ranges.iter().enumerate() {
            let renderer = drawables.renderer(ids[a]);
            let id = backbone.insert_block(Block::new(renderer, SurfaceHandle(n as u64 + 1), ids[a]));
            backbone.block_mut(id).notify_interval(drawables, ids[a], ids[b]);
            for &d in &ids[a..=b] {
                drawables.block[d.index() as usize] = Some(id);
            }
            backbone.blocks.push(id);
        }
        backbone.previous_first_drawable = ids.first().copied();
        backbone.previous_last_drawable = ids.last().copied();
        backbone
    }

    #[test]
    fn tiled_frame_is_consistent() {
        let (mut drawables, ids) = scene(&[Renderer::Canvas, Renderer::Canvas, Renderer::Vector]);
        let backbone = backbone(&mut drawables, &ids, &[(0, 1), (2, 2)]);
        assert_eq!(
            check_consistency(&backbone, &drawables, Some(ids[0]), Some(ids[2])),
            Ok(())
        );
    }

    #[test]
    fn adjacent_same_renderer_blocks_are_reported() {
        let (mut drawables, ids) = scene(&[Renderer::Gpu, Renderer::Gpu]);
        let backbone = backbone(&mut drawables, &ids, &[(0, 0), (1, 1)]);
        let err = check_consistency(&backbone, &drawables, Some(ids[0]), Some(ids[1]));
        assert!(matches!(err, Err(AuditError::Unmerged { .. })), "{err:?}");
    }

    #[test]
    fn adjacent_element_blocks_are_fine() {
        let (mut drawables, ids) = scene(&[Renderer::Element, Renderer::Element]);
        let backbone = backbone(&mut drawables, &ids, &[(0, 0), (1, 1)]);
        assert!(check_consistency(&backbone, &drawables, Some(ids[0]), Some(ids[1])).is_ok());
    }

    #[test]
    fn uncovered_tail_is_reported() {
        let (mut drawables, ids) = scene(&[Renderer::Canvas, Renderer::Vector]);
        let backbone = backbone(&mut drawables, &ids, &[(0, 0)]);
        assert_eq!(
            check_consistency(&backbone, &drawables, Some(ids[0]), Some(ids[1])),
            Err(AuditError::Uncovered { first: ids[1] })
        );
    }

    #[test]
    fn foreign_owner_is_reported() {
        let (mut drawables, ids) = scene(&[Renderer::Canvas, Renderer::Canvas]);
        let backbone = backbone(&mut drawables, &ids, &[(0, 1)]);
        drawables.block[ids[1].index() as usize] = None;
        let err = check_consistency(&backbone, &drawables, Some(ids[0]), Some(ids[1]));
        assert!(matches!(err, Err(AuditError::Ownership { owner: None, .. })), "{err:?}");
    }

    #[test]
    #[should_panic(expected = "inconsistent backbone")]
    fn assert_consistent_panics_on_boundary_mismatch() {
        let (mut drawables, ids) = scene(&[Renderer::Canvas]);
        let mut backbone = backbone(&mut drawables, &ids, &[(0, 0)]);
        backbone.previous_last_drawable = None;
        assert_consistent(&backbone, &drawables, Some(ids[0]), Some(ids[0]));
    }
}
