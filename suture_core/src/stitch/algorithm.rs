// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gluing/ungluing pass.

use crate::block::BlockId;
use crate::drawable::DrawableId;
use crate::renderer::Renderer;
use crate::trace::{BlockReusedEvent, ReuseSource, SeamEvent, SeamKind, StitchSummary};

use super::Stitch;

/// The block currently receiving drawables during the seam walk.
#[derive(Clone, Copy, Debug)]
struct OpenBlock {
    block: BlockId,
    renderer: Renderer,
    last: DrawableId,
}

impl Stitch<'_, '_> {
    /// Runs the full reconciliation and returns its summary.
    ///
    /// # Panics
    ///
    /// Panics if the change intervals do not describe the difference between
    /// the previous and current frame, or if the host cannot create a surface
    /// for a renderer that needs one.
    pub fn run(mut self) -> StitchSummary {
        self.collect_removals();
        self.stitch_seams();
        self.dispose_unclaimed();
        self.rebuild_order();
        self.reindex();
        self.update_block_intervals();
        self.record_backbone_boundaries();

        #[expect(
            clippy::cast_possible_truncation,
            reason = "block count is far below u32::MAX"
        )]
        let blocks_after = self.backbone.len() as u32;
        self.summary.blocks_after = blocks_after;
        self.tracer.stitch_end(&self.summary);
        self.summary
    }

    // ---- phase 1 ----

    /// Records a removal for every old drawable inside a change interval and
    /// pools the blocks that lie entirely inside a removed run.
    fn collect_removals(&mut self) {
        let frame = self.frame;
        let intervals = self.intervals;
        for (_, interval) in
            intervals.iter_from(frame.first_change_interval, frame.last_change_interval)
        {
            let left = interval
                .drawable_before
                .and_then(|d| self.drawables.block(d));
            let right = interval
                .drawable_after
                .and_then(|d| self.drawables.block(d));
            for block in [left, right].into_iter().flatten() {
                self.put_at_risk(block);
            }

            let mut cursor = match interval.drawable_before {
                Some(before) => self.drawables.old_next(before),
                None => self.old_first_drawable,
            };
            while let Some(d) = cursor {
                if Some(d) == interval.drawable_after {
                    break;
                }
                cursor = self.drawables.old_next(d);
                let Some(block) = self.drawables.block(d) else {
                    continue;
                };
                self.note_pending_removal(d);
                self.touch(block);
                if Some(block) != left && Some(block) != right {
                    self.pool(block);
                }
            }
        }
    }

    fn put_at_risk(&mut self, block: BlockId) {
        let flags = self.flags(block);
        if !flags.at_risk {
            flags.at_risk = true;
            self.scratch.at_risk.push(block);
        }
    }

    fn pool(&mut self, block: BlockId) {
        let flags = self.flags(block);
        if !flags.pooled {
            flags.pooled = true;
            self.scratch.pool.push(block);
        }
        self.put_at_risk(block);
    }

    // ---- phase 2 ----

    /// Walks the new frame interval by interval, assigning blocks to new runs
    /// and resolving the seam after each interval.
    fn stitch_seams(&mut self) {
        let frame = self.frame;
        let intervals = self.intervals;
        let mut iter = intervals
            .iter_from(frame.first_change_interval, frame.last_change_interval)
            .peekable();
        let mut open: Option<OpenBlock> = None;

        while let Some((_, interval)) = iter.next() {
            match interval.drawable_before {
                Some(before) if open.is_none() => {
                    let Some(block) = self.drawables.block(before) else {
                        panic!("{before:?} precedes a change interval but has no block");
                    };
                    self.claim(block);
                    open = Some(OpenBlock {
                        block,
                        renderer: self.backbone.block(block).renderer(),
                        last: before,
                    });
                }
                Some(before) => {
                    debug_assert_eq!(open.map(|o| o.last), Some(before), "seam walk lost its place");
                }
                None => assert!(
                    open.is_none(),
                    "only the first change interval may be open at the start"
                ),
            }

            open = self.stitch_new_run(open, interval.drawable_before, interval.drawable_after);

            let Some(after) = interval.drawable_after else {
                continue;
            };
            let boundary = match iter.peek() {
                Some((_, next)) => {
                    let Some(before) = next.drawable_before else {
                        panic!("only the first change interval may be open at the start");
                    };
                    before
                }
                None => {
                    let Some(last) = frame.last_drawable else {
                        panic!("{after:?} follows a change interval in an empty frame");
                    };
                    last
                }
            };
            open = Some(self.stitch_chunk(open, after, boundary));
        }

        if let Some(o) = open {
            debug_assert_eq!(Some(o.last), frame.last_drawable, "seam walk ended early");
            self.close_block(o);
        }
    }

    /// Assigns blocks to the new run between `before` and `after`.
    fn stitch_new_run(
        &mut self,
        mut open: Option<OpenBlock>,
        before: Option<DrawableId>,
        after: Option<DrawableId>,
    ) -> Option<OpenBlock> {
        let start = match before {
            Some(before) => self.drawables.next(before),
            None => self.frame.first_drawable,
        };
        let mut run = core::mem::take(&mut self.scratch.run);
        run.clear();
        run.extend(
            self.drawables
                .run(start, None)
                .take_while(|&d| Some(d) != after),
        );

        for (i, &d) in run.iter().enumerate() {
            let renderer = self.drawables.renderer(d);
            if let Some(o) = open.as_mut().filter(|o| o.renderer.joins(renderer)) {
                self.note_pending_addition(d, o.block);
                self.mark_after_block(o.block, d);
                o.last = d;
                continue;
            }

            let is_last_group = run[i + 1..]
                .iter()
                .all(|&rest| renderer.joins(self.drawables.renderer(rest)));
            let block = self.block_for_group(d, renderer, is_last_group, after);
            if let Some(o) = open {
                self.close_block(o);
            }
            self.open_block(block, d);
            self.note_pending_addition(d, block);
            open = Some(OpenBlock {
                block,
                renderer,
                last: d,
            });
        }

        self.scratch.run = run;
        open
    }

    /// Picks the block for a group of new drawables starting at `first`.
    fn block_for_group(
        &mut self,
        first: DrawableId,
        renderer: Renderer,
        is_last_group: bool,
        after: Option<DrawableId>,
    ) -> BlockId {
        if !renderer.is_shareable() {
            if let Some(own) = self.drawables.block(first)
                && !self.is_claimed(own)
                && self.backbone.is_live(own)
            {
                return self.reuse(own, ReuseSource::Element);
            }
            return self.create_block(renderer, first);
        }

        if is_last_group
            && let Some(after) = after
            && let Some(block) = self.drawables.block(after)
            && !self.is_claimed(block)
            && renderer.joins(self.backbone.block(block).renderer())
        {
            return self.reuse(block, ReuseSource::After);
        }

        if let Some(block) = self.pooled_block(renderer) {
            return self.reuse(block, ReuseSource::Pool);
        }
        self.create_block(renderer, first)
    }

    /// Resolves the unchanged chunk that starts at `after` and ends at the end
    /// of its old block or at `boundary`, whichever comes first.
    fn stitch_chunk(
        &mut self,
        open: Option<OpenBlock>,
        after: DrawableId,
        boundary: DrawableId,
    ) -> OpenBlock {
        let Some(chunk_block) = self.drawables.block(after) else {
            panic!("{after:?} follows a change interval but has no block");
        };
        let (chunk_renderer, committed_last) = {
            let block = self.backbone.block(chunk_block);
            (block.renderer(), block.last_drawable())
        };
        let whole = self.drawables.block(boundary) == Some(chunk_block);
        let chunk_end = if whole {
            boundary
        } else {
            let Some(last) = committed_last else {
                panic!("{chunk_block:?} has no committed interval");
            };
            last
        };

        let mut glued_right = false;
        let target = match open {
            Some(o) if o.renderer.joins(chunk_renderer) => {
                if o.block == chunk_block {
                    o.block
                } else if self.glue_into_chunk(o, after, chunk_end, chunk_block) {
                    glued_right = true;
                    chunk_block
                } else {
                    self.move_chunk(after, chunk_end, chunk_block, o.block, SeamKind::Glue);
                    o.block
                }
            }
            _ if !self.is_claimed(chunk_block) => {
                self.claim(chunk_block);
                chunk_block
            }
            _ => {
                let block = match self.pooled_block(chunk_renderer) {
                    Some(block) => self.reuse(block, ReuseSource::Pool),
                    None => self.create_block(chunk_renderer, after),
                };
                self.move_chunk(after, chunk_end, chunk_block, block, SeamKind::Unglue);
                block
            }
        };

        if !glued_right && open.map(|o| o.block) != Some(target) {
            if let Some(o) = open {
                self.close_block(o);
            }
            self.open_block(target, after);
        }

        if whole {
            return OpenBlock {
                block: target,
                renderer: chunk_renderer,
                last: boundary,
            };
        }

        self.close_block(OpenBlock {
            block: target,
            renderer: chunk_renderer,
            last: chunk_end,
        });
        let Some(next) = self.drawables.block(boundary) else {
            panic!("{boundary:?} precedes a change interval but has no block");
        };
        self.claim(next);
        OpenBlock {
            block: next,
            renderer: self.backbone.block(next).renderer(),
            last: boundary,
        }
    }

    /// Glues the open block into the chunk's block instead of the other way
    /// round, if the open block is strictly smaller and only holds unchanged
    /// drawables. Returns whether it did.
    ///
    /// The open block is released and disposed with the other unclaimed
    /// blocks.
    fn glue_into_chunk(
        &mut self,
        open: OpenBlock,
        chunk_first: DrawableId,
        chunk_last: DrawableId,
        chunk_block: BlockId,
    ) -> bool {
        if self.flags(open.block).received || self.is_claimed(chunk_block) {
            return false;
        }
        let left = self.backbone.block(open.block);
        let left_first = if self.is_touched(open.block) {
            left.pending_first_drawable()
        } else {
            left.first_drawable()
        };
        let Some(left_first) = left_first else {
            return false;
        };
        let chunk_len = self
            .drawables
            .run(Some(chunk_first), Some(chunk_last))
            .count();
        let left_len = self
            .drawables
            .run(Some(left_first), Some(open.last))
            .take(chunk_len)
            .count();
        if left_len >= chunk_len {
            return false;
        }

        self.release_claim(open.block);
        self.put_at_risk(open.block);
        self.claim(chunk_block);
        self.move_chunk(left_first, open.last, open.block, chunk_block, SeamKind::Glue);
        self.mark_before_block(chunk_block, left_first);
        true
    }

    /// Moves the unchanged drawables `first..=last` from `from` into `to`.
    fn move_chunk(
        &mut self,
        first: DrawableId,
        last: DrawableId,
        from: BlockId,
        to: BlockId,
        kind: SeamKind,
    ) {
        self.touch(from);
        let mut run = core::mem::take(&mut self.scratch.run);
        run.clear();
        run.extend(self.drawables.run(Some(first), Some(last)));
        for &d in &run {
            self.note_pending_move(d, to);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "drawable count is far below u32::MAX"
        )]
        let moved = run.len() as u32;
        self.scratch.run = run;
        self.tracer.seam(&SeamEvent {
            stitch_index: self.summary.stitch_index,
            kind,
            block: to,
            chunk_first: first,
            moved,
        });
    }

    fn pooled_block(&self, renderer: Renderer) -> Option<BlockId> {
        if !renderer.is_shareable() {
            return None;
        }
        self.scratch.pool.iter().copied().find(|&block| {
            !self.is_claimed(block) && self.backbone.block(block).renderer() == renderer
        })
    }

    fn reuse(&mut self, block: BlockId, source: ReuseSource) -> BlockId {
        self.claim(block);
        if source != ReuseSource::After {
            self.order_dirty = true;
        }
        self.summary.blocks_reused += 1;
        self.tracer.block_reused(&BlockReusedEvent {
            stitch_index: self.summary.stitch_index,
            block,
            renderer: self.backbone.block(block).renderer(),
            source,
        });
        block
    }

    /// Starts `block` at `first`, unless its committed interval already does.
    fn open_block(&mut self, block: BlockId, first: DrawableId) {
        if self.is_touched(block) || self.backbone.block(block).first_drawable() != Some(first) {
            self.mark_before_block(block, first);
        }
    }

    /// Ends the open block at its last drawable, unless its committed
    /// interval already does.
    fn close_block(&mut self, open: OpenBlock) {
        if self.is_touched(open.block)
            || self.backbone.block(open.block).last_drawable() != Some(open.last)
        {
            self.mark_after_block(open.block, open.last);
        }
    }

    // ---- phase 3 ----

    fn dispose_unclaimed(&mut self) {
        let at_risk = core::mem::take(&mut self.scratch.at_risk);
        for &block in &at_risk {
            if !self.is_claimed(block) && !self.backbone.block(block).is_disposed() {
                self.mark_block_for_disposal(block);
            }
        }
        self.scratch.at_risk = at_risk;
    }

    /// Rebuilds the block array by walking block ranges of the new frame.
    fn rebuild_order(&mut self) {
        let Some(first) = self.frame.first_drawable else {
            self.use_no_blocks();
            return;
        };
        if !self.order_dirty {
            return;
        }

        let mut order = core::mem::take(&mut self.scratch.order);
        order.clear();
        let limit = self.backbone.store.slot_count();
        let mut cursor = Some(first);
        while let Some(d) = cursor {
            let Some(block) = self.drawables.target_block(d) else {
                panic!("{d:?} has no block after stitching");
            };
            let state = self.backbone.block(block);
            let last = if self.is_touched(block) {
                state.pending_last_drawable()
            } else {
                state.last_drawable()
            };
            let Some(last) = last else {
                panic!("{block:?} has no last drawable");
            };
            order.push(block);
            assert!(order.len() <= limit, "block ranges do not cover the frame in order");
            cursor = self.drawables.next(last);
        }

        self.use_no_blocks();
        for &block in &order {
            self.append_block(block);
        }
        self.scratch.order = order;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Rect;

    use crate::audit;
    use crate::backbone::{Backbone, BackboneId};
    use crate::drawable::{DrawableId, DrawableStore};
    use crate::host::{HeadlessHost, SurfaceHost};
    use crate::interval::ChangeIntervals;
    use crate::renderer::Renderer;
    use crate::stitch::{StitchFrame, Stitcher};
    use crate::trace::{StitchSummary, Tracer};

    use Renderer::{Canvas, Element, Gpu, Vector};

    type Bounds = (Option<DrawableId>, Option<DrawableId>);

    /// A backbone with its collaborators, driven frame by frame.
    struct Scene {
        drawables: DrawableStore,
        backbone: Backbone,
        host: HeadlessHost,
        stitcher: Stitcher,
        order: Vec<DrawableId>,
    }

    impl Scene {
        fn new() -> Self {
            Self::with_host(HeadlessHost::new())
        }

        fn with_host(mut host: HeadlessHost) -> Self {
            let container = host.create_container();
            Self {
                drawables: DrawableStore::new(),
                backbone: Backbone::new(BackboneId(0), container),
                host,
                stitcher: Stitcher::new(),
                order: Vec::new(),
            }
        }

        fn add(&mut self, renderer: Renderer) -> DrawableId {
            let x = f64::from(self.drawables.len);
            self.drawables
                .create_drawable(renderer, Rect::new(x * 10.0, 0.0, x * 10.0 + 8.0, 8.0))
        }

        fn relink(&mut self, order: &[DrawableId]) {
            for &d in &self.order {
                if !order.contains(&d) {
                    self.drawables.disconnect(d);
                }
            }
            self.drawables.link_run(order);
            self.order = order.to_vec();
        }

        /// Stitches `order` as the new frame without applying the results.
        fn stitch_only(&mut self, order: &[DrawableId], intervals: &[Bounds]) -> StitchSummary {
            self.relink(order);
            let mut arena = ChangeIntervals::new();
            for &(before, after) in intervals {
                arena.push(before, after);
            }
            let frame = StitchFrame::new(order.first().copied(), order.last().copied(), &arena);
            self.stitcher.stitch(
                &mut self.backbone,
                &mut self.drawables,
                &mut self.host,
                &arena,
                &mut Tracer::none(),
                frame,
            )
        }

        /// Stitches `order`, applies the results and audits the backbone.
        fn frame(&mut self, order: &[DrawableId], intervals: &[Bounds]) -> StitchSummary {
            let summary = self.stitch_only(order, intervals);
            self.drawables.apply_block_changes();
            self.drawables.commit_links();
            audit::assert_consistent(
                &self.backbone,
                &self.drawables,
                order.first().copied(),
                order.last().copied(),
            );
            self.backbone.release_disposed(&mut self.host);
            summary
        }

        /// Stitches the current links with explicit frame boundaries.
        fn stitch_between(
            &mut self,
            first: Option<DrawableId>,
            last: Option<DrawableId>,
        ) -> StitchSummary {
            let mut arena = ChangeIntervals::new();
            arena.push(None, None);
            let frame = StitchFrame::new(first, last, &arena);
            self.stitcher.stitch(
                &mut self.backbone,
                &mut self.drawables,
                &mut self.host,
                &arena,
                &mut Tracer::none(),
                frame,
            )
        }

        /// Returns each block's renderer and drawables, in array order.
        fn layout(&self) -> Vec<(Renderer, Vec<DrawableId>)> {
            self.backbone
                .blocks()
                .iter()
                .map(|&id| {
                    let block = self.backbone.block(id);
                    let run = self
                        .drawables
                        .run(block.first_drawable(), block.last_drawable())
                        .collect();
                    (block.renderer(), run)
                })
                .collect()
        }
    }

    #[test]
    fn first_frame_creates_one_block() {
        let mut scene = Scene::new();
        let d = scene.add(Canvas);
        let summary = scene.frame(&[d], &[(None, None)]);

        assert_eq!(scene.layout(), vec![(Canvas, vec![d])]);
        assert_eq!(summary.blocks_created, 1);
        assert_eq!(summary.interval_updates, 1);
        assert!(summary.reindexed);
        let block = scene.backbone.blocks()[0];
        assert_eq!(scene.drawables.block(d), Some(block));
        assert_eq!(
            scene.host.children(scene.backbone.container()),
            &[scene.backbone.block(block).surface()]
        );
        assert_eq!(scene.backbone.take_dirty_blocks(), [block]);
    }

    #[test]
    fn removing_separator_glues_neighbors() {
        let mut scene = Scene::new();
        let [c1, c2, v, c4, c5] = [Canvas, Canvas, Vector, Canvas, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, c2, v, c4, c5], &[(None, None)]);
        assert_eq!(scene.backbone.len(), 3);
        let [a, b, c] = [0, 1, 2].map(|i| scene.backbone.blocks()[i]);

        let summary = scene.frame(&[c1, c2, c4, c5], &[(Some(c2), Some(c4))]);

        assert_eq!(scene.layout(), vec![(Canvas, vec![c1, c2, c4, c5])]);
        assert_eq!(scene.backbone.blocks(), [a], "ties keep the left block");
        assert!(scene.backbone.get(b).is_none());
        assert!(scene.backbone.get(c).is_none());
        assert_eq!(summary.blocks_disposed, 2);
        assert_eq!(summary.moves, 2);
        assert_eq!(summary.blocks_created, 0);
    }

    #[test]
    fn glue_keeps_the_larger_side() {
        let mut scene = Scene::new();
        let [c1, v, c3, c4, c5] = [Canvas, Vector, Canvas, Canvas, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, v, c3, c4, c5], &[(None, None)]);
        let [left, _, right] = [0, 1, 2].map(|i| scene.backbone.blocks()[i]);

        let summary = scene.frame(&[c1, c3, c4, c5], &[(Some(c1), Some(c3))]);

        assert_eq!(scene.layout(), vec![(Canvas, vec![c1, c3, c4, c5])]);
        assert_eq!(scene.backbone.blocks(), [right]);
        assert!(scene.backbone.get(left).is_none());
        assert_eq!(scene.drawables.block(c1), Some(right));
        assert_eq!(summary.moves, 1);
        assert_eq!(summary.blocks_disposed, 2);
        assert_eq!(summary.interval_updates, 1);
    }

    #[test]
    fn glue_after_addition_keeps_the_left_block() {
        let mut scene = Scene::new();
        let [c1, v, c3, c4, c5] = [Canvas, Vector, Canvas, Canvas, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, v, c3, c4, c5], &[(None, None)]);
        let left = scene.backbone.blocks()[0];

        let c2 = scene.add(Canvas);
        let summary = scene.frame(&[c1, c2, c3, c4, c5], &[(Some(c1), Some(c3))]);

        assert_eq!(scene.layout(), vec![(Canvas, vec![c1, c2, c3, c4, c5])]);
        assert_eq!(scene.backbone.blocks(), [left]);
        assert_eq!(summary.moves, 3);
    }

    #[test]
    fn inserting_other_renderer_splits_block() {
        let mut scene = Scene::new();
        let [v1, v2] = [Vector, Vector].map(|r| scene.add(r));
        scene.frame(&[v1, v2], &[(None, None)]);
        let a = scene.backbone.blocks()[0];

        let c = scene.add(Canvas);
        let summary = scene.frame(&[v1, c, v2], &[(Some(v1), Some(v2))]);

        assert_eq!(
            scene.layout(),
            vec![(Vector, vec![v1]), (Canvas, vec![c]), (Vector, vec![v2])]
        );
        assert_eq!(scene.backbone.blocks()[0], a);
        assert_eq!(summary.blocks_created, 2);
        assert_eq!(summary.moves, 1);
        assert_eq!(summary.blocks_disposed, 0);
    }

    #[test]
    fn element_drawables_get_dedicated_blocks() {
        let mut scene = Scene::new();
        let [c1, e1, e2, c2] = [Canvas, Element, Element, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, e1, e2, c2], &[(None, None)]);

        assert_eq!(
            scene.layout(),
            vec![
                (Canvas, vec![c1]),
                (Element, vec![e1]),
                (Element, vec![e2]),
                (Canvas, vec![c2]),
            ]
        );
    }

    #[test]
    fn inserting_element_splits_shared_block() {
        let mut scene = Scene::new();
        let [g1, g2] = [Gpu, Gpu].map(|r| scene.add(r));
        scene.frame(&[g1, g2], &[(None, None)]);

        let e = scene.add(Element);
        scene.frame(&[g1, e, g2], &[(Some(g1), Some(g2))]);
        assert_eq!(
            scene.layout(),
            vec![(Gpu, vec![g1]), (Element, vec![e]), (Gpu, vec![g2])]
        );
    }

    #[test]
    fn pooled_block_is_reused_for_same_renderer() {
        let mut scene = Scene::new();
        let [v1, c, v2] = [Vector, Canvas, Vector].map(|r| scene.add(r));
        scene.frame(&[v1, c, v2], &[(None, None)]);
        let canvas_block = scene.backbone.blocks()[1];
        let created = scene.host.created().len();

        let replacement = scene.add(Canvas);
        let summary = scene.frame(&[v1, replacement, v2], &[(Some(v1), Some(v2))]);

        assert_eq!(summary.blocks_created, 0);
        assert_eq!(summary.blocks_reused, 1);
        assert_eq!(scene.host.created().len(), created);
        assert_eq!(scene.drawables.block(replacement), Some(canvas_block));
        assert_eq!(
            scene.layout(),
            vec![(Vector, vec![v1]), (Canvas, vec![replacement]), (Vector, vec![v2])]
        );
    }

    #[test]
    fn reincluded_element_keeps_its_block() {
        let mut scene = Scene::new();
        let [c1, e, c2] = [Canvas, Element, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, e, c2], &[(None, None)]);
        let element_block = scene.drawables.block(e);

        let summary = scene.frame(&[c1, e, c2], &[(Some(c1), Some(c2))]);

        assert_eq!(scene.drawables.block(e), element_block);
        assert_eq!(summary.blocks_created, 0);
        assert_eq!(summary.blocks_disposed, 0);
        assert_eq!(summary.interval_updates, 1, "only the element block is refreshed");
    }

    #[test]
    fn new_run_extends_right_block() {
        let mut scene = Scene::new();
        let [v, c1] = [Vector, Canvas].map(|r| scene.add(r));
        scene.frame(&[v, c1], &[(None, None)]);
        let canvas_block = scene.backbone.blocks()[1];

        let c0 = scene.add(Canvas);
        let summary = scene.frame(&[v, c0, c1], &[(Some(v), Some(c1))]);

        assert_eq!(summary.blocks_created, 0);
        assert_eq!(scene.drawables.block(c0), Some(canvas_block));
        assert_eq!(
            scene.layout(),
            vec![(Vector, vec![v]), (Canvas, vec![c0, c1])]
        );
    }

    #[test]
    fn untouched_blocks_are_not_refreshed() {
        let mut scene = Scene::new();
        let [c1, c2, v1] = [Canvas, Canvas, Vector].map(|r| scene.add(r));
        scene.frame(&[c1, c2, v1], &[(None, None)]);
        let _ = scene.backbone.take_dirty_blocks();

        let u = scene.add(Vector);
        let summary = scene.frame(&[u, c1, c2, v1], &[(None, Some(c1))]);

        assert_eq!(summary.blocks_created, 1);
        assert_eq!(summary.interval_updates, 1);
        assert_eq!(scene.backbone.take_dirty_blocks(), [scene.drawables.block(u).unwrap()]);
        assert_eq!(
            scene.layout(),
            vec![(Vector, vec![u]), (Canvas, vec![c1, c2]), (Vector, vec![v1])]
        );
    }

    #[test]
    fn removal_inside_block_refreshes_it() {
        let mut scene = Scene::new();
        let [c1, c2, c3] = [Canvas, Canvas, Canvas].map(|r| scene.add(r));
        scene.frame(&[c1, c2, c3], &[(None, None)]);
        let block = scene.backbone.blocks()[0];

        let summary = scene.frame(&[c1, c3], &[(Some(c1), Some(c3))]);

        assert_eq!(summary.interval_updates, 1);
        assert_eq!(scene.backbone.block(block).drawable_count(), 2);
        assert_eq!(scene.drawables.block(c2), None);
        scene.drawables.destroy_drawable(c2);
    }

    #[test]
    fn multiple_intervals_cascade() {
        let mut scene = Scene::new();
        let [c1, c2, c3, c4, c5] = [Canvas; 5].map(|r| scene.add(r));
        scene.frame(&[c1, c2, c3, c4, c5], &[(None, None)]);

        let [v, w] = [Vector, Vector].map(|r| scene.add(r));
        scene.frame(
            &[c1, v, c3, w, c5],
            &[(Some(c1), Some(c3)), (Some(c3), Some(c5))],
        );
        assert_eq!(
            scene.layout(),
            vec![
                (Canvas, vec![c1]),
                (Vector, vec![v]),
                (Canvas, vec![c3]),
                (Vector, vec![w]),
                (Canvas, vec![c5]),
            ]
        );

        // Removing both separators glues everything back into one block.
        let summary = scene.frame(
            &[c1, c3, c5],
            &[(Some(c1), Some(c3)), (Some(c3), Some(c5))],
        );
        assert_eq!(scene.layout(), vec![(Canvas, vec![c1, c3, c5])]);
        assert_eq!(summary.blocks_disposed, 4);
    }

    #[test]
    fn clearing_scene_disposes_everything() {
        let mut scene = Scene::new();
        let [c, e, g] = [Canvas, Element, Gpu].map(|r| scene.add(r));
        scene.frame(&[c, e, g], &[(None, None)]);

        let summary = scene.frame(&[], &[(None, None)]);

        assert!(scene.backbone.is_empty());
        assert_eq!(summary.blocks_disposed, 3);
        assert!(scene.host.children(scene.backbone.container()).is_empty());
        assert_eq!(scene.backbone.previous_first_drawable(), None);
        assert_eq!(scene.backbone.previous_last_drawable(), None);
    }

    #[test]
    fn backbone_boundaries_follow_frame() {
        let mut scene = Scene::new();
        let [a, b] = [Canvas, Vector].map(|r| scene.add(r));
        scene.frame(&[a, b], &[(None, None)]);
        assert_eq!(scene.backbone.previous_first_drawable(), Some(a));
        assert_eq!(scene.backbone.previous_last_drawable(), Some(b));

        let c = scene.add(Gpu);
        scene.frame(&[a, b, c], &[(Some(b), None)]);
        assert_eq!(scene.backbone.previous_last_drawable(), Some(c));
    }

    #[test]
    #[should_panic(expected = "at least one change interval")]
    fn stitch_without_interval_panics() {
        let mut scene = Scene::new();
        let d = scene.add(Canvas);
        scene.frame(&[d], &[]);
    }

    #[test]
    #[should_panic(expected = "has a predecessor")]
    fn first_drawable_with_predecessor_panics() {
        let mut scene = Scene::new();
        let [a, b] = [Canvas, Canvas].map(|r| scene.add(r));
        scene.relink(&[a, b]);
        scene.stitch_between(Some(b), Some(b));
    }

    #[test]
    #[should_panic(expected = "has a successor")]
    fn last_drawable_with_successor_panics() {
        let mut scene = Scene::new();
        let [a, b] = [Canvas, Canvas].map(|r| scene.add(r));
        scene.relink(&[a, b]);
        scene.stitch_between(Some(a), Some(a));
    }

    #[test]
    #[should_panic(expected = "previous first drawable")]
    fn previous_first_drawable_with_predecessor_panics() {
        let mut scene = Scene::new();
        let [a, b] = [Canvas, Vector].map(|r| scene.add(r));
        scene.frame(&[a, b], &[(None, None)]);

        // Committing without a stitch leaves the backbone's boundaries stale.
        scene.relink(&[b, a]);
        scene.drawables.commit_links();
        scene.stitch_only(&[b, a], &[(None, None)]);
    }

    #[test]
    #[should_panic(expected = "previous last drawable")]
    fn previous_last_drawable_with_successor_panics() {
        let mut scene = Scene::new();
        let [a, b] = [Canvas, Vector].map(|r| scene.add(r));
        scene.frame(&[a, b], &[(None, None)]);

        let c = scene.add(Gpu);
        scene.relink(&[a, b, c]);
        scene.drawables.commit_links();
        scene.stitch_only(&[a, b, c], &[(Some(b), None)]);
    }

    #[test]
    #[should_panic(expected = "already recorded")]
    fn recording_boundaries_twice_panics() {
        let mut scene = Scene::new();
        let mut arena = ChangeIntervals::new();
        arena.push(None, None);
        let mut tracer = Tracer::none();
        let mut session = scene.stitcher.begin(
            &mut scene.backbone,
            &mut scene.drawables,
            &mut scene.host,
            &arena,
            &mut tracer,
            StitchFrame::new(None, None, &arena),
        );
        session.record_backbone_boundaries();
        session.record_backbone_boundaries();
    }

    #[test]
    #[should_panic(expected = "unsupported renderer")]
    fn unsupported_renderer_panics() {
        let mut scene = Scene::with_host(HeadlessHost::new().without(Gpu));
        let d = scene.add(Gpu);
        scene.frame(&[d], &[(None, None)]);
    }

    #[test]
    #[should_panic(expected = "never applied")]
    fn unapplied_changes_panic() {
        let mut scene = Scene::new();
        let d = scene.add(Canvas);
        scene.stitch_only(&[d], &[(None, None)]);
        scene.stitch_only(&[d], &[(None, None)]);
    }

    #[test]
    #[should_panic(expected = "renderer mismatch")]
    fn addition_to_foreign_block_panics() {
        let mut scene = Scene::new();
        let v = scene.add(Vector);
        scene.relink(&[v]);
        let mut arena = ChangeIntervals::new();
        arena.push(None, None);
        let mut tracer = Tracer::none();
        let mut session = scene.stitcher.begin(
            &mut scene.backbone,
            &mut scene.drawables,
            &mut scene.host,
            &arena,
            &mut tracer,
            StitchFrame::new(Some(v), Some(v), &arena),
        );
        let block = session.create_block(Canvas, v);
        session.note_pending_addition(v, block);
    }

    #[test]
    fn dropping_session_cleans_scratch() {
        let mut scene = Scene::new();
        let c = scene.add(Canvas);
        scene.relink(&[c]);
        let mut arena = ChangeIntervals::new();
        arena.push(None, None);
        let mut tracer = Tracer::none();
        {
            let mut session = scene.stitcher.begin(
                &mut scene.backbone,
                &mut scene.drawables,
                &mut scene.host,
                &arena,
                &mut tracer,
                StitchFrame::new(Some(c), Some(c), &arena),
            );
            let block = session.create_block(Canvas, c);
            session.mark_before_block(block, c);
        }
        assert!(scene.stitcher.scratch.touched.is_empty());
        assert!(scene.stitcher.scratch.flags.is_empty());
        assert_eq!(scene.stitcher.stitch_count(), 1);
    }

    #[test]
    fn element_surface_survives_reordering() {
        let mut scene = Scene::new();
        let [c, e] = [Canvas, Element].map(|r| scene.add(r));
        scene.frame(&[c, e], &[(None, None)]);
        let surface = scene.host.element_surface(e).unwrap();

        scene.frame(&[e, c], &[(None, None)]);

        assert_eq!(scene.layout(), vec![(Element, vec![e]), (Canvas, vec![c])]);
        let container = scene.backbone.container();
        assert_eq!(scene.host.parent_of(surface), Some(container));
        assert_eq!(scene.host.children(container)[0], surface);
        assert!(!scene.host.released().contains(&surface));
    }

    #[test]
    fn element_handoff_leaves_surface_with_new_backbone() {
        let mut host = HeadlessHost::new();
        let mut stitcher = Stitcher::new();
        let mut arena = ChangeIntervals::new();
        arena.push(None, None);
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);

        let mut old_drawables = DrawableStore::new();
        let mut old_backbone = Backbone::new(BackboneId(0), host.create_container());
        let e_old = old_drawables.create_drawable(Element, bounds);
        old_drawables.link_run(&[e_old]);
        stitcher.stitch(
            &mut old_backbone,
            &mut old_drawables,
            &mut host,
            &arena,
            &mut Tracer::none(),
            StitchFrame::new(Some(e_old), Some(e_old), &arena),
        );
        old_drawables.apply_block_changes();
        old_drawables.commit_links();
        let surface = host.element_surface(e_old).unwrap();

        // Another backbone picks the element up before the old one lets go.
        let mut new_drawables = DrawableStore::new();
        let mut new_backbone = Backbone::new(BackboneId(1), host.create_container());
        let _unlinked = new_drawables.create_drawable(Canvas, bounds);
        let e_new = new_drawables.create_drawable(Element, bounds);
        assert_ne!(e_new, e_old);
        host.register_element(e_new, surface);
        new_drawables.link_run(&[e_new]);
        stitcher.stitch(
            &mut new_backbone,
            &mut new_drawables,
            &mut host,
            &arena,
            &mut Tracer::none(),
            StitchFrame::new(Some(e_new), Some(e_new), &arena),
        );
        new_drawables.apply_block_changes();
        new_drawables.commit_links();
        assert_eq!(host.parent_of(surface), Some(new_backbone.container()));

        old_drawables.disconnect(e_old);
        let summary = stitcher.stitch(
            &mut old_backbone,
            &mut old_drawables,
            &mut host,
            &arena,
            &mut Tracer::none(),
            StitchFrame::new(None, None, &arena),
        );
        old_drawables.apply_block_changes();
        old_drawables.commit_links();
        old_backbone.release_disposed(&mut host);

        assert_eq!(summary.blocks_disposed, 1);
        assert!(old_backbone.is_empty());
        assert_eq!(host.parent_of(surface), Some(new_backbone.container()));
        assert_eq!(host.children(new_backbone.container()), &[surface]);
        assert!(host.children(old_backbone.container()).is_empty());
        assert!(!host.released().contains(&surface));
    }

    #[test]
    fn clearing_many_blocks_empties_container() {
        let mut scene = Scene::new();
        let order: Vec<_> = (0..32)
            .map(|i| scene.add(if i % 2 == 0 { Canvas } else { Vector }))
            .collect();
        scene.frame(&order, &[(None, None)]);
        assert_eq!(scene.backbone.len(), 32);

        let summary = scene.frame(&[], &[(None, None)]);

        assert_eq!(summary.blocks_disposed, 32);
        assert!(scene.backbone.is_empty());
        assert!(scene.host.children(scene.backbone.container()).is_empty());
        assert_eq!(scene.host.released().len(), 32);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn sink_receives_stitch_events() {
        use crate::trace::{BlockCreatedEvent, StitchBeginEvent, StitchSink};

        #[derive(Default)]
        struct Counts {
            begins: u32,
            created: u32,
            ends: Vec<StitchSummary>,
        }
        impl StitchSink for Counts {
            fn on_stitch_begin(&mut self, _: &StitchBeginEvent) {
                self.begins += 1;
            }
            fn on_block_created(&mut self, _: &BlockCreatedEvent) {
                self.created += 1;
            }
            fn on_stitch_end(&mut self, s: &StitchSummary) {
                self.ends.push(*s);
            }
        }

        let mut scene = Scene::new();
        let [a, b] = [Canvas, Vector].map(|r| scene.add(r));
        scene.relink(&[a, b]);
        let mut arena = ChangeIntervals::new();
        arena.push(None, None);
        let mut sink = Counts::default();
        let mut tracer = Tracer::new(&mut sink);
        let summary = scene.stitcher.stitch(
            &mut scene.backbone,
            &mut scene.drawables,
            &mut scene.host,
            &arena,
            &mut tracer,
            StitchFrame::new(Some(a), Some(b), &arena),
        );
        drop(tracer);

        assert_eq!(sink.begins, 1);
        assert_eq!(sink.created, 2);
        assert_eq!(sink.ends, [summary]);
    }
}
