// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The backbone: an ordered array of blocks under one native container.
//!
//! The backbone owns its block arena. The stitcher edits the block array and
//! the per-block boundaries during a [`Stitch`](crate::stitch::Stitch); the
//! display layer reads the results afterwards:
//!
//! - [`blocks`](Backbone::blocks): live blocks in paint order,
//! - [`take_dirty_blocks`](Backbone::take_dirty_blocks): blocks to repaint,
//! - [`take_resized_blocks`](Backbone::take_resized_blocks): blocks whose
//!   range or bounds changed,
//! - [`release_disposed`](Backbone::release_disposed): teardown of blocks
//!   disposed by the last stitch.
//!
//! Disposed blocks leave the array immediately but keep their arena slot
//! until released, so their handles stay valid for diagnostics.

use alloc::vec::Vec;
use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::block::{Block, BlockId, BlockStore};
use crate::dirty;
use crate::drawable::DrawableId;
use crate::host::{SurfaceHandle, SurfaceHost};

/// Identifies a backbone within a scene.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackboneId(pub u32);

impl fmt::Debug for BackboneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackboneId({})", self.0)
    }
}

/// Ordered block container bound to one native container surface.
#[derive(Debug)]
pub struct Backbone {
    id: BackboneId,
    container: SurfaceHandle,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) store: BlockStore,
    pub(crate) previous_first_drawable: Option<DrawableId>,
    pub(crate) previous_last_drawable: Option<DrawableId>,
    dirty: DirtyTracker<u32>,
    disposed: Vec<BlockId>,
}

impl Backbone {
    /// Creates an empty backbone attached to `container`.
    #[must_use]
    pub fn new(id: BackboneId, container: SurfaceHandle) -> Self {
        Self {
            id,
            container,
            blocks: Vec::new(),
            store: BlockStore::default(),
            previous_first_drawable: None,
            previous_last_drawable: None,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            disposed: Vec::new(),
        }
    }

    /// Returns the backbone's identifier.
    #[must_use]
    pub fn id(&self) -> BackboneId {
        self.id
    }

    /// Returns the native container that block surfaces are attached to.
    #[must_use]
    pub fn container(&self) -> SurfaceHandle {
        self.container
    }

    /// Returns the live blocks in paint order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns whether the backbone has no live blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns a block by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale (the block was released).
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        self.store.get(id)
    }

    /// Returns a block by handle, or `None` if it has been released.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.store.contains(id).then(|| self.store.get(id))
    }

    /// Returns whether the block is live.
    #[must_use]
    pub fn is_live(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(Block::is_live)
    }

    /// Returns the first drawable of the frame last stitched.
    #[must_use]
    pub fn previous_first_drawable(&self) -> Option<DrawableId> {
        self.previous_first_drawable
    }

    /// Returns the last drawable of the frame last stitched.
    #[must_use]
    pub fn previous_last_drawable(&self) -> Option<DrawableId> {
        self.previous_last_drawable
    }

    /// Returns the blocks disposed since the last release, in disposal order.
    #[must_use]
    pub fn disposed(&self) -> &[BlockId] {
        &self.disposed
    }

    // ---- dirty tracking ----

    /// Schedules a block for repaint.
    pub fn mark_dirty_block(&mut self, id: BlockId) {
        self.store.validate(id);
        self.dirty.mark(id.idx, dirty::REPAINT);
    }

    pub(crate) fn mark_interval_changed(&mut self, id: BlockId) {
        self.dirty.mark(id.idx, dirty::INTERVAL);
    }

    /// Drains the blocks scheduled for repaint, in slot order.
    pub fn take_dirty_blocks(&mut self) -> Vec<BlockId> {
        self.drain_channel(dirty::REPAINT)
    }

    /// Drains the blocks whose range or bounds changed, in slot order.
    pub fn take_resized_blocks(&mut self) -> Vec<BlockId> {
        self.drain_channel(dirty::INTERVAL)
    }

    fn drain_channel(&mut self, channel: understory_dirty::Channel) -> Vec<BlockId> {
        let keys: Vec<u32> = self.dirty.drain(channel).deterministic().run().collect();
        keys.into_iter()
            .filter_map(|idx| self.store.id_at(idx))
            .collect()
    }

    // ---- ordering ----

    /// Re-attaches every block surface in array order and refreshes block
    /// indices, so the native child order matches paint order.
    pub fn reindex_blocks(&mut self, host: &mut dyn SurfaceHost) {
        for (i, &id) in self.blocks.iter().enumerate() {
            let block = self.store.get_mut(id);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "block count is far below u32::MAX"
            )]
            let index = i as u32;
            block.index = index;
            host.append_child(self.container, block.surface);
        }
    }

    // ---- arena (stitcher side) ----

    pub(crate) fn insert_block(&mut self, block: Block) -> BlockId {
        self.store.insert(block)
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.store.get_mut(id)
    }

    /// Flags a block disposed and queues it for release.
    ///
    /// The block must already be out of the array.
    pub(crate) fn dispose(&mut self, id: BlockId) {
        self.store.get_mut(id).mark_for_disposal();
        self.dirty.remove_key(id.idx);
        self.disposed.push(id);
    }

    // ---- teardown (display side) ----

    /// Removes disposed blocks from the arena and returns them.
    ///
    /// The caller becomes responsible for the returned surfaces.
    pub fn take_disposed(&mut self) -> Vec<Block> {
        let ids = core::mem::take(&mut self.disposed);
        ids.into_iter().map(|id| self.store.remove(id)).collect()
    }

    /// Releases the surfaces of disposed blocks and frees their slots.
    ///
    /// Element surfaces belong to their drawable and are left alone. Returns
    /// the number of blocks released.
    pub fn release_disposed(&mut self, host: &mut dyn SurfaceHost) -> usize {
        let blocks = self.take_disposed();
        for block in &blocks {
            if block.owns_surface() {
                host.release_surface(block.surface);
            }
        }
        blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::renderer::Renderer;

    fn backbone_with(host: &mut HeadlessHost, renderers: &[Renderer]) -> Backbone {
        let container = host.create_container();
        let mut backbone = Backbone::new(BackboneId(0), container);
        for (i, &renderer) in renderers.iter().enumerate() {
            let surface = host.create_container();
            let id = backbone.insert_block(Block::new(
                renderer,
                surface,
                DrawableId::from_raw(i as u32, 0),
            ));
            backbone.blocks.push(id);
        }
        backbone
    }

    #[test]
    fn reindex_orders_native_children() {
        let mut host = HeadlessHost::new();
        let mut backbone = backbone_with(&mut host, &[Renderer::Canvas, Renderer::Vector]);
        backbone.blocks.reverse();
        backbone.reindex_blocks(&mut host);

        let surfaces: Vec<_> = backbone
            .blocks()
            .iter()
            .map(|&id| backbone.block(id).surface())
            .collect();
        assert_eq!(host.children(backbone.container()), surfaces.as_slice());
        assert_eq!(backbone.block(backbone.blocks()[1]).index(), 1);
    }

    #[test]
    fn dirty_blocks_drain_once() {
        let mut host = HeadlessHost::new();
        let mut backbone = backbone_with(&mut host, &[Renderer::Canvas, Renderer::Gpu]);
        let [a, b] = [backbone.blocks()[0], backbone.blocks()[1]];
        backbone.mark_dirty_block(b);
        backbone.mark_dirty_block(a);
        backbone.mark_dirty_block(b);

        assert_eq!(backbone.take_dirty_blocks(), [a, b]);
        assert!(backbone.take_dirty_blocks().is_empty());
    }

    #[test]
    fn disposed_blocks_leave_tracker() {
        let mut host = HeadlessHost::new();
        let mut backbone = backbone_with(&mut host, &[Renderer::Canvas, Renderer::Vector]);
        let [a, b] = [backbone.blocks()[0], backbone.blocks()[1]];
        backbone.mark_dirty_block(a);
        backbone.blocks.remove(0);
        backbone.dispose(a);

        assert_eq!(backbone.blocks(), [b]);
        assert!(!backbone.is_live(a));
        assert!(backbone.block(a).is_disposed());
        assert!(backbone.take_dirty_blocks().is_empty());
        assert_eq!(backbone.disposed(), [a]);
    }

    #[test]
    fn release_frees_slots_and_skips_elements() {
        let mut host = HeadlessHost::new();
        let mut backbone = backbone_with(&mut host, &[Renderer::Canvas, Renderer::Element]);
        let [a, b] = [backbone.blocks()[0], backbone.blocks()[1]];
        let surface_a = backbone.block(a).surface();
        backbone.blocks.clear();
        backbone.dispose(a);
        backbone.dispose(b);

        assert_eq!(backbone.release_disposed(&mut host), 2);
        assert_eq!(host.released(), [surface_a]);
        assert!(backbone.get(a).is_none());
        assert!(backbone.get(b).is_none());
        assert!(backbone.disposed().is_empty());
    }

    #[test]
    #[should_panic(expected = "stale BlockId")]
    fn released_handle_panics() {
        let mut host = HeadlessHost::new();
        let mut backbone = backbone_with(&mut host, &[Renderer::Canvas]);
        let a = backbone.blocks()[0];
        backbone.blocks.clear();
        backbone.dispose(a);
        backbone.release_disposed(&mut host);
        let _ = backbone.block(a);
    }
}
