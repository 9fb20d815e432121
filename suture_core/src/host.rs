// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native surface contract for platform integrations.
//!
//! Blocks are backed by native surfaces: a canvas element, an SVG root, a
//! platform view, a GPU swapchain texture. Suture never touches those
//! directly. Instead a platform crate implements [`SurfaceHost`], which
//! provides:
//!
//! - **Factories**: one per back end. Each returns `None` when the platform
//!   cannot produce that kind of surface; the stitcher treats asking for an
//!   unsupported renderer as a programmer error.
//! - **Tree edits**: DOM-style `append_child` / `remove_child` / `parent_of`
//!   on opaque [`SurfaceHandle`]s. Appending a surface that already has a
//!   parent moves it.
//! - **Teardown**: [`release_surface`](SurfaceHost::release_surface), called
//!   by the display layer for disposed blocks outside the stitch.
//!
//! [`HeadlessHost`] is an in-memory implementation used by tests and tooling.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crate::drawable::DrawableId;
use crate::renderer::Renderer;

/// An opaque reference to a native surface or container.
///
/// Hosts assign handles; core code passes them through without interpreting
/// the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle(pub u64);

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({})", self.0)
    }
}

/// Creates, attaches and releases native surfaces for blocks.
///
/// Factory methods default to `None` (unsupported), so a host only needs to
/// override the back ends it provides.
pub trait SurfaceHost {
    /// Creates an immediate-mode raster surface.
    fn create_canvas_surface(&mut self, representative: DrawableId) -> Option<SurfaceHandle> {
        _ = representative;
        None
    }

    /// Creates a vector-markup root.
    fn create_vector_surface(&mut self, representative: DrawableId) -> Option<SurfaceHandle> {
        _ = representative;
        None
    }

    /// Returns the native element owned by an element drawable.
    ///
    /// Element blocks do not own their surface: the same handle must be
    /// returned every time for the same drawable.
    fn element_surface(&mut self, drawable: DrawableId) -> Option<SurfaceHandle> {
        _ = drawable;
        None
    }

    /// Creates a GPU-accelerated surface.
    fn create_gpu_surface(&mut self, representative: DrawableId) -> Option<SurfaceHandle> {
        _ = representative;
        None
    }

    /// Appends `surface` as the last child of `container`, moving it from any
    /// previous parent.
    fn append_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle);

    /// Removes `surface` from `container`.
    fn remove_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle);

    /// Returns the current parent of `surface`, if attached.
    fn parent_of(&self, surface: SurfaceHandle) -> Option<SurfaceHandle>;

    /// Releases the native resources of a disposed block's surface.
    fn release_surface(&mut self, surface: SurfaceHandle) {
        _ = surface;
    }
}

/// Dispatches to the factory matching `renderer`.
pub(crate) fn create_surface(
    host: &mut dyn SurfaceHost,
    renderer: Renderer,
    representative: DrawableId,
) -> Option<SurfaceHandle> {
    match renderer {
        Renderer::Canvas => host.create_canvas_surface(representative),
        Renderer::Vector => host.create_vector_surface(representative),
        Renderer::Element => host.element_surface(representative),
        Renderer::Gpu => host.create_gpu_surface(representative),
    }
}

/// An in-memory [`SurfaceHost`] that models the native tree.
///
/// Every factory is supported unless disabled with
/// [`without`](Self::without). The host records created and released
/// surfaces so tests can assert on surface churn.
#[derive(Debug)]
pub struct HeadlessHost {
    next_handle: u64,
    supported: [bool; 4],
    parents: BTreeMap<SurfaceHandle, SurfaceHandle>,
    children: BTreeMap<SurfaceHandle, Vec<SurfaceHandle>>,
    elements: BTreeMap<DrawableId, SurfaceHandle>,
    created: Vec<(Renderer, SurfaceHandle)>,
    released: Vec<SurfaceHandle>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// Creates a host supporting every renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            supported: [true; 4],
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
            elements: BTreeMap::new(),
            created: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Disables the factory for `renderer`.
    #[must_use]
    pub fn without(mut self, renderer: Renderer) -> Self {
        self.supported[renderer as usize] = false;
        self
    }

    /// Creates a detached container surface (e.g. a backbone root).
    pub fn create_container(&mut self) -> SurfaceHandle {
        self.alloc()
    }

    /// Makes `drawable` present an existing element surface.
    ///
    /// Use this when the same element is shown by drawables of different
    /// stores, e.g. while it moves from one backbone to another.
    pub fn register_element(&mut self, drawable: DrawableId, surface: SurfaceHandle) {
        self.elements.insert(drawable, surface);
    }

    /// Returns the children of `container` in order.
    #[must_use]
    pub fn children(&self, container: SurfaceHandle) -> &[SurfaceHandle] {
        self.children.get(&container).map_or(&[], Vec::as_slice)
    }

    /// Returns every surface created by a factory, in creation order.
    ///
    /// Element surfaces are listed the first time they are requested.
    #[must_use]
    pub fn created(&self) -> &[(Renderer, SurfaceHandle)] {
        &self.created
    }

    /// Returns every released surface, in release order.
    #[must_use]
    pub fn released(&self) -> &[SurfaceHandle] {
        &self.released
    }

    fn alloc(&mut self) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn create(&mut self, renderer: Renderer) -> Option<SurfaceHandle> {
        if !self.supported[renderer as usize] {
            return None;
        }
        let handle = self.alloc();
        self.created.push((renderer, handle));
        Some(handle)
    }

    fn detach(&mut self, surface: SurfaceHandle) {
        if let Some(parent) = self.parents.remove(&surface) {
            if let Some(list) = self.children.get_mut(&parent) {
                list.retain(|&s| s != surface);
            }
        }
    }
}

impl SurfaceHost for HeadlessHost {
    fn create_canvas_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create(Renderer::Canvas)
    }

    fn create_vector_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create(Renderer::Vector)
    }

    fn element_surface(&mut self, drawable: DrawableId) -> Option<SurfaceHandle> {
        if let Some(&handle) = self.elements.get(&drawable) {
            return Some(handle);
        }
        let handle = self.create(Renderer::Element)?;
        self.elements.insert(drawable, handle);
        Some(handle)
    }

    fn create_gpu_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create(Renderer::Gpu)
    }

    fn append_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle) {
        self.detach(surface);
        self.children.entry(container).or_default().push(surface);
        self.parents.insert(surface, container);
    }

    fn remove_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle) {
        assert_eq!(
            self.parents.get(&surface),
            Some(&container),
            "{surface:?} is not a child of {container:?}"
        );
        self.detach(surface);
    }

    fn parent_of(&self, surface: SurfaceHandle) -> Option<SurfaceHandle> {
        self.parents.get(&surface).copied()
    }

    fn release_surface(&mut self, surface: SurfaceHandle) {
        self.detach(surface);
        self.released.push(surface);
    }
}
