// Copyright 2026 the Suture Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM surface management.
//!
//! Maps [`SurfaceHandle`]s to live DOM elements. Handles are slot indices;
//! slot 0 is the container passed to [`DomSurfaceHost::new`]. Released slots
//! are recycled, so a handle must not be used after its surface is released.
//!
//! Containers carry their slot index in a `data-suture-container` attribute,
//! which lets [`parent_of`](SurfaceHost::parent_of) resolve a parent without
//! scanning the slot table.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;
use suture_core::drawable::DrawableId;
use suture_core::host::{SurfaceHandle, SurfaceHost};
use wasm_bindgen::JsCast as _;
use web_sys::{Document, Element, HtmlElement};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const CONTAINER_ATTR: &str = "data-suture-container";
const RENDERER_ATTR: &str = "data-suture-renderer";

/// Creates block surfaces as children of DOM containers.
///
/// Element drawables present a DOM element owned by the application; register
/// it with [`register_element`](Self::register_element) before the first
/// stitch that includes the drawable.
pub struct DomSurfaceHost {
    document: Document,
    surfaces: Slots<Element>,
    elements: BTreeMap<DrawableId, SurfaceHandle>,
}

impl core::fmt::Debug for DomSurfaceHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomSurfaceHost")
            .field("document", &"Document")
            .field("surface_slots", &self.surfaces.capacity())
            .field("elements", &self.elements)
            .finish()
    }
}

impl DomSurfaceHost {
    /// Creates a host whose first container is `container`.
    ///
    /// Returns `None` if the container is not attached to a document.
    #[must_use]
    pub fn new(container: HtmlElement) -> Option<Self> {
        let document = container.owner_document()?;
        let mut host = Self {
            document,
            surfaces: Slots::new(),
            elements: BTreeMap::new(),
        };
        host.add_container(container);
        Some(host)
    }

    /// Returns the handle of the container passed to [`new`](Self::new).
    #[must_use]
    pub fn root(&self) -> SurfaceHandle {
        SurfaceHandle(0)
    }

    /// Registers another container element, e.g. for a second backbone.
    pub fn add_container(&mut self, container: HtmlElement) -> SurfaceHandle {
        let handle = self.surfaces.insert(container.into());
        if let Some(el) = self.surfaces.get(handle) {
            let _ = el.set_attribute(CONTAINER_ATTR, &format!("{}", handle.0));
        }
        handle
    }

    /// Registers the DOM element presented by an element drawable.
    ///
    /// Registering the same drawable again replaces the element's handle
    /// target; the handle itself stays the same.
    pub fn register_element(&mut self, drawable: DrawableId, element: Element) -> SurfaceHandle {
        if let Some(&handle) = self.elements.get(&drawable)
            && let Some(slot) = self.surfaces.get_mut(handle)
        {
            *slot = element;
            return handle;
        }
        let handle = self.surfaces.insert(element);
        self.elements.insert(drawable, handle);
        handle
    }

    /// Forgets the element of a destroyed drawable without touching the DOM.
    pub fn unregister_element(&mut self, drawable: DrawableId) {
        if let Some(handle) = self.elements.remove(&drawable) {
            self.surfaces.remove(handle);
        }
    }

    /// Returns the DOM element behind `handle`, if it is live.
    #[must_use]
    pub fn surface(&self, handle: SurfaceHandle) -> Option<&Element> {
        self.surfaces.get(handle)
    }

    /// Returns the surface as an [`HtmlElement`], e.g. a `<canvas>` to obtain
    /// a rendering context from.
    #[must_use]
    pub fn html_surface(&self, handle: SurfaceHandle) -> Option<&HtmlElement> {
        self.surface(handle)?.dyn_ref::<HtmlElement>()
    }

    /// Positions and sizes a surface to cover `bounds` in container
    /// coordinates.
    ///
    /// Canvas-backed surfaces also get a matching backing-store size.
    pub fn place_surface(&self, handle: SurfaceHandle, bounds: Rect) {
        let Some(el) = self.surface(handle) else {
            return;
        };
        let _ = el.set_attribute("style", &placement_style(bounds));
        if el.tag_name().eq_ignore_ascii_case("canvas") {
            let (width, height) = backing_size(bounds);
            let _ = el.set_attribute("width", &format!("{width}"));
            let _ = el.set_attribute("height", &format!("{height}"));
        }
    }

    /// Creates an absolutely positioned element for a new block.
    fn create(
        &mut self,
        tag: &str,
        namespace: Option<&str>,
        renderer: &str,
    ) -> Option<SurfaceHandle> {
        let el = match namespace {
            Some(ns) => self.document.create_element_ns(Some(ns), tag),
            None => self.document.create_element(tag),
        }
        .ok()?;
        let _ = el.set_attribute("style", &placement_style(Rect::ZERO));
        let _ = el.set_attribute(RENDERER_ATTR, renderer);
        Some(self.surfaces.insert(el))
    }
}

impl SurfaceHost for DomSurfaceHost {
    fn create_canvas_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create("canvas", None, "canvas")
    }

    fn create_vector_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create("svg", Some(SVG_NS), "vector")
    }

    fn element_surface(&mut self, drawable: DrawableId) -> Option<SurfaceHandle> {
        self.elements.get(&drawable).copied()
    }

    fn create_gpu_surface(&mut self, _representative: DrawableId) -> Option<SurfaceHandle> {
        self.create("canvas", None, "gpu")
    }

    fn append_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle) {
        if let (Some(parent), Some(child)) = (self.surface(container), self.surface(surface)) {
            // Appending an attached node moves it, which is how blocks are reordered.
            let _ = parent.append_child(child);
        }
    }

    fn remove_child(&mut self, container: SurfaceHandle, surface: SurfaceHandle) {
        if let (Some(parent), Some(child)) = (self.surface(container), self.surface(surface)) {
            let _ = parent.remove_child(child);
        }
    }

    fn parent_of(&self, surface: SurfaceHandle) -> Option<SurfaceHandle> {
        let parent = self.surface(surface)?.parent_element()?;
        let handle = SurfaceHandle(parent.get_attribute(CONTAINER_ATTR)?.parse().ok()?);
        self.surface(handle)?
            .is_same_node(Some(&*parent))
            .then_some(handle)
    }

    /// Removes a surface created by this host and recycles its slot.
    ///
    /// Containers and registered elements belong to the application and are
    /// left alone.
    fn release_surface(&mut self, surface: SurfaceHandle) {
        let created = self
            .surface(surface)
            .is_some_and(|el| el.has_attribute(RENDERER_ATTR));
        if created && let Some(el) = self.surfaces.remove(surface) {
            el.remove();
        }
    }
}

/// Slot table addressed by [`SurfaceHandle`], recycling released indices.
#[derive(Debug)]
struct Slots<T> {
    items: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Slots<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, item: T) -> SurfaceHandle {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.items[idx] = Some(item);
                idx
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };
        SurfaceHandle(idx as u64)
    }

    fn get(&self, handle: SurfaceHandle) -> Option<&T> {
        let idx = usize::try_from(handle.0).ok()?;
        self.items.get(idx)?.as_ref()
    }

    fn get_mut(&mut self, handle: SurfaceHandle) -> Option<&mut T> {
        let idx = usize::try_from(handle.0).ok()?;
        self.items.get_mut(idx)?.as_mut()
    }

    fn remove(&mut self, handle: SurfaceHandle) -> Option<T> {
        let idx = usize::try_from(handle.0).ok()?;
        let item = self.items.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some(item)
    }

    /// Number of slots ever allocated, live or free.
    fn capacity(&self) -> usize {
        self.items.len()
    }
}

/// Returns the inline style that places a surface over `bounds`.
fn placement_style(bounds: Rect) -> String {
    let bounds = bounds.abs();
    format!(
        "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px",
        bounds.x0,
        bounds.y0,
        bounds.width(),
        bounds.height(),
    )
}

/// Returns the pixel size of a canvas backing store covering `bounds`.
fn backing_size(bounds: Rect) -> (u32, u32) {
    let size = bounds.abs().expand().size();
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sizes are expanded to whole pixels and clamped to the u32 range"
    )]
    let px = |v: f64| v.clamp(0.0, f64::from(u32::MAX)) as u32;
    (px(size.width), px(size.height))
}
