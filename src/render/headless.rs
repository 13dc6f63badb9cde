use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use super::Renderer;
use crate::camera::PerspectiveCamera;
use crate::config::RendererOptions;
use crate::error::RenderError;
use crate::host::queued::SurfaceId;
use crate::scene::{GeometryId, MaterialId, SceneGraph};

/// Counters shared between a [`HeadlessRenderer`] and whoever observes it;
/// they outlive the renderer itself.
#[derive(Debug, Default)]
pub struct RenderStats {
    frames: Cell<u64>,
    resizes: Cell<u64>,
    disposed: Cell<bool>,
    live_geometries: RefCell<HashSet<GeometryId>>,
    live_materials: RefCell<HashSet<MaterialId>>,
}

impl RenderStats {
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    pub fn resizes(&self) -> u64 {
        self.resizes.get()
    }

    pub fn disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Geometries uploaded and not yet released.
    pub fn live_geometries(&self) -> usize {
        self.live_geometries.borrow().len()
    }

    pub fn live_materials(&self) -> usize {
        self.live_materials.borrow().len()
    }
}

/// Renderer that tracks what a GPU renderer would allocate without touching
/// any graphics API. Used when no display is available.
#[derive(Debug)]
pub struct HeadlessRenderer {
    surface: SurfaceId,
    size: (u32, u32),
    stats: Rc<RenderStats>,
}

impl HeadlessRenderer {
    /// Nothing is drawn, so `_options` has no effect.
    pub fn new(width: u32, height: u32, _options: RendererOptions) -> Self {
        Self {
            surface: SurfaceId::next(),
            size: (width.max(1), height.max(1)),
            stats: Rc::new(RenderStats::default()),
        }
    }

    pub fn stats(&self) -> Rc<RenderStats> {
        Rc::clone(&self.stats)
    }
}

impl Renderer for HeadlessRenderer {
    type Surface = SurfaceId;

    fn output_surface(&self) -> &SurfaceId {
        &self.surface
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.stats.resizes.set(self.stats.resizes.get() + 1);
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        _camera: &PerspectiveCamera,
    ) -> Result<(), RenderError> {
        if self.stats.disposed.get() {
            return Err(RenderError::Disposed);
        }
        for mesh in scene.meshes() {
            self.stats
                .live_geometries
                .borrow_mut()
                .insert(mesh.geometry.id());
            self.stats
                .live_materials
                .borrow_mut()
                .insert(mesh.material.id());
        }
        self.stats.frames.set(self.stats.frames.get() + 1);
        Ok(())
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.stats.live_geometries.borrow_mut().remove(&geometry);
    }

    fn release_material(&mut self, material: MaterialId) {
        self.stats.live_materials.borrow_mut().remove(&material);
    }

    fn dispose(&mut self) {
        self.stats.live_geometries.borrow_mut().clear();
        self.stats.live_materials.borrow_mut().clear();
        self.stats.disposed.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshData;
    use crate::scene::{Geometry, Material, Mesh};

    #[test]
    fn render_uploads_and_release_frees() {
        let mut renderer = HeadlessRenderer::new(800, 600, RendererOptions::default());
        let stats = renderer.stats();
        let mut scene = SceneGraph::new();
        let mesh = Mesh::new(Geometry::new(MeshData::default()), Material::normal());
        let (geometry, material) = (mesh.geometry.id(), mesh.material.id());
        scene.add(mesh);
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);

        renderer.render(&scene, &camera).unwrap();
        assert_eq!(stats.live_geometries(), 1);
        assert_eq!(stats.live_materials(), 1);
        renderer.release_geometry(geometry);
        renderer.release_material(material);
        assert_eq!(stats.live_geometries(), 0);
        assert_eq!(stats.live_materials(), 0);
    }

    #[test]
    fn disposed_renderer_refuses_to_render() {
        let mut renderer = HeadlessRenderer::new(800, 600, RendererOptions::default());
        renderer.dispose();
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        assert!(matches!(
            renderer.render(&SceneGraph::new(), &camera),
            Err(RenderError::Disposed)
        ));
        assert!(renderer.stats().disposed());
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut renderer = HeadlessRenderer::new(800, 600, RendererOptions::default());
        renderer.set_size(0, 300);
        assert_eq!(renderer.size(), (800, 600));
        assert_eq!(renderer.stats().resizes(), 0);
    }
}
