mod gpu;
mod headless;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use gpu::{GpuRenderer, OutputSurface};
pub use headless::{HeadlessRenderer, RenderStats};

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::{GeometryId, MaterialId, SceneGraph};

/// Draws a [`SceneGraph`] into an output surface that a host region can
/// display.
pub trait Renderer {
    type Surface;

    fn output_surface(&self) -> &Self::Surface;

    fn size(&self) -> (u32, u32);

    /// Resizes the output surface. Zero-sized requests are ignored.
    fn set_size(&mut self, width: u32, height: u32);

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
    ) -> Result<(), RenderError>;

    /// Frees the GPU buffers uploaded for `geometry`.
    fn release_geometry(&mut self, geometry: GeometryId);

    /// Frees the pipeline built for `material`.
    fn release_material(&mut self, material: MaterialId);

    /// Frees every remaining graphics resource. Further renders fail with
    /// [`RenderError::Disposed`].
    fn dispose(&mut self);
}
