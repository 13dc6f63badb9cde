use std::sync::Arc;

use winit::window::Window;

use super::{GpuRenderer, OutputSurface};
use crate::config::RendererOptions;
use crate::error::RenderError;

/// Renderer presenting straight into a winit window.
pub type WindowRenderer = GpuRenderer<Arc<Window>>;

impl OutputSurface for Arc<Window> {
    fn resize_output(&self, _width: u32, _height: u32) {
        self.request_redraw();
    }
}

/// Creates a renderer for `window` sized to the requested dimensions.
pub fn create_window_renderer(
    window: Arc<Window>,
    width: u32,
    height: u32,
    options: &RendererOptions,
) -> Result<WindowRenderer, RenderError> {
    let target = wgpu::SurfaceTarget::from(Arc::clone(&window));
    pollster::block_on(GpuRenderer::new(window, target, width, height, *options))
}
