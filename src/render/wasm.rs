use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use super::{GpuRenderer, OutputSurface};
use crate::config::RendererOptions;
use crate::error::RenderError;

/// Renderer drawing into a canvas it owns.
pub type CanvasRenderer = GpuRenderer<HtmlCanvasElement>;

impl OutputSurface for HtmlCanvasElement {
    fn resize_output(&self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
        let style = self.style();
        let _ = style.set_property("width", &format!("{width}px"));
        let _ = style.set_property("height", &format!("{height}px"));
    }
}

/// Creates a detached canvas of the given size; the caller appends it to the
/// page.
pub fn create_canvas(width: u32, height: u32) -> Result<HtmlCanvasElement, RenderError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| RenderError::CreateSurface("no document available".into()))?;
    let canvas = document
        .create_element("canvas")
        .map_err(|err| RenderError::CreateSurface(format!("{err:?}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| RenderError::CreateSurface("created element is not a canvas".into()))?;
    canvas.resize_output(width, height);
    Ok(canvas)
}

/// Creates a canvas and a renderer bound to it.
pub async fn create_canvas_renderer(
    width: u32,
    height: u32,
    options: RendererOptions,
) -> Result<CanvasRenderer, RenderError> {
    let canvas = create_canvas(width, height)?;
    let target = wgpu::SurfaceTarget::Canvas(canvas.clone());
    GpuRenderer::new(canvas, target, width, height, options).await
}
