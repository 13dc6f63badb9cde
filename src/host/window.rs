use std::cell::Cell;
use std::sync::Arc;

use winit::window::Window;

use super::HostRegion;
use crate::error::HostError;

/// A desktop window acting as the hero region. The renderer presents straight
/// into the window, so "appending" the surface only marks it as shown.
pub struct WindowRegion {
    window: Arc<Window>,
    attached: Cell<bool>,
}

impl WindowRegion {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            attached: Cell::new(false),
        }
    }
}

impl HostRegion for WindowRegion {
    type Surface = Arc<Window>;

    fn dimensions(&self) -> Option<(u32, u32)> {
        let size = self.window.inner_size();
        (size.width > 0 && size.height > 0).then_some((size.width, size.height))
    }

    fn append_surface(&self, surface: &Arc<Window>) -> Result<(), HostError> {
        if surface.id() != self.window.id() {
            return Err(HostError::Dom("surface belongs to another window".into()));
        }
        self.attached.set(true);
        self.window.request_redraw();
        Ok(())
    }

    fn contains_surface(&self, surface: &Arc<Window>) -> bool {
        self.attached.get() && surface.id() == self.window.id()
    }

    fn remove_surface(&self, surface: &Arc<Window>) -> Result<(), HostError> {
        if !self.contains_surface(surface) {
            return Err(HostError::Dom("surface is not shown in this window".into()));
        }
        self.attached.set(false);
        Ok(())
    }
}
