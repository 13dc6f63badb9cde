//! Seams between the runtime and whatever page or window hosts it.
//!
//! The hero scene and the navigation controller only ever talk to the traits
//! in this module. [`queued`] provides an in-process implementation used by
//! the headless binary and the tests; `window` binds a desktop window and the
//! `wasm` submodule binds the same traits to the browser.

use std::fmt;
use std::rc::Rc;

use crate::error::HostError;

pub mod queued;
#[cfg(target_arch = "wasm32")]
pub mod wasm;
#[cfg(not(target_arch = "wasm32"))]
pub mod window;

/// Screen area that can display one renderer output surface.
pub trait HostRegion {
    type Surface;

    /// Current pixel size, or `None` when the region is gone from the page or
    /// has no area.
    fn dimensions(&self) -> Option<(u32, u32)>;

    fn append_surface(&self, surface: &Self::Surface) -> Result<(), HostError>;

    fn contains_surface(&self, surface: &Self::Surface) -> bool;

    fn remove_surface(&self, surface: &Self::Surface) -> Result<(), HostError>;
}

/// Token for a frame callback that has been requested but has not run yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// "Call me back before the next display refresh."
pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameHandle, HostError>;

    /// Cancelling a handle that already ran or was already cancelled is a no-op.
    fn cancel_frame(&self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    Scroll,
    Resize,
}

/// Ambient viewport measurements sampled when an event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportReading {
    pub scroll_y: f64,
    pub width: u32,
    pub height: u32,
}

pub type ViewportListener = Box<dyn FnMut(ViewportReading)>;

pub trait ViewportSignals {
    fn reading(&self) -> ViewportReading;

    /// Registers `listener` until the returned [`Subscription`] is dropped or
    /// cancelled.
    fn listen(&self, event: ViewportEvent, listener: ViewportListener) -> Subscription;
}

/// Guard that deregisters a listener when dropped.
#[must_use = "dropping a subscription removes its listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Host facilities shared by every component mounted on a page.
#[derive(Clone)]
pub struct HostServices {
    pub scheduler: Rc<dyn FrameScheduler>,
    pub signals: Rc<dyn ViewportSignals>,
}

impl HostServices {
    pub fn new(scheduler: Rc<dyn FrameScheduler>, signals: Rc<dyn ViewportSignals>) -> Self {
        Self { scheduler, signals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscription_releases_exactly_once() {
        let released = Rc::new(Cell::new(0));
        let counter = Rc::clone(&released);
        let mut subscription = Subscription::new(move || counter.set(counter.get() + 1));
        assert!(subscription.is_active());
        subscription.cancel();
        subscription.cancel();
        assert!(!subscription.is_active());
        drop(subscription);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn dropping_subscription_releases_listener() {
        let released = Rc::new(Cell::new(false));
        let flag = Rc::clone(&released);
        {
            let _subscription = Subscription::new(move || flag.set(true));
        }
        assert!(released.get());
    }
}
