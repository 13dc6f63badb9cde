//! Emulated smooth scrolling over a virtual page, for hosts that have no
//! native `scrollIntoView`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::error::HostError;
use crate::host::queued::SignalHub;
use crate::host::ViewportSignals;
use crate::nav::{ScrollBehavior, Section, SectionAnchor};

/// Eased scroll from one offset to another over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothScroll {
    from: f64,
    to: f64,
    duration_ms: f64,
    elapsed_ms: f64,
}

impl SmoothScroll {
    pub fn new(from: f64, to: f64, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            elapsed_ms: 0.0,
        }
    }

    /// Moves the animation forward and returns the new offset. The final
    /// step lands exactly on the target.
    pub fn advance(&mut self, dt_ms: f64) -> f64 {
        self.elapsed_ms = (self.elapsed_ms + dt_ms.max(0.0)).min(self.duration_ms);
        self.offset()
    }

    pub fn offset(&self) -> f64 {
        if self.is_finished() {
            return self.to;
        }
        let t = ease_in_out(self.elapsed_ms / self.duration_ms);
        self.from + (self.to - self.from) * t
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// Slow start, fast middle, slow end.
fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Vertical layout of the virtual page: the hero followed by every section,
/// each one viewport tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    viewport_height: f64,
}

impl PageLayout {
    pub fn new(viewport_height: u32) -> Self {
        Self {
            viewport_height: f64::from(viewport_height.max(1)),
        }
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn total_height(&self) -> f64 {
        self.viewport_height * (Section::ALL.len() + 1) as f64
    }

    pub fn max_scroll(&self) -> f64 {
        self.total_height() - self.viewport_height
    }

    pub fn anchor_top(&self, section: Section) -> f64 {
        self.viewport_height * (section.index() + 1) as f64
    }

    /// Top and bottom of `section` relative to the viewport at `scroll_y`.
    pub fn section_bounds(&self, section: Section, scroll_y: f64) -> (f64, f64) {
        let top = self.anchor_top(section) - scroll_y;
        (top, top + self.viewport_height)
    }
}

/// Drives the virtual page's scroll offset through a [`SignalHub`].
pub struct PageScroller {
    hub: Rc<SignalHub>,
    duration_ms: f64,
    animation: RefCell<Option<SmoothScroll>>,
    smooth_requests: Cell<u32>,
}

impl PageScroller {
    pub fn new(hub: Rc<SignalHub>, duration_ms: f64) -> Self {
        Self {
            hub,
            duration_ms,
            animation: RefCell::new(None),
            smooth_requests: Cell::new(0),
        }
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::new(self.hub.reading().height)
    }

    pub fn offset(&self) -> f64 {
        self.hub.reading().scroll_y
    }

    pub fn scroll_to(&self, target: f64, behavior: ScrollBehavior) {
        let target = target.clamp(0.0, self.layout().max_scroll());
        match behavior {
            ScrollBehavior::Instant => {
                self.animation.borrow_mut().take();
                self.hub.scroll_to(target);
            }
            ScrollBehavior::Smooth => {
                self.smooth_requests.set(self.smooth_requests.get() + 1);
                let from = self.offset();
                debug!("smooth scroll {from:.0} -> {target:.0}");
                let animation = SmoothScroll::new(from, target, self.duration_ms);
                *self.animation.borrow_mut() = Some(animation);
            }
        }
    }

    /// Steps the running animation, emitting a scroll event with the new
    /// offset. Returns `None` when nothing is animating.
    pub fn advance(&self, dt_ms: f64) -> Option<f64> {
        let (offset, finished) = {
            let mut animation = self.animation.borrow_mut();
            let scroll = animation.as_mut()?;
            let offset = scroll.advance(dt_ms);
            let finished = scroll.is_finished();
            if finished {
                animation.take();
            }
            (offset, finished)
        };
        self.hub.scroll_to(offset);
        if finished {
            debug!("smooth scroll settled at {offset:.0}");
        }
        Some(offset)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.borrow().is_some()
    }

    /// Smooth scroll requests received so far.
    pub fn smooth_requests(&self) -> u32 {
        self.smooth_requests.get()
    }
}

/// Section anchor on the virtual page.
pub struct PageAnchor {
    section: Section,
    scroller: Rc<PageScroller>,
}

impl PageAnchor {
    pub fn new(section: Section, scroller: Rc<PageScroller>) -> Self {
        Self { section, scroller }
    }

    /// One anchor per section, all sharing `scroller`.
    pub fn for_all(scroller: &Rc<PageScroller>) -> Vec<(Section, PageAnchor)> {
        Section::ALL
            .into_iter()
            .map(|section| (section, PageAnchor::new(section, Rc::clone(scroller))))
            .collect()
    }
}

impl SectionAnchor for PageAnchor {
    fn scroll_into_view(&self, behavior: ScrollBehavior) -> Result<(), HostError> {
        let top = self.scroller.layout().anchor_top(self.section);
        self.scroller.scroll_to(top, behavior);
        Ok(())
    }
}
