use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gloo_events::EventListener;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlCanvasElement, HtmlElement, Node, ScrollBehavior as DomScrollBehavior,
    ScrollIntoViewOptions, Window,
};

use super::{
    FrameCallback, FrameHandle, FrameScheduler, HostRegion, Subscription, ViewportEvent,
    ViewportListener, ViewportReading, ViewportSignals,
};
use crate::error::HostError;
use crate::nav::{ScrollBehavior, SectionAnchor};

type RafClosure = Closure<dyn FnMut(f64)>;

fn browser_window() -> Result<Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::Dom("window not available".into()))
}

fn document() -> Result<Document, HostError> {
    browser_window()?
        .document()
        .ok_or_else(|| HostError::Dom("document not available".into()))
}

fn element_by_id(id: &str) -> Result<Element, HostError> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| HostError::Dom(format!("element #{id} not found")))
}

/// `requestAnimationFrame` scheduler.
///
/// A closure handed to the browser must stay alive until it has run or been
/// cancelled, so pending closures are kept by id and a closure that has run
/// is parked until the next callback, when it is no longer executing.
pub struct AnimationFrameScheduler {
    window: Window,
    pending: Rc<RefCell<HashMap<i32, RafClosure>>>,
    spent: Rc<RefCell<Vec<RafClosure>>>,
}

impl AnimationFrameScheduler {
    pub fn new() -> Result<Self, HostError> {
        Ok(Self {
            window: browser_window()?,
            pending: Rc::new(RefCell::new(HashMap::new())),
            spent: Rc::new(RefCell::new(Vec::new())),
        })
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameHandle, HostError> {
        let id = Rc::new(Cell::new(0));
        let own_id = Rc::clone(&id);
        let pending = Rc::downgrade(&self.pending);
        let spent = Rc::downgrade(&self.spent);
        let mut callback = Some(callback);

        let closure = Closure::wrap(Box::new(move |timestamp: f64| {
            if let (Some(pending), Some(spent)) = (pending.upgrade(), spent.upgrade()) {
                let own = pending.borrow_mut().remove(&own_id.get());
                let mut spent = spent.borrow_mut();
                spent.clear();
                spent.extend(own);
            }
            if let Some(callback) = callback.take() {
                callback(timestamp);
            }
        }) as Box<dyn FnMut(f64)>);

        let raw = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|err| HostError::Schedule(format!("requestAnimationFrame failed: {err:?}")))?;
        id.set(raw);
        self.pending.borrow_mut().insert(raw, closure);
        Ok(FrameHandle::new(raw as u64))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let raw = handle.raw() as i32;
        if self.pending.borrow_mut().remove(&raw).is_some() {
            let _ = self.window.cancel_animation_frame(raw);
        }
    }
}

/// Window-level `scroll` and `resize` events.
pub struct WindowSignals {
    window: Window,
}

impl WindowSignals {
    pub fn new() -> Result<Self, HostError> {
        Ok(Self {
            window: browser_window()?,
        })
    }
}

fn read_viewport(window: &Window) -> ViewportReading {
    let dimension = |value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or_default()
            .max(0.0) as u32
    };
    ViewportReading {
        scroll_y: window.scroll_y().unwrap_or_default(),
        width: dimension(window.inner_width()),
        height: dimension(window.inner_height()),
    }
}

impl ViewportSignals for WindowSignals {
    fn reading(&self) -> ViewportReading {
        read_viewport(&self.window)
    }

    fn listen(&self, event: ViewportEvent, mut listener: ViewportListener) -> Subscription {
        let name = match event {
            ViewportEvent::Scroll => "scroll",
            ViewportEvent::Resize => "resize",
        };
        let window = self.window.clone();
        let guard = EventListener::new(&self.window, name, move |_| {
            listener(read_viewport(&window));
        });
        Subscription::new(move || drop(guard))
    }
}

/// Page element hosting the hero canvas.
pub struct DomRegion {
    element: HtmlElement,
}

impl DomRegion {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }

    pub fn by_id(id: &str) -> Result<Self, HostError> {
        let element = element_by_id(id)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| HostError::Dom(format!("#{id} is not an HTML element")))?;
        Ok(Self::new(element))
    }
}

impl HostRegion for DomRegion {
    type Surface = HtmlCanvasElement;

    fn dimensions(&self) -> Option<(u32, u32)> {
        if !self.element.is_connected() {
            return None;
        }
        let width = self.element.client_width().max(0) as u32;
        let height = self.element.client_height().max(0) as u32;
        (width > 0 && height > 0).then_some((width, height))
    }

    fn append_surface(&self, surface: &HtmlCanvasElement) -> Result<(), HostError> {
        if !self.element.is_connected() {
            return Err(HostError::Detached);
        }
        let node: &Node = surface;
        self.element.replace_children_with_node_1(node);
        Ok(())
    }

    fn contains_surface(&self, surface: &HtmlCanvasElement) -> bool {
        let node: &Node = surface;
        self.element.contains(Some(node))
    }

    fn remove_surface(&self, surface: &HtmlCanvasElement) -> Result<(), HostError> {
        let node: &Node = surface;
        self.element
            .remove_child(node)
            .map(|_| ())
            .map_err(|err| HostError::Dom(format!("removeChild failed: {err:?}")))
    }
}

/// Section element scrolled with `scrollIntoView`.
pub struct ElementAnchor {
    element: Element,
}

impl ElementAnchor {
    pub fn by_id(id: &str) -> Result<Self, HostError> {
        Ok(Self {
            element: element_by_id(id)?,
        })
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl SectionAnchor for ElementAnchor {
    fn scroll_into_view(&self, behavior: ScrollBehavior) -> Result<(), HostError> {
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(match behavior {
            ScrollBehavior::Smooth => DomScrollBehavior::Smooth,
            ScrollBehavior::Instant => DomScrollBehavior::Instant,
        });
        self.element
            .scroll_into_view_with_scroll_into_view_options(&options);
        Ok(())
    }
}
