use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{
    FrameCallback, FrameHandle, FrameScheduler, HostRegion, Subscription, ViewportEvent,
    ViewportListener, ViewportReading, ViewportSignals,
};
use crate::error::HostError;

/// Frame scheduler driven explicitly by the owner calling [`run_frame`].
///
/// Callbacks requested while a frame is running are deferred to the next
/// frame, matching `requestAnimationFrame`.
///
/// [`run_frame`]: QueuedScheduler::run_frame
#[derive(Default)]
pub struct QueuedScheduler {
    queued: RefCell<VecDeque<(FrameHandle, FrameCallback)>>,
    running: RefCell<VecDeque<(FrameHandle, FrameCallback)>>,
    next_handle: Cell<u64>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queued.borrow().len()
    }

    /// Runs every callback requested before this call, in request order, and
    /// returns how many ran.
    pub fn run_frame(&self, timestamp: f64) -> usize {
        {
            let mut queued = self.queued.borrow_mut();
            self.running.borrow_mut().extend(queued.drain(..));
        }
        let mut ran = 0;
        loop {
            let next = self.running.borrow_mut().pop_front();
            let Some((_, callback)) = next else {
                break;
            };
            callback(timestamp);
            ran += 1;
        }
        ran
    }
}

impl FrameScheduler for QueuedScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameHandle, HostError> {
        let handle = FrameHandle::new(self.next_handle.get() + 1);
        self.next_handle.set(handle.raw());
        self.queued.borrow_mut().push_back((handle, callback));
        Ok(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queued.borrow_mut().retain(|(queued, _)| *queued != handle);
        self.running.borrow_mut().retain(|(queued, _)| *queued != handle);
    }
}

struct ListenerEntry {
    id: u64,
    event: ViewportEvent,
    callback: Rc<RefCell<ViewportListener>>,
}

/// In-process viewport signal source.
///
/// The owner updates the reading and emits events; listeners run in
/// registration order and a listener removed during dispatch is skipped.
pub struct SignalHub {
    reading: RwLock<ViewportReading>,
    listeners: Rc<RefCell<Vec<ListenerEntry>>>,
    next_id: Cell<u64>,
}

impl SignalHub {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            reading: RwLock::new(ViewportReading {
                scroll_y: 0.0,
                width,
                height,
            }),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn set_scroll(&self, scroll_y: f64) {
        self.reading.write().scroll_y = scroll_y.max(0.0);
    }

    pub fn set_size(&self, width: u32, height: u32) {
        let mut reading = self.reading.write();
        reading.width = width;
        reading.height = height;
    }

    pub fn scroll_to(&self, scroll_y: f64) -> usize {
        self.set_scroll(scroll_y);
        self.emit(ViewportEvent::Scroll)
    }

    pub fn resize(&self, width: u32, height: u32) -> usize {
        self.set_size(width, height);
        self.emit(ViewportEvent::Resize)
    }

    /// Dispatches `event` with the current reading; returns the number of
    /// listeners invoked.
    pub fn emit(&self, event: ViewportEvent) -> usize {
        let reading = self.reading();
        let targets: Vec<(u64, Rc<RefCell<ViewportListener>>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == event)
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();

        let mut invoked = 0;
        for (id, callback) in targets {
            let registered = self.listeners.borrow().iter().any(|entry| entry.id == id);
            if !registered {
                continue;
            }
            // A listener that re-enters its own event is not invoked recursively.
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (*callback)(reading);
                invoked += 1;
            }
        }
        invoked
    }

    pub fn listener_count(&self, event: ViewportEvent) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == event)
            .count()
    }
}

impl ViewportSignals for SignalHub {
    fn reading(&self) -> ViewportReading {
        *self.reading.read()
    }

    fn listen(&self, event: ViewportEvent, listener: ViewportListener) -> Subscription {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            event,
            callback: Rc::new(RefCell::new(listener)),
        });

        let listeners: Weak<RefCell<Vec<ListenerEntry>>> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                // Removed listeners are dropped after the borrow is released.
                let removed = {
                    let mut guard = listeners.borrow_mut();
                    let (removed, kept): (Vec<ListenerEntry>, Vec<ListenerEntry>) =
                        guard.drain(..).partition(|entry| entry.id == id);
                    *guard = kept;
                    removed
                };
                drop(removed);
            }
        })
    }
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Output surface of a renderer that draws nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Host region that only records which surfaces are attached to it.
#[derive(Debug)]
pub struct HeadlessRegion {
    size: Cell<(u32, u32)>,
    connected: Cell<bool>,
    surfaces: RefCell<Vec<SurfaceId>>,
}

impl HeadlessRegion {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new((width, height)),
            connected: Cell::new(true),
            surfaces: RefCell::new(Vec::new()),
        }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    /// Simulates the region being removed from the page together with its
    /// children.
    pub fn disconnect(&self) {
        self.connected.set(false);
        self.surfaces.borrow_mut().clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.borrow().len()
    }
}

impl HostRegion for HeadlessRegion {
    type Surface = SurfaceId;

    fn dimensions(&self) -> Option<(u32, u32)> {
        let (width, height) = self.size.get();
        (self.connected.get() && width > 0 && height > 0).then_some((width, height))
    }

    fn append_surface(&self, surface: &SurfaceId) -> Result<(), HostError> {
        if !self.connected.get() {
            return Err(HostError::Detached);
        }
        // The appended surface replaces whatever the region showed before.
        let mut surfaces = self.surfaces.borrow_mut();
        surfaces.clear();
        surfaces.push(*surface);
        Ok(())
    }

    fn contains_surface(&self, surface: &SurfaceId) -> bool {
        self.surfaces.borrow().contains(surface)
    }

    fn remove_surface(&self, surface: &SurfaceId) -> Result<(), HostError> {
        let mut surfaces = self.surfaces.borrow_mut();
        let before = surfaces.len();
        surfaces.retain(|attached| attached != surface);
        if surfaces.len() == before {
            return Err(HostError::Dom("surface is not a child of this region".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_requested_during_a_frame_wait_for_the_next() {
        let scheduler = Rc::new(QueuedScheduler::new());
        let hits = Rc::new(Cell::new(0));
        let inner_scheduler = Rc::clone(&scheduler);
        let inner_hits = Rc::clone(&hits);
        scheduler
            .request_frame(Box::new(move |_| {
                inner_hits.set(inner_hits.get() + 1);
                let again = Rc::clone(&inner_hits);
                inner_scheduler
                    .request_frame(Box::new(move |_| again.set(again.get() + 10)))
                    .unwrap();
            }))
            .unwrap();

        assert_eq!(scheduler.run_frame(16.0), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_frame(32.0), 1);
        assert_eq!(hits.get(), 11);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_frames_never_run() {
        let scheduler = QueuedScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let handle = scheduler
            .request_frame(Box::new(move |_| flag.set(true)))
            .unwrap();
        scheduler.cancel_frame(handle);
        scheduler.cancel_frame(handle);
        assert_eq!(scheduler.run_frame(16.0), 0);
        assert!(!ran.get());
    }

    #[test]
    fn hub_delivers_readings_until_unsubscribed() {
        let hub = SignalHub::new(800, 600);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = hub.listen(
            ViewportEvent::Resize,
            Box::new(move |reading| sink.borrow_mut().push((reading.width, reading.height))),
        );
        assert_eq!(hub.scroll_to(40.0), 0);
        assert_eq!(hub.resize(1024, 768), 1);
        drop(subscription);
        assert_eq!(hub.listener_count(ViewportEvent::Resize), 0);
        assert_eq!(hub.resize(640, 480), 0);
        assert_eq!(*seen.borrow(), vec![(1024, 768)]);
        assert_eq!(hub.reading().scroll_y, 40.0);
    }

    #[test]
    fn listener_unsubscribed_mid_dispatch_is_skipped() {
        let hub = SignalHub::new(800, 600);
        let hits = Rc::new(RefCell::new(Vec::new()));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let first_hits = Rc::clone(&hits);
        let first_victim = Rc::clone(&victim);
        let _first = hub.listen(
            ViewportEvent::Scroll,
            Box::new(move |_| {
                first_hits.borrow_mut().push("first");
                first_victim.borrow_mut().take();
            }),
        );
        let second_hits = Rc::clone(&hits);
        *victim.borrow_mut() = Some(hub.listen(
            ViewportEvent::Scroll,
            Box::new(move |_| second_hits.borrow_mut().push("second")),
        ));

        assert_eq!(hub.scroll_to(20.0), 1);
        assert_eq!(*hits.borrow(), vec!["first"]);
        assert_eq!(hub.listener_count(ViewportEvent::Scroll), 1);
    }

    #[test]
    fn appended_surface_becomes_the_only_child() {
        let region = HeadlessRegion::new(800, 600);
        let stray = SurfaceId::next();
        let surface = SurfaceId::next();
        region.append_surface(&stray).unwrap();
        region.append_surface(&surface).unwrap();
        assert_eq!(region.surface_count(), 1);
        assert!(region.contains_surface(&surface));
        assert!(!region.contains_surface(&stray));
    }

    #[test]
    fn headless_region_reports_nothing_once_disconnected() {
        let region = HeadlessRegion::new(800, 600);
        let surface = SurfaceId::next();
        region.append_surface(&surface).unwrap();
        assert!(region.contains_surface(&surface));
        region.disconnect();
        assert_eq!(region.dimensions(), None);
        assert!(!region.contains_surface(&surface));
        assert!(matches!(
            region.append_surface(&surface),
            Err(HostError::Detached)
        ));
        assert!(region.remove_surface(&surface).is_err());
    }
}
