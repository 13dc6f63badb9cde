use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, error};

use crate::error::HostError;
use crate::host::{FrameHandle, FrameScheduler};

type Step = Box<dyn FnMut(f64)>;

/// Self-rescheduling per-frame loop.
///
/// Every tick requests the next frame before running the step, so exactly
/// one frame is outstanding while the loop runs. [`cancel`](Self::cancel)
/// withdraws that frame and drops the step; no tick runs afterwards.
pub struct FrameLoop {
    inner: Rc<LoopInner>,
}

struct LoopInner {
    scheduler: Rc<dyn FrameScheduler>,
    pending: Cell<Option<FrameHandle>>,
    step: RefCell<Option<Step>>,
    running: Cell<bool>,
    ticks: Cell<u64>,
}

impl FrameLoop {
    pub fn start(
        scheduler: Rc<dyn FrameScheduler>,
        step: impl FnMut(f64) + 'static,
    ) -> Result<Self, HostError> {
        let inner = Rc::new(LoopInner {
            scheduler,
            pending: Cell::new(None),
            step: RefCell::new(Some(Box::new(step))),
            running: Cell::new(true),
            ticks: Cell::new(0),
        });
        LoopInner::schedule(&inner)?;
        Ok(Self { inner })
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Handle of the frame that will run the next tick.
    pub fn pending(&self) -> Option<FrameHandle> {
        self.inner.pending.get()
    }

    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    pub fn cancel(&self) {
        if !self.inner.running.replace(false) {
            return;
        }
        if let Some(handle) = self.inner.pending.take() {
            self.inner.scheduler.cancel_frame(handle);
        }
        // Taken out (and thus `None`) while a tick is executing.
        let step = self.inner.step.borrow_mut().take();
        drop(step);
        debug!("frame loop cancelled after {} tick(s)", self.inner.ticks.get());
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl LoopInner {
    fn schedule(this: &Rc<Self>) -> Result<(), HostError> {
        let weak: Weak<Self> = Rc::downgrade(this);
        let handle = this.scheduler.request_frame(Box::new(move |timestamp| {
            if let Some(inner) = weak.upgrade() {
                LoopInner::tick(&inner, timestamp);
            }
        }))?;
        this.pending.set(Some(handle));
        Ok(())
    }

    fn tick(this: &Rc<Self>, timestamp: f64) {
        this.pending.set(None);
        if !this.running.get() {
            return;
        }
        if let Err(err) = Self::schedule(this) {
            error!("failed to schedule next frame: {err}");
            this.running.set(false);
        }

        let step = this.step.borrow_mut().take();
        if let Some(mut step) = step {
            step(timestamp);
            this.ticks.set(this.ticks.get() + 1);
            if this.running.get() {
                *this.step.borrow_mut() = Some(step);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::queued::QueuedScheduler;

    fn counting_loop(scheduler: &Rc<QueuedScheduler>) -> (FrameLoop, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let scheduler: Rc<dyn FrameScheduler> = scheduler.clone();
        let frame_loop =
            FrameLoop::start(scheduler, move |_| counter.set(counter.get() + 1)).unwrap();
        (frame_loop, count)
    }

    #[test]
    fn keeps_exactly_one_frame_outstanding() {
        let scheduler = Rc::new(QueuedScheduler::new());
        let (frame_loop, count) = counting_loop(&scheduler);
        for frame in 0..5 {
            assert_eq!(scheduler.pending(), 1);
            scheduler.run_frame(frame as f64 * 16.0);
        }
        assert_eq!(count.get(), 5);
        assert_eq!(frame_loop.ticks(), 5);
        assert!(frame_loop.pending().is_some());
    }

    #[test]
    fn cancel_stops_future_ticks() {
        let scheduler = Rc::new(QueuedScheduler::new());
        let (frame_loop, count) = counting_loop(&scheduler);
        scheduler.run_frame(0.0);
        frame_loop.cancel();
        assert!(!frame_loop.is_running());
        assert_eq!(scheduler.pending(), 0);
        scheduler.run_frame(16.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn dropping_the_loop_cancels_it() {
        let scheduler = Rc::new(QueuedScheduler::new());
        let (frame_loop, count) = counting_loop(&scheduler);
        drop(frame_loop);
        assert_eq!(scheduler.pending(), 0);
        scheduler.run_frame(0.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn cancelling_from_inside_a_tick_is_final() {
        let scheduler = Rc::new(QueuedScheduler::new());
        let slot: Rc<RefCell<Option<FrameLoop>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&slot);
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let dyn_scheduler: Rc<dyn FrameScheduler> = scheduler.clone();
        let frame_loop = FrameLoop::start(dyn_scheduler, move |_| {
            counter.set(counter.get() + 1);
            if let Some(frame_loop) = handle.borrow().as_ref() {
                frame_loop.cancel();
            }
        })
        .unwrap();
        *slot.borrow_mut() = Some(frame_loop);

        scheduler.run_frame(0.0);
        scheduler.run_frame(16.0);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.pending(), 0);
    }
}
