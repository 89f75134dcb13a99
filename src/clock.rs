//! Host-driven frame clock.
//!
//! The host calls [`FrameClock::tick`] once per display refresh with its own
//! timestamp (`performance.now()` in the browser, an `Instant` natively). Each
//! task registered with [`FrameClock::run`] is invoked with the time elapsed
//! since its first tick, so motion stays independent of the refresh rate.

use std::cell::Cell;
use std::rc::Rc;

/// Timing information handed to a frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the task's first tick.
    pub elapsed: f64,
    /// Seconds since the task's previous tick, zero on the first one.
    pub delta: f32,
    /// Number of ticks delivered to the task before this one.
    pub frame: u64,
}

/// Cancellation token for a running frame task.
///
/// Clones share liveness, so a clone captured inside the callback can stop its
/// own task.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    id: u64,
    live: Rc<Cell<bool>>,
}

impl FrameHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    pub fn cancel(&self) {
        self.live.set(false);
    }
}

struct FrameTask {
    handle: FrameHandle,
    callback: Box<dyn FnMut(FrameTime)>,
    started_at: Option<f64>,
    last_tick: Option<f64>,
    frames: u64,
}

#[derive(Default)]
pub struct FrameClock {
    tasks: Vec<FrameTask>,
    next_id: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<F>(&mut self, callback: F) -> FrameHandle
    where
        F: FnMut(FrameTime) + 'static,
    {
        let handle = FrameHandle {
            id: self.next_id,
            live: Rc::new(Cell::new(true)),
        };
        self.next_id += 1;

        self.tasks.push(FrameTask {
            handle: handle.clone(),
            callback: Box::new(callback),
            started_at: None,
            last_tick: None,
            frames: 0,
        });
        log::debug!("frame task {} scheduled", handle.id);
        handle
    }

    /// Stops the task behind `handle`. Cancelling twice is a no-op.
    pub fn cancel(&mut self, handle: &FrameHandle) {
        handle.cancel();
        let before = self.tasks.len();
        self.tasks.retain(|task| task.handle.id != handle.id);
        if self.tasks.len() != before {
            log::debug!("frame task {} cancelled", handle.id);
        }
    }

    pub fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| task.handle.is_live()).count()
    }

    /// Delivers one refresh notification. `now_ms` is the host timestamp in
    /// milliseconds.
    pub fn tick(&mut self, now_ms: f64) {
        self.tasks.retain(|task| task.handle.is_live());

        for task in &mut self.tasks {
            // A callback earlier in this tick may have cancelled a later task.
            if !task.handle.is_live() {
                continue;
            }

            let started_at = *task.started_at.get_or_insert(now_ms);
            let delta = match task.last_tick {
                Some(last) => ((now_ms - last).max(0.0) / 1000.0) as f32,
                None => 0.0,
            };
            task.last_tick = Some(now_ms);

            let time = FrameTime {
                elapsed: (now_ms - started_at).max(0.0) / 1000.0,
                delta,
                frame: task.frames,
            };
            task.frames += 1;
            (task.callback)(time);
        }
    }
}
