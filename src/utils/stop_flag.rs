use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Watched side of a stop flag, held by a worker thread.
pub struct StopWatcher {
    running: Arc<AtomicBool>,
}

/// Trigger side of a stop flag. Dropping it also stops the watcher.
pub struct StopTrigger {
    running: Arc<AtomicBool>,
}

pub fn new_stop_flag() -> (StopWatcher, StopTrigger) {
    let running = Arc::new(AtomicBool::new(true));
    (
        StopWatcher {
            running: Arc::clone(&running),
        },
        StopTrigger { running },
    )
}

impl StopWatcher {
    pub fn should_run(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl StopTrigger {
    pub fn stop(self) {}
}

impl Drop for StopTrigger {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
