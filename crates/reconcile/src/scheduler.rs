//! Background pass scheduling and the manual control surface

use crate::error::Result;
use crate::sync::Orchestrator;
use crate::types::PassReport;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Manual control over a running orchestrator
///
/// Cheap to clone; every clone talks to the same orchestrator.
#[derive(Clone)]
pub struct ControlHandle {
    orchestrator: Arc<Orchestrator>,
}

impl ControlHandle {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run a pass on the calling thread, queueing behind any in-flight pass
    pub fn run_now(&self, force: Option<bool>) -> Result<PassReport> {
        self.orchestrator.sync(force)
    }

    /// Absence summary, taken once no pass is running
    pub fn summary(&self) -> String {
        self.orchestrator.summary()
    }
}

/// Runs a pass immediately and then once per interval on its own thread
pub struct Scheduler {
    stop: Sender<()>,
    thread: JoinHandle<()>,
    control: ControlHandle,
}

impl Scheduler {
    /// Start the scheduler thread
    pub fn start(orchestrator: Arc<Orchestrator>, interval: Duration) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let control = ControlHandle::new(Arc::clone(&orchestrator));

        let thread = thread::Builder::new()
            .name("sync-scheduler".into())
            .spawn(move || {
                log::info!("Syncing every {}s", interval.as_secs());
                loop {
                    run_logged(&orchestrator);
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::info!("Scheduler stopped");
            })?;

        Ok(Self {
            stop,
            thread,
            control,
        })
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Stop after the current pass and wait for the thread to exit
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            log::error!("Scheduler thread panicked");
        }
    }
}

/// Run one scheduled pass, logging instead of propagating errors
fn run_logged(orchestrator: &Orchestrator) {
    match orchestrator.sync(None) {
        Ok(report) => {
            if let Some(writes) = &report.writes {
                for failure in &writes.failures {
                    log::warn!("Write failed: {failure}");
                }
            }
        }
        Err(e) => {
            log::error!("Sync pass failed: {e}");
            log::error!("  {}", e.category().advice());
        }
    }
}
