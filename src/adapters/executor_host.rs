//! Background work host on a dedicated executor thread.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  "zonewatch-host" thread                                 │
//!  │  futures_lite::block_on(executor.run(shutdown.wait()))   │
//!  │  ┌────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::Executor                           │  │
//!  │  │   slot "zone-proximity-check" ─▶ Task<()>          │  │
//!  │  │     OneShot:  Timer::after(delay) ; job()          │  │
//!  │  │     Periodic: loop { Timer::after(iv) ; job() }    │  │
//!  │  └────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each slot owns the [`Task`] handle of its timer future.  Dropping the
//! handle cancels the future, so replacing or cancelling a slot under
//! the slot lock guarantees the old job never starts again.  Jobs run on
//! the host thread; a job may submit into or cancel its own slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use async_io_mini::Timer;
use edge_executor::{Executor, Task};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use crate::app::ports::{Job, WorkHost};
use crate::scheduler::ScheduleMode;

type Shutdown = Signal<CriticalSectionRawMutex, ()>;

struct SlotEntry {
    mode: ScheduleMode,
    task: Task<()>,
}

pub struct ExecutorHost {
    executor: Arc<Executor<'static>>,
    slots: Mutex<HashMap<&'static str, SlotEntry>>,
    shutdown: Arc<Shutdown>,
    thread: Option<JoinHandle<()>>,
    min_periodic: Duration,
    max_execution: Option<Duration>,
}

impl ExecutorHost {
    /// Start the host thread.
    pub fn start(min_periodic: Duration) -> std::io::Result<Self> {
        let executor: Arc<Executor<'static>> = Arc::new(Executor::new());
        let shutdown = Arc::new(Shutdown::new());

        let thread = {
            let executor = executor.clone();
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name("zonewatch-host".into())
                .spawn(move || {
                    futures_lite::future::block_on(executor.run(async move {
                        shutdown.wait().await;
                    }));
                    debug!("ExecutorHost: thread exiting");
                })?
        };

        info!(
            "ExecutorHost: started (min periodic {}s)",
            min_periodic.as_secs()
        );
        Ok(Self {
            executor,
            slots: Mutex::new(HashMap::new()),
            shutdown,
            thread: Some(thread),
            min_periodic,
            max_execution: None,
        })
    }

    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution = Some(limit);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, SlotEntry>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_slot(mode: ScheduleMode, job: Job) {
    match mode {
        ScheduleMode::OneShot { delay } => {
            Timer::after(delay).await;
            job();
        }
        ScheduleMode::Periodic { interval } => loop {
            Timer::after(interval).await;
            job();
        },
    }
}

impl WorkHost for ExecutorHost {
    fn submit(&self, slot: &'static str, mode: ScheduleMode, job: Job) {
        let mut slots = self.lock();
        let task = self.executor.spawn(run_slot(mode, job));
        if slots.insert(slot, SlotEntry { mode, task }).is_some() {
            debug!("ExecutorHost: replaced work in '{}'", slot);
        }
    }

    fn cancel(&self, slot: &'static str) -> bool {
        self.lock()
            .remove(slot)
            .is_some_and(|e| !e.task.is_finished())
    }

    /// A one-shot that already ran reports `None`.
    fn scheduled(&self, slot: &'static str) -> Option<ScheduleMode> {
        self.lock()
            .get(slot)
            .filter(|e| !e.task.is_finished())
            .map(|e| e.mode)
    }

    fn min_periodic_interval(&self) -> Duration {
        self.min_periodic
    }

    fn max_execution_time(&self) -> Option<Duration> {
        self.max_execution
    }
}

impl Drop for ExecutorHost {
    fn drop(&mut self) {
        self.lock().clear();
        self.shutdown.signal(());
        if let Some(thread) = self.thread.take() {
            // Last reference released by a job on the host thread itself.
            if thread.thread().id() == std::thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                warn!("ExecutorHost: host thread panicked");
            }
        }
    }
}
