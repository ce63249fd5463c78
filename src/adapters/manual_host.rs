//! Deterministic virtual-time work host.
//!
//! Nothing runs until [`ManualHost::advance`] moves the virtual clock.
//! Due jobs run on the caller's thread, in due-time order, without the
//! slot lock held, so a job may resubmit or cancel its own slot.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;

use crate::app::ports::{Job, WorkHost};
use crate::scheduler::ScheduleMode;

struct Pending {
    mode: ScheduleMode,
    job: Job,
    due: Duration,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    slots: HashMap<&'static str, Pending>,
    executions: usize,
}

pub struct ManualHost {
    inner: Mutex<Inner>,
    min_periodic: Duration,
    max_execution: Option<Duration>,
}

impl ManualHost {
    pub fn new(min_periodic: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            min_periodic,
            max_execution: None,
        }
    }

    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution = Some(limit);
        self
    }

    /// Virtual time since the host was created.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of occupied slots.
    pub fn pending(&self) -> usize {
        self.lock().slots.len()
    }

    /// Total jobs run so far.
    pub fn executions(&self) -> usize {
        self.lock().executions
    }

    /// Move virtual time forward by `by`, running every job that falls
    /// due on the way.  Returns how many jobs ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        loop {
            let job = {
                let mut inner = self.lock();
                let next = inner
                    .slots
                    .iter()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(name, p)| (p.due, **name))
                    .map(|(name, _)| *name);
                let Some(slot) = next else {
                    inner.now = target;
                    break;
                };
                let Some(pending) = inner.slots.get_mut(slot) else {
                    break;
                };
                let due = pending.due;
                let job = pending.job.clone();
                if let ScheduleMode::Periodic { interval } = pending.mode {
                    pending.due = due + interval.max(Duration::from_millis(1));
                } else {
                    inner.slots.remove(slot);
                }
                inner.now = due;
                inner.executions += 1;
                debug!("ManualHost: running '{}' at {:?}", slot, due);
                job
            };
            job();
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkHost for ManualHost {
    fn submit(&self, slot: &'static str, mode: ScheduleMode, job: Job) {
        let mut inner = self.lock();
        let due = inner.now
            + match mode {
                ScheduleMode::OneShot { delay } => delay,
                ScheduleMode::Periodic { interval } => interval,
            };
        inner.slots.insert(slot, Pending { mode, job, due });
    }

    fn cancel(&self, slot: &'static str) -> bool {
        self.lock().slots.remove(slot).is_some()
    }

    fn scheduled(&self, slot: &'static str) -> Option<ScheduleMode> {
        self.lock().slots.get(slot).map(|p| p.mode)
    }

    fn min_periodic_interval(&self) -> Duration {
        self.min_periodic
    }

    fn max_execution_time(&self) -> Option<Duration> {
        self.max_execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SLOT: &str = "slot";

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn counter_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = counter.clone();
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn one_shot_fires_at_delay_and_clears() {
        let host = ManualHost::new(secs(900));
        let runs = Arc::new(AtomicUsize::new(0));
        host.submit(SLOT, ScheduleMode::OneShot { delay: secs(60) }, counter_job(&runs));
        assert_eq!(host.advance(secs(59)), 0);
        assert_eq!(host.advance(secs(1)), 1);
        assert_eq!(host.pending(), 0);
        assert_eq!(host.advance(secs(600)), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn periodic_fires_each_interval() {
        let host = ManualHost::new(secs(900));
        let runs = Arc::new(AtomicUsize::new(0));
        host.submit(SLOT, ScheduleMode::Periodic { interval: secs(900) }, counter_job(&runs));
        assert_eq!(host.advance(secs(2700)), 3);
        assert_eq!(host.now(), secs(2700));
        assert_eq!(host.pending(), 1);
    }

    #[test]
    fn replace_keeps_one_slot() {
        let host = ManualHost::new(secs(900));
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        host.submit(SLOT, ScheduleMode::OneShot { delay: secs(10) }, counter_job(&old));
        host.submit(SLOT, ScheduleMode::OneShot { delay: secs(20) }, counter_job(&new));
        assert_eq!(host.pending(), 1);
        host.advance(secs(30));
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn job_can_resubmit_itself() {
        let host = Arc::new(ManualHost::new(secs(900)));
        let runs = Arc::new(AtomicUsize::new(0));
        let job: Job = {
            let host = Arc::downgrade(&host);
            let runs = runs.clone();
            Arc::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                if let Some(host) = host.upgrade() {
                    let again: Job = Arc::new(|| {});
                    host.submit(SLOT, ScheduleMode::OneShot { delay: secs(5) }, again);
                }
            })
        };
        host.submit(SLOT, ScheduleMode::OneShot { delay: secs(5) }, job);
        assert_eq!(host.advance(secs(10)), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(host.executions(), 2);
    }
}
