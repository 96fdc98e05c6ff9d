// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TryRecvError};
use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::types::MetricResult;

pub(crate) const OVERRUN_WARNING: &str = "Window to report gauge may have been missed.";

/// Statistics about the job being run by a background reporter.
#[derive(Debug, Default)]
pub struct ReporterStats {
    cycles: AtomicU64,
    panics: AtomicU64,
    overruns: AtomicU64,
    warnings: AtomicU64,
}

impl ReporterStats {
    fn incr_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cycles run, including ones that panicked.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    /// Number of cycles started late because the previous one ran past
    /// its deadline.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Number of overrun warnings logged.
    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    Sleep(Duration),
    Overrun,
}

fn since_epoch(time: SystemTime) -> Duration {
    time.duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// First multiple of `period` since the epoch that's strictly after `time`.
fn boundary_after(time: Duration, period: Duration) -> Duration {
    let period = period.as_nanos();
    if period == 0 {
        return time;
    }

    let nanos = (time.as_nanos() / period + 1) * period;
    let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % 1_000_000_000) as u32)
}

/// Fixed period schedule aligned to multiples of the period in wall-clock
/// time, so a 60 second period runs at the start of every minute no matter
/// when the reporter started or how long each cycle takes.
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    // Start of the current cycle, in time since the epoch
    current: Duration,
    period: Duration,
}

impl Schedule {
    pub(crate) fn new(start: SystemTime, period: Duration) -> Self {
        Schedule {
            current: since_epoch(start),
            period,
        }
    }

    /// How long to wait from `now` until the next cycle should run.
    ///
    /// The next cycle starts at the first boundary after the start of the
    /// current one. When that boundary has already passed the next cycle
    /// starts at `now` and the one after it at the following boundary, so a
    /// slow cycle causes one late run instead of a burst of catch-up runs.
    pub(crate) fn until_next(&mut self, now: SystemTime) -> Wait {
        let now = since_epoch(now);
        let deadline = boundary_after(self.current, self.period);

        if deadline > now {
            self.current = deadline;
            Wait::Sleep(deadline - now)
        } else {
            self.current = now;
            Wait::Overrun
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ReporterOptions {
    pub(crate) name: String,
    pub(crate) period: Duration,
    pub(crate) warn_on_overrun: bool,
}

/// Handle to a background reporter thread.
///
/// Stopping the reporter (explicitly or by dropping the handle) wakes the
/// thread if it's waiting for the next cycle. A cycle that's already running
/// is allowed to finish.
#[derive(Debug)]
pub(crate) struct ReporterHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<ReporterStats>,
}

impl ReporterHandle {
    pub(crate) fn stats(&self) -> Arc<ReporterStats> {
        Arc::clone(&self.stats)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub(crate) fn stop(&mut self) {
        // Disconnecting the channel is the stop signal
        self.stop.take();

        if let Some(handle) = self.thread.take() {
            // The reporter may end up dropping the last reference to its
            // own cache, never join from the reporter thread itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `job` on a new named thread once every period until the returned
/// handle is stopped or the job returns `false`.
///
/// Runs happen on multiples of the period in wall-clock time, the first one
/// at the first boundary after the reporter starts. A panic from the job is
/// caught, logged, and counted, and doesn't stop later runs.
pub(crate) fn spawn_reporter<F>(opts: ReporterOptions, mut job: F) -> MetricResult<ReporterHandle>
where
    F: FnMut() -> bool + Send + 'static,
{
    let stats = Arc::new(ReporterStats::default());
    let (tx, rx) = bounded::<()>(1);
    let thread_stats = Arc::clone(&stats);
    let name = opts.name.clone();

    let thread = thread::Builder::new().name(opts.name.clone()).spawn(move || {
        info!("starting gauge reporter {} every {:?}", name, opts.period);
        let mut schedule = Schedule::new(SystemTime::now(), opts.period);

        loop {
            match schedule.until_next(SystemTime::now()) {
                Wait::Sleep(remaining) => match rx.recv_timeout(remaining) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                },
                Wait::Overrun => {
                    if let Err(TryRecvError::Disconnected) | Ok(()) = rx.try_recv() {
                        break;
                    }

                    thread_stats.incr_overrun();
                    if opts.warn_on_overrun {
                        thread_stats.incr_warning();
                        warn!("{}", OVERRUN_WARNING);
                    }
                }
            }

            thread_stats.incr_cycle();
            match panic::catch_unwind(AssertUnwindSafe(&mut job)) {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    thread_stats.incr_panic();
                    error!("gauge reporter {} panicked while reporting", name);
                }
            }
        }

        info!("stopping gauge reporter {}", name);
    })?;

    Ok(ReporterHandle {
        stop: Some(tx),
        thread: Some(thread),
        stats,
    })
}
