//! The timer scheduler: mutex/condvar-guarded state, one detector thread,
//! and a private rayon worker pool for callback execution.
//!
//! The detector owns the min-heap of fire entries. On each firing it pops
//! the earliest entry, looks the timer up by id (a lookup miss means the
//! timer was cancelled — the stale entry is skipped), submits the callback
//! to the pool without blocking, and reschedules or deletes the timer.
//! Callback panics are caught by the pool's panic handler and logged; they
//! never reach the detector.

use crate::error::SchedError;
use crate::timer::{first_fire, next_fire, Callback, Timer};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Identifier handed out by `add_*`; pass it to [`TimerScheduler::remove`]
/// to cancel.
pub type TimerId = i32;

/// Sentinel repeat count meaning "fire forever".
pub const REPEAT_FOREVER: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FireEntry {
    at: DateTime<Utc>,
    id: TimerId,
}

struct State {
    queue: BinaryHeap<Reverse<FireEntry>>,
    timers: HashMap<TimerId, Timer>,
    current_id: TimerId,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
    running: AtomicBool,
}

impl Shared {
    /// Poison-tolerant lock: a panicking callback can never poison this
    /// mutex (callbacks run on the pool), so recover rather than unwind.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TimerScheduler {
    shared: Arc<Shared>,
    pool: Arc<rayon::ThreadPool>,
    detector: Option<JoinHandle<()>>,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler {
    /// Create a stopped scheduler; call [`start`](Self::start) to begin
    /// dispatching.
    pub fn new() -> Self {
        Self::with_workers(2)
    }

    pub fn with_workers(workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("kairos-sched-worker-{i}"))
            .panic_handler(|_| error!("timer callback panicked"))
            .build()
            .expect("failed to build scheduler worker pool");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: BinaryHeap::new(),
                    timers: HashMap::new(),
                    current_id: -1,
                }),
                cond: Condvar::new(),
                running: AtomicBool::new(false),
            }),
            pool: Arc::new(pool),
            detector: None,
        }
    }

    /// Idempotently transition stopped→running: rebuild the fire queue from
    /// the live timers (dropping already-expired ones) and spawn the
    /// detector thread.
    pub fn start(&mut self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut state = self.shared.lock();
            let now = Utc::now();
            state.queue.clear();
            state.timers.retain(|id, timer| {
                if timer.is_expired(now) {
                    debug!(id, "dropping expired timer on start");
                    false
                } else {
                    true
                }
            });
            let entries: Vec<FireEntry> = state
                .timers
                .iter()
                .map(|(&id, timer)| FireEntry { at: first_fire(now, timer), id })
                .collect();
            for entry in entries {
                state.queue.push(Reverse(entry));
            }
        }
        self.shared.cond.notify_all();

        let shared = Arc::clone(&self.shared);
        let pool = Arc::clone(&self.pool);
        let handle = thread::Builder::new()
            .name("kairos-sched-detect".into())
            .spawn(move || detect_loop(shared, pool))
            .expect("failed to spawn detector thread");
        self.detector = Some(handle);
    }

    /// Stop dispatching: clear the queue, wake and join the detector.
    /// Callbacks already submitted to the pool run to completion. Live
    /// timers survive and are rescheduled by a later `start()`.
    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.lock().queue.clear();
        self.shared.cond.notify_all();
        if let Some(handle) = self.detector.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.shared.lock().timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full schedule: run `f` every `duration` inside the daily
    /// `[start_time, end_time]` window between `start_date` and `end_date`
    /// (inclusive), `repeat_num` times.
    #[allow(clippy::too_many_arguments)]
    pub fn add_func<F>(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: TimeDelta,
        end_time: TimeDelta,
        repeat_num: i32,
        duration: TimeDelta,
        f: F,
    ) -> Result<TimerId, SchedError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if end_date <= start_date {
            return Err(SchedError::BadDateRange { start: start_date, end: end_date });
        }
        check_time_of_day(start_time)?;
        check_time_of_day(end_time)?;
        if end_time < start_time {
            return Err(SchedError::BadTimeWindow);
        }
        if repeat_num < 1 {
            return Err(SchedError::BadRepeat);
        }
        if duration <= TimeDelta::zero() {
            return Err(SchedError::BadDuration);
        }
        self.add_timer(start_date, end_date, start_time, end_time, repeat_num, duration, Arc::new(f))
    }

    /// Run `f` every `duration`, `repeat_num` times, with no window.
    pub fn add_duration_func<F>(
        &self,
        repeat_num: i32,
        duration: TimeDelta,
        f: F,
    ) -> Result<TimerId, SchedError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if repeat_num < 1 {
            return Err(SchedError::BadRepeat);
        }
        if duration <= TimeDelta::zero() {
            return Err(SchedError::BadDuration);
        }
        self.add_timer(
            NaiveDate::MIN,
            NaiveDate::MAX,
            TimeDelta::zero(),
            TimeDelta::zero(),
            repeat_num,
            duration,
            Arc::new(f),
        )
    }

    /// Run `f` once after `delay`.
    pub fn add_delay_func<F>(&self, delay: TimeDelta, f: F) -> Result<TimerId, SchedError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if delay <= TimeDelta::zero() {
            return Err(SchedError::BadDuration);
        }
        self.add_timer(
            NaiveDate::MIN,
            NaiveDate::MAX,
            TimeDelta::zero(),
            TimeDelta::zero(),
            1,
            delay,
            Arc::new(f),
        )
    }

    /// Run `f` once at `point` (a fraction of a millisecond early, never
    /// late by construction). A point already in the past fires promptly.
    pub fn add_func_at<F>(&self, point: DateTime<Utc>, f: F) -> Result<TimerId, SchedError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let lead = TimeDelta::microseconds(100);
        let run_point = point - lead;
        let date = run_point.date_naive();
        let time = run_point - date.and_time(NaiveTime::MIN).and_utc();
        let end_of_day = TimeDelta::hours(24) - TimeDelta::microseconds(1);
        self.add_timer(date, NaiveDate::MAX, time.max(TimeDelta::microseconds(1)), end_of_day, 1, lead, Arc::new(f))
    }

    /// Cancel a timer. A fire entry already in the heap is skipped by the
    /// detector through the lookup miss. Returns whether the id was live.
    pub fn remove(&self, id: TimerId) -> bool {
        self.shared.lock().timers.remove(&id).is_some()
    }

    #[allow(clippy::too_many_arguments)]
    fn add_timer(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: TimeDelta,
        end_time: TimeDelta,
        repeat: i32,
        duration: TimeDelta,
        callback: Callback,
    ) -> Result<TimerId, SchedError> {
        let timer =
            Timer { start_date, end_date, start_time, end_time, duration, repeat, callback };
        let entry_at = first_fire(Utc::now(), &timer);

        {
            let mut state = self.shared.lock();
            let id = alloc_id(&mut state)?;
            state.timers.insert(id, timer);
            state.queue.push(Reverse(FireEntry { at: entry_at, id }));
            drop(state);
            self.shared.cond.notify_all();
            Ok(id)
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.stop();
        // Dropping the pool Arc joins the workers once the detector's clone
        // is gone (stop() joined the detector above).
    }
}

fn check_time_of_day(t: TimeDelta) -> Result<(), SchedError> {
    if t <= TimeDelta::zero() || t >= TimeDelta::hours(24) {
        return Err(SchedError::BadTimeOfDay(t.to_string()));
    }
    Ok(())
}

/// Allocate the next timer id: monotonically increasing, wrapping at
/// `i32::MAX`, probing forward past ids still in use.
fn alloc_id(state: &mut State) -> Result<TimerId, SchedError> {
    if state.timers.len() >= i32::MAX as usize {
        warn!("timer table is full");
        return Err(SchedError::Exhausted);
    }
    loop {
        state.current_id = if state.current_id >= i32::MAX - 1 {
            0
        } else {
            state.current_id + 1
        };
        if !state.timers.contains_key(&state.current_id) {
            return Ok(state.current_id);
        }
    }
}

fn detect_loop(shared: Arc<Shared>, pool: Arc<rayon::ThreadPool>) {
    let mut state = shared.lock();
    loop {
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let now = Utc::now();
        let Some(&Reverse(head)) = state.queue.peek() else {
            state = shared
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        if head.at > now {
            let wait = (head.at - now).to_std().unwrap_or_default();
            // Spurious wakes are fine: the loop re-derives the head delay.
            let (guard, _) = shared
                .cond
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            continue;
        }

        state.queue.pop();
        let st = &mut *state;
        let Some(timer) = st.timers.get_mut(&head.id) else {
            // Cancelled: stale heap entry, skip.
            continue;
        };

        let callback = Arc::clone(&timer.callback);
        pool.spawn(move || callback());

        if timer.repeat != REPEAT_FOREVER {
            timer.repeat -= 1;
        }
        if timer.repeat <= 0 {
            st.timers.remove(&head.id);
            continue;
        }

        match next_fire(head.at, timer) {
            Some(at) => st.queue.push(Reverse(FireEntry { at, id: head.id })),
            None => {
                debug!(id = head.id, "timer passed its end date, removed");
                st.timers.remove(&head.id);
            }
        }
    }
}
