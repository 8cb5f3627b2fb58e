//! Shared once-per-second clock that tells visible faces to redraw.

use super::{snapshot::ClockSnapshot, source::ClockSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TIMER_THREAD_NAME: &str = "clock-invalidation-timer";

/// Thread-safe "please repaint me" primitive supplied by the host.
///
/// Called from the timer thread. Implementations must hand the request
/// over to the UI thread instead of drawing directly.
pub trait Invalidate: Send + Sync {
    fn invalidate(&self);
}

/// Opaque handle returned by [`ClockTimeService::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

/// What the timer does once nobody is listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Keep ticking until [`ClockTimeService::stop`].
    #[default]
    RunForever,
    /// Park the timer thread while the registry is empty and bring it
    /// back on the next subscribe.
    StopWhenIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub period: Duration,
    pub idle_policy: IdlePolicy,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
            idle_policy: IdlePolicy::RunForever,
        }
    }
}

struct Registry {
    next_id: u64,
    entries: Vec<(Subscription, Weak<dyn Invalidate>)>,
    // Set by the timer thread, under this lock, right before it exits
    // because nothing was subscribed.
    worker_parked: bool,
}

impl Registry {
    fn find(&self, handle: &Arc<dyn Invalidate>) -> Option<Subscription> {
        let target = Arc::as_ptr(handle) as *const ();
        self.entries
            .iter()
            .find(|(_, weak)| weak.as_ptr() as *const () == target)
            .map(|(subscription, _)| *subscription)
    }

    /// Upgrades every entry, dropping the ones whose owner is gone.
    fn live(&mut self) -> Vec<Arc<dyn Invalidate>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|(subscription, weak)| match weak.upgrade() {
            Some(handle) => {
                live.push(handle);
                true
            }
            None => {
                log::debug!("Pruning dead subscriber {:?}", subscription);
                false
            }
        });
        live
    }
}

struct Shared {
    source: Box<dyn ClockSource>,
    snapshot: RwLock<ClockSnapshot>,
    registry: Mutex<Registry>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `None` when `park_when_idle` is set and nobody listens; the
    /// registry is marked parked in the same critical section.
    fn tick(&self, park_when_idle: bool) -> Option<usize> {
        let snapshot = ClockSnapshot::from_time(self.source.now());
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        let live = {
            let mut registry = self.registry();
            let live = registry.live();
            if live.is_empty() && park_when_idle {
                registry.worker_parked = true;
                return None;
            }
            live
        };

        for handle in &live {
            handle.invalidate();
        }
        Some(live.len())
    }
}

struct Worker {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(shared: Arc<Shared>, config: TimerConfig) -> Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let park_when_idle = config.idle_policy == IdlePolicy::StopWhenIdle;

        let handle = thread::Builder::new()
            .name(TIMER_THREAD_NAME.to_string())
            .spawn(move || loop {
                if shared.tick(park_when_idle).is_none() {
                    log::debug!("No subscribers left, parking clock timer");
                    break;
                }
                match stopped.recv_timeout(config.period) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .context("Failed to spawn clock timer thread")?;

        Ok(Self { stop, handle })
    }

    fn halt(self) {
        // The thread may already be gone, in which case the send fails.
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::error!("Clock timer thread panicked");
        }
    }
}

/// Authoritative source of hand angles for every clock face.
///
/// Owned by the composition root and shared with views through an `Arc`.
/// The snapshot is replaced whole on each tick, so a reader never sees
/// angles from two different ticks.
pub struct ClockTimeService {
    shared: Arc<Shared>,
    config: TimerConfig,
    started: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl ClockTimeService {
    pub fn new(source: impl ClockSource, config: TimerConfig) -> Self {
        let snapshot = ClockSnapshot::from_time(source.now());

        Self {
            shared: Arc::new(Shared {
                source: Box::new(source),
                snapshot: RwLock::new(snapshot),
                registry: Mutex::new(Registry {
                    next_id: 0,
                    entries: Vec::new(),
                    worker_parked: false,
                }),
            }),
            config,
            started: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Starts ticking. The first tick happens right away.
    pub fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        self.ensure_worker()
    }

    /// Stops ticking and waits for the timer thread to finish.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        self.halt_worker();
    }

    pub fn is_running(&self) -> bool {
        let worker = self.worker();
        match worker.as_ref() {
            Some(worker) => !worker.handle.is_finished() && !self.shared.registry().worker_parked,
            None => false,
        }
    }

    /// Registers `handle` for redraw notifications.
    ///
    /// Subscribing a handle that is already registered returns its
    /// existing subscription, so it is never notified twice per tick.
    pub fn subscribe(&self, handle: &Arc<dyn Invalidate>) -> Result<Subscription> {
        let subscription = {
            let mut registry = self.shared.registry();
            match registry.find(handle) {
                Some(existing) => existing,
                None => {
                    let subscription = Subscription(registry.next_id);
                    registry.next_id += 1;
                    registry.entries.push((subscription, Arc::downgrade(handle)));
                    subscription
                }
            }
        };

        if self.started.load(Ordering::SeqCst) {
            self.ensure_worker()?;
        }
        Ok(subscription)
    }

    /// Removes a subscription. Unknown or already removed ones are ignored.
    pub fn unsubscribe(&self, subscription: Subscription) {
        if self.config.idle_policy != IdlePolicy::StopWhenIdle {
            self.shared.registry().entries.retain(|(s, _)| *s != subscription);
            return;
        }

        // Holding the worker slot across the emptiness check orders this
        // against a concurrent subscribe's `ensure_worker`.
        let mut worker = self.worker();
        let now_empty = {
            let mut registry = self.shared.registry();
            registry.entries.retain(|(s, _)| *s != subscription);
            registry.entries.is_empty()
        };

        if now_empty {
            if let Some(old) = worker.take() {
                log::debug!("Last clock face unsubscribed, stopping timer");
                old.halt();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.registry().entries.len()
    }

    /// The snapshot published by the most recent tick.
    pub fn current_angles(&self) -> ClockSnapshot {
        *self.shared.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one tick on the calling thread and returns how many
    /// subscribers were notified.
    pub fn tick(&self) -> usize {
        self.shared.tick(false).unwrap_or(0)
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_worker(&self) -> Result<()> {
        let mut worker = self.worker();

        let alive = match worker.as_ref() {
            Some(w) => !w.handle.is_finished() && !self.shared.registry().worker_parked,
            None => false,
        };
        if alive {
            return Ok(());
        }

        if let Some(old) = worker.take() {
            old.halt();
        }
        self.shared.registry().worker_parked = false;

        log::debug!(
            "Starting clock timer ({:?} period, {:?})",
            self.config.period,
            self.config.idle_policy
        );
        *worker = Some(Worker::spawn(self.shared.clone(), self.config)?);
        Ok(())
    }

    fn halt_worker(&self) {
        if let Some(worker) = self.worker().take() {
            worker.halt();
        }
    }
}

impl Drop for ClockTimeService {
    fn drop(&mut self) {
        self.halt_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::source::FixedClock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Instant;
    use time::Time;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Counter {
        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Invalidate for Counter {
        fn invalidate(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> (Arc<Counter>, Arc<dyn Invalidate>) {
        let counter = Arc::new(Counter::default());
        let handle: Arc<dyn Invalidate> = counter.clone();
        (counter, handle)
    }

    fn fixed(h: u8, m: u8, s: u8) -> FixedClock {
        FixedClock::new(Time::from_hms(h, m, s).unwrap())
    }

    fn fast(idle_policy: IdlePolicy) -> TimerConfig {
        TimerConfig {
            period: Duration::from_millis(5),
            idle_policy,
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn snapshot_is_available_before_the_first_tick() {
        let service = ClockTimeService::new(fixed(3, 0, 0), TimerConfig::default());
        assert_eq!(service.current_angles(), ClockSnapshot::from_hms(3, 0, 0));
        assert!(!service.is_running());
    }

    #[test]
    fn reading_twice_without_a_tick_is_bit_identical() {
        let service = ClockTimeService::new(AlwaysMoving, TimerConfig::default());
        let a = service.current_angles();
        let b = service.current_angles();
        assert_eq!(a.hour_angle.to_bits(), b.hour_angle.to_bits());
        assert_eq!(a.minute_angle.to_bits(), b.minute_angle.to_bits());
        assert_eq!(a.second_angle.to_bits(), b.second_angle.to_bits());
    }

    // Moves every time it is asked, so an unexpected tick would show up.
    struct AlwaysMoving;

    impl ClockSource for AlwaysMoving {
        fn now(&self) -> Time {
            static CALLS: AtomicUsize = AtomicUsize::new(0);
            let n = CALLS.fetch_add(1, Ordering::SeqCst) as u8;
            Time::from_hms(n % 24, n % 60, n % 60).unwrap()
        }
    }

    #[test]
    fn tick_publishes_a_new_snapshot() {
        let source = Arc::new(fixed(0, 0, 0));
        let service = ClockTimeService::new(source.clone(), TimerConfig::default());

        source.set(Time::from_hms(6, 30, 0).unwrap());
        assert_eq!(service.current_angles(), ClockSnapshot::from_hms(0, 0, 0));

        service.tick();
        assert_eq!(service.current_angles(), ClockSnapshot::from_hms(6, 30, 0));
    }

    #[test]
    fn tick_notifies_every_subscriber_once() {
        let service = ClockTimeService::new(fixed(1, 2, 3), TimerConfig::default());
        let (a, a_handle) = counter();
        let (b, b_handle) = counter();

        service.subscribe(&a_handle).unwrap();
        service.subscribe(&b_handle).unwrap();
        assert_eq!(service.tick(), 2);
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 1);
    }

    #[test]
    fn double_subscribe_is_a_single_membership() {
        let service = ClockTimeService::new(fixed(1, 2, 3), TimerConfig::default());
        let (count, handle) = counter();

        let first = service.subscribe(&handle).unwrap();
        let second = service.subscribe(&handle).unwrap();
        assert_eq!(first, second);
        assert_eq!(service.subscriber_count(), 1);

        service.tick();
        assert_eq!(count.get(), 1);

        service.unsubscribe(first);
        assert_eq!(service.subscriber_count(), 0);
        assert_eq!(service.tick(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let service = ClockTimeService::new(fixed(1, 2, 3), TimerConfig::default());
        let (_count, handle) = counter();
        let (_other, other_handle) = counter();

        let subscription = service.subscribe(&handle).unwrap();
        service.subscribe(&other_handle).unwrap();
        service.unsubscribe(subscription);
        service.unsubscribe(subscription);
        assert_eq!(service.subscriber_count(), 1);
    }

    #[test]
    fn resubscribing_after_unsubscribe_gets_a_fresh_handle() {
        let service = ClockTimeService::new(fixed(1, 2, 3), TimerConfig::default());
        let (_count, handle) = counter();

        let first = service.subscribe(&handle).unwrap();
        service.unsubscribe(first);
        let second = service.subscribe(&handle).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn dropped_subscribers_are_pruned_without_keeping_them_alive() {
        let service = ClockTimeService::new(fixed(1, 2, 3), TimerConfig::default());
        let (count, handle) = counter();
        service.subscribe(&handle).unwrap();

        drop(handle);
        assert_eq!(Arc::strong_count(&count), 1);
        drop(count);

        assert_eq!(service.tick(), 0);
        assert_eq!(service.subscriber_count(), 0);
    }

    #[test]
    fn running_timer_keeps_notifying() {
        let service = ClockTimeService::new(fixed(1, 2, 3), fast(IdlePolicy::RunForever));
        let (count, handle) = counter();
        service.subscribe(&handle).unwrap();

        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_running());
        assert!(wait_until(|| count.get() >= 3));

        service.stop();
        assert!(!service.is_running());
        let after_stop = count.get();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.get(), after_stop);
    }

    #[test]
    fn run_forever_keeps_ticking_with_nobody_subscribed() {
        let service = ClockTimeService::new(fixed(1, 2, 3), fast(IdlePolicy::RunForever));
        service.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(service.is_running());
    }

    #[test]
    fn stop_when_idle_follows_the_registry() {
        let service = ClockTimeService::new(fixed(1, 2, 3), fast(IdlePolicy::StopWhenIdle));
        let (count, handle) = counter();

        service.start().unwrap();
        let subscription = service.subscribe(&handle).unwrap();
        assert!(service.is_running());
        assert!(wait_until(|| count.get() >= 1));

        service.unsubscribe(subscription);
        assert!(!service.is_running());

        service.subscribe(&handle).unwrap();
        assert!(service.is_running());
        let before = count.get();
        assert!(wait_until(|| count.get() > before));
    }

    #[test]
    fn stop_when_idle_parks_after_subscribers_disappear() {
        let service = ClockTimeService::new(fixed(1, 2, 3), fast(IdlePolicy::StopWhenIdle));
        let (count, handle) = counter();
        service.subscribe(&handle).unwrap();
        service.start().unwrap();
        assert!(wait_until(|| count.get() >= 1));

        drop(handle);
        drop(count);
        assert!(wait_until(|| !service.is_running()));
    }

    #[test]
    fn racing_subscribe_and_unsubscribe_never_strand_a_face() {
        let service = Arc::new(ClockTimeService::new(
            fixed(1, 2, 3),
            TimerConfig {
                period: Duration::from_secs(1),
                idle_policy: IdlePolicy::StopWhenIdle,
            },
        ));
        let (_a, leaving) = counter();
        let (_b, arriving) = counter();
        service.start().unwrap();

        for round in 0..2000 {
            let subscription = service.subscribe(&leaving).unwrap();
            let barrier = Arc::new(Barrier::new(2));
            let leaver = {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.unsubscribe(subscription);
                })
            };

            barrier.wait();
            let kept = service.subscribe(&arriving).unwrap();
            leaver.join().unwrap();

            assert_eq!(service.subscriber_count(), 1);
            assert!(service.is_running(), "no timer after round {}", round);
            service.unsubscribe(kept);
        }
        service.stop();
    }

    #[test]
    fn subscribing_before_start_does_not_spawn_a_timer() {
        let service = ClockTimeService::new(fixed(1, 2, 3), fast(IdlePolicy::StopWhenIdle));
        let (_count, handle) = counter();
        service.subscribe(&handle).unwrap();
        assert!(!service.is_running());
    }

    #[test]
    fn readers_never_see_a_torn_snapshot() {
        let source = Arc::new(fixed(3, 0, 0));
        let service = Arc::new(ClockTimeService::new(source.clone(), TimerConfig::default()));
        let a = ClockSnapshot::from_hms(3, 0, 0);
        let b = ClockSnapshot::from_hms(9, 30, 30);

        let writer = {
            let service = service.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    let time = if i % 2 == 0 { (9, 30, 30) } else { (3, 0, 0) };
                    source.set(Time::from_hms(time.0, time.1, time.2).unwrap());
                    service.tick();
                }
            })
        };

        for _ in 0..2000 {
            let seen = service.current_angles();
            assert!(seen == a || seen == b, "torn snapshot {:?}", seen);
        }
        writer.join().unwrap();
    }
}
