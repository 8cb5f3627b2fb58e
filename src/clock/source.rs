//! Wall-clock sources the timer service samples on every tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use time::{OffsetDateTime, Time};

/// Something that can tell the current time of day.
pub trait ClockSource: Send + Sync + 'static {
    fn now(&self) -> Time;
}

/// Local wall-clock time.
///
/// Falls back to UTC when the local offset cannot be determined, which
/// `time` refuses to do on some platforms once more than one thread runs.
#[derive(Debug, Default)]
pub struct SystemClock {
    warned: AtomicBool,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> Time {
        match OffsetDateTime::now_local() {
            Ok(now) => now.time(),
            Err(e) => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    log::warn!("Local UTC offset unavailable ({}), showing UTC", e);
                }
                OffsetDateTime::now_utc().time()
            }
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    time: Mutex<Time>,
}

impl FixedClock {
    pub fn new(time: Time) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    pub fn set(&self, time: Time) {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> Time {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ClockSource> ClockSource for Arc<T> {
    fn now(&self) -> Time {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_what_it_was_set_to() {
        let clock = FixedClock::new(Time::from_hms(6, 30, 0).unwrap());
        assert_eq!(clock.now(), Time::from_hms(6, 30, 0).unwrap());

        clock.set(Time::from_hms(23, 59, 59).unwrap());
        assert_eq!(clock.now(), Time::from_hms(23, 59, 59).unwrap());
    }
}
