//! Coalescing of high-frequency updates.

use std::time::Duration;

use web_time::Instant;

/// Rate limiter that keeps only the most recent value.
///
/// The first call in a quiet period fires at once. Calls arriving within
/// `interval` of the last fire are coalesced into one pending value that
/// `poll` releases once the interval has passed. `flush` releases it early
/// and `cancel` drops it; a cancelled value never fires.
#[derive(Clone, Debug)]
pub struct Throttled<T> {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttled<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_fired
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Offer a new value. Returns it if it should be applied now.
    pub fn call(&mut self, value: T, now: Instant) -> Option<T> {
        if self.ready(now) {
            self.pending = None;
            self.last_fired = Some(now);
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value if its interval has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fired = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Release the pending value regardless of timing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Drop the pending value and reset timing.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_fired = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_leading_call_fires() {
        let mut throttle = Throttled::new(40 * MS);
        let t0 = Instant::now();
        assert_eq!(throttle.call(1, t0), Some(1));
        assert_eq!(throttle.call(2, t0 + 10 * MS), None);
        assert_eq!(throttle.call(3, t0 + 20 * MS), None);
        assert!(throttle.is_pending());
        assert_eq!(throttle.poll(t0 + 30 * MS), None);
        assert_eq!(throttle.poll(t0 + 40 * MS), Some(3));
        assert!(!throttle.is_pending());
    }

    #[test]
    fn test_flush_returns_latest() {
        let mut throttle = Throttled::new(40 * MS);
        let t0 = Instant::now();
        throttle.call("a", t0);
        throttle.call("b", t0 + MS);
        throttle.call("c", t0 + 2 * MS);
        assert_eq!(throttle.flush(), Some("c"));
        assert_eq!(throttle.flush(), None);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut throttle = Throttled::new(40 * MS);
        let t0 = Instant::now();
        throttle.call(1, t0);
        throttle.call(2, t0 + MS);
        throttle.cancel();
        assert_eq!(throttle.poll(t0 + 100 * MS), None);
        assert_eq!(throttle.flush(), None);
        assert_eq!(throttle.call(3, t0 + 2 * MS), Some(3));
    }
}
