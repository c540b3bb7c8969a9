// src/timer.rs
use std::time::{Duration, Instant};
/// Repeating timer polled from the engine loop.
///
/// A late poll fires once and re-arms one period after `now`; missed ticks are
/// not replayed.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntervalTimer {
    period: Duration,
    next_due: Option<Instant>,
}
impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }
    /// (Re)starts the timer; the first tick is due one period from `now`.
    pub fn start(&mut self, period: Duration, now: Instant) {
        self.period = period.max(Duration::from_millis(1));
        self.next_due = Some(now + self.period);
    }
    pub fn stop(&mut self) {
        self.next_due = None;
    }
    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let mut timer = IntervalTimer::new();
        assert!(!timer.poll(t0));
        timer.start(Duration::from_millis(40), t0);
        assert!(!timer.poll(t0 + Duration::from_millis(39)));
        assert!(timer.poll(t0 + Duration::from_millis(40)));
        assert!(!timer.poll(t0 + Duration::from_millis(41)));
        assert!(timer.poll(t0 + Duration::from_millis(80)));
    }
    #[test]
    fn late_poll_does_not_catch_up() {
        let t0 = Instant::now();
        let mut timer = IntervalTimer::new();
        timer.start(Duration::from_millis(10), t0);
        assert!(timer.poll(t0 + Duration::from_millis(100)));
        assert!(!timer.poll(t0 + Duration::from_millis(105)));
        assert!(timer.poll(t0 + Duration::from_millis(110)));
    }
    #[test]
    fn stop_is_idempotent() {
        let t0 = Instant::now();
        let mut timer = IntervalTimer::new();
        timer.start(Duration::from_millis(5), t0);
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
        assert!(!timer.poll(t0 + Duration::from_secs(1)));
    }
    #[test]
    fn zero_period_is_clamped() {
        let mut timer = IntervalTimer::new();
        timer.start(Duration::ZERO, Instant::now());
        assert_eq!(timer.period, Duration::from_millis(1));
    }
}
