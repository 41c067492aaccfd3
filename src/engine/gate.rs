// src/engine/gate.rs

//! Pure restart decision.
//!
//! The gate has no Tokio types and does no IO, so the debounce rule can be
//! tested with synthetic instants.

use std::time::{Duration, Instant};

/// Default minimum time between two chain starts.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(50);

/// Decides whether a change may restart the command chain.
///
/// A change arriving less than `min_delay` after the last start is absorbed.
/// Nothing is queued or delayed; the change is simply dropped.
#[derive(Debug, Clone, Copy)]
pub struct RestartGate {
    min_delay: Duration,
    last_start: Option<Instant>,
}

impl RestartGate {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_start: None,
        }
    }

    /// Build a gate from a configured delay in milliseconds; values `<= 0`
    /// fall back to [`DEFAULT_MIN_DELAY`].
    pub fn from_millis(min_delay_ms: i64) -> Self {
        Self::new(effective_min_delay(min_delay_ms))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn last_start(&self) -> Option<Instant> {
        self.last_start
    }

    pub fn allows(&self, now: Instant) -> bool {
        match self.last_start {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_delay,
        }
    }

    pub fn record_start(&mut self, now: Instant) {
        self.last_start = Some(now);
    }
}

impl Default for RestartGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY)
    }
}

pub fn effective_min_delay(min_delay_ms: i64) -> Duration {
    match u64::try_from(min_delay_ms) {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => DEFAULT_MIN_DELAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_change_is_always_allowed() {
        assert!(RestartGate::default().allows(Instant::now()));
    }

    #[test]
    fn change_inside_min_delay_is_absorbed() {
        let t0 = Instant::now();
        let mut gate = RestartGate::new(Duration::from_millis(50));
        gate.record_start(t0);

        assert!(!gate.allows(t0 + Duration::from_millis(10)));
        assert!(gate.allows(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn boundary_is_inclusive() {
        let t0 = Instant::now();
        let mut gate = RestartGate::new(Duration::from_millis(50));
        gate.record_start(t0);
        assert!(gate.allows(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn non_positive_delay_means_default() {
        assert_eq!(effective_min_delay(0), DEFAULT_MIN_DELAY);
        assert_eq!(effective_min_delay(-5), DEFAULT_MIN_DELAY);
        assert_eq!(effective_min_delay(200), Duration::from_millis(200));
        assert_eq!(RestartGate::from_millis(0).min_delay(), DEFAULT_MIN_DELAY);
    }
}
