//! Named-interval timer used by the search path.
//!
//! Intervals are independent: `start(name)` / `stop(name)` pairs need not
//! nest, and the same key accumulates across pairs.

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Timer {
    totals: Vec<(String, Duration)>,
    running: Vec<(String, Instant)>,
}

impl Timer {
    pub fn new() -> Self {
        Timer::default()
    }

    /// Begin an interval under `name`.
    pub fn start(&mut self, name: &str) {
        self.running.push((name.to_string(), Instant::now()));
    }

    /// End the most recent open interval under `name` and accumulate it.
    /// A stop without a matching start is ignored.
    pub fn stop(&mut self, name: &str) {
        let Some(pos) = self.running.iter().rposition(|(n, _)| n == name) else {
            debug_assert!(false, "Timer::stop without start: {}", name);
            return;
        };
        let (_, started) = self.running.remove(pos);
        let elapsed = started.elapsed();
        match self.totals.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += elapsed,
            None => self.totals.push((name.to_string(), elapsed)),
        }
    }

    /// Accumulated seconds for `name` (0.0 if never stopped).
    pub fn seconds(&self, name: &str) -> f64 {
        self.totals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Clear all keys and open intervals.
    pub fn reset(&mut self) {
        self.totals.clear();
        self.running.clear();
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, total) in &self.totals {
            writeln!(f, "{}: {:.6}s", name, total.as_secs_f64())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_per_key() {
        let mut timer = Timer::new();
        timer.start("io");
        timer.stop("io");
        let first = timer.seconds("io");
        timer.start("io");
        timer.stop("io");
        assert!(timer.seconds("io") >= first);
    }

    #[test]
    fn test_intervals_need_not_nest() {
        let mut timer = Timer::new();
        timer.start("a");
        timer.start("b");
        timer.stop("a");
        timer.stop("b");
        assert!(timer.seconds("a") >= 0.0);
        assert!(timer.seconds("b") >= 0.0);
    }

    #[test]
    fn test_unknown_key_is_zero() {
        let timer = Timer::new();
        assert_eq!(timer.seconds("nothing"), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut timer = Timer::new();
        timer.start("x");
        timer.stop("x");
        timer.reset();
        assert_eq!(timer.seconds("x"), 0.0);
    }

    #[test]
    fn test_display_lists_keys() {
        let mut timer = Timer::new();
        timer.start("hashes");
        timer.stop("hashes");
        let text = timer.to_string();
        assert!(text.contains("hashes:"));
    }
}
