//! Accumulated timings for the named phases of a tick

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
struct PhaseStats {
    total: Duration,
    last: Duration,
    calls: u64,
}

pub struct PhaseProfiler {
    phases: HashMap<&'static str, PhaseStats>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self {
            phases: HashMap::new(),
        }
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let stats = self.phases.entry(name).or_default();
        stats.total += elapsed;
        stats.last = elapsed;
        stats.calls += 1;
        result
    }

    /// Sum of every recorded run of `name`.
    pub fn total(&self, name: &str) -> Duration {
        self.phases.get(name).map_or(Duration::ZERO, |s| s.total)
    }

    /// Duration of the most recent run of `name`.
    pub fn last(&self, name: &str) -> Duration {
        self.phases.get(name).map_or(Duration::ZERO, |s| s.last)
    }

    pub fn calls(&self, name: &str) -> u64 {
        self.phases.get(name).map_or(0, |s| s.calls)
    }

    pub fn average(&self, name: &str) -> Duration {
        match self.phases.get(name) {
            Some(s) if s.calls > 0 => s.total.div_f64(s.calls as f64),
            _ => Duration::ZERO,
        }
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases.iter().map(|(name, s)| (*name, s.total))
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_per_phase() {
        let mut profiler = PhaseProfiler::new();
        let value = profiler.time_phase("advance", || 7);
        profiler.time_phase("advance", || ());
        profiler.time_phase("transfer", || ());

        assert_eq!(value, 7);
        assert_eq!(profiler.calls("advance"), 2);
        assert_eq!(profiler.calls("transfer"), 1);
        assert_eq!(profiler.calls("missing"), 0);
        assert!(profiler.total("advance") >= profiler.last("advance"));
        assert_eq!(profiler.iter().count(), 2);

        profiler.reset();
        assert_eq!(profiler.calls("advance"), 0);
    }
}
