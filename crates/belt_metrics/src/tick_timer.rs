//! Tick timing

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Rolling wall-clock duration of whole simulation ticks.
pub struct TickTimer {
    tick_start: Instant,
    tick_times: RingBuffer<Duration>,
    ticks: u64,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_start: Instant::now(),
            tick_times: RingBuffer::new(capacity),
            ticks: 0,
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.tick_times.push(self.tick_start.elapsed());
        self.ticks += 1;
    }

    /// Ticks measured since creation, including those rolled out of the window.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ticks_per_second(&self) -> f64 {
        let avg = self.tick_times.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.tick_times.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.tick_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
