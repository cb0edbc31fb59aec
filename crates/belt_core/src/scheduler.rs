//! Two-phase parallel tick scheduler.
//!
//! Every tick is split across `parties` contiguous packs of lanes and of
//! hands. Pack 0 runs on the calling thread, packs `1..parties` on a fixed
//! pool of worker threads:
//!
//! ```text
//! release ──► [advance lane pack] ──► barrier ──► [step hand pack] ──► barrier ──► return
//! ```
//!
//! The first barrier guarantees no hand ever observes a half-advanced lane.
//! The second one hands control back only once every pack is done.

use crate::arena::Arenas;
use crate::error::SimError;
use crate::hand::HandEvent;
use belt_metrics::PhaseProfiler;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};

/// Phase names reported to the profiler.
pub const PHASE_ADVANCE: &str = "advance_lanes";
pub const PHASE_TRANSFER: &str = "step_hands";

/// Index range of `pack` when `len` slots are cut into `packs` packs of
/// `ceil(len / packs)` slots. Trailing packs may be empty.
pub fn pack_range(len: usize, pack: usize, packs: usize) -> Range<usize> {
    let size = len.div_ceil(packs.max(1));
    let start = (pack * size).min(len);
    let end = (start + size).min(len);
    start..end
}

/// Aggregate outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Free items moved along their lane.
    pub advanced: usize,
    /// Items that jammed against a lane end this tick.
    pub newly_stuck: usize,
    pub picked_up: usize,
    pub delivered: usize,
    /// Hands that finished a swing but found no room downstream.
    pub blocked: usize,
}

#[derive(Default)]
struct TickCounters {
    advanced: AtomicUsize,
    newly_stuck: AtomicUsize,
    picked_up: AtomicUsize,
    delivered: AtomicUsize,
    blocked: AtomicUsize,
}

impl TickCounters {
    fn reset(&self) {
        self.advanced.store(0, Ordering::Relaxed);
        self.newly_stuck.store(0, Ordering::Relaxed);
        self.picked_up.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
    }

    fn add_hands(&self, tally: &TickStats) {
        self.picked_up.fetch_add(tally.picked_up, Ordering::Relaxed);
        self.delivered.fetch_add(tally.delivered, Ordering::Relaxed);
        self.blocked.fetch_add(tally.blocked, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TickStats {
        TickStats {
            advanced: self.advanced.load(Ordering::Relaxed),
            newly_stuck: self.newly_stuck.load(Ordering::Relaxed),
            picked_up: self.picked_up.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }
}

enum Command {
    Tick { dt: f32 },
    Shutdown,
}

struct Shared {
    arenas: RwLock<Arenas>,
    barrier: Barrier,
    counters: TickCounters,
}

impl Shared {
    /// Phase A for one pack.
    fn advance_lanes(&self, arenas: &Arenas, pack: usize, parties: usize, dt: f32) {
        let lanes = arenas.lanes();
        let (mut moved, mut stuck) = (0, 0);
        for lane in &lanes[pack_range(lanes.len(), pack, parties)] {
            let mut lane = lane.lock();
            moved += lane.len() - lane.stuck_count();
            stuck += lane.advance(dt);
        }
        self.counters.advanced.fetch_add(moved, Ordering::Relaxed);
        self.counters.newly_stuck.fetch_add(stuck, Ordering::Relaxed);
    }

    /// Phase B for one pack.
    fn step_hands(&self, arenas: &Arenas, pack: usize, parties: usize, dt: f32) {
        let hands = arenas.hands();
        let mut tally = TickStats::default();
        for hand in &hands[pack_range(hands.len(), pack, parties)] {
            match hand.lock().step(dt, arenas.lanes()) {
                HandEvent::PickedUp => tally.picked_up += 1,
                HandEvent::Delivered => tally.delivered += 1,
                HandEvent::Blocked => tally.blocked += 1,
                HandEvent::Waiting | HandEvent::Moving => {}
            }
        }
        self.counters.add_hands(&tally);
    }

    fn run_pack(&self, pack: usize, parties: usize, dt: f32) {
        let arenas = self.arenas.read();
        self.advance_lanes(&arenas, pack, parties, dt);
        self.barrier.wait();
        self.step_hands(&arenas, pack, parties, dt);
        self.barrier.wait();
    }
}

fn worker_loop(shared: Arc<Shared>, release: Receiver<Command>, pack: usize, parties: usize) {
    tracing::trace!(pack, "worker started");
    while let Ok(Command::Tick { dt }) = release.recv() {
        shared.run_pack(pack, parties, dt);
    }
    tracing::trace!(pack, "worker stopped");
}

/// Owns the arenas and the worker pool that advances them.
pub struct Scheduler {
    shared: Arc<Shared>,
    release: Sender<Command>,
    workers: Vec<JoinHandle<()>>,
    parties: usize,
    profiler: PhaseProfiler,
}

impl Scheduler {
    /// Start a scheduler whose ticks are split across `parties` packs.
    ///
    /// Spawns `parties - 1` worker threads; the caller of [`tick`](Self::tick)
    /// works the remaining pack.
    pub fn new(parties: usize) -> Result<Self, SimError> {
        Self::with_arenas(parties, Arenas::new())
    }

    pub fn with_arenas(parties: usize, arenas: Arenas) -> Result<Self, SimError> {
        if parties == 0 {
            return Err(SimError::NoWorkers);
        }

        let shared = Arc::new(Shared {
            arenas: RwLock::new(arenas),
            barrier: Barrier::new(parties),
            counters: TickCounters::default(),
        });
        let (release, receiver) = unbounded();

        let mut scheduler = Self {
            shared,
            release,
            workers: Vec::with_capacity(parties - 1),
            parties,
            profiler: PhaseProfiler::new(),
        };

        for pack in 1..parties {
            let shared = Arc::clone(&scheduler.shared);
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("belt-worker-{pack}"))
                .spawn(move || worker_loop(shared, receiver, pack, parties))
                .map_err(|err| SimError::WorkerSpawn {
                    index: pack,
                    reason: err.to_string(),
                })?;
            scheduler.workers.push(handle);
        }

        tracing::debug!(parties, workers = scheduler.workers.len(), "scheduler started");
        Ok(scheduler)
    }

    /// Number of packs per phase, the calling thread included.
    #[inline]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Shared read access to the arenas. Do not hold across [`tick`](Self::tick).
    pub fn arenas(&self) -> RwLockReadGuard<'_, Arenas> {
        self.shared.arenas.read()
    }

    /// Exclusive access between ticks, for growing the arenas.
    pub fn arenas_mut(&mut self) -> RwLockWriteGuard<'_, Arenas> {
        self.shared.arenas.write()
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    /// Run one full tick over every lane and hand.
    pub fn tick(&mut self, dt: f32) -> Result<TickStats, SimError> {
        if let Some(index) = self.workers.iter().position(|w| w.is_finished()) {
            return Err(SimError::WorkerLost { index: index + 1 });
        }

        let shared = &self.shared;
        let parties = self.parties;
        shared.counters.reset();

        for _ in 0..self.workers.len() {
            if self.release.send(Command::Tick { dt }).is_err() {
                return Err(SimError::WorkerLost { index: 0 });
            }
        }

        let arenas = shared.arenas.read();
        self.profiler.time_phase(PHASE_ADVANCE, || {
            shared.advance_lanes(&arenas, 0, parties, dt);
            shared.barrier.wait();
        });
        self.profiler.time_phase(PHASE_TRANSFER, || {
            shared.step_hands(&arenas, 0, parties, dt);
            shared.barrier.wait();
        });
        drop(arenas);

        let stats = shared.counters.snapshot();
        tracing::trace!(?stats, "tick complete");
        Ok(stats)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for _ in 0..self.workers.len() {
            let _ = self.release.send(Command::Shutdown);
        }
        for (index, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() {
                tracing::warn!(worker = index + 1, "worker panicked");
            }
        }
    }
}
