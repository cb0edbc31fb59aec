//! End-to-end runs of the simulation across worker counts.

use belt_core::math::Vec2;
use belt_core::{HandState, LaneHandle, Simulation};

const WAYPOINTS: usize = 11;

fn belt(sim: &mut Simulation, column: usize) -> LaneHandle {
    let x = column as f32 * 2.0;
    let waypoints = (0..WAYPOINTS).map(|i| Vec2::new(x, -(i as f32))).collect();
    sim.create_lane(waypoints).unwrap()
}

/// Belts in a ring: each hand moves items from the end of one belt to the start of the next.
fn ring(workers: usize, belts: usize) -> (Simulation, Vec<LaneHandle>) {
    let mut sim = Simulation::with_workers(workers).unwrap();
    let lanes: Vec<_> = (0..belts).map(|c| belt(&mut sim, c)).collect();
    for (i, &from) in lanes.iter().enumerate() {
        let to = lanes[(i + 1) % lanes.len()];
        sim.create_hand(Vec2::new(i as f32 * 2.0 + 1.0, -8.5), from, 8.5, to, 1.5)
            .unwrap();
    }
    (sim, lanes)
}

/// Independent pairs: hand `i` moves items from lane `2i` to lane `2i + 1` only.
fn pairs(workers: usize, count: usize) -> (Simulation, Vec<LaneHandle>) {
    let mut sim = Simulation::with_workers(workers).unwrap();
    let lanes: Vec<_> = (0..count * 2).map(|c| belt(&mut sim, c)).collect();
    for pair in lanes.chunks(2) {
        let x = pair[0].index() as f32 * 2.0 + 1.0;
        sim.create_hand(Vec2::new(x, -8.5), pair[0], 8.5, pair[1], 1.5)
            .unwrap();
    }
    (sim, lanes)
}

fn snapshot(sim: &Simulation, lanes: &[LaneHandle]) -> Vec<Vec<f32>> {
    lanes
        .iter()
        .map(|&lane| {
            sim.lane_items(lane)
                .unwrap()
                .iter()
                .map(|item| item.progress)
                .collect()
        })
        .collect()
}

#[test]
fn ring_conserves_items() {
    for workers in [1, 2, 4, 7] {
        let (mut sim, lanes) = ring(workers, 13);
        for &lane in &lanes {
            for waypoint in [0, 3, 6] {
                assert!(sim.spawn_item(lane, waypoint));
            }
        }
        let seeded = sim.item_count();
        assert_eq!(seeded, 39);

        let mut delivered = 0;
        for _ in 0..600 {
            delivered += sim.tick(1.0 / 30.0).unwrap().delivered;
        }

        assert_eq!(sim.item_count(), seeded, "workers = {workers}");
        assert!(delivered > 0);
        for &lane in &lanes {
            assert!(sim.with_lane(lane, |l| l.is_consistent()).unwrap());
        }
    }
}

#[test]
fn disjoint_pairs_match_single_threaded_run() {
    let run = |workers| {
        let (mut sim, lanes) = pairs(workers, 9);
        for &lane in lanes.iter().step_by(2) {
            sim.spawn_item(lane, 2);
            sim.spawn_item(lane, 5);
        }
        for _ in 0..400 {
            sim.tick(0.05).unwrap();
        }
        snapshot(&sim, &lanes)
    };

    let single = run(1);
    for workers in [2, 3, 5] {
        assert_eq!(run(workers), single, "workers = {workers}");
    }
}

#[test]
fn full_destination_jams_the_source() {
    let mut sim = Simulation::with_workers(3).unwrap();
    let a = belt(&mut sim, 0);
    let b = belt(&mut sim, 1);
    let hand = sim.create_hand(Vec2::new(1.0, -8.5), a, 8.5, b, 1.5).unwrap();

    // Keep feeding the source until everything backs up.
    for _ in 0..2000 {
        sim.spawn_item(a, 0);
        sim.tick(0.1).unwrap();
    }

    assert_eq!(
        sim.hand_state(hand),
        Some(HandState::Carrying { progress: 1.0 })
    );
    assert!(sim.stuck_count(a).unwrap() > 0);
    assert!(sim.stuck_count(b).unwrap() > 0);
}

#[test]
fn elapsed_time_tracks_steps() {
    let (mut sim, _) = ring(2, 3);
    for _ in 0..10 {
        sim.tick(0.25).unwrap();
    }
    assert_eq!(sim.time().tick_count(), 10);
    assert!((sim.time().elapsed() - 2.5).abs() < 1e-9);
}
