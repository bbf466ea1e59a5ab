extern crate roadmap;

use roadmap::field::UNWRITTEN;
use roadmap::partition::ChunkCursor;
use roadmap::{Coordinator, Discard, Geometry, Policy, Window, ZoomDriver};

const RANKS: [usize; 5] = [1, 2, 3, 5, 8];

fn policies() -> Vec<Policy> {
    vec![
        Policy::Block,
        Policy::RoundRobin,
        Policy::dynamic(),
        Policy::Dynamic { chunk_size: 7 },
    ]
}

fn sequential(geometry: Geometry, window: &Window) -> u64 {
    Coordinator::new(geometry, 1, Policy::Sequential, 1)
        .unwrap()
        .run_round(window)
        .unwrap()
        .checksum
}

#[test]
fn every_policy_matches_the_sequential_checksum() {
    let geometry = Geometry::new(160, 123, 100).unwrap();
    let window = Window::start();
    let expected = sequential(geometry, &window);
    assert!(expected > 0);

    for policy in policies() {
        for &ranks in RANKS.iter() {
            let round = Coordinator::new(geometry, ranks, policy, 1)
                .unwrap()
                .run_round(&window)
                .unwrap();
            assert_eq!(round.checksum, expected, "{} over {} ranks", policy, ranks);
        }
    }
}

#[test]
fn every_cell_is_written_under_every_policy() {
    let geometry = Geometry::new(37, 29, 50).unwrap();
    let window = Window::target();
    let baseline = Coordinator::new(geometry, 1, Policy::Sequential, 1)
        .unwrap()
        .run_round(&window)
        .unwrap();

    for policy in policies() {
        for &ranks in RANKS.iter() {
            let round = Coordinator::new(geometry, ranks, policy, 2)
                .unwrap()
                .run_round(&window)
                .unwrap();
            assert!(round.field.cells().iter().all(|&c| c != UNWRITTEN));
            assert!(round.field.missing_rows().is_empty());
            assert_eq!(round.field.cells(), baseline.field.cells());
        }
    }
}

#[test]
fn dynamic_rounds_issue_exactly_the_chunks_needed() {
    let geometry = Geometry::new(30, 41, 30).unwrap();
    for &chunk_size in &[1, 3, 8, 41, 50] {
        for &ranks in RANKS.iter() {
            let round = Coordinator::new(geometry, ranks, Policy::Dynamic { chunk_size }, 1)
                .unwrap()
                .run_round(&Window::start())
                .unwrap();
            assert_eq!(
                round.stats.chunks_issued,
                ChunkCursor::expected_chunks(41, chunk_size),
                "chunk {} ranks {}",
                chunk_size,
                ranks
            );
            assert_eq!(round.stats.outstanding, 0);
        }
    }
}

#[test]
fn zoom_sequence_agrees_across_policies() {
    let geometry = Geometry::new(64, 48, 100).unwrap();
    let driver = ZoomDriver::default();
    let expected = driver
        .run(
            &Coordinator::new(geometry, 1, Policy::Sequential, 1).unwrap(),
            &mut Discard,
        )
        .unwrap()
        .checksums();
    assert_eq!(expected.len(), 11);

    for policy in policies() {
        for &ranks in &[2, 5] {
            let coordinator = Coordinator::new(geometry, ranks, policy, 1).unwrap();
            let report = driver.run(&coordinator, &mut Discard).unwrap();
            assert_eq!(report.checksums(), expected, "{} over {} ranks", policy, ranks);
        }
    }
}

#[test]
fn rounds_are_reproducible() {
    let geometry = Geometry::new(50, 50, 100).unwrap();
    let coordinator = Coordinator::new(geometry, 4, Policy::dynamic(), 1).unwrap();
    let first = coordinator.run_round(&Window::target()).unwrap().checksum;
    let second = coordinator.run_round(&Window::target()).unwrap().checksum;
    assert_eq!(first, second);
}

/// Checksum of the start window at 2000x2000 with an iteration cap of 100.
const REFERENCE_CHECKSUM: u64 = 175_732_262;

#[test]
fn reference_field_dynamic_matches_sequential() {
    let geometry = Geometry::default();
    let window = Window::start();
    let c0 = sequential(geometry, &window);
    assert_eq!(c0, REFERENCE_CHECKSUM);
    let dynamic = Coordinator::new(geometry, 4, Policy::Dynamic { chunk_size: 1 }, 1)
        .unwrap()
        .run_round(&window)
        .unwrap();
    assert_eq!(dynamic.checksum, REFERENCE_CHECKSUM);
    assert_eq!(dynamic.stats.chunks_issued, 2000);
}

#[test]
#[ignore]
fn reference_zoom_sequence_agrees_across_policies() {
    let geometry = Geometry::default();
    let driver = ZoomDriver::default();
    let expected = driver
        .run(
            &Coordinator::new(geometry, 1, Policy::Sequential, 1).unwrap(),
            &mut Discard,
        )
        .unwrap()
        .checksums();

    for policy in &[Policy::Block, Policy::RoundRobin, Policy::dynamic()] {
        let coordinator = Coordinator::new(geometry, 4, *policy, 2).unwrap();
        let report = driver.run(&coordinator, &mut Discard).unwrap();
        assert_eq!(report.checksums(), expected, "{}", policy);
    }
}
