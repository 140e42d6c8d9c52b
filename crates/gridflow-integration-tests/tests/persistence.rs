//! Integration test: saving and loading network state.
//!
//! A save only carries volumes, memberships and pin buffers; the loading
//! side rebuilds the same world itself and re-seeds discovery from the
//! snapshot so stored resource survives the round trip.

use gridflow_net::test_utils::*;
use gridflow_net::{NetError, NodeRef, Pin, PinBuffers, VolumeSnapshot};
use gridflow_spatial::Direction;

fn world() -> (Sandbox, NodeRef, NodeRef) {
    let mut sb = Sandbox::new();
    let (producer, consumer) = sb.line(
        3,
        Pin::producer(fixed(50.0)),
        Pin::consumer(fixed(0.0)),
    );
    (sb, producer, consumer)
}

#[test]
fn save_and_load_through_bytes() {
    let (mut saved, producer, _) = world();
    for _ in 0..6 {
        saved.module.adjust_buffer(producer, 50.0).unwrap();
        saved.tick();
    }
    saved.module.adjust_buffer(producer, 30.0).unwrap();
    assert_eq!(saved.module.total_volume(), fixed(300.0));

    let bytes = saved.module.snapshot(saved.tick).encode().unwrap();

    let (mut loaded, producer, _) = world();
    let snapshot = VolumeSnapshot::decode(&bytes).unwrap();
    assert_eq!(snapshot.total_volume(), fixed(300.0));
    let report = loaded.module.restore_volumes(&snapshot).unwrap();
    assert_eq!(report.skipped, 0);
    assert_eq!(report.buffers, 2);

    let outcome = loaded.module.recompute(&loaded.grid);
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(loaded.module.total_volume(), fixed(300.0));
    assert_eq!(loaded.buffer(producer), fixed(30.0));

    // Restored networks never reuse a saved id.
    let saved_id = saved.module.networks().next().unwrap().id;
    assert!(outcome.created[0] > saved_id);
}

#[test]
fn load_into_a_smaller_world_keeps_what_fits() {
    let (mut saved, producer, _) = world();
    for _ in 0..6 {
        saved.module.adjust_buffer(producer, 50.0).unwrap();
        saved.tick();
    }
    let snapshot = saved.module.snapshot(saved.tick);

    // Same layout without its last connector and consumer.
    let mut loaded = Sandbox::new();
    loaded.pin_at(0, 0, Direction::East, grade_a(), Pin::producer(fixed(50.0)));
    loaded.connector_at(1, 0, grade_a());
    loaded.connector_at(2, 0, grade_a());

    let report = loaded.module.restore_volumes(&snapshot).unwrap();
    assert!(report.skipped > 0);
    loaded.tick();
    // Two of three connectors at half fill.
    assert_eq!(loaded.module.total_volume(), fixed(200.0));
}

#[test]
fn corrupt_saves_are_rejected() {
    let (saved, _, _) = world();
    let mut bytes = saved.module.snapshot(0).encode().unwrap();
    bytes.truncate(bytes.len() / 2);
    assert!(matches!(
        VolumeSnapshot::decode(&bytes),
        Err(NetError::SnapshotDecode(_))
    ));
}

#[test]
fn restore_then_tick_resumes_flow() {
    let (mut saved, producer, consumer) = world();
    for _ in 0..3 {
        saved.module.adjust_buffer(producer, 50.0).unwrap();
        saved.tick();
    }
    let snapshot = saved.module.snapshot(saved.tick);

    // Reload with a consumer that now takes 25 per tick.
    let mut loaded = Sandbox::new();
    let (_, consumer_loaded) = loaded.line(3, Pin::producer(fixed(50.0)), Pin::consumer(fixed(25.0)));
    assert_eq!(consumer_loaded, consumer);
    loaded.module.restore_volumes(&snapshot).unwrap();
    loaded.tick();

    assert_eq!(loaded.buffer(consumer), fixed(25.0));
    // A quarter of 600 restored, less one tick of demand.
    assert_eq!(loaded.module.total_volume(), fixed(125.0));
}
