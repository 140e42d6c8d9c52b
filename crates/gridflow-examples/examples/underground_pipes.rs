//! Underground pipe example: tunnels, storage and save/load.
//!
//! A pump feeds a boiler through a pair of underground pipe ends that
//! bridge a row of other buildings. Halfway through, the network state is
//! saved to bytes and loaded into a freshly built copy of the same layout.
//!
//! Run with: `cargo run -p gridflow-examples --example underground_pipes`

use gridflow_examples::{World, WorldError, data_dir};
use gridflow_net::{Behaviors, ConstantSink, ConstantSource, NodeRef, PinBuffers, VolumeSnapshot};
use gridflow_spatial::Rotation;
use log::info;

/// Pump, pipe, tunnel pair over a lamp row, pipe, boiler. Returns the
/// boiler's pin.
fn build(world: &mut World, behaviors: &mut Behaviors) -> Result<NodeRef, WorldError> {
    let pump = world.place("offshore_pump", 0, 0, Rotation::None)?;
    world.place("pipe", 1, 0, Rotation::None)?;
    world.place("pipe_to_ground", 2, 0, Rotation::None)?;
    // Unrelated buildings the tunnel passes under.
    for x in 3..7 {
        world.place("lamp", x, 0, Rotation::None)?;
    }
    world.place("pipe_from_ground", 7, 0, Rotation::None)?;
    world.place("pipe", 8, 0, Rotation::None)?;
    let boiler = world.place("boiler", 9, 0, Rotation::None)?;

    behaviors.insert(pump, Box::new(ConstantSource { slot: 0, rate: 60.0 }));
    behaviors.insert(boiler, Box::new(ConstantSink::new(0, 30.0)));
    Ok(NodeRef::slot(boiler, 0))
}

fn main() -> Result<(), WorldError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = World::load(&data_dir())?;
    let mut behaviors = Behaviors::new();
    build(&mut world, &mut behaviors)?;

    for _ in 0..5 {
        world.step(&mut behaviors);
    }
    world.report();

    let bytes = world.module.snapshot(world.tick).encode()?;
    info!("saved {} bytes at tick {}", bytes.len(), world.tick);

    let mut loaded = World::load(&data_dir())?;
    let mut loaded_behaviors = Behaviors::new();
    let boiler = build(&mut loaded, &mut loaded_behaviors)?;
    let report = loaded
        .module
        .restore_volumes(&VolumeSnapshot::decode(&bytes)?)?;
    info!(
        "restored {} links and {} buffers ({} skipped)",
        report.links, report.buffers, report.skipped
    );
    loaded.tick = world.tick;

    for _ in 0..5 {
        world.step(&mut behaviors);
        loaded.step(&mut loaded_behaviors);
    }
    info!("original:");
    world.report();
    info!("reloaded:");
    loaded.report();

    for (name, w) in [("original", &world), ("reloaded", &loaded)] {
        let stored: f64 = w
            .module
            .networks()
            .map(|n| n.current_volume.to_num::<f64>())
            .sum();
        info!("{name}: {stored} stored");
    }

    info!("boiler buffer: {}", loaded.module.read_buffer(boiler)?);
    Ok(())
}
