//! Power grid example: a steam engine feeding lamps over poles.
//!
//! Builds a small grid from the bundled catalog, runs it until storage
//! fills, then knocks out a pole in the middle and watches the grid split
//! and the far lamps go dark.
//!
//! Run with: `RUST_LOG=info cargo run -p gridflow-examples --example power_grid`

use gridflow_examples::{World, WorldError, data_dir};
use gridflow_net::{Behaviors, ConstantSink, ConstantSource, NetworkEvent};
use gridflow_spatial::Rotation;
use log::{info, warn};

fn log_events(events: &[NetworkEvent]) {
    for event in events {
        match event {
            NetworkEvent::Starved { network_id, shortfall, tick } => {
                warn!("tick {tick}: {network_id:?} is short by {shortfall}");
            }
            other => info!("{other:?}"),
        }
    }
}

fn main() -> Result<(), WorldError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = World::load(&data_dir())?;
    let mut behaviors = Behaviors::new();

    // Engine occupies (0,0)-(1,0); its pin faces east into the first pole.
    let engine = world.place("steam_engine", 0, 0, Rotation::None)?;
    behaviors.insert(engine, Box::new(ConstantSource { slot: 0, rate: 50.0 }));

    let mut poles = Vec::new();
    for x in 2..8 {
        poles.push(world.place("small_pole", x, 0, Rotation::None)?);
    }
    // Lamps hang below the poles, turned to face north.
    for x in [3, 6] {
        let lamp = world.place("lamp", x, 1, Rotation::Cw90)?;
        behaviors.insert(lamp, Box::new(ConstantSink::new(0, 10.0)));
    }
    let lamp = world.place("lamp", 8, 0, Rotation::None)?;
    behaviors.insert(lamp, Box::new(ConstantSink::new(0, 10.0)));

    info!("=== Running a healthy grid ===");
    for _ in 0..10 {
        let events = world.step(&mut behaviors);
        log_events(&events);
    }
    world.report();

    info!("=== Removing the pole at (4, 0) ===");
    world.demolish(poles[2])?;
    behaviors.remove(engine);
    for _ in 0..40 {
        let events = world.step(&mut behaviors);
        log_events(&events);
    }
    world.report();

    Ok(())
}
