//! Example: Configuration-driven galvo machine.
//!
//! This example demonstrates how to:
//! - Parse a machine description from TOML
//! - Build the calibration grid and wrap a DAC in a `GalvoStepSink`
//! - Run queued blocks through the step scheduler with linear advance
//!
//! Run with: `cargo run --example config_driven --features std`

use galvo_motion::{
    error::{ConfigError, Error, OutputError, Result},
    galvo::GalvoAxis,
    parse_config, AdvanceSteps, AdvanceTask, Axis, BlockQueue, GalvoPositionMapper, GalvoSink,
    GalvoStepSink, MotionBlock, Motor, NoEndstops, StepSink, Stepper,
};

/// DAC stand-in that keeps the last committed pair.
#[derive(Default)]
struct MockDac {
    pending_x: u16,
    committed: (u16, u16),
    commits: u32,
}

impl GalvoSink for MockDac {
    fn set_axis_value(
        &mut self,
        axis: GalvoAxis,
        value: u16,
        commit: bool,
    ) -> core::result::Result<(), OutputError> {
        match axis {
            GalvoAxis::X => self.pending_x = value,
            GalvoAxis::Y => {
                if commit {
                    self.committed = (self.pending_x, value);
                    self.commits += 1;
                }
            }
        }
        Ok(())
    }
}

/// Z and extruder drivers stand-in.
#[derive(Default)]
struct MockDrivers {
    pulses: [u32; galvo_motion::stepper::MOTOR_SLOTS],
}

impl StepSink for MockDrivers {
    fn set_direction(
        &mut self,
        _motor: Motor,
        _reverse: bool,
    ) -> core::result::Result<(), OutputError> {
        Ok(())
    }

    fn pulse(&mut self, motor: Motor) -> core::result::Result<(), OutputError> {
        self.pulses[motor.index()] += 1;
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== Configuration-Driven Galvo Example ===\n");

    let toml_content = r#"
[stepper]
max_step_frequency = 40000
extruders = 1

[axes.x]
steps_per_unit = 655.35
[axes.y]
steps_per_unit = 655.35
[axes.z]
steps_per_unit = 400.0
[axes.e]
steps_per_unit = 95.0

[advance]
pulses_per_tick = 2

[galvo]
field_size_mm = 100.0
mirror_distance_mm = 200.0
mirror_separation_mm = 10.0
"#;

    let config = parse_config(toml_content)?;
    let galvo = config
        .galvo
        .as_ref()
        .ok_or(Error::Config(ConfigError::MissingComponent("galvo")))?;

    let mapper: GalvoPositionMapper<MockDac, 9> =
        GalvoPositionMapper::from_config(galvo, MockDac::default())?;
    let geometry = *mapper.grid().geometry();
    println!("Calibration grid:");
    println!("  X range: {}..{}", geometry.x.min, geometry.x.max);
    println!("  Y range: {}..{}", geometry.y.min, geometry.y.max);
    println!("  Units/mm: {:.2}", geometry.units_per_mm(GalvoAxis::X));
    let corner = mapper.grid().offset(0, 0);
    println!("  Corner offset: ({}, {})", corner.x, corner.y);
    println!();

    let steps = AdvanceSteps::new();
    let mut extruder_task = AdvanceTask::from_config(&steps, MockDrivers::default(), &config)?;

    let mut queue: BlockQueue<8> = BlockQueue::new();
    let (mut planner, consumer) = queue.split();

    let mut stepper = Stepper::builder()
        .from_config(&config)
        .queue(consumer)
        .sink(GalvoStepSink::new(mapper, MockDrivers::default()))
        .endstops(NoEndstops)
        .advance_steps(&steps)
        .build()?;

    planner.push(
        MotionBlock::new([2000, -1000, 0, 50], 20_000)
            .with_rates(2000, 20_000, 2000)
            .with_phases(600, 1400, 200_000),
    )?;
    planner.push(MotionBlock::new([-500, 500, 10, 0], 8000))?;

    let mut interrupts = 0u32;
    let mut elapsed_ticks = 0u64;
    let mut extruder_pulses = 0u32;
    while stepper.is_busy() || !planner.is_empty() {
        elapsed_ticks += u64::from(stepper.on_timer());
        extruder_pulses += extruder_task.tick();
        interrupts += 1;
    }
    while steps.pending(0) != 0 {
        extruder_pulses += extruder_task.tick();
    }

    let stats = stepper.stats();
    println!("Execution:");
    println!("  Interrupts: {}", interrupts);
    println!("  Timer ticks: {}", elapsed_ticks);
    println!("  Blocks completed: {}", stats.blocks_completed);
    println!("  Rate clamps: {}", stats.rate_clamps);
    println!("  Extruder pulses: {}", extruder_pulses);
    for axis in [Axis::X, Axis::Y, Axis::Z, Axis::E] {
        println!(
            "  {:?}: {} steps ({:.3} mm)",
            axis,
            stepper.position(axis).value(),
            stepper.position_units(axis).value()
        );
    }

    let (wx, wy) = stepper.sink().world_position();
    let dac = stepper.sink().mapper().sink();
    println!("  Galvo world position: ({}, {})", wx, wy);
    println!("  Galvo DAC output: {:?} after {} commits", dac.committed, dac.commits);
    println!("  Z pulses: {}", stepper.sink().inner().pulses[Motor::Z.index()]);

    println!("\n=== Example Complete ===");

    Ok(())
}
