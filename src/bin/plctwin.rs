use clap::{App, Arg};
use colored::Colorize;
use plctwin::sim::{ActuatorWire, MotorSignal, SensorWire, SimulationConfig, Simulator};
use plctwin::{CompiledProgram, EquipmentConfig, EquipmentKind};
use std::time::Duration;
use tokio::time;
use tracing::info;

const STATUS_PERIOD_MS: u64 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("plctwin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("PLC digital-twin co-simulator: closed-loop motor start/stop demo")
        .arg(
            Arg::with_name("scan-ms")
                .long("scan-ms")
                .takes_value(true)
                .default_value("10")
                .help("Scan clock period in milliseconds"),
        )
        .arg(
            Arg::with_name("physics-ms")
                .long("physics-ms")
                .takes_value(true)
                .default_value("10")
                .help("Physics clock period in milliseconds"),
        )
        .arg(
            Arg::with_name("duration")
                .long("duration")
                .takes_value(true)
                .default_value("10")
                .help("Simulated seconds to run"),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Emit JSON snapshots instead of the status line"),
        )
        .get_matches();

    let scan_ms: u64 = matches.value_of("scan-ms").unwrap_or("10").parse()?;
    let physics_ms: u64 = matches.value_of("physics-ms").unwrap_or("10").parse()?;
    let duration_s: u64 = matches.value_of("duration").unwrap_or("10").parse()?;
    let emit_json = matches.is_present("json");

    let config = demo_config(scan_ms, physics_ms);
    let mut sim = Simulator::new(&config)?;
    sim.load_program(CompiledProgram::motor_start_stop());
    sim.start();

    println!("⚙️  PLC Digital-Twin Co-Simulator");
    println!("=================================");
    println!("   Scan clock:    {scan_ms} ms");
    println!("   Physics clock: {physics_ms} ms");
    println!("   Program:       motor start/stop (seal-in latch)");

    let total_scans = duration_s * 1000 / scan_ms;
    let status_every = STATUS_PERIOD_MS / scan_ms;
    let start_at = 1000 / scan_ms;
    let release_at = 1500 / scan_ms;
    let stop_at = total_scans.saturating_sub(2000 / scan_ms);

    let mut interval = time::interval(Duration::from_millis(scan_ms));
    let mut scan: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Scripted operator: press start at 1s, release half a
                // second later, press stop 2s before the end.
                if scan == start_at {
                    info!("🟢 START button pressed");
                    sim.set_input("START_BUTTON", true);
                } else if scan == release_at {
                    sim.set_input("START_BUTTON", false);
                } else if scan == stop_at {
                    info!("🔴 STOP button pressed");
                    sim.set_input("STOP_BUTTON", true);
                }

                sim.tick();
                scan += 1;

                if scan % status_every.max(1) == 0 {
                    print_status(&sim, emit_json)?;
                }

                if scan >= total_scans {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    sim.stop();
    let stats = sim.stats();
    println!(
        "🛑 Done: {} scans, {} dropped coil writes",
        stats.scan_count, stats.ignored_coil_writes
    );

    Ok(())
}

fn demo_config(scan_ms: u64, physics_ms: u64) -> SimulationConfig {
    SimulationConfig {
        scan_period_ms: scan_ms,
        physics_period_ms: physics_ms,
        equipment: vec![EquipmentConfig {
            id: "M1".to_string(),
            kind: EquipmentKind::Motor,
            name: "Main drive".to_string(),
            position: plctwin::equipment::Position::default(),
            parameters: serde_json::json!({
                "maxRPM": 1800.0,
                "inertia": 0.05,
                "torque": 10.0,
                "ratedCurrent": 12.0,
                "ratedPower": 5.5,
            }),
        }],
        sensors: vec![
            SensorWire {
                equipment_id: "M1".to_string(),
                signal: MotorSignal::Running,
                input: "MOTOR_RUNNING".to_string(),
            },
            SensorWire {
                equipment_id: "M1".to_string(),
                signal: MotorSignal::Rpm,
                input: "MOTOR_SPEED".to_string(),
            },
        ],
        actuators: vec![ActuatorWire {
            output: "MOTOR_CONTACTOR".to_string(),
            equipment_id: "M1".to_string(),
        }],
    }
}

fn print_status(sim: &Simulator, emit_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if emit_json {
        println!("{}", serde_json::to_string(&sim.snapshot())?);
        return Ok(());
    }

    let stats = sim.stats();
    if let Some(motor) = sim.equipment_state("M1") {
        let contactor = if sim.output_bit("MOTOR_CONTACTOR") {
            "ON ".green()
        } else {
            "OFF".red()
        };
        println!(
            "t={:>6.1}s scan={:<6} contactor={} rpm={:>6.0} current={:>6.2}A temp={:>5.1}°C vib={:>5.1}",
            sim.elapsed().as_secs_f64(),
            stats.scan_count,
            contactor,
            motor.rpm,
            motor.current,
            motor.temperature,
            motor.vibration,
        );
    }
    Ok(())
}
