use crate::engine::{ScanEngine, ScanStats};
use crate::equipment::{Equipment, EquipmentConfig, EquipmentKind, Motor, MotorState};
use crate::memory::{Value, Variable};
use crate::program::CompiledProgram;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scan period must be non-zero")]
    ZeroScanPeriod,
    #[error("physics period must be non-zero")]
    ZeroPhysicsPeriod,
    #[error("duplicate equipment id `{0}`")]
    DuplicateEquipment(String),
    #[error("equipment kind `{kind}` has no physical model (unit `{id}`)")]
    UnsupportedEquipment { id: String, kind: EquipmentKind },
    #[error("invalid parameters for unit `{id}`")]
    InvalidParameters {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("wire references unknown equipment `{0}`")]
    UnknownEquipment(String),
}

/// Which field of a motor's physical state feeds an input address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorSignal {
    Running,
    Rpm,
    Current,
    Temperature,
    Vibration,
}

/// Equipment state field → PLC input address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorWire {
    pub equipment_id: String,
    pub signal: MotorSignal,
    pub input: String,
}

/// PLC output bit → equipment boolean command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorWire {
    pub output: String,
    pub equipment_id: String,
}

fn default_period_ms() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Scan clock period (nominally 10 ms / 100 Hz).
    #[serde(default = "default_period_ms")]
    pub scan_period_ms: u64,
    /// Physics clock period; may differ from the scan clock.
    #[serde(default = "default_period_ms")]
    pub physics_period_ms: u64,
    pub equipment: Vec<EquipmentConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorWire>,
    #[serde(default)]
    pub actuators: Vec<ActuatorWire>,
}

#[derive(Debug)]
struct MotorUnit {
    motor: Motor,
    command: bool,
    last_state: MotorState,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentSnapshot {
    pub id: String,
    pub state: MotorState,
}

/// Point-in-time view of the whole co-simulation, for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub running: bool,
    pub elapsed_ms: u64,
    pub stats: ScanStats,
    pub equipment: Vec<EquipmentSnapshot>,
}

/// Drives the scan engine on the scan clock and the equipment models on
/// the physics clock, wiring equipment state back into PLC inputs and PLC
/// outputs into equipment commands.
///
/// Per tick, in this order: (a) prior-tick equipment state → inputs,
/// (b) exactly one `scan()`, (c) outputs → equipment commands, (d) advance
/// the physics models. Reordering introduces a one-tick input/output skew.
#[derive(Debug)]
pub struct Simulator {
    engine: ScanEngine,
    units: Vec<MotorUnit>,
    // Wires resolved to unit indices at build time.
    sensors: Vec<(usize, MotorSignal, String)>,
    actuators: Vec<(String, usize)>,
    physics_period: Duration,
    physics_debt: Duration,
    elapsed: Duration,
}

impl Simulator {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        if config.scan_period_ms == 0 {
            return Err(ConfigError::ZeroScanPeriod);
        }
        if config.physics_period_ms == 0 {
            return Err(ConfigError::ZeroPhysicsPeriod);
        }

        let mut units: Vec<MotorUnit> = Vec::with_capacity(config.equipment.len());
        for unit_config in &config.equipment {
            if units.iter().any(|u| u.motor.id() == unit_config.id) {
                return Err(ConfigError::DuplicateEquipment(unit_config.id.clone()));
            }
            if unit_config.kind != EquipmentKind::Motor {
                return Err(ConfigError::UnsupportedEquipment {
                    id: unit_config.id.clone(),
                    kind: unit_config.kind,
                });
            }
            let motor_config = serde_json::from_value(unit_config.parameters.clone()).map_err(
                |source| ConfigError::InvalidParameters {
                    id: unit_config.id.clone(),
                    source,
                },
            )?;
            let motor = Motor::new(&unit_config.id, motor_config);
            let last_state = motor.state();
            units.push(MotorUnit {
                motor,
                command: false,
                last_state,
            });
        }

        let unit_index = |id: &str| -> Result<usize, ConfigError> {
            units
                .iter()
                .position(|u| u.motor.id() == id)
                .ok_or_else(|| ConfigError::UnknownEquipment(id.to_string()))
        };

        let mut sensors = Vec::with_capacity(config.sensors.len());
        for wire in &config.sensors {
            sensors.push((unit_index(&wire.equipment_id)?, wire.signal, wire.input.clone()));
        }
        let mut actuators = Vec::with_capacity(config.actuators.len());
        for wire in &config.actuators {
            actuators.push((wire.output.clone(), unit_index(&wire.equipment_id)?));
        }

        Ok(Self {
            engine: ScanEngine::new(Duration::from_millis(config.scan_period_ms)),
            units,
            sensors,
            actuators,
            physics_period: Duration::from_millis(config.physics_period_ms),
            physics_debt: Duration::ZERO,
            elapsed: Duration::ZERO,
        })
    }

    pub fn load_program(&mut self, program: CompiledProgram) {
        self.engine.load_program(program);
    }

    pub fn start(&mut self) {
        tracing::info!(units = self.units.len(), "co-simulation starting");
        self.engine.start();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        tracing::info!("co-simulation stopped");
    }

    /// Discard PLC memory, statistics and equipment state. Does not change
    /// the running flag.
    pub fn reset(&mut self) {
        self.engine.reset();
        for unit in &mut self.units {
            unit.motor.reset();
            unit.command = false;
            unit.last_state = unit.motor.state();
        }
        self.physics_debt = Duration::ZERO;
        self.elapsed = Duration::ZERO;
    }

    /// Advance the co-simulation by one scan period.
    pub fn tick(&mut self) {
        let scan_period = self.engine.scan_period();

        // (a) Prior-tick equipment state into the input region.
        for (unit_idx, signal, input) in &self.sensors {
            let state = &self.units[*unit_idx].last_state;
            let value = match signal {
                MotorSignal::Running => Value::Bool(state.running),
                MotorSignal::Rpm => Value::Real(state.rpm),
                MotorSignal::Current => Value::Real(state.current),
                MotorSignal::Temperature => Value::Real(state.temperature),
                MotorSignal::Vibration => Value::Real(state.vibration),
            };
            self.engine.memory_mut().set_input(input, value);
        }

        // (b) Exactly one logic pass.
        self.engine.scan();

        // (c) Outputs into equipment commands.
        for (output, unit_idx) in &self.actuators {
            self.units[*unit_idx].command = self.engine.memory().output_bit(output);
        }

        // (d) Physics clock, fixed-step with its own accumulator.
        self.physics_debt += scan_period;
        while self.physics_debt >= self.physics_period {
            for unit in &mut self.units {
                unit.last_state = unit.motor.update(unit.command, self.physics_period);
            }
            self.physics_debt -= self.physics_period;
        }

        self.elapsed += scan_period;
    }

    pub fn run_scans(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    pub fn set_input(&mut self, address: &str, value: impl Into<Value>) {
        self.engine.memory_mut().set_input(address, value);
    }

    #[must_use]
    pub fn output_bit(&self, address: &str) -> bool {
        self.engine.memory().output_bit(address)
    }

    #[must_use]
    pub fn output_word(&self, address: &str) -> f64 {
        self.engine.memory().output_word(address)
    }

    #[must_use]
    pub fn equipment_state(&self, id: &str) -> Option<MotorState> {
        self.units
            .iter()
            .find(|u| u.motor.id() == id)
            .map(|u| u.last_state)
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.engine.memory().variables()
    }

    #[must_use]
    pub fn stats(&self) -> ScanStats {
        self.engine.stats()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn engine(&self) -> &ScanEngine {
        &self.engine
    }

    #[must_use]
    pub fn engine_mut(&mut self) -> &mut ScanEngine {
        &mut self.engine
    }

    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            running: self.engine.is_running(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            stats: self.engine.stats(),
            equipment: self
                .units
                .iter()
                .map(|u| EquipmentSnapshot {
                    id: u.motor.id().to_string(),
                    state: u.last_state,
                })
                .collect(),
        }
    }
}
