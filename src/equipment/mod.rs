pub mod motor;

pub use motor::{Motor, MotorConfig, MotorState};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A continuous-dynamics process model advanced in lock-step with the scan
/// engine. Pure step function: no blocking, no internal parallelism. Each
/// configured unit owns exactly one instance.
pub trait Equipment {
    type State: Clone + Serialize;

    /// Advance the model by `dt` under a boolean actuator command and
    /// return the resulting physical state.
    fn update(&mut self, command_on: bool, dt: Duration) -> Self::State;

    fn state(&self) -> Self::State;

    fn reset(&mut self);

    fn id(&self) -> &str;
}

/// Equipment type selector. Only `Motor` has an algorithmic model today;
/// the remaining kinds are declared extension points and fail unit
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentKind {
    Motor,
    Conveyor,
    Tank,
    Valve,
    Sensor,
    Cylinder,
    Pump,
}

impl core::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            EquipmentKind::Motor => "motor",
            EquipmentKind::Conveyor => "conveyor",
            EquipmentKind::Tank => "tank",
            EquipmentKind::Valve => "valve",
            EquipmentKind::Sensor => "sensor",
            EquipmentKind::Cylinder => "cylinder",
            EquipmentKind::Pump => "pump",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

/// Per-unit configuration record. `kind` selects the physical model,
/// `parameters` seeds its constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub parameters: serde_json::Value,
}
