//! # PLC Digital-Twin Co-Simulator
//!
//! A multi-rate discrete-time co-simulator: a fixed-step PLC scan engine
//! executing compiled ladder-style logic against a segregated memory model,
//! advanced in lock-step with continuous-dynamics equipment models to
//! produce physically plausible closed-loop behavior.
//!
//! ## Features
//!
//! - **Segregated memory model**: inputs, outputs, flags, timers and
//!   counters with total-function reads (a missing address reads as its
//!   region's zero value)
//! - **Scan-cycle engine**: one fixed-order logic pass per `scan()`, with
//!   scan statistics for performance monitoring
//! - **Instruction set**: series/parallel rungs, SR latch with reset
//!   priority, on-delay timers, edge-triggered counters, compare and math
//! - **Motor physics**: torque/inertia acceleration, friction decay,
//!   thermal rise/cooling, locked-rotor current surge, resonance vibration
//! - **Co-simulation scheduler**: independent scan and physics clocks,
//!   sensor/actuator wiring between PLC memory and equipment models
//!
//! ## Quick Start
//!
//! ```rust
//! use plctwin::{CompiledProgram, ScanEngine};
//!
//! let mut engine = ScanEngine::default();
//! engine.load_program(CompiledProgram::motor_start_stop());
//! engine.start();
//!
//! engine.memory_mut().set_input("START_BUTTON", true);
//! engine.scan();
//! assert!(engine.memory().output_bit("MOTOR_CONTACTOR"));
//! ```
//!
//! ## Architecture
//!
//! - [`memory`] - addressable controller state and monitoring snapshot
//! - [`program`] - the rung instruction set and compiled programs
//! - [`engine`] - the scan-cycle state machine
//! - [`equipment`] - physical process models
//! - [`sim`] - the co-simulation scheduler and wiring

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod engine;
pub mod equipment;
pub mod memory;
pub mod program;
pub mod sim;

// Re-export main public types for convenience
pub use engine::{ScanEngine, ScanStats};
pub use equipment::{Equipment, EquipmentConfig, EquipmentKind, Motor, MotorConfig, MotorState};
pub use memory::{Counter, PlcMemory, Timer, Value, Variable};
pub use program::{CompiledProgram, Contact, Instruction};
pub use sim::{ConfigError, SimulationConfig, Simulator};
