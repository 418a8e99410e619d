use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const MAX_IGNORED_WRITE_LOG: usize = 16;
pub const MAX_ADDRESS_LEN: usize = 48;

static_assertions::const_assert!(MAX_IGNORED_WRITE_LOG > 0);
static_assertions::const_assert!(MAX_ADDRESS_LEN >= 8);

type IgnoredWriteLog = heapless::Vec<ArrayString<MAX_ADDRESS_LEN>, MAX_IGNORED_WRITE_LOG>;

/// A scalar held at one PLC address. Bit addresses carry `Bool`, word
/// addresses carry `Int` or `Real`; the zero value is picked by the typed
/// accessor, never by implicit coercion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Real(f64),
}

impl Value {
    #[must_use]
    pub fn as_bit(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            Value::Real(r) => r != 0.0,
        }
    }

    #[must_use]
    pub fn as_word(&self) -> f64 {
        match *self {
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(i) => f64::from(i),
            Value::Real(r) => r,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

/// On-delay timer. Accumulates once per scan while running, clamps at the
/// preset and latches `done` until reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub preset: Duration,
    pub accumulated: Duration,
    pub done: bool,
    pub running: bool,
}

/// Up-counter. Event-driven: the scan loop never touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub preset: u32,
    pub accumulated: u32,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VarType {
    Bool,
    Int,
    Real,
    Time,
    String,
}

/// Point-in-time monitoring projection of one address. Derived on demand,
/// never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub var_type: VarType,
    pub address: String,
}

fn var_type_of(value: Value) -> VarType {
    match value {
        Value::Bool(_) => VarType::Bool,
        Value::Int(_) => VarType::Int,
        Value::Real(_) => VarType::Real,
    }
}

/// A coil address parsed once at program-load time. Dispatch is purely on
/// the two-character region prefix; the remainder of the address (including
/// any `W` word infix) is the region key, bit-for-bit compatible with
/// generated programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoilTarget {
    Output(String),
    Flag(String),
    /// Unrecognized prefix. Writes to it are dropped without mutation;
    /// callers may depend on the no-op.
    Unknown(String),
}

impl CoilTarget {
    #[must_use]
    pub fn parse(address: &str) -> Self {
        if let Some(key) = address.strip_prefix("%Q") {
            CoilTarget::Output(key.to_string())
        } else if let Some(key) = address.strip_prefix("%M") {
            CoilTarget::Flag(key.to_string())
        } else {
            CoilTarget::Unknown(address.to_string())
        }
    }
}

/// The addressable state of the controller: inputs, outputs, internal
/// flags, timers and counters. Every read is a total function; a missing
/// address behaves as its region's zero value.
///
/// Single-writer discipline (enforced by construction, not at runtime):
/// the external scheduler writes `inputs`, the scan engine writes
/// everything else.
#[derive(Debug, Default)]
pub struct PlcMemory {
    inputs: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
    flags: HashMap<String, Value>,
    timers: HashMap<String, Timer>,
    counters: HashMap<String, Counter>,
    ignored_coil_writes: u64,
    ignored_write_log: IgnoredWriteLog,
}

impl PlcMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, address: &str, value: impl Into<Value>) {
        self.inputs.insert(address.to_string(), value.into());
    }

    pub fn set_output(&mut self, address: &str, value: impl Into<Value>) {
        self.outputs.insert(address.to_string(), value.into());
    }

    pub fn set_flag(&mut self, address: &str, value: impl Into<Value>) {
        self.flags.insert(address.to_string(), value.into());
    }

    #[must_use]
    pub fn input_bit(&self, address: &str) -> bool {
        self.inputs.get(address).is_some_and(Value::as_bit)
    }

    #[must_use]
    pub fn input_word(&self, address: &str) -> f64 {
        self.inputs.get(address).map_or(0.0, Value::as_word)
    }

    #[must_use]
    pub fn output_bit(&self, address: &str) -> bool {
        self.outputs.get(address).is_some_and(Value::as_bit)
    }

    #[must_use]
    pub fn output_word(&self, address: &str) -> f64 {
        self.outputs.get(address).map_or(0.0, Value::as_word)
    }

    #[must_use]
    pub fn flag_bit(&self, address: &str) -> bool {
        self.flags.get(address).is_some_and(Value::as_bit)
    }

    #[must_use]
    pub fn flag_word(&self, address: &str) -> f64 {
        self.flags.get(address).map_or(0.0, Value::as_word)
    }

    /// Contact read: whichever of inputs/outputs/flags holds the address.
    /// An address belongs to exactly one region; absent everywhere reads
    /// as false.
    #[must_use]
    pub fn contact_bit(&self, address: &str) -> bool {
        if let Some(v) = self.inputs.get(address) {
            v.as_bit()
        } else if let Some(v) = self.outputs.get(address) {
            v.as_bit()
        } else {
            self.flag_bit(address)
        }
    }

    /// Word read across regions, same resolution order as [`contact_bit`].
    ///
    /// [`contact_bit`]: PlcMemory::contact_bit
    #[must_use]
    pub fn word(&self, address: &str) -> f64 {
        if let Some(v) = self.inputs.get(address) {
            v.as_word()
        } else if let Some(v) = self.outputs.get(address) {
            v.as_word()
        } else {
            self.flag_word(address)
        }
    }

    /// Dispatch a coil write on its parsed target. Unknown targets are
    /// dropped without mutation, counted, and surfaced as a warning.
    pub fn write_coil(&mut self, target: &CoilTarget, value: impl Into<Value>) {
        match target {
            CoilTarget::Output(key) => self.set_output(key, value),
            CoilTarget::Flag(key) => self.set_flag(key, value),
            CoilTarget::Unknown(address) => {
                self.ignored_coil_writes = self.ignored_coil_writes.saturating_add(1);
                tracing::warn!(address, "coil write to unrecognized region prefix dropped");

                let mut entry = ArrayString::<MAX_ADDRESS_LEN>::new();
                if entry.try_push_str(address).is_ok() {
                    if self.ignored_write_log.is_full() {
                        self.ignored_write_log.remove(0);
                    }
                    let _ = self.ignored_write_log.push(entry);
                }
            }
        }
    }

    /// Start (or implicitly create) an on-delay timer. Starting an already
    /// running or done timer is harmless.
    pub fn start_timer(&mut self, name: &str, preset: Duration) {
        let timer = self.timers.entry(name.to_string()).or_insert(Timer {
            preset,
            accumulated: Duration::ZERO,
            done: false,
            running: false,
        });
        timer.running = true;
    }

    pub fn reset_timer(&mut self, name: &str) {
        if let Some(timer) = self.timers.get_mut(name) {
            timer.accumulated = Duration::ZERO;
            timer.done = false;
            timer.running = false;
        }
    }

    #[must_use]
    pub fn is_timer_done(&self, name: &str) -> bool {
        self.timers.get(name).is_some_and(|t| t.done)
    }

    #[must_use]
    pub fn timer(&self, name: &str) -> Option<&Timer> {
        self.timers.get(name)
    }

    /// Advance every running timer by one scan period. Accumulation clamps
    /// at the preset; `done` latches and the timer stops.
    pub fn advance_timers(&mut self, scan_period: Duration) {
        for timer in self.timers.values_mut() {
            if timer.running && !timer.done {
                timer.accumulated += scan_period;
                if timer.accumulated >= timer.preset {
                    timer.accumulated = timer.preset;
                    timer.done = true;
                    timer.running = false;
                }
            }
            debug_assert!(
                timer.accumulated <= timer.preset,
                "timer accumulation overshot preset"
            );
        }
    }

    /// Count up by exactly one, implicitly creating the counter on first
    /// use. `done` latches once the preset is reached.
    pub fn count_up(&mut self, name: &str, preset: u32) {
        let counter = self.counters.entry(name.to_string()).or_insert(Counter {
            preset,
            accumulated: 0,
            done: false,
        });
        counter.accumulated = counter.accumulated.saturating_add(1);
        if counter.accumulated >= counter.preset {
            counter.done = true;
        }
    }

    pub fn reset_counter(&mut self, name: &str) {
        if let Some(counter) = self.counters.get_mut(name) {
            counter.accumulated = 0;
            counter.done = false;
        }
    }

    #[must_use]
    pub fn is_counter_done(&self, name: &str) -> bool {
        self.counters.get(name).is_some_and(|c| c.done)
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> Option<&Counter> {
        self.counters.get(name)
    }

    #[must_use]
    pub fn ignored_coil_writes(&self) -> u64 {
        self.ignored_coil_writes
    }

    /// Most recent dropped coil addresses, oldest first.
    #[must_use]
    pub fn ignored_write_log(&self) -> impl Iterator<Item = &str> {
        self.ignored_write_log.iter().map(ArrayString::as_str)
    }

    /// Lazy, restartable snapshot of every address for monitoring. Timers
    /// and counters emit two synthetic variables each (`<name>.ACC`,
    /// `<name>.DN`). Iteration order within a region is unspecified.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        let inputs = self.inputs.iter().map(|(name, &value)| Variable {
            name: name.clone(),
            value,
            var_type: var_type_of(value),
            address: format!("%I{name}"),
        });
        let outputs = self.outputs.iter().map(|(name, &value)| Variable {
            name: name.clone(),
            value,
            var_type: var_type_of(value),
            address: format!("%Q{name}"),
        });
        let flags = self.flags.iter().map(|(name, &value)| Variable {
            name: name.clone(),
            value,
            var_type: var_type_of(value),
            address: format!("%M{name}"),
        });
        let timers = self.timers.iter().flat_map(|(name, timer)| {
            [
                Variable {
                    name: format!("{name}.ACC"),
                    value: Value::Int(timer.accumulated.as_millis() as i32),
                    var_type: VarType::Time,
                    address: format!("%T{name}"),
                },
                Variable {
                    name: format!("{name}.DN"),
                    value: Value::Bool(timer.done),
                    var_type: VarType::Bool,
                    address: format!("%T{name}.DN"),
                },
            ]
        });
        let counters = self.counters.iter().flat_map(|(name, counter)| {
            [
                Variable {
                    name: format!("{name}.ACC"),
                    value: Value::Int(counter.accumulated as i32),
                    var_type: VarType::Int,
                    address: format!("%C{name}"),
                },
                Variable {
                    name: format!("{name}.DN"),
                    value: Value::Bool(counter.done),
                    var_type: VarType::Bool,
                    address: format!("%C{name}.DN"),
                },
            ]
        });

        inputs
            .chain(outputs)
            .chain(flags)
            .chain(timers)
            .chain(counters)
    }

    /// Discard all regions and warning counters. Destructive and immediate.
    pub fn reset(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
        self.flags.clear();
        self.timers.clear();
        self.counters.clear();
        self.ignored_coil_writes = 0;
        self.ignored_write_log.clear();
    }
}
