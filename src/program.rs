use crate::memory::{CoilTarget, PlcMemory};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Contact polarity: direct read (normally open) or negated read
/// (normally closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    NormallyOpen,
    NormallyClosed,
}

/// One logic read of a memory bit, resolved against whichever of
/// inputs/outputs/flags holds the address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub address: String,
    pub polarity: Polarity,
}

impl Contact {
    #[must_use]
    pub fn no(address: &str) -> Self {
        Self {
            address: address.to_string(),
            polarity: Polarity::NormallyOpen,
        }
    }

    #[must_use]
    pub fn nc(address: &str) -> Self {
        Self {
            address: address.to_string(),
            polarity: Polarity::NormallyClosed,
        }
    }

    fn evaluate(&self, memory: &PlcMemory) -> bool {
        let bit = memory.contact_bit(&self.address);
        match self.polarity {
            Polarity::NormallyOpen => bit,
            Polarity::NormallyClosed => !bit,
        }
    }
}

fn all_contacts(contacts: &[Contact], memory: &PlcMemory) -> bool {
    contacts.iter().all(|c| c.evaluate(memory))
}

fn any_contact(contacts: &[Contact], memory: &PlcMemory) -> bool {
    contacts.iter().any(|c| c.evaluate(memory))
}

/// A word operand: a cross-region address read or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Address(String),
    Const(f64),
}

impl Operand {
    fn value(&self, memory: &PlcMemory) -> f64 {
        match self {
            Operand::Address(address) => memory.word(address),
            Operand::Const(c) => *c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// An ordered series of contacts ANDed into one coil. Pure combinational
/// logic, no memory of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRung {
    pub contacts: Vec<Contact>,
    pub coil: CoilTarget,
}

impl SeriesRung {
    #[must_use]
    pub fn new(contacts: Vec<Contact>, coil: &str) -> Self {
        Self {
            contacts,
            coil: CoilTarget::parse(coil),
        }
    }
}

/// Several series branches ORed into one shared coil ("branches feeding
/// the same coil").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelRung {
    pub branches: Vec<Vec<Contact>>,
    pub coil: CoilTarget,
}

/// SR latch with reset priority: any asserted reset contact forces the
/// coil false; otherwise all set contacts asserted sets it true; otherwise
/// the coil holds its previous value (no write). The canonical seal-in
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatchRung {
    pub set: Vec<Contact>,
    pub reset: Vec<Contact>,
    pub coil: CoilTarget,
}

/// On-delay timer rung: enable starts the named timer, dropping the enable
/// resets it. The optional done coil mirrors the done bit every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerOnRung {
    pub enable: Vec<Contact>,
    pub timer: String,
    pub preset: Duration,
    pub done_coil: Option<CoilTarget>,
}

/// Rising-edge up-counter rung.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpRung {
    pub clock: Vec<Contact>,
    pub counter: String,
    pub preset: u32,
    pub done_coil: Option<CoilTarget>,
    #[serde(default, skip)]
    prev_clock: bool,
}

impl CountUpRung {
    #[must_use]
    pub fn new(clock: Vec<Contact>, counter: &str, preset: u32, done_coil: Option<&str>) -> Self {
        Self {
            clock,
            counter: counter.to_string(),
            preset,
            done_coil: done_coil.map(CoilTarget::parse),
            prev_clock: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRung {
    pub a: Operand,
    pub op: CmpOp,
    pub b: Operand,
    pub coil: CoilTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathRung {
    pub a: Operand,
    pub op: MathOp,
    pub b: Operand,
    pub dest: CoilTarget,
}

/// One unit of compiled logic, executed once per scan with write access to
/// the whole memory model. A compiled program is an ordered sequence of
/// these; later rungs see earlier coil writes within the same scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Series(SeriesRung),
    Parallel(ParallelRung),
    Latch(LatchRung),
    TimerOn(TimerOnRung),
    CountUp(CountUpRung),
    ResetTimer { enable: Vec<Contact>, timer: String },
    ResetCounter { enable: Vec<Contact>, counter: String },
    Compare(CompareRung),
    Math(MathRung),
}

impl Instruction {
    pub fn execute(&mut self, memory: &mut PlcMemory) {
        match self {
            Instruction::Series(rung) => {
                let result = all_contacts(&rung.contacts, memory);
                memory.write_coil(&rung.coil, result);
            }
            Instruction::Parallel(rung) => {
                let result = rung
                    .branches
                    .iter()
                    .any(|branch| all_contacts(branch, memory));
                memory.write_coil(&rung.coil, result);
            }
            Instruction::Latch(rung) => {
                if any_contact(&rung.reset, memory) {
                    memory.write_coil(&rung.coil, false);
                } else if all_contacts(&rung.set, memory) {
                    memory.write_coil(&rung.coil, true);
                }
                // Neither asserted: hold the previous coil value.
            }
            Instruction::TimerOn(rung) => {
                if all_contacts(&rung.enable, memory) {
                    memory.start_timer(&rung.timer, rung.preset);
                } else {
                    memory.reset_timer(&rung.timer);
                }
                if let Some(coil) = &rung.done_coil {
                    let done = memory.is_timer_done(&rung.timer);
                    memory.write_coil(coil, done);
                }
            }
            Instruction::CountUp(rung) => {
                let clock = all_contacts(&rung.clock, memory);
                if clock && !rung.prev_clock {
                    memory.count_up(&rung.counter, rung.preset);
                }
                rung.prev_clock = clock;
                if let Some(coil) = &rung.done_coil {
                    let done = memory.is_counter_done(&rung.counter);
                    memory.write_coil(coil, done);
                }
            }
            Instruction::ResetTimer { enable, timer } => {
                if all_contacts(enable, memory) {
                    memory.reset_timer(timer);
                }
            }
            Instruction::ResetCounter { enable, counter } => {
                if all_contacts(enable, memory) {
                    memory.reset_counter(counter);
                }
            }
            Instruction::Compare(rung) => {
                let a = rung.a.value(memory);
                let b = rung.b.value(memory);
                let result = match rung.op {
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                };
                memory.write_coil(&rung.coil, result);
            }
            Instruction::Math(rung) => {
                let a = rung.a.value(memory);
                let b = rung.b.value(memory);
                let result = match rung.op {
                    MathOp::Add => a + b,
                    MathOp::Sub => a - b,
                    MathOp::Mul => a * b,
                    // Total-function policy: divide by zero yields zero.
                    MathOp::Div => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                };
                memory.write_coil(&rung.dest, result);
            }
        }
    }
}

/// An opaque compiled program: an ordered rung list plus a display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl CompiledProgram {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            instructions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The built-in motor start/stop pattern: a seal-in latch with
    /// stop/emergency-stop priority driving the contactor and the running
    /// lamp.
    #[must_use]
    pub fn motor_start_stop() -> Self {
        let latch = |coil: &str| {
            Instruction::Latch(LatchRung {
                set: vec![Contact::no("START_BUTTON")],
                reset: vec![Contact::no("STOP_BUTTON"), Contact::no("EMERGENCY_STOP")],
                coil: CoilTarget::parse(coil),
            })
        };
        Self::new("motor start/stop")
            .with(latch("%QMOTOR_CONTACTOR"))
            .with(latch("%QRUNNING_LAMP"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(instruction: &mut Instruction, memory: &mut PlcMemory) {
        instruction.execute(memory);
    }

    #[test]
    fn test_series_rung_with_normally_closed_contact() {
        let mut memory = PlcMemory::new();
        let mut rung = Instruction::Series(SeriesRung::new(
            vec![Contact::no("START_BTN"), Contact::nc("STOP_BTN")],
            "%QMOTOR",
        ));

        memory.set_input("START_BTN", true);
        memory.set_input("STOP_BTN", false);
        execute(&mut rung, &mut memory);
        assert!(memory.output_bit("MOTOR"));

        memory.set_input("STOP_BTN", true);
        execute(&mut rung, &mut memory);
        assert!(!memory.output_bit("MOTOR"));
    }

    #[test]
    fn test_parallel_branches_or_into_one_coil() {
        let mut memory = PlcMemory::new();
        let mut rung = Instruction::Parallel(ParallelRung {
            branches: vec![vec![Contact::no("A")], vec![Contact::no("B")]],
            coil: CoilTarget::parse("%MEITHER"),
        });

        memory.set_input("A", false);
        memory.set_input("B", true);
        execute(&mut rung, &mut memory);
        assert!(memory.flag_bit("EITHER"));

        memory.set_input("B", false);
        execute(&mut rung, &mut memory);
        assert!(!memory.flag_bit("EITHER"));
    }

    #[test]
    fn test_latch_reset_wins_and_holds() {
        let mut memory = PlcMemory::new();
        let mut rung = Instruction::Latch(LatchRung {
            set: vec![Contact::no("START")],
            reset: vec![Contact::no("STOP")],
            coil: CoilTarget::parse("%QOUT"),
        });

        // Set.
        memory.set_input("START", true);
        execute(&mut rung, &mut memory);
        assert!(memory.output_bit("OUT"));

        // Hold with neither asserted.
        memory.set_input("START", false);
        execute(&mut rung, &mut memory);
        assert!(memory.output_bit("OUT"));

        // Reset wins over simultaneous set.
        memory.set_input("START", true);
        memory.set_input("STOP", true);
        execute(&mut rung, &mut memory);
        assert!(!memory.output_bit("OUT"));
    }

    #[test]
    fn test_count_up_is_edge_triggered() {
        let mut memory = PlcMemory::new();
        let mut rung =
            Instruction::CountUp(CountUpRung::new(vec![Contact::no("PULSE")], "C1", 3, None));

        // Held high for several executions counts once.
        memory.set_input("PULSE", true);
        execute(&mut rung, &mut memory);
        execute(&mut rung, &mut memory);
        assert_eq!(memory.counter("C1").unwrap().accumulated, 1);

        memory.set_input("PULSE", false);
        execute(&mut rung, &mut memory);
        memory.set_input("PULSE", true);
        execute(&mut rung, &mut memory);
        assert_eq!(memory.counter("C1").unwrap().accumulated, 2);
    }

    #[test]
    fn test_timer_on_resets_when_enable_drops() {
        let mut memory = PlcMemory::new();
        let mut rung = Instruction::TimerOn(TimerOnRung {
            enable: vec![Contact::no("RUN")],
            timer: "T1".to_string(),
            preset: Duration::from_millis(300),
            done_coil: Some(CoilTarget::parse("%QT1_DONE")),
        });

        memory.set_input("RUN", true);
        execute(&mut rung, &mut memory);
        memory.advance_timers(Duration::from_millis(100));
        assert_eq!(
            memory.timer("T1").unwrap().accumulated,
            Duration::from_millis(100)
        );

        memory.set_input("RUN", false);
        execute(&mut rung, &mut memory);
        let timer = memory.timer("T1").unwrap();
        assert_eq!(timer.accumulated, Duration::ZERO);
        assert!(!timer.running);
        assert!(!memory.output_bit("T1_DONE"));
    }

    #[test]
    fn test_compare_and_math_rungs() {
        let mut memory = PlcMemory::new();
        memory.set_input("LEVEL", 42.0);

        let mut compare = Instruction::Compare(CompareRung {
            a: Operand::Address("LEVEL".to_string()),
            op: CmpOp::Gt,
            b: Operand::Const(40.0),
            coil: CoilTarget::parse("%QHIGH"),
        });
        execute(&mut compare, &mut memory);
        assert!(memory.output_bit("HIGH"));

        let mut math = Instruction::Math(MathRung {
            a: Operand::Address("LEVEL".to_string()),
            op: MathOp::Mul,
            b: Operand::Const(2.0),
            dest: CoilTarget::parse("%MWSCALED"),
        });
        execute(&mut math, &mut memory);
        assert_eq!(memory.flag_word("WSCALED"), 84.0);

        // Divide by zero yields zero, never a fault.
        let mut div = Instruction::Math(MathRung {
            a: Operand::Const(10.0),
            op: MathOp::Div,
            b: Operand::Address("ZERO".to_string()),
            dest: CoilTarget::parse("%MWQUOT"),
        });
        execute(&mut div, &mut memory);
        assert_eq!(memory.flag_word("WQUOT"), 0.0);
    }

    #[test]
    fn test_motor_start_stop_program_shape() {
        let program = CompiledProgram::motor_start_stop();
        assert_eq!(program.len(), 2);
        assert!(!program.is_empty());
    }
}
