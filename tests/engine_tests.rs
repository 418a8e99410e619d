use plctwin::program::{CompareRung, CmpOp, Contact, CountUpRung, Operand, SeriesRung, TimerOnRung};
use plctwin::{CompiledProgram, Instruction, ScanEngine};
use std::time::Duration;

fn engine_with(program: CompiledProgram, scan_period_ms: u64) -> ScanEngine {
    let mut engine = ScanEngine::new(Duration::from_millis(scan_period_ms));
    engine.load_program(program);
    engine.start();
    engine
}

#[cfg(test)]
mod scan_cycle_tests {
    use super::*;

    #[test]
    fn test_series_rung_start_stop() {
        // [START_BTN(NO), STOP_BTN(NC)] -> MOTOR
        let program = CompiledProgram::new("series").with(Instruction::Series(SeriesRung::new(
            vec![Contact::no("START_BTN"), Contact::nc("STOP_BTN")],
            "%QMOTOR",
        )));
        let mut engine = engine_with(program, 10);

        engine.memory_mut().set_input("START_BTN", true);
        engine.memory_mut().set_input("STOP_BTN", false);
        engine.scan();
        assert!(engine.memory().output_bit("MOTOR"));

        engine.memory_mut().set_input("STOP_BTN", true);
        engine.scan();
        assert!(!engine.memory().output_bit("MOTOR"));

        // Stop holds regardless of start.
        engine.memory_mut().set_input("START_BTN", true);
        engine.scan();
        assert!(!engine.memory().output_bit("MOTOR"));
    }

    #[test]
    fn test_latch_priority_and_holding() {
        let mut engine = engine_with(CompiledProgram::motor_start_stop(), 10);

        // Set.
        engine.memory_mut().set_input("START_BUTTON", true);
        engine.scan();
        assert!(engine.memory().output_bit("MOTOR_CONTACTOR"));
        assert!(engine.memory().output_bit("RUNNING_LAMP"));

        // Holding: releasing the start button must not decay the output.
        engine.memory_mut().set_input("START_BUTTON", false);
        for _ in 0..10 {
            engine.scan();
        }
        assert!(engine.memory().output_bit("MOTOR_CONTACTOR"));

        // Reset wins over a simultaneous set.
        engine.memory_mut().set_input("START_BUTTON", true);
        engine.memory_mut().set_input("STOP_BUTTON", true);
        engine.scan();
        assert!(!engine.memory().output_bit("MOTOR_CONTACTOR"));

        // Emergency stop forces the output off on its own.
        engine.memory_mut().set_input("STOP_BUTTON", false);
        engine.memory_mut().set_input("EMERGENCY_STOP", true);
        engine.scan();
        assert!(!engine.memory().output_bit("MOTOR_CONTACTOR"));
    }

    #[test]
    fn test_coil_write_visible_to_later_rungs_in_same_scan() {
        // Single-pass semantics: the second rung reads the flag the first
        // rung just wrote.
        let program = CompiledProgram::new("chained")
            .with(Instruction::Series(SeriesRung::new(
                vec![Contact::no("IN")],
                "%MSTAGE",
            )))
            .with(Instruction::Series(SeriesRung::new(
                vec![Contact::no("STAGE")],
                "%QOUT",
            )));
        let mut engine = engine_with(program, 10);

        engine.memory_mut().set_input("IN", true);
        engine.scan();
        assert!(engine.memory().output_bit("OUT"));
    }

    #[test]
    fn test_timer_reaches_preset_without_overshoot() {
        // Timer T1, preset 3000 ms, scan period 100 ms: done after exactly
        // 30 scans, clamped thereafter.
        let program = CompiledProgram::new("timer").with(Instruction::TimerOn(TimerOnRung {
            enable: vec![Contact::no("RUN")],
            timer: "T1".to_string(),
            preset: Duration::from_millis(3000),
            done_coil: Some(plctwin::memory::CoilTarget::parse("%QT1_DONE")),
        }));
        let mut engine = engine_with(program, 100);
        engine.memory_mut().set_input("RUN", true);

        let mut previous = Duration::ZERO;
        for scan in 1..=29 {
            engine.scan();
            let timer = engine.memory().timer("T1").unwrap();
            assert!(timer.accumulated >= previous, "accumulation must not decrease");
            assert!(timer.accumulated < timer.preset, "not done before scan 30");
            assert!(!timer.done, "done early at scan {scan}");
            previous = timer.accumulated;
        }

        engine.scan();
        let timer = engine.memory().timer("T1").unwrap();
        assert_eq!(timer.accumulated, Duration::from_millis(3000));
        assert!(timer.done);
        assert!(!timer.running);

        // The 31st scan leaves the accumulation clamped.
        engine.scan();
        let timer = engine.memory().timer("T1").unwrap();
        assert_eq!(timer.accumulated, Duration::from_millis(3000));
        assert!(timer.done);

        // The done coil mirrors the done bit on the following scan.
        assert!(engine.memory().output_bit("T1_DONE"));
    }

    #[test]
    fn test_counter_reaches_preset_and_resets() {
        let program = CompiledProgram::new("counter").with(Instruction::CountUp(
            CountUpRung::new(vec![Contact::no("PULSE")], "C1", 5, Some("%QBATCH_DONE")),
        ));
        let mut engine = engine_with(program, 10);

        for _ in 0..5 {
            engine.memory_mut().set_input("PULSE", true);
            engine.scan();
            engine.memory_mut().set_input("PULSE", false);
            engine.scan();
        }

        let counter = engine.memory().counter("C1").unwrap();
        assert_eq!(counter.accumulated, 5);
        assert!(counter.done);
        assert!(engine.memory().output_bit("BATCH_DONE"));

        engine.memory_mut().reset_counter("C1");
        let counter = engine.memory().counter("C1").unwrap();
        assert_eq!(counter.accumulated, 0);
        assert!(!counter.done);
    }

    #[test]
    fn test_unknown_coil_prefix_is_silently_dropped() {
        let program = CompiledProgram::new("bad coil").with(Instruction::Series(
            SeriesRung::new(vec![Contact::no("IN")], "%X99"),
        ));
        let mut engine = engine_with(program, 10);
        engine.memory_mut().set_input("IN", true);

        engine.scan();
        engine.scan();

        // No mutation anywhere, but the drops are observable in the stats.
        assert_eq!(engine.memory().variables().count(), 1); // just the input
        assert_eq!(engine.stats().ignored_coil_writes, 2);
    }

    #[test]
    fn test_compare_rung_against_analog_input_word() {
        let program = CompiledProgram::new("compare").with(Instruction::Compare(CompareRung {
            a: Operand::Address("W0.0".to_string()),
            op: CmpOp::Ge,
            b: Operand::Const(100.0),
            coil: plctwin::memory::CoilTarget::parse("%QLEVEL_OK"),
        }));
        let mut engine = engine_with(program, 10);

        engine.memory_mut().set_input("W0.0", 99.5);
        engine.scan();
        assert!(!engine.memory().output_bit("LEVEL_OK"));

        engine.memory_mut().set_input("W0.0", 100.0);
        engine.scan();
        assert!(engine.memory().output_bit("LEVEL_OK"));
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_reset_round_trip() {
        let mut engine = engine_with(CompiledProgram::motor_start_stop(), 10);
        engine.memory_mut().set_input("START_BUTTON", true);
        engine.memory_mut().start_timer("T1", Duration::from_secs(1));
        engine.memory_mut().count_up("C1", 2);
        for _ in 0..5 {
            engine.scan();
        }
        assert!(engine.stats().scan_count > 0);

        engine.reset();

        assert_eq!(engine.stats().scan_count, 0);
        assert!(!engine.memory().input_bit("START_BUTTON"));
        assert!(!engine.memory().output_bit("MOTOR_CONTACTOR"));
        assert!(engine.memory().timer("T1").is_none());
        assert!(engine.memory().counter("C1").is_none());
        assert_eq!(engine.memory().variables().count(), 0);
        // Reset does not change the running state.
        assert!(engine.is_running());
    }

    #[test]
    fn test_stopped_engine_ignores_scan() {
        let mut engine = engine_with(CompiledProgram::motor_start_stop(), 10);
        engine.stop();

        engine.memory_mut().set_input("START_BUTTON", true);
        engine.scan();

        assert_eq!(engine.stats().scan_count, 0);
        assert!(!engine.memory().output_bit("MOTOR_CONTACTOR"));
    }

    #[test]
    fn test_determinism_across_identical_runs() {
        let run = || {
            let mut engine = engine_with(CompiledProgram::motor_start_stop(), 10);
            let mut outputs = Vec::new();
            for scan in 0..50u32 {
                engine
                    .memory_mut()
                    .set_input("START_BUTTON", (10..20).contains(&scan));
                engine
                    .memory_mut()
                    .set_input("STOP_BUTTON", scan >= 40);
                engine.scan();
                outputs.push(engine.memory().output_bit("MOTOR_CONTACTOR"));
            }
            outputs
        };

        assert_eq!(run(), run());
    }
}
