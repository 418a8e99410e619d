use crate::memory::PlcMemory;
use crate::program::CompiledProgram;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_millis(10);

/// Scan statistics, exposed for performance monitoring, not for control
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub scan_count: u64,
    pub last_scan_duration_us: u64,
    pub scan_rate_hz: f64,
    pub running: bool,
    pub ignored_coil_writes: u64,
}

/// The scan-cycle engine: one fixed-order logic pass per `scan()` call.
///
/// The engine exclusively owns outputs, flags, timers and counters; the
/// external scheduler owns writes to inputs. `start()`/`stop()` are
/// instantaneous flag flips and scans are atomic, non-interruptible units.
#[derive(Debug)]
pub struct ScanEngine {
    memory: PlcMemory,
    program: CompiledProgram,
    scan_period: Duration,
    running: bool,
    scan_count: u64,
    last_scan_duration: Duration,
}

impl ScanEngine {
    #[must_use]
    pub fn new(scan_period: Duration) -> Self {
        Self {
            memory: PlcMemory::new(),
            program: CompiledProgram::default(),
            scan_period,
            running: false,
            scan_count: 0,
            last_scan_duration: Duration::ZERO,
        }
    }

    /// Load an opaque compiled program, replacing any previous one.
    pub fn load_program(&mut self, program: CompiledProgram) {
        tracing::info!(name = %program.name, rungs = program.len(), "program loaded");
        self.program = program;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Execute one scan cycle. A no-op unless running.
    ///
    /// Fixed order: program logic (single pass, coil writes visible to
    /// later rungs), then running timers advance by the scan period.
    /// Counters are event-driven and left alone. Outputs stay in memory
    /// for the external scheduler to read.
    pub fn scan(&mut self) {
        if !self.running {
            return;
        }

        let scan_start = Instant::now();

        for instruction in &mut self.program.instructions {
            instruction.execute(&mut self.memory);
        }

        self.memory.advance_timers(self.scan_period);

        self.last_scan_duration = scan_start.elapsed();
        self.scan_count = self.scan_count.saturating_add(1);
    }

    /// Reinitialize memory and zero the statistics. Valid whether running
    /// or stopped; does not change the running flag.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.scan_count = 0;
        self.last_scan_duration = Duration::ZERO;
    }

    #[must_use]
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            scan_count: self.scan_count,
            last_scan_duration_us: self.last_scan_duration.as_micros() as u64,
            scan_rate_hz: 1000.0 / self.scan_period.as_millis() as f64,
            running: self.running,
            ignored_coil_writes: self.memory.ignored_coil_writes(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn scan_period(&self) -> Duration {
        self.scan_period
    }

    #[must_use]
    pub fn memory(&self) -> &PlcMemory {
        &self.memory
    }

    /// Mutable memory access for the scheduler and test harness. The
    /// single-writer-per-region discipline is the caller's to honor.
    #[must_use]
    pub fn memory_mut(&mut self) -> &mut PlcMemory {
        &mut self.memory
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_PERIOD)
    }
}
