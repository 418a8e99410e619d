use super::Equipment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FRICTION_COEFFICIENT: f64 = 0.5;
const AMBIENT_TEMP_C: f64 = 25.0;
const MAX_TEMP_C: f64 = 80.0;
const HEAT_RATE_C_PER_S: f64 = 5.0;
const COOLING_RATE_C_PER_S: f64 = 2.0;

const SURGE_MULTIPLIER: f64 = 6.0;
const SURGE_LOAD_THRESHOLD: f64 = 0.1;
const RESONANT_RPM: f64 = 1200.0;
const STOP_THRESHOLD_RPM: f64 = 1.0;
const VIBRATION_NOISE_SPAN: f64 = 10.0;

// Fixed seed for deterministic vibration noise across runs.
const RNG_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Nameplate constants seeding one motor instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorConfig {
    #[serde(rename = "maxRPM")]
    pub max_rpm: f64,
    /// kg·m²
    pub inertia: f64,
    /// N·m
    pub torque: f64,
    /// Amps
    pub rated_current: f64,
    /// kW
    pub rated_power: f64,
    /// Compatibility flag: when set, `set_target_rpm` may raise the target
    /// back up to the configured maximum instead of only ever lowering it.
    #[serde(default)]
    pub allow_target_raise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorState {
    pub rpm: f64,
    #[serde(rename = "targetRPM")]
    pub target_rpm: f64,
    pub running: bool,
    /// Amps
    pub current: f64,
    /// Celsius
    pub temperature: f64,
    /// 0-100 scale; cosmetic realism signal, never for interlocking
    pub vibration: f64,
    /// N·m
    pub torque: f64,
}

/// Motor physics: torque/inertia acceleration, exponential friction decay,
/// thermal rise and cooling, load-proportional current with a locked-rotor
/// surge regime, and resonance-based vibration.
///
/// Only `rpm` and `temperature` carry memory across ticks; everything else
/// is recomputed from them on demand.
#[derive(Debug)]
pub struct Motor {
    id: String,
    config: MotorConfig,
    rpm: f64,
    target_rpm: f64,
    temperature: f64,
    running: bool,
    // Vibration noise is sampled once per physics tick so that repeated
    // state reads between ticks stay stable.
    vibration: f64,
    rng_state: u64,
}

impl Motor {
    #[must_use]
    pub fn new(id: &str, config: MotorConfig) -> Self {
        Self {
            id: id.to_string(),
            config,
            rpm: 0.0,
            target_rpm: config.max_rpm,
            temperature: AMBIENT_TEMP_C,
            running: false,
            vibration: 0.0,
            rng_state: RNG_SEED,
        }
    }

    fn accelerate(&mut self, dt_s: f64) {
        if self.rpm < self.target_rpm {
            // α = τ / I, converted from rad/s² to RPM/s.
            let angular_acceleration = self.config.torque / self.config.inertia;
            let rpm_acceleration = angular_acceleration * 60.0 / (2.0 * std::f64::consts::PI);

            self.rpm += rpm_acceleration * dt_s;
            if self.rpm > self.target_rpm {
                self.rpm = self.target_rpm;
            }
        }
    }

    fn decelerate(&mut self, dt_s: f64) {
        if self.rpm > 0.0 {
            // Exponential friction decay, snapped to zero below 1 RPM to
            // avoid the asymptotic tail.
            self.rpm *= (-FRICTION_COEFFICIENT * dt_s).exp();
            if self.rpm < STOP_THRESHOLD_RPM {
                self.rpm = 0.0;
            }
        }
    }

    fn heat_up(&mut self, dt_s: f64) {
        let load = if self.target_rpm > 0.0 {
            self.rpm / self.target_rpm
        } else {
            0.0
        };
        self.temperature += HEAT_RATE_C_PER_S * load * dt_s;
        if self.temperature > MAX_TEMP_C {
            self.temperature = MAX_TEMP_C;
        }
    }

    fn cool_down(&mut self, dt_s: f64) {
        if self.temperature > AMBIENT_TEMP_C {
            let headroom = self.temperature - AMBIENT_TEMP_C;
            self.temperature -= headroom.min(COOLING_RATE_C_PER_S * dt_s);
        }
    }

    fn current_draw(&self) -> f64 {
        if !self.running || self.rpm == 0.0 {
            return 0.0;
        }

        let load = self.rpm / self.target_rpm;
        // The discontinuity at the 10% threshold is the locked-rotor
        // starting surge and must not be smoothed.
        if load < SURGE_LOAD_THRESHOLD {
            return self.config.rated_current * SURGE_MULTIPLIER;
        }

        self.config.rated_current * load
    }

    fn sample_vibration(&mut self) {
        let distance_from_resonance = (self.rpm - RESONANT_RPM).abs();
        let base = 100.0 / (1.0 + distance_from_resonance / 100.0);
        let noise = (self.random_float() - 0.5) * VIBRATION_NOISE_SPAN;
        self.vibration = (base + noise).clamp(0.0, 100.0);
    }

    /// Lower the target RPM ceiling. Requests above the current target are
    /// clamped down unless the `allow_target_raise` compatibility flag was
    /// configured, in which case the configured maximum is the ceiling.
    pub fn set_target_rpm(&mut self, rpm: f64) {
        let ceiling = if self.config.allow_target_raise {
            self.config.max_rpm
        } else {
            self.target_rpm
        };
        self.target_rpm = rpm.clamp(0.0, ceiling);
    }

    #[must_use]
    pub fn target_rpm(&self) -> f64 {
        self.target_rpm
    }

    // Linear congruential generator, parameters from Numerical Recipes.
    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.rng_state
    }

    fn random_float(&mut self) -> f64 {
        (self.next_random() as f64) / (u64::MAX as f64)
    }

    fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }
}

impl Equipment for Motor {
    type State = MotorState;

    fn update(&mut self, command_on: bool, dt: Duration) -> MotorState {
        let dt_s = dt.as_secs_f64();
        self.running = command_on;

        if command_on {
            self.accelerate(dt_s);
            self.heat_up(dt_s);
        } else {
            self.decelerate(dt_s);
            self.cool_down(dt_s);
        }
        self.sample_vibration();

        debug_assert!(self.rpm >= 0.0, "rpm went negative");
        debug_assert!(
            (AMBIENT_TEMP_C..=MAX_TEMP_C).contains(&self.temperature),
            "temperature {} outside physical bounds",
            self.temperature
        );

        self.state()
    }

    fn state(&self) -> MotorState {
        // Display rounding matches the monitoring contract; internal state
        // stays unrounded.
        MotorState {
            rpm: self.rpm.round(),
            target_rpm: self.target_rpm,
            running: self.running,
            current: Self::round_to(self.current_draw(), 2),
            temperature: Self::round_to(self.temperature, 1),
            vibration: Self::round_to(self.vibration, 1),
            torque: self.config.torque,
        }
    }

    fn reset(&mut self) {
        self.rpm = 0.0;
        self.temperature = AMBIENT_TEMP_C;
        self.running = false;
        self.vibration = 0.0;
        self.rng_state = RNG_SEED;
    }

    fn id(&self) -> &str {
        &self.id
    }
}
