//! ---
//! hydro_section: "11-simulation"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Simulation runtime helpers and telemetry frames."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hydrosim_common::SimulationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::rain::RainEvent;
use crate::reading::{DeviceStatus, SensorReading};

/// Generates the synthetic telemetry stream for one device.
///
/// The oscillation period and phase are derived from the fleet index, and the
/// random source is seeded from the shared simulation seed plus that index, so
/// two generators with the same inputs replay the same trace while distinct
/// devices stay visibly de-correlated.
#[derive(Debug)]
pub struct WaveformGenerator {
    device_id: Uuid,
    index: usize,
    location: String,
    base_level: f64,
    tick_interval: Duration,
    sim: SimulationConfig,
    rng: StdRng,
    rain: RainEvent,
    current_level: f64,
    period_secs: f64,
    phase: f64,
    amplitude: f64,
}

impl WaveformGenerator {
    pub fn new(
        device_id: Uuid,
        index: usize,
        location: String,
        base_level: f64,
        tick_interval: Duration,
        sim: &SimulationConfig,
    ) -> Self {
        let variation = sim.max_variation + 0.05 * index as f64;
        Self {
            device_id,
            index,
            location,
            base_level,
            tick_interval,
            sim: sim.clone(),
            rng: StdRng::seed_from_u64(sim.random_seed.wrapping_add(index as u64)),
            rain: RainEvent::new(sim.rain.clone()),
            current_level: base_level,
            period_secs: 50.0 + 20.0 * index as f64,
            phase: index as f64 * FRAC_PI_2,
            amplitude: variation * 0.7,
        }
    }

    /// Resume the level trajectory from a previously observed value instead of
    /// the configured baseline.
    pub fn with_initial_level(mut self, level: f64) -> Self {
        self.current_level = level.clamp(self.sim.min_water_level, self.sim.max_water_level);
        self
    }

    pub fn rain(&self) -> &RainEvent {
        &self.rain
    }

    pub fn current_level(&self) -> f64 {
        self.current_level
    }

    /// Undisturbed oscillation value for the given instant, noise excluded.
    fn baseline(&self, now: DateTime<Utc>) -> f64 {
        let t = now.timestamp_millis() as f64 / 1000.0;
        self.base_level + (t / self.period_secs + self.phase).sin() * self.amplitude
    }

    /// Produce the sample for one tick, advancing rain state and level memory.
    pub fn next_reading(&mut self, now: DateTime<Utc>) -> SensorReading {
        self.rain.step(now, &mut self.rng);
        let dt = self.tick_interval.as_secs_f64();

        let level = if let Some(rise_rate) = self.rain.rise_rate() {
            // Storm surge: monotonic rise, bounded by the alert overshoot cap.
            let cap = self.sim.alert_level * self.sim.rain.overshoot_factor;
            (self.current_level + rise_rate * dt)
                .min(cap)
                .max(self.current_level.min(cap))
        } else {
            let target = self.baseline(now) + self.rng.gen_range(-0.03..=0.03);
            let decay_step = self.sim.rain.decay_rate * dt;
            let offset = self.current_level - target;
            if offset.abs() > decay_step {
                // Post-storm recovery: bounded drift back toward the waveform.
                self.current_level - decay_step * offset.signum()
            } else {
                target
            }
        };

        let level = round_to(
            level.clamp(self.sim.min_water_level, self.sim.max_water_level),
            3,
        );
        self.current_level = level;

        let temp_offset = 2.0 * self.index as f64;
        let humidity_offset = 5.0 * self.index as f64;
        let signal_offset = 5 * self.index as i32;

        let temperature = round_to(
            clamp_range(
                20.0 + temp_offset + self.rng.gen_range(-2.0..=2.0),
                self.sim.temp_range,
            ),
            1,
        );
        let humidity = round_to(
            clamp_range(
                65.0 + humidity_offset + self.rng.gen_range(-5.0..=5.0),
                self.sim.humidity_range,
            ),
            1,
        );
        let battery_level = round_to(self.sample_range(self.sim.battery_range), 1);
        let signal_strength = (-70 + signal_offset + self.rng.gen_range(-15..=10))
            .clamp(self.sim.signal_range.0, self.sim.signal_range.1);
        let pressure = round_to(
            self.sim.pressure_base
                + self
                    .rng
                    .gen_range(-self.sim.pressure_variation..=self.sim.pressure_variation),
            2,
        );
        let ph = round_to(
            clamp_range(7.0 + self.rng.gen_range(-0.5..=0.5), self.sim.ph_range),
            2,
        );
        let status = if self.rng.gen_range(0..4) == 0 {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Normal
        };
        let data_quality = round_to(self.rng.gen_range(0.85..=1.0), 2);

        SensorReading {
            device_id: self.device_id,
            device_index: self.index,
            location: self.location.clone(),
            timestamp: now,
            water_level: level,
            temperature,
            humidity,
            battery_level,
            signal_strength,
            pressure,
            ph,
            status,
            data_quality,
        }
    }

    fn sample_range(&mut self, (lo, hi): (f64, f64)) -> f64 {
        if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }
}

fn clamp_range(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.clamp(lo, hi)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
