//! ---
//! hydro_section: "11-simulation"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Simulation runtime helpers and telemetry frames."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};
use hydrosim_common::RainConfig;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

/// Externally observable rain machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainState {
    Idle,
    Raining,
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Raining {
        started_at: DateTime<Utc>,
        duration: Duration,
        rise_rate: f64,
    },
}

/// Two-state storm machine: one probabilistic entry edge, one timeout exit.
///
/// The entry probability is evaluated once per tick, so storm frequency is
/// coupled to the owning device's send interval. No re-entry while raining.
#[derive(Debug, Clone)]
pub struct RainEvent {
    config: RainConfig,
    state: State,
}

impl RainEvent {
    pub fn new(config: RainConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> RainState {
        match self.state {
            State::Idle => RainState::Idle,
            State::Raining { .. } => RainState::Raining,
        }
    }

    pub fn is_raining(&self) -> bool {
        self.state() == RainState::Raining
    }

    /// Rise rate of the active event in meters per second, if raining.
    pub fn rise_rate(&self) -> Option<f64> {
        match &self.state {
            State::Idle => None,
            State::Raining { rise_rate, .. } => Some(*rise_rate),
        }
    }

    /// Advance the machine one tick and return the state after the step.
    pub fn step(&mut self, now: DateTime<Utc>, rng: &mut StdRng) -> RainState {
        match &self.state {
            State::Idle => {
                if rng.gen::<f64>() < self.config.probability {
                    let duration = self.sample_duration(rng);
                    let (lo, hi) = self.config.rise_rate_range;
                    let rise_rate = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
                    debug!(
                        duration_secs = duration.as_secs(),
                        rise_rate, "rain event started"
                    );
                    self.state = State::Raining {
                        started_at: now,
                        duration,
                        rise_rate,
                    };
                }
            }
            State::Raining {
                started_at,
                duration,
                ..
            } => {
                let elapsed = now.signed_duration_since(*started_at);
                if elapsed.num_milliseconds().max(0) as u128 >= duration.as_millis() {
                    debug!("rain event ended");
                    self.state = State::Idle;
                }
            }
        }
        self.state()
    }

    fn sample_duration(&self, rng: &mut StdRng) -> Duration {
        let lo = self.config.min_duration.as_secs();
        let hi = self.config.max_duration.as_secs();
        if hi > lo {
            Duration::from_secs(rng.gen_range(lo..=hi))
        } else {
            self.config.min_duration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_758_585_600 + secs, 0).unwrap()
    }

    fn config(probability: f64) -> RainConfig {
        RainConfig {
            probability,
            min_duration: Duration::from_secs(120),
            max_duration: Duration::from_secs(300),
            ..RainConfig::default()
        }
    }

    #[test]
    fn zero_probability_never_rains() {
        let mut rain = RainEvent::new(config(0.0));
        let mut rng = rng();
        for tick in 0..1000 {
            assert_eq!(rain.step(at(tick * 5), &mut rng), RainState::Idle);
        }
    }

    #[test]
    fn certain_probability_enters_on_first_tick() {
        let mut rain = RainEvent::new(config(1.0));
        let mut rng = rng();
        assert_eq!(rain.step(at(0), &mut rng), RainState::Raining);
        let rate = rain.rise_rate().expect("active event carries a rise rate");
        let (lo, hi) = RainConfig::default().rise_rate_range;
        assert!(rate >= lo && rate <= hi);
    }

    #[test]
    fn exits_exactly_after_sampled_duration() {
        let mut cfg = config(1.0);
        cfg.min_duration = Duration::from_secs(180);
        cfg.max_duration = Duration::from_secs(180);
        let mut rain = RainEvent::new(cfg);
        let mut rng = rng();
        rain.step(at(0), &mut rng);
        // Still raining strictly before the deadline.
        assert_eq!(rain.step(at(179), &mut rng), RainState::Raining);
        assert_eq!(rain.step(at(180), &mut rng), RainState::Idle);
    }

    #[test]
    fn no_reentry_resampling_while_raining() {
        let mut cfg = config(1.0);
        cfg.min_duration = Duration::from_secs(300);
        cfg.max_duration = Duration::from_secs(300);
        let mut rain = RainEvent::new(cfg);
        let mut rng = rng();
        rain.step(at(0), &mut rng);
        let rate = rain.rise_rate().unwrap();
        for tick in 1..5 {
            rain.step(at(tick * 30), &mut rng);
            // The active event keeps its sampled rate; no resampling mid-storm.
            assert_eq!(rain.rise_rate(), Some(rate));
        }
    }
}
