//! Clinical scenario model
//!
//! Each patient follows one trajectory archetype for its whole lifetime. The
//! drift rules are a bounded random walk, not a physiological model.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::vitals::{round_tenth, VitalSigns};

/// Normal bounds a stable patient never leaves.
pub const STABLE_HEART_RATE: (i32, i32) = (60, 100);
pub const STABLE_TEMPERATURE: (f64, f64) = (36.0, 37.5);

/// Sepsis deterioration caps.
pub const SEPSIS_MAX_TEMPERATURE: f64 = 41.0;
pub const SEPSIS_MAX_HEART_RATE: i32 = 160;
pub const SEPSIS_MIN_SYSTOLIC: i32 = 70;

/// Cardiac heart-rate envelope.
pub const CARDIAC_HEART_RATE: (i32, i32) = (40, 190);
pub const CARDIAC_SPIKE_PROBABILITY: f64 = 0.1;

/// Clinical trajectory archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    Stable,
    Sepsis,
    Cardiac,
}

impl Scenario {
    /// Draw a scenario: 80% stable, 10% sepsis, 10% cardiac.
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let r: f64 = rng.gen();
        if r < 0.8 {
            Scenario::Stable
        } else if r < 0.9 {
            Scenario::Sepsis
        } else {
            Scenario::Cardiac
        }
    }

    /// Produce the next vitals for one tick. Pure apart from the RNG draws.
    pub fn drift<R: Rng + ?Sized>(&self, current: &VitalSigns, rng: &mut R) -> VitalSigns {
        let mut next = *current;

        match self {
            Scenario::Stable => {
                next.heart_rate = current
                    .heart_rate
                    .saturating_add(rng.gen_range(-1..=1))
                    .clamp(STABLE_HEART_RATE.0, STABLE_HEART_RATE.1);
                let temperature = current.temperature + rng.gen_range(-0.05..=0.05);
                next.temperature =
                    round_tenth(temperature.clamp(STABLE_TEMPERATURE.0, STABLE_TEMPERATURE.1));
            }
            Scenario::Sepsis => {
                let temperature = current.temperature + rng.gen_range(0.01..=0.1);
                next.temperature = round_tenth(temperature.min(SEPSIS_MAX_TEMPERATURE));
                next.heart_rate = current
                    .heart_rate
                    .saturating_add(rng.gen_range(0..=2))
                    .min(SEPSIS_MAX_HEART_RATE);
                next.systolic = current
                    .systolic
                    .saturating_sub(rng.gen_range(0..=1))
                    .max(SEPSIS_MIN_SYSTOLIC);
            }
            Scenario::Cardiac => {
                let step = if rng.gen_bool(CARDIAC_SPIKE_PROBABILITY) {
                    rng.gen_range(10..=30)
                } else {
                    rng.gen_range(-5..=5)
                };
                next.heart_rate = current
                    .heart_rate
                    .saturating_add(step)
                    .clamp(CARDIAC_HEART_RATE.0, CARDIAC_HEART_RATE.1);
            }
        }

        next
    }
}
