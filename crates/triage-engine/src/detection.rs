//! # Anomaly Detector
//!
//! Stateless evaluation of one patient's current vitals against fixed clinical
//! thresholds, followed by a short-window trend check against the most recent
//! recorded sample. Every rule that matches contributes one explanation string,
//! in a fixed order, and each string embeds the value that triggered it.
//!
//! ```text
//!   current vitals ──► threshold rules (HR, temp, SpO2, systolic)
//!                            │
//!   history (≥ 2 samples) ──► trend rules (HR rise, SpO2 drop vs. last sample)
//!                            │
//!                            ▼
//!                 ordered Vec<String> (empty = no anomaly)
//! ```
//!
//! A non-empty result forces the patient to `High` risk; see
//! [`PatientRecord::apply_detection`](crate::patient::PatientRecord::apply_detection).

use crate::patient::VitalSigns;

/// Minimum number of stored samples before trend rules are evaluated.
pub const MIN_TREND_SAMPLES: usize = 2;

/// Fixed detection thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub heart_rate_high: i32,
    pub heart_rate_low: i32,
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub oxygen_low: i32,
    pub systolic_high: i32,
    pub systolic_low: i32,
    /// Heart-rate rise since the previous sample
    pub heart_rate_spike: i32,
    /// Saturation drop since the previous sample, percentage points
    pub desaturation_drop: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_rate_high: 120,
            heart_rate_low: 50,
            temperature_high: 39.0,
            temperature_low: 35.0,
            oxygen_low: 92,
            systolic_high: 160,
            systolic_low: 90,
            heart_rate_spike: 20,
            desaturation_drop: 5,
        }
    }
}

/// Threshold and trend based anomaly detector
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    thresholds: Thresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate `current` against the thresholds and, when at least
    /// [`MIN_TREND_SAMPLES`] samples exist, against the newest entry of
    /// `history` (ordered oldest to newest).
    pub fn detect(&self, current: &VitalSigns, history: &[VitalSigns]) -> Vec<String> {
        let t = &self.thresholds;
        let mut explanations = Vec::new();

        let hr = current.heart_rate;
        if hr > t.heart_rate_high {
            explanations.push(format!("CRITICAL: Extreme Tachycardia ({} bpm)", hr));
        } else if hr < t.heart_rate_low {
            explanations.push(format!("CRITICAL: Bradycardia ({} bpm)", hr));
        }

        let temp = current.temperature;
        if temp > t.temperature_high {
            explanations.push(format!("High Fever ({:.1}°C)", temp));
        } else if temp < t.temperature_low {
            explanations.push(format!("Hypothermia Risk ({:.1}°C)", temp));
        }

        let o2 = current.oxygen_saturation;
        if o2 < t.oxygen_low {
            explanations.push(format!("Hypoxia Alert (O2 {}%)", o2));
        }

        let sys = current.systolic;
        if sys > t.systolic_high {
            explanations.push(format!("Hypertensive Crisis (Sys {})", sys));
        } else if sys < t.systolic_low {
            explanations.push(format!("Hypotension (Sys {})", sys));
        }

        if history.len() >= MIN_TREND_SAMPLES {
            if let Some(previous) = history.last() {
                let rise = hr.saturating_sub(previous.heart_rate);
                if rise > t.heart_rate_spike {
                    explanations.push(format!("Sudden HR Spike (+{} bpm)", rise));
                }

                let drop = previous.oxygen_saturation.saturating_sub(o2);
                if drop > t.desaturation_drop {
                    explanations.push(format!("Rapid O2 Desaturation (-{}%)", drop));
                }
            }
        }

        explanations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(heart_rate: i32, oxygen_saturation: i32) -> VitalSigns {
        VitalSigns {
            heart_rate,
            oxygen_saturation,
            ..VitalSigns::default()
        }
    }

    #[test]
    fn test_normal_vitals_produce_nothing() {
        let detector = AnomalyDetector::default();
        assert!(detector.detect(&VitalSigns::default(), &[]).is_empty());
    }

    #[test]
    fn test_tachycardia_names_value() {
        let detector = AnomalyDetector::default();
        let out = detector.detect(&sample(130, 98), &[]);
        assert_eq!(out.len(), 1);
        assert!(out[0].to_lowercase().contains("extreme tachycardia"));
        assert!(out[0].contains("130"));
    }

    #[test]
    fn test_bradycardia() {
        let out = AnomalyDetector::default().detect(&sample(45, 98), &[]);
        assert_eq!(out, vec!["CRITICAL: Bradycardia (45 bpm)".to_string()]);
    }

    #[test]
    fn test_fever_keeps_one_decimal() {
        let current = VitalSigns {
            temperature: 40.0,
            ..VitalSigns::default()
        };
        let out = AnomalyDetector::default().detect(&current, &[]);
        assert_eq!(out.len(), 1);
        assert!(out[0].to_lowercase().contains("high fever"));
        assert!(out[0].contains("40.0"));
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let current = VitalSigns {
            heart_rate: 150,
            temperature: 34.2,
            systolic: 85,
            diastolic: 50,
            oxygen_saturation: 88,
        };
        let history = [sample(90, 97), sample(100, 96)];
        let out = AnomalyDetector::default().detect(&current, &history);
        assert_eq!(
            out,
            vec![
                "CRITICAL: Extreme Tachycardia (150 bpm)".to_string(),
                "Hypothermia Risk (34.2°C)".to_string(),
                "Hypoxia Alert (O2 88%)".to_string(),
                "Hypotension (Sys 85)".to_string(),
                "Sudden HR Spike (+50 bpm)".to_string(),
                "Rapid O2 Desaturation (-8%)".to_string(),
            ]
        );
    }

    #[test]
    fn test_trend_needs_two_samples() {
        let detector = AnomalyDetector::default();
        let out = detector.detect(&sample(110, 98), &[sample(80, 98)]);
        assert!(out.is_empty());

        let out = detector.detect(&sample(110, 98), &[sample(85, 98), sample(80, 98)]);
        assert_eq!(out, vec!["Sudden HR Spike (+30 bpm)".to_string()]);
    }

    #[test]
    fn test_trend_compares_newest_sample_only() {
        // 40 bpm above the oldest sample but only 10 above the newest
        let out = AnomalyDetector::default().detect(&sample(110, 98), &[sample(70, 98), sample(100, 98)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let current = VitalSigns {
            heart_rate: 120,
            temperature: 39.0,
            systolic: 160,
            diastolic: 80,
            oxygen_saturation: 92,
        };
        let history = [sample(100, 97), sample(100, 97)];
        assert!(AnomalyDetector::default().detect(&current, &history).is_empty());
    }
}
