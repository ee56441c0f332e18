use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One vitals sample. Field names follow the hospital dataset columns so
/// records round-trip with the dashboard unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    /// Beats per minute
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: i32,

    /// Degrees Celsius, one decimal
    #[serde(rename = "Temperature")]
    pub temperature: f64,

    #[serde(rename = "BP_Systolic")]
    pub systolic: i32,

    #[serde(rename = "BP_Diastolic")]
    pub diastolic: i32,

    /// Percent
    #[serde(rename = "O2_Saturation")]
    pub oxygen_saturation: i32,
}

impl VitalSigns {
    pub const DEFAULT_HEART_RATE: i32 = 80;
    pub const DEFAULT_TEMPERATURE: f64 = 37.0;
    pub const DEFAULT_SYSTOLIC: i32 = 120;
    pub const DEFAULT_DIASTOLIC: i32 = 80;
    pub const DEFAULT_OXYGEN_SATURATION: i32 = 98;

    /// Readings outside these ranges are treated as recording errors.
    pub const PLAUSIBLE_HEART_RATE: RangeInclusive<i32> = 0..=300;
    pub const PLAUSIBLE_TEMPERATURE: RangeInclusive<f64> = 25.0..=45.0;
    pub const PLAUSIBLE_SYSTOLIC: RangeInclusive<i32> = 0..=300;
    pub const PLAUSIBLE_DIASTOLIC: RangeInclusive<i32> = 0..=200;
    pub const PLAUSIBLE_OXYGEN_SATURATION: RangeInclusive<i32> = 0..=100;
}

impl Default for VitalSigns {
    fn default() -> Self {
        Self {
            heart_rate: Self::DEFAULT_HEART_RATE,
            temperature: Self::DEFAULT_TEMPERATURE,
            systolic: Self::DEFAULT_SYSTOLIC,
            diastolic: Self::DEFAULT_DIASTOLIC,
            oxygen_saturation: Self::DEFAULT_OXYGEN_SATURATION,
        }
    }
}

/// Round a temperature to the one decimal the feed reports.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Triage risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "urgent" => Ok(RiskLevel::Medium),
            "high" | "critical" => Ok(RiskLevel::High),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}
