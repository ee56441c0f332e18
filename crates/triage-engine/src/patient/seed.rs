//! Synthetic population used when no dataset file is configured.
//!
//! Roughly a third each of critical, urgent and routine presentations, with
//! vitals and department consistent with the presentation.

use rand::seq::SliceRandom;
use rand::Rng;

use super::record::{random_name, PatientRecord};
use super::vitals::{round_tenth, Gender, RiskLevel, VitalSigns};

struct Presentation {
    symptoms: &'static [&'static str],
    department: &'static str,
}

const CRITICAL: &[Presentation] = &[
    Presentation { symptoms: &["Chest Pain", "Shortness of Breath", "Sweating"], department: "Cardiology" },
    Presentation { symptoms: &["Slurred Speech", "Facial Droop", "Arm Weakness"], department: "Neurology" },
    Presentation { symptoms: &["Severe Difficulty Breathing", "Cyanosis"], department: "Pulmonology" },
];

const URGENT: &[Presentation] = &[
    Presentation { symptoms: &["High Fever", "Chills", "Cough"], department: "General Medicine" },
    Presentation { symptoms: &["Deep Cut", "Bleeding", "Pain"], department: "Orthopedics" },
    Presentation { symptoms: &["Severe Abdominal Pain", "Vomiting"], department: "Gastroenterology" },
];

const ROUTINE: &[Presentation] = &[
    Presentation { symptoms: &["Mild Pain", "Rash", "Itchiness"], department: "Dermatology" },
    Presentation { symptoms: &["Runny Nose", "Sore Throat", "Mild Fever"], department: "General Medicine" },
    Presentation { symptoms: &["Routine Checkup"], department: "General Medicine" },
];

/// Generate `count` synthetic patients
pub fn synthetic_population<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<PatientRecord> {
    (0..count).map(|_| synthetic_patient(rng)).collect()
}

/// Generate a single synthetic patient
pub fn synthetic_patient<R: Rng + ?Sized>(rng: &mut R) -> PatientRecord {
    let age: u32 = rng.gen_range(1..=90);

    let mut vitals = VitalSigns {
        heart_rate: rng.gen_range(60..100),
        temperature: round_tenth(rng.gen_range(36.1..=37.5)),
        systolic: rng.gen_range(90..140),
        diastolic: rng.gen_range(60..90),
        oxygen_saturation: rng.gen_range(95..100),
    };

    let mut chronic = Vec::new();
    if age > 40 && rng.gen_bool(0.3) {
        chronic.push("Hypertension");
        vitals.systolic += rng.gen_range(10..30);
        vitals.diastolic += rng.gen_range(5..15);
    }
    if age > 50 && rng.gen_bool(0.15) {
        chronic.push("Diabetes");
    }

    let roll: f64 = rng.gen();
    let (risk, pool) = if roll < 0.34 {
        (RiskLevel::High, CRITICAL)
    } else if roll < 0.67 {
        (RiskLevel::Medium, URGENT)
    } else {
        (RiskLevel::Low, ROUTINE)
    };
    let index = rng.gen_range(0..pool.len());
    let presentation = &pool[index];

    match (risk, index) {
        (RiskLevel::High, 0) => {
            vitals.systolic = rng.gen_range(150..200);
            vitals.heart_rate = rng.gen_range(110..150);
            vitals.oxygen_saturation = rng.gen_range(85..94);
        }
        (RiskLevel::High, 1) => vitals.systolic = rng.gen_range(160..220),
        (RiskLevel::High, _) => vitals.oxygen_saturation = rng.gen_range(70..88),
        (RiskLevel::Medium, 0) => {
            vitals.temperature = round_tenth(rng.gen_range(38.5..=40.5));
            vitals.heart_rate = rng.gen_range(90..120);
        }
        (RiskLevel::Low, 1) => vitals.temperature = round_tenth(rng.gen_range(37.0..=38.0)),
        _ => {}
    }

    if chronic.is_empty() && age > 60 && rng.gen_bool(0.3) {
        chronic.push("Arthritis");
    }

    let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
    let mut record = PatientRecord::new(id, random_name(rng), vitals).with_baseline_risk(risk);
    record.age = age;
    record.gender = *[Gender::Male, Gender::Female].choose(rng).unwrap_or(&Gender::Other);
    record.symptoms = presentation.symptoms.join(", ");
    record.chronic_conditions = if chronic.is_empty() {
        "None".to_string()
    } else {
        chronic.join(", ")
    };
    record.department = presentation.department.to_string();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_population_size_and_uniqueness() {
        let mut rng = StdRng::seed_from_u64(42);
        let population = synthetic_population(300, &mut rng);
        assert_eq!(population.len(), 300);

        let mut ids: Vec<&str> = population.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 300);
    }

    #[test]
    fn test_population_is_reproducible() {
        let a = synthetic_population(20, &mut StdRng::seed_from_u64(7));
        let b = synthetic_population(20, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_mix_of_risk_tiers() {
        let mut rng = StdRng::seed_from_u64(3);
        let population = synthetic_population(600, &mut rng);
        for tier in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            let n = population.iter().filter(|p| p.baseline_risk == tier).count();
            assert!(n > 100, "{:?} only {}", tier, n);
        }
        assert!(population.iter().all(|p| !p.department.is_empty()));
    }
}
