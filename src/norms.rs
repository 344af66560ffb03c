//! Demographic norm tables for the session metrics and the T-score
//! normalization used to place a raw reading on the 0-100 report scale.
//!
//! Deterministic, no I/O. Rows are population reference values per metric,
//! gender, and age band; a missing row means the metric cannot be normalized
//! for that demographic and the caller falls back to the raw value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
}

/// One population reference row. Age bounds are inclusive.
#[derive(Debug, Clone, Copy)]
pub struct DemographicNorm {
    pub metric: &'static str,
    pub gender: Gender,
    pub age_min: u8,
    pub age_max: u8,
    pub mean: f64,
    pub std_dev: f64,
}

const fn norm(
    metric: &'static str,
    gender: Gender,
    age_min: u8,
    age_max: u8,
    mean: f64,
    std_dev: f64,
) -> DemographicNorm {
    DemographicNorm {
        metric,
        gender,
        age_min,
        age_max,
        mean,
        std_dev,
    }
}

use Gender::{Female, Male};

/// Population reference values per metric, gender, and age band.
/// Bands jointly cover ages 18-90 for every metric.
static NORM_TABLE: &[DemographicNorm] = &[
    // EEG relative band power (fraction of total power)
    norm("alpha_power", Male, 18, 39, 0.42, 0.12),
    norm("alpha_power", Male, 40, 90, 0.38, 0.11),
    norm("alpha_power", Female, 18, 39, 0.44, 0.12),
    norm("alpha_power", Female, 40, 90, 0.40, 0.11),
    norm("beta_power", Male, 18, 39, 0.25, 0.08),
    norm("beta_power", Male, 40, 90, 0.27, 0.08),
    norm("beta_power", Female, 18, 39, 0.24, 0.08),
    norm("beta_power", Female, 40, 90, 0.26, 0.08),
    norm("theta_power", Male, 18, 39, 0.18, 0.06),
    norm("theta_power", Male, 40, 90, 0.20, 0.07),
    norm("theta_power", Female, 18, 39, 0.18, 0.06),
    norm("theta_power", Female, 40, 90, 0.20, 0.07),
    norm("theta_beta_ratio", Male, 18, 39, 2.1, 0.8),
    norm("theta_beta_ratio", Male, 40, 90, 2.4, 0.9),
    norm("theta_beta_ratio", Female, 18, 39, 2.0, 0.8),
    norm("theta_beta_ratio", Female, 40, 90, 2.3, 0.9),
    // PPG cardiovascular metrics
    norm("heart_rate", Male, 18, 39, 66.0, 9.0),
    norm("heart_rate", Male, 40, 90, 68.0, 10.0),
    norm("heart_rate", Female, 18, 39, 70.0, 9.0),
    norm("heart_rate", Female, 40, 90, 72.0, 10.0),
    norm("rmssd", Male, 18, 39, 42.0, 18.0),
    norm("rmssd", Male, 40, 90, 28.0, 13.0),
    norm("rmssd", Female, 18, 39, 44.0, 18.0),
    norm("rmssd", Female, 40, 90, 30.0, 13.0),
    norm("sdnn", Male, 18, 39, 52.0, 20.0),
    norm("sdnn", Male, 40, 90, 38.0, 16.0),
    norm("sdnn", Female, 18, 39, 50.0, 20.0),
    norm("sdnn", Female, 40, 90, 36.0, 15.0),
    norm("stress_index", Male, 18, 39, 30.0, 15.0),
    norm("stress_index", Male, 40, 90, 34.0, 16.0),
    norm("stress_index", Female, 18, 39, 31.0, 15.0),
    norm("stress_index", Female, 40, 90, 35.0, 16.0),
];

/// Look up the reference row for one metric and demographic.
pub fn norms_for(metric: &str, gender: Gender, age: u8) -> Option<&'static DemographicNorm> {
    NORM_TABLE
        .iter()
        .find(|n| n.metric == metric && n.gender == gender && age >= n.age_min && age <= n.age_max)
}

/// Place a raw reading on the 0-100 report scale as a T-score (50 + 10z)
/// against its demographic reference. `None` when no reference row exists.
pub fn normalized_score(metric: &str, gender: Gender, age: u8, value: f64) -> Option<f64> {
    let norm = norms_for(metric, gender, age)?;
    let z = (value - norm.mean) / norm.std_dev;
    Some((50.0 + 10.0 * z).clamp(0.0, 100.0))
}
