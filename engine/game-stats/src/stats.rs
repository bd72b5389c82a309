//! Small descriptive-statistics helpers shared by training and projection

use crate::types::{GameParticipationRecord, StatField};

/// Arithmetic mean, or `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by n)
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    Some(values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64)
}

pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// Standard deviation over mean; `None` when the mean is not positive
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    if avg <= 0.0 {
        return None;
    }
    population_std_dev(values).map(|sd| sd / avg)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Observed values of `field`, in the order the records are given
pub fn valid_values<'a, I>(records: I, field: StatField) -> Vec<f64>
where
    I: IntoIterator<Item = &'a GameParticipationRecord>,
{
    records.into_iter().filter_map(|r| r.value(field)).collect()
}
