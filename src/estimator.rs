use crate::errors::{AppError, AppResult};
use crate::models::{DoublingRate, Estimate, Sample};

pub const DEFAULT_DAYS_PER_MONTH: f64 = 30.0;

pub fn estimate(samples: &[Sample]) -> AppResult<Estimate> {
    estimate_with(samples, DEFAULT_DAYS_PER_MONTH)
}

/// Projects a doubling interval from the first and last sample.
///
/// The slice must already be sorted by date; it is not re-sorted here. A first value that is zero,
/// negative, or non-finite has no meaningful growth ratio and is rejected.
pub fn estimate_with(samples: &[Sample], days_per_month: f64) -> AppResult<Estimate> {
    let (first, last) = match samples {
        [first, .., last] => (first, last),
        _ => return Ok(Estimate::InsufficientData),
    };

    if !first.value.is_finite() || !last.value.is_finite() {
        return Err(AppError::InvalidInput("Sample values must be finite numbers".to_string()));
    }
    if first.value <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "Cannot project growth from a starting value of {}",
            first.value
        )));
    }
    if !days_per_month.is_finite() || days_per_month <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "daysPerMonth must be positive, got {}",
            days_per_month
        )));
    }

    let total_growth = last.value / first.value;
    if total_growth < 2.0 {
        return Ok(Estimate::NotYetDoubled);
    }

    let elapsed_days = first.date.days_until(last.date);
    let doublings = total_growth.log2();
    let days_per_doubling = elapsed_days as f64 / doublings;
    let projected_next_double_date = last.date.add_days(days_per_doubling.round() as i64)?;

    Ok(Estimate::Doubling(DoublingRate {
        days_per_doubling: round_tenths(days_per_doubling),
        months_per_doubling: round_tenths(days_per_doubling / days_per_month),
        projected_next_double_date,
        total_growth,
        doublings,
        elapsed_days,
    }))
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
