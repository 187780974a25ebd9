use std::f64::consts::TAU;

use chrono::{DateTime, TimeDelta, Utc};

use skygen_core::PropertyValue;
use skygen_script::{Distribution, WeightedOption};

use crate::errors::GenerationError;
use crate::random::RandomSource;

/// Inputs shared by every distribution draw.
pub struct SampleContext<'a> {
    /// Current value of the object's synthetic clock.
    pub clock: DateTime<Utc>,
    /// Rule path, used in error messages.
    pub path: &'a str,
}

/// Draw one value from `distribution`.
///
/// Constants take no draw, `normal` takes two, everything else takes one.
pub fn sample(
    distribution: &Distribution,
    ctx: &SampleContext<'_>,
    rng: &mut RandomSource,
) -> Result<PropertyValue, GenerationError> {
    distribution
        .check()
        .map_err(|message| GenerationError::InvalidParameter {
            path: ctx.path.to_string(),
            message,
        })?;

    let value = match distribution {
        Distribution::Constant { value } => PropertyValue::from(value),
        Distribution::UniformInt { min, max } => PropertyValue::Integer(rng.range_i64(*min, *max)),
        Distribution::UniformFloat { min, max } => {
            PropertyValue::Float(finite(rng.range_f64(*min, *max), ctx)?)
        }
        Distribution::Normal { mean, std_dev } => {
            // Box-Muller; 1 - u keeps the logarithm finite.
            let u1 = 1.0 - rng.next_f64();
            let u2 = rng.next_f64();
            let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
            PropertyValue::Float(finite(mean + std_dev * z, ctx)?)
        }
        Distribution::Bernoulli { probability } => {
            PropertyValue::Boolean(rng.next_f64() < *probability)
        }
        Distribution::Choice { options } => PropertyValue::from(&choose(options, rng).value),
        Distribution::Clock {
            min_offset_secs,
            max_offset_secs,
        } => {
            let offset = rng.range_i64(*min_offset_secs, *max_offset_secs);
            let timestamp = TimeDelta::try_seconds(offset)
                .and_then(|delta| ctx.clock.checked_add_signed(delta))
                .ok_or_else(|| GenerationError::ClockOverflow {
                    path: ctx.path.to_string(),
                })?;
            PropertyValue::Timestamp(timestamp)
        }
    };

    Ok(value)
}

/// Non-finite floats serialize as `null`, so they never leave the engine.
fn finite(value: f64, ctx: &SampleContext<'_>) -> Result<f64, GenerationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GenerationError::InvalidParameter {
            path: ctx.path.to_string(),
            message: format!("distribution produced a non-finite value ({value})"),
        })
    }
}

/// Weighted pick; `options` is non-empty with a positive total weight.
fn choose<'a>(options: &'a [WeightedOption], rng: &mut RandomSource) -> &'a WeightedOption {
    let total: f64 = options.iter().map(|option| option.weight).sum();
    let target = rng.next_f64() * total;

    let mut cumulative = 0.0;
    let mut last_weighted = &options[0];
    for option in options {
        if option.weight <= 0.0 {
            continue;
        }
        cumulative += option.weight;
        last_weighted = option;
        if target < cumulative {
            return option;
        }
    }
    // Rounding can leave `target` a hair above the final cumulative weight.
    last_weighted
}
