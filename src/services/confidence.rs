//! Time-decayed confidence over crowd-sourced availability observations.
//!
//! Each observation is weighted by `exp(-days_since_report / 30)`; the confidence value is
//! the weighted share of positive reports.

use chrono::{DateTime, Utc};

use crate::models::{AvailabilityObservation, Confidence};

/// Decay constant in days
pub const DECAY_DAYS: f64 = 30.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Weight of a report made at `reported_at`, as seen at `now`.
///
/// Reports timestamped in the future weigh the same as reports made right now.
pub fn decay_weight(reported_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_since = ((now - reported_at).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0);
    (-days_since / DECAY_DAYS).exp()
}

/// Decayed confidence that a title is available, given its observations.
///
/// Empty input, or input whose weights have all decayed to zero, yields
/// [`Confidence::UNKNOWN`].
pub fn calculate_confidence<'a, I>(observations: I, now: DateTime<Utc>) -> Confidence
where
    I: IntoIterator<Item = &'a AvailabilityObservation>,
{
    let (positive_weight, total_weight) =
        observations
            .into_iter()
            .fold((0.0_f64, 0.0_f64), |(positive, total), obs| {
                let weight = decay_weight(obs.reported_at, now);
                let positive = if obs.available { positive + weight } else { positive };
                (positive, total + weight)
            });

    if total_weight <= 0.0 {
        return Confidence::UNKNOWN;
    }

    Confidence::new(positive_weight / total_weight)
}
