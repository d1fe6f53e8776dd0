use serde::{Deserialize, Serialize};

use crate::estimate::CompletionAggregate;
use crate::{ContentProduct, ProductRates};

/// Rates the cost projector works with for a single lesson.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateContext {
    pub advanced: bool,
    pub single_rate: f64,
    pub rates: ProductRates,
}

impl RateContext {
    pub fn single(rate: f64) -> Self {
        Self {
            advanced: false,
            single_rate: rate,
            rates: ProductRates::default(),
        }
    }

    pub fn advanced(single_rate: f64, rates: ProductRates) -> Self {
        Self {
            advanced: true,
            single_rate,
            rates,
        }
    }

    pub fn rate_for(&self, product: ContentProduct) -> f64 {
        self.rates.get(product).unwrap_or(self.single_rate)
    }
}

/// Creation hours for a lesson, rounded once at the end.
///
/// Advanced mode bills each product's minutes at its own rate; an empty
/// product list falls back to the single-rate formula over the total.
pub fn project_hours(
    primary: &[ContentProduct],
    aggregate: &CompletionAggregate,
    context: &RateContext,
) -> u32 {
    let raw = if context.advanced && !primary.is_empty() {
        primary
            .iter()
            .map(|product| {
                f64::from(aggregate.minutes_for(*product)) / 60.0 * context.rate_for(*product)
            })
            .sum::<f64>()
    } else {
        f64::from(aggregate.total) / 60.0 * context.single_rate
    };

    round_hours(raw)
}

fn round_hours(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round() as u32
}
