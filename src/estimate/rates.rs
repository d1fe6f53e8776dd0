//! Rate and tier resolution over the lesson → section → project chain.
//!
//! The most specific level that sets a value wins; every chain ends in a
//! constant, so resolution never fails.

use serde::{Deserialize, Serialize};

use crate::estimate::RateContext;
use crate::{Lesson, ProductRates, ProjectDefaults, QualityTier, Section};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRates {
    /// Whether per-product rates apply instead of one flat rate.
    pub enabled: bool,
    pub rates: ProductRates,
}

pub fn resolve_effective_rate(
    lesson: &Lesson,
    section: &Section,
    project: &ProjectDefaults,
    tier_default: f64,
) -> EffectiveRates {
    let enabled = lesson
        .advanced
        .or(section.advanced)
        .or(project.is_advanced)
        .unwrap_or(false);

    let single = resolve_single_rate(lesson, section, project, tier_default);
    let rates = match lesson
        .advanced_rates
        .or(section.advanced_rates)
        .or(project.advanced_rates)
    {
        Some(rates) => rates.with_fallback(single),
        None => ProductRates::flat(project.custom_rate.unwrap_or(tier_default)),
    };

    EffectiveRates { enabled, rates }
}

pub fn resolve_single_rate(
    lesson: &Lesson,
    section: &Section,
    project: &ProjectDefaults,
    tier_default: f64,
) -> f64 {
    lesson
        .custom_rate
        .or(section.custom_rate)
        .or(project.custom_rate)
        .unwrap_or(tier_default)
}

pub fn resolve_tier(lesson: &Lesson, section: &Section, project: &ProjectDefaults) -> QualityTier {
    [&lesson.quality_tier, &section.quality_tier, &project.quality_tier]
        .into_iter()
        .flatten()
        .find(|tier| !tier.trim().is_empty())
        .map(|tier| QualityTier::parse_or_default(tier))
        .unwrap_or_default()
}

/// Everything the cost projector needs for one lesson.
pub fn rate_context(
    lesson: &Lesson,
    section: &Section,
    project: &ProjectDefaults,
    tier_default: f64,
) -> RateContext {
    let effective = resolve_effective_rate(lesson, section, project, tier_default);
    RateContext {
        advanced: effective.enabled,
        single_rate: resolve_single_rate(lesson, section, project, tier_default),
        rates: effective.rates,
    }
}
