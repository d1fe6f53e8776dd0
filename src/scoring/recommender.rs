use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::scoring::{keyword_scores, seeded_score, tier_candidates, KeywordScores};
use crate::{ContentProduct, ExistingContent, QualityTier};

const JITTER_STEP: f64 = 0.0005;
const MIN_WEIGHT: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub primary: Vec<ContentProduct>,
    pub quality_tier_used: QualityTier,
    pub reasoning: String,
    pub scores: KeywordScores,
    pub seed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCandidate {
    pub index: usize,
    pub products: &'static [ContentProduct],
    pub weight: f64,
}

/// Recommends which products to create for a lesson.
///
/// Pure and total: the same title, tier and existing flags always yield the
/// same `primary` list. Unknown tiers are scored as `interactive`.
pub fn compute_recommendations(
    lesson_title: &str,
    tier: &str,
    existing: &ExistingContent,
) -> Recommendation {
    let tier = QualityTier::parse_or_default(tier);
    let title = lesson_title.to_lowercase();

    let scores = keyword_scores(&title);
    let seed = seeded_score(&title, tier.label());
    let candidates = weigh_candidates(tier, &scores, seed);
    let chosen = roulette_pick(&candidates, seed);

    let primary = order_candidates(&candidates, chosen)
        .into_iter()
        .map(|candidate| missing_products(candidate.products, existing))
        .find(|remaining| !remaining.is_empty())
        .unwrap_or_else(|| candidates[chosen].products.to_vec());

    debug!(
        title = %title,
        tier = tier.label(),
        seed,
        chosen,
        primary = ?primary,
        "computed content recommendation"
    );

    Recommendation {
        primary,
        quality_tier_used: tier,
        reasoning: format_reasoning(tier, &scores, seed),
        scores,
        seed,
    }
}

/// Tier candidates with keyword boosts and index jitter applied.
pub fn weigh_candidates(
    tier: QualityTier,
    scores: &KeywordScores,
    seed: f64,
) -> Vec<WeightedCandidate> {
    tier_candidates(tier)
        .iter()
        .enumerate()
        .map(|(index, template)| {
            let jitter = (index + 1) as f64 * JITTER_STEP * seed;
            WeightedCandidate {
                index,
                products: template.products,
                weight: (template.weight(scores) + jitter).max(MIN_WEIGHT),
            }
        })
        .collect()
}

/// Seeded weighted roulette: index of the first candidate whose cumulative
/// weight exceeds `(seed % 1) * total`.
pub fn roulette_pick(candidates: &[WeightedCandidate], seed: f64) -> usize {
    let total: f64 = candidates.iter().map(|candidate| candidate.weight).sum();
    let target = (seed % 1.0) * total;
    let mut cumulative = 0.0;
    for (position, candidate) in candidates.iter().enumerate() {
        cumulative += candidate.weight;
        if cumulative > target {
            return position;
        }
    }
    candidates.len().saturating_sub(1)
}

/// The chosen candidate first, then the rest by descending weight.
pub fn order_candidates(
    candidates: &[WeightedCandidate],
    chosen: usize,
) -> Vec<&WeightedCandidate> {
    let mut rest: Vec<&WeightedCandidate> = candidates
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != chosen)
        .map(|(_, candidate)| candidate)
        .collect();
    rest.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

    let mut ordered = Vec::with_capacity(candidates.len());
    if let Some(first) = candidates.get(chosen) {
        ordered.push(first);
    }
    ordered.extend(rest);
    ordered
}

fn missing_products(products: &[ContentProduct], existing: &ExistingContent) -> Vec<ContentProduct> {
    products
        .iter()
        .copied()
        .filter(|product| !existing.contains(*product))
        .collect()
}

fn format_reasoning(tier: QualityTier, scores: &KeywordScores, seed: f64) -> String {
    format!(
        "tier={}; s(one={:.2},pres={:.2},vid={:.2},quiz={:.2}) seed={:.3}",
        tier.label(),
        scores.one_pager,
        scores.presentation,
        scores.video,
        scores.quiz,
        seed
    )
}
