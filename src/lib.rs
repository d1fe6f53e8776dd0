pub mod autosave;
pub mod config;
pub mod estimate;
pub mod planner;
pub mod rates_client;
pub mod scoring;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::PlannerConfig;
use crate::estimate::{compute_completion_aggregate_with, project_hours, CompletionAggregate, RateContext};
use crate::scoring::{compute_recommendations, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentProduct {
    #[serde(rename = "presentation", alias = "lesson")]
    Presentation,
    #[serde(rename = "one-pager", alias = "one_pager")]
    OnePager,
    #[serde(rename = "quiz")]
    Quiz,
    #[serde(rename = "video-lesson", alias = "video_lesson")]
    VideoLesson,
}

impl ContentProduct {
    pub const ALL: [ContentProduct; 4] = [
        ContentProduct::Presentation,
        ContentProduct::OnePager,
        ContentProduct::Quiz,
        ContentProduct::VideoLesson,
    ];

    /// Parses a canonical product key. Rate-bucket spellings are accepted too.
    pub fn from_key(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "presentation" | "lesson" => Some(ContentProduct::Presentation),
            "one-pager" | "one_pager" | "onepager" => Some(ContentProduct::OnePager),
            "quiz" => Some(ContentProduct::Quiz),
            "video-lesson" | "video_lesson" | "videolesson" => Some(ContentProduct::VideoLesson),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ContentProduct::Presentation => "presentation",
            ContentProduct::OnePager => "one-pager",
            ContentProduct::Quiz => "quiz",
            ContentProduct::VideoLesson => "video-lesson",
        }
    }

    /// Key of the per-product rate bucket this product is billed against.
    pub fn rate_key(self) -> &'static str {
        match self {
            ContentProduct::Presentation => "presentation",
            ContentProduct::OnePager => "one_pager",
            ContentProduct::Quiz => "quiz",
            ContentProduct::VideoLesson => "video_lesson",
        }
    }
}

impl fmt::Display for ContentProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parses a list of product keys, dropping anything unrecognised.
pub fn parse_products<S: AsRef<str>>(values: &[S]) -> Vec<ContentProduct> {
    values
        .iter()
        .filter_map(|value| ContentProduct::from_key(value.as_ref()))
        .collect()
}

// Stored plans may carry product keys this build does not know; those are
// dropped rather than failing the whole plan.
fn lenient_products<'de, D>(deserializer: D) -> Result<Vec<ContentProduct>, D::Error>
where
    D: Deserializer<'de>,
{
    let keys = Vec::<String>::deserialize(deserializer)?;
    Ok(parse_products(&keys))
}

fn lenient_breakdown<'de, D>(deserializer: D) -> Result<Option<BTreeMap<ContentProduct, u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<BTreeMap<String, u32>>::deserialize(deserializer)?;
    Ok(entries.map(|entries| {
        entries
            .into_iter()
            .filter_map(|(key, minutes)| ContentProduct::from_key(&key).map(|product| (product, minutes)))
            .collect()
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Basic,
    #[default]
    Interactive,
    Advanced,
    Immersive,
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "basic" => Ok(QualityTier::Basic),
            "interactive" => Ok(QualityTier::Interactive),
            "advanced" => Ok(QualityTier::Advanced),
            "immersive" => Ok(QualityTier::Immersive),
            _ => Err(format!("unknown quality tier '{}'", value)),
        }
    }
}

impl QualityTier {
    /// Unknown or empty tiers silently resolve to `Interactive`.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Basic => "basic",
            QualityTier::Interactive => "interactive",
            QualityTier::Advanced => "advanced",
            QualityTier::Immersive => "immersive",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which products already exist for a lesson, as reported by content discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExistingContent {
    pub has_lesson: bool,
    pub has_quiz: bool,
    pub has_one_pager: bool,
    pub has_video_lesson: bool,
}

impl ExistingContent {
    pub fn contains(&self, product: ContentProduct) -> bool {
        match product {
            ContentProduct::Presentation => self.has_lesson,
            ContentProduct::OnePager => self.has_one_pager,
            ContentProduct::Quiz => self.has_quiz,
            ContentProduct::VideoLesson => self.has_video_lesson,
        }
    }

    pub fn all_present(&self) -> bool {
        ContentProduct::ALL.iter().all(|product| self.contains(*product))
    }
}

/// Per-product hourly rates. Absent entries fall back to the single rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRates {
    pub presentation: Option<f64>,
    pub one_pager: Option<f64>,
    pub quiz: Option<f64>,
    pub video_lesson: Option<f64>,
}

impl ProductRates {
    pub fn flat(rate: f64) -> Self {
        Self {
            presentation: Some(rate),
            one_pager: Some(rate),
            quiz: Some(rate),
            video_lesson: Some(rate),
        }
    }

    pub fn get(&self, product: ContentProduct) -> Option<f64> {
        match product {
            ContentProduct::Presentation => self.presentation,
            ContentProduct::OnePager => self.one_pager,
            ContentProduct::Quiz => self.quiz,
            ContentProduct::VideoLesson => self.video_lesson,
        }
    }

    pub fn with_fallback(&self, fallback: f64) -> Self {
        Self {
            presentation: Some(self.presentation.unwrap_or(fallback)),
            one_pager: Some(self.one_pager.unwrap_or(fallback)),
            quiz: Some(self.quiz.unwrap_or(fallback)),
            video_lesson: Some(self.video_lesson.unwrap_or(fallback)),
        }
    }
}

/// Snapshot of the scorer's output as stored on a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedContent {
    #[serde(deserialize_with = "lenient_products")]
    pub primary: Vec<ContentProduct>,
    pub reasoning: String,
    pub last_updated: DateTime<Utc>,
    pub quality_tier_used: String,
}

impl RecommendedContent {
    pub fn from_recommendation(recommendation: Recommendation, now: DateTime<Utc>) -> Self {
        Self {
            primary: recommendation.primary,
            reasoning: recommendation.reasoning,
            last_updated: now,
            quality_tier_used: recommendation.quality_tier_used.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<bool>,
    #[serde(rename = "advancedRates", default, skip_serializing_if = "Option::is_none")]
    pub advanced_rates: Option<ProductRates>,
    #[serde(rename = "completionTime", default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_breakdown",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_breakdown: Option<BTreeMap<ContentProduct, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_content_types: Option<RecommendedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
}

impl Lesson {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Stored recommendations are stale when missing or made for another tier.
    pub fn recommendations_stale(&self, tier: QualityTier) -> bool {
        match &self.recommended_content_types {
            Some(existing) => QualityTier::parse_or_default(&existing.quality_tier_used) != tier,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<bool>,
    #[serde(rename = "advancedRates", default, skip_serializing_if = "Option::is_none")]
    pub advanced_rates: Option<ProductRates>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(rename = "totalHours", default)]
    pub total_hours: f64,
}

impl Section {
    pub fn new(title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        let mut section = Self {
            title: title.into(),
            lessons,
            ..Self::default()
        };
        section.recompute_total_hours();
        section
    }

    /// Restores `total_hours == sum(lesson.hours)`.
    pub fn recompute_total_hours(&mut self) -> f64 {
        self.total_hours = self
            .lessons
            .iter()
            .map(|lesson| lesson.hours.unwrap_or(0.0))
            .sum();
        self.total_hours
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl TrainingPlan {
    pub fn total_hours(&self) -> f64 {
        self.sections.iter().map(|section| section.total_hours).sum()
    }

    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|section| section.lessons.len()).sum()
    }
}

/// Project-wide fallbacks, the least specific level of every precedence chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDefaults {
    pub quality_tier: Option<String>,
    pub custom_rate: Option<f64>,
    pub is_advanced: Option<bool>,
    pub advanced_rates: Option<ProductRates>,
}

/// Full estimate for one lesson: recommendation, completion time and hours.
#[derive(Debug, Clone, Serialize)]
pub struct LessonEstimate {
    pub recommendation: Recommendation,
    pub completion: CompletionAggregate,
    pub rates: RateContext,
    pub hours: u32,
}

/// One-shot estimate for a standalone lesson title.
pub fn estimate_lesson(
    title: &str,
    tier: &str,
    existing: &ExistingContent,
    rates: RateContext,
    config: &PlannerConfig,
) -> LessonEstimate {
    let recommendation = compute_recommendations(title, tier, existing);
    let completion = compute_completion_aggregate_with(&recommendation.primary, &config.completion);
    let hours = project_hours(&recommendation.primary, &completion, &rates);
    LessonEstimate {
        recommendation,
        completion,
        rates,
        hours,
    }
}

pub fn format_hours(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}h", value.round() as i64)
    } else {
        format!("{:.1}h", value)
    }
}

pub fn format_products(products: &[ContentProduct]) -> String {
    if products.is_empty() {
        return "-".to_string();
    }
    products
        .iter()
        .map(|product| product.key())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
