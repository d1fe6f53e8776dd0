use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::estimate::{
    compute_completion_aggregate_with, project_hours, rate_context, resolve_tier,
    CompletionAggregate, CompletionTimes,
};
use crate::scoring::compute_recommendations;
use crate::{
    ContentProduct, ExistingContent, Lesson, ProductRates, ProjectDefaults, QualityTier,
    RecommendedContent, Section, TrainingPlan,
};

pub const MANUAL_REASONING: &str = "manual override";

/// Supplies which products already exist for a lesson.
pub trait ExistingContentSource {
    fn existing_for(&self, section_index: usize, lesson_index: usize, lesson: &Lesson) -> ExistingContent;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoExistingContent;

impl ExistingContentSource for NoExistingContent {
    fn existing_for(&self, _: usize, _: usize, _: &Lesson) -> ExistingContent {
        ExistingContent::default()
    }
}

/// Existing-content flags keyed by lesson title, case- and whitespace-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ExistingByTitle {
    entries: HashMap<String, ExistingContent>,
}

impl ExistingByTitle {
    pub fn new(entries: HashMap<String, ExistingContent>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(title, flags)| (normalize_title(&title), flags))
                .collect(),
        }
    }

    pub fn insert(&mut self, title: &str, flags: ExistingContent) {
        self.entries.insert(normalize_title(title), flags);
    }
}

impl ExistingContentSource for ExistingByTitle {
    fn existing_for(&self, _: usize, _: usize, lesson: &Lesson) -> ExistingContent {
        self.entries
            .get(&normalize_title(&lesson.title))
            .copied()
            .unwrap_or_default()
    }
}

impl<F> ExistingContentSource for F
where
    F: Fn(usize, usize, &Lesson) -> ExistingContent,
{
    fn existing_for(&self, section_index: usize, lesson_index: usize, lesson: &Lesson) -> ExistingContent {
        self(section_index, lesson_index, lesson)
    }
}

/// How a lesson's product list is obtained during a refresh.
#[derive(Debug, Clone)]
enum Refresh {
    /// Keep stored recommendations unless they were made for another tier.
    Reuse,
    /// Always run the scorer.
    Rescore,
    /// Use the given products and skip the scorer.
    Manual(Vec<ContentProduct>),
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonUpdate {
    pub section_index: usize,
    pub lesson_index: usize,
    pub tier: QualityTier,
    pub primary: Vec<ContentProduct>,
    pub completion: CompletionAggregate,
    pub hours: u32,
    pub section_total_hours: f64,
    pub rescored: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionUpdate {
    pub section_index: usize,
    pub lessons: Vec<LessonUpdate>,
    pub total_hours: f64,
}

/// Applies edits to a training plan and keeps every derived field current.
#[derive(Debug, Clone)]
pub struct Planner {
    tier_default: f64,
    completion: CompletionTimes,
}

impl Default for Planner {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

impl Planner {
    pub fn new(tier_default: f64, completion: CompletionTimes) -> Self {
        Self {
            tier_default,
            completion,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.rates.fallback_rate, config.completion)
    }

    pub fn tier_default(&self) -> f64 {
        self.tier_default
    }

    pub fn completion_times(&self) -> &CompletionTimes {
        &self.completion
    }

    pub fn recompute_lesson(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        lesson_mut(section, lesson_index)?;
        Ok(self.refresh_lesson(section, section_index, lesson_index, project, existing, Refresh::Reuse))
    }

    pub fn set_lesson_tier(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        tier: &str,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        lesson_mut(section, lesson_index)?.quality_tier = Some(canonical_tier(tier));
        Ok(self.refresh_lesson(section, section_index, lesson_index, project, existing, Refresh::Rescore))
    }

    /// Renaming changes the keyword signals, so the scorer always reruns.
    pub fn rename_lesson(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        title: &str,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        lesson_mut(section, lesson_index)?.title = title.to_string();
        Ok(self.refresh_lesson(section, section_index, lesson_index, project, existing, Refresh::Rescore))
    }

    pub fn set_lesson_rate(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        rate: Option<f64>,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        lesson_mut(section, lesson_index)?.custom_rate = sanitize_rate(rate);
        Ok(self.refresh_lesson(section, section_index, lesson_index, project, existing, Refresh::Reuse))
    }

    pub fn set_lesson_advanced_rates(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        advanced: Option<bool>,
        rates: Option<ProductRates>,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        let lesson = lesson_mut(section, lesson_index)?;
        lesson.advanced = advanced;
        lesson.advanced_rates = rates;
        Ok(self.refresh_lesson(section, section_index, lesson_index, project, existing, Refresh::Reuse))
    }

    /// Replaces the product list with a user selection, bypassing the scorer.
    pub fn override_products(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        lesson_index: usize,
        products: Vec<ContentProduct>,
    ) -> Result<LessonUpdate, String> {
        let section = section_mut(plan, section_index)?;
        lesson_mut(section, lesson_index)?;
        let mut products = products;
        dedup_in_order(&mut products);
        Ok(self.refresh_lesson(
            section,
            section_index,
            lesson_index,
            project,
            &ExistingContent::default(),
            Refresh::Manual(products),
        ))
    }

    /// Sets the section tier and cascades it into every lesson.
    pub fn set_section_tier(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        tier: &str,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let tier = canonical_tier(tier);
        let section = section_mut(plan, section_index)?;
        section.quality_tier = Some(tier.clone());
        for lesson in section.lessons.iter_mut() {
            lesson.quality_tier = Some(tier.clone());
        }
        Ok(self.refresh_section(section, section_index, project, discovery, true))
    }

    pub fn set_section_rate(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        rate: Option<f64>,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let rate = sanitize_rate(rate);
        let section = section_mut(plan, section_index)?;
        section.custom_rate = rate;
        for lesson in section.lessons.iter_mut() {
            lesson.custom_rate = rate;
        }
        Ok(self.refresh_section(section, section_index, project, discovery, false))
    }

    pub fn set_section_advanced_rates(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        section_index: usize,
        advanced: Option<bool>,
        rates: Option<ProductRates>,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let section = section_mut(plan, section_index)?;
        section.advanced = advanced;
        section.advanced_rates = rates;
        for lesson in section.lessons.iter_mut() {
            lesson.advanced = advanced;
            lesson.advanced_rates = rates;
        }
        Ok(self.refresh_section(section, section_index, project, discovery, false))
    }

    /// Brings every lesson and section total up to date. Returns the plan total.
    pub fn recompute_plan(
        &self,
        plan: &mut TrainingPlan,
        project: &ProjectDefaults,
        discovery: &dyn ExistingContentSource,
    ) -> f64 {
        for (section_index, section) in plan.sections.iter_mut().enumerate() {
            self.refresh_section(section, section_index, project, discovery, false);
        }
        plan.total_hours()
    }

    fn refresh_section(
        &self,
        section: &mut Section,
        section_index: usize,
        project: &ProjectDefaults,
        discovery: &dyn ExistingContentSource,
        rescore: bool,
    ) -> SectionUpdate {
        let mut lessons = Vec::with_capacity(section.lessons.len());
        for lesson_index in 0..section.lessons.len() {
            let existing = discovery.existing_for(section_index, lesson_index, &section.lessons[lesson_index]);
            let mode = if rescore { Refresh::Rescore } else { Refresh::Reuse };
            lessons.push(self.refresh_lesson(section, section_index, lesson_index, project, &existing, mode));
        }
        let total_hours = section.recompute_total_hours();
        SectionUpdate {
            section_index,
            lessons,
            total_hours,
        }
    }

    /// `lesson_index` must already be checked against `section.lessons`.
    fn refresh_lesson(
        &self,
        section: &mut Section,
        section_index: usize,
        lesson_index: usize,
        project: &ProjectDefaults,
        existing: &ExistingContent,
        mode: Refresh,
    ) -> LessonUpdate {
        let lesson = &section.lessons[lesson_index];
        let tier = resolve_tier(lesson, section, project);
        let rates = rate_context(lesson, section, project, self.tier_default);

        let (recommended, rescored) = match mode {
            Refresh::Manual(products) => (
                Some(RecommendedContent {
                    primary: products,
                    reasoning: MANUAL_REASONING.to_string(),
                    last_updated: Utc::now(),
                    quality_tier_used: tier.label().to_string(),
                }),
                false,
            ),
            Refresh::Reuse if !needs_rescore(lesson, tier, existing) => (None, false),
            Refresh::Reuse | Refresh::Rescore => {
                let recommendation = compute_recommendations(&lesson.title, tier.label(), existing);
                (
                    Some(RecommendedContent::from_recommendation(recommendation, Utc::now())),
                    true,
                )
            }
        };

        let lesson = &mut section.lessons[lesson_index];
        if let Some(recommended) = recommended {
            lesson.recommended_content_types = Some(recommended);
        }
        let primary = lesson
            .recommended_content_types
            .as_ref()
            .map(|recommended| recommended.primary.clone())
            .unwrap_or_default();

        let completion = compute_completion_aggregate_with(&primary, &self.completion);
        let hours = project_hours(&primary, &completion, &rates);

        lesson.completion_time = Some(completion.label());
        lesson.completion_breakdown = Some(completion.breakdown.clone());
        lesson.hours = Some(f64::from(hours));

        debug!(
            section_index,
            lesson_index,
            tier = tier.label(),
            rescored,
            advanced = rates.advanced,
            minutes = completion.total,
            hours,
            "lesson estimate refreshed"
        );

        let section_total_hours = section.recompute_total_hours();
        LessonUpdate {
            section_index,
            lesson_index,
            tier,
            primary,
            completion,
            hours,
            section_total_hours,
            rescored,
        }
    }
}

fn section_mut(plan: &mut TrainingPlan, section_index: usize) -> Result<&mut Section, String> {
    plan.sections
        .get_mut(section_index)
        .ok_or_else(|| format!("section {} not found", section_index))
}

fn lesson_mut(section: &mut Section, lesson_index: usize) -> Result<&mut Lesson, String> {
    section
        .lessons
        .get_mut(lesson_index)
        .ok_or_else(|| format!("lesson {} not found in section '{}'", lesson_index, section.title))
}

/// Stored scorer output is reused only while it was made for `tier` and
/// recommends nothing that now exists. Manual selections are kept as chosen.
fn needs_rescore(lesson: &Lesson, tier: QualityTier, existing: &ExistingContent) -> bool {
    if lesson.recommendations_stale(tier) {
        return true;
    }
    match &lesson.recommended_content_types {
        Some(recommended) if recommended.reasoning != MANUAL_REASONING => {
            !existing.all_present()
                && recommended.primary.iter().any(|product| existing.contains(*product))
        }
        _ => false,
    }
}

fn canonical_tier(tier: &str) -> String {
    QualityTier::parse_or_default(tier).label().to_string()
}

fn sanitize_rate(rate: Option<f64>) -> Option<f64> {
    rate.filter(|value| value.is_finite() && *value >= 0.0)
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

fn dedup_in_order(products: &mut Vec<ContentProduct>) {
    let mut seen = Vec::with_capacity(products.len());
    products.retain(|product| {
        if seen.contains(product) {
            false
        } else {
            seen.push(*product);
            true
        }
    });
}
