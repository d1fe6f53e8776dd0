use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use content_planner::config::PlannerConfig;
use content_planner::estimate::{compute_completion_aggregate_with, RateContext};
use content_planner::planner::{
    ExistingByTitle, ExistingContentSource, LessonUpdate, Planner, SectionUpdate,
};
use content_planner::{
    estimate_lesson, parse_products, ContentProduct, ExistingContent, Lesson, LessonEstimate,
    ProductRates, ProjectDefaults, TrainingPlan,
};

#[derive(Debug, Deserialize)]
pub struct ApiRecommendationRequest {
    pub title: Option<String>,
    pub tier: Option<String>,
    #[serde(default)]
    pub existing: ExistingContent,
    pub rate: Option<f64>,
    pub advanced: Option<bool>,
    pub advanced_rates: Option<ProductRates>,
}

impl ApiRecommendationRequest {
    pub fn estimate(self, config: &PlannerConfig) -> LessonEstimate {
        let single_rate = self
            .rate
            .filter(|rate| rate.is_finite() && *rate >= 0.0)
            .unwrap_or(config.rates.fallback_rate);
        let rates = if self.advanced.unwrap_or(false) {
            RateContext::advanced(single_rate, self.advanced_rates.unwrap_or_default())
        } else {
            RateContext::single(single_rate)
        };
        estimate_lesson(
            self.title.as_deref().unwrap_or_default(),
            self.tier.as_deref().unwrap_or_default(),
            &self.existing,
            rates,
            config,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ApiRecommendationResponse {
    pub primary: Vec<ContentProduct>,
    pub reasoning: String,
    pub quality_tier_used: String,
    #[serde(rename = "completionTime")]
    pub completion_time: String,
    pub completion_breakdown: BTreeMap<ContentProduct, u32>,
    pub rates: RateContext,
    pub hours: u32,
}

impl ApiRecommendationResponse {
    pub fn from_estimate(estimate: LessonEstimate) -> Self {
        Self {
            completion_time: estimate.completion.label(),
            primary: estimate.recommendation.primary,
            reasoning: estimate.recommendation.reasoning,
            quality_tier_used: estimate.recommendation.quality_tier_used.label().to_string(),
            completion_breakdown: estimate.completion.breakdown,
            rates: estimate.rates,
            hours: estimate.hours,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiCompletionRequest {
    #[serde(default)]
    pub primary: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiCompletionResponse {
    pub primary: Vec<ContentProduct>,
    pub total: u32,
    #[serde(rename = "completionTime")]
    pub completion_time: String,
    pub breakdown: BTreeMap<ContentProduct, u32>,
}

impl ApiCompletionRequest {
    pub fn aggregate(self, config: &PlannerConfig) -> ApiCompletionResponse {
        let primary = parse_products(&self.primary);
        let aggregate = compute_completion_aggregate_with(&primary, &config.completion);
        ApiCompletionResponse {
            primary,
            total: aggregate.total,
            completion_time: aggregate.label(),
            breakdown: aggregate.breakdown,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiPlanRequest {
    pub plan: TrainingPlan,
    #[serde(default)]
    pub project: ProjectDefaults,
    #[serde(default)]
    pub existing: HashMap<String, ExistingContent>,
}

#[derive(Debug, Serialize)]
pub struct ApiPlanResponse {
    pub plan: TrainingPlan,
    pub total_hours: f64,
}

impl ApiPlanRequest {
    pub fn recompute(self, planner: &Planner) -> ApiPlanResponse {
        let mut plan = self.plan;
        let discovery = ExistingByTitle::new(self.existing);
        let total_hours = planner.recompute_plan(&mut plan, &self.project, &discovery);
        ApiPlanResponse { plan, total_hours }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanEdit {
    Recompute,
    Tier { tier: String },
    Rename { title: String },
    Rate { rate: Option<f64> },
    AdvancedRates {
        advanced: Option<bool>,
        rates: Option<ProductRates>,
    },
    Products { products: Vec<String> },
    SectionTier { tier: String },
    SectionRate { rate: Option<f64> },
    SectionAdvancedRates {
        advanced: Option<bool>,
        rates: Option<ProductRates>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ApiEditRequest {
    pub plan: TrainingPlan,
    #[serde(default)]
    pub project: ProjectDefaults,
    pub section_index: usize,
    pub lesson_index: Option<usize>,
    #[serde(default)]
    pub existing: HashMap<String, ExistingContent>,
    pub edit: PlanEdit,
}

#[derive(Debug, Serialize)]
pub struct ApiEditResponse {
    pub plan: TrainingPlan,
    pub lesson: Option<LessonUpdate>,
    pub section: Option<SectionUpdate>,
}

impl ApiEditRequest {
    pub fn apply(self, planner: &Planner) -> Result<ApiEditResponse, String> {
        let mut plan = self.plan;
        let project = self.project;
        let section_index = self.section_index;
        let discovery = ExistingByTitle::new(self.existing);

        let mut lesson = None;
        let mut section = None;
        match self.edit {
            PlanEdit::SectionTier { tier } => {
                section = Some(planner.set_section_tier(&mut plan, &project, section_index, &tier, &discovery)?);
            }
            PlanEdit::SectionRate { rate } => {
                section = Some(planner.set_section_rate(&mut plan, &project, section_index, rate, &discovery)?);
            }
            PlanEdit::SectionAdvancedRates { advanced, rates } => {
                section = Some(planner.set_section_advanced_rates(
                    &mut plan,
                    &project,
                    section_index,
                    advanced,
                    rates,
                    &discovery,
                )?);
            }
            edit => {
                let lesson_index = self
                    .lesson_index
                    .ok_or_else(|| "lesson_index is required for lesson edits".to_string())?;
                let existing = existing_for(&plan, &discovery, section_index, lesson_index);
                let update = match edit {
                    PlanEdit::Recompute => {
                        planner.recompute_lesson(&mut plan, &project, section_index, lesson_index, &existing)?
                    }
                    PlanEdit::Tier { tier } => planner.set_lesson_tier(
                        &mut plan,
                        &project,
                        section_index,
                        lesson_index,
                        &tier,
                        &existing,
                    )?,
                    PlanEdit::Rename { title } => {
                        let existing = discovery_for_title(&discovery, &title);
                        planner.rename_lesson(&mut plan, &project, section_index, lesson_index, &title, &existing)?
                    }
                    PlanEdit::Rate { rate } => {
                        planner.set_lesson_rate(&mut plan, &project, section_index, lesson_index, rate, &existing)?
                    }
                    PlanEdit::AdvancedRates { advanced, rates } => planner.set_lesson_advanced_rates(
                        &mut plan,
                        &project,
                        section_index,
                        lesson_index,
                        advanced,
                        rates,
                        &existing,
                    )?,
                    PlanEdit::Products { products } => {
                        let products = parse_products(&products);
                        if products.is_empty() {
                            return Err("products must name at least one known content type".to_string());
                        }
                        planner.override_products(&mut plan, &project, section_index, lesson_index, products)?
                    }
                    PlanEdit::SectionTier { .. }
                    | PlanEdit::SectionRate { .. }
                    | PlanEdit::SectionAdvancedRates { .. } => {
                        return Err("not a lesson edit".to_string())
                    }
                };
                lesson = Some(update);
            }
        }

        Ok(ApiEditResponse {
            plan,
            lesson,
            section,
        })
    }
}

fn existing_for(
    plan: &TrainingPlan,
    discovery: &ExistingByTitle,
    section_index: usize,
    lesson_index: usize,
) -> ExistingContent {
    plan.sections
        .get(section_index)
        .and_then(|section| section.lessons.get(lesson_index))
        .map(|lesson| discovery.existing_for(section_index, lesson_index, lesson))
        .unwrap_or_default()
}

fn discovery_for_title(discovery: &ExistingByTitle, title: &str) -> ExistingContent {
    discovery.existing_for(0, 0, &Lesson::new(title))
}
