use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ContentProduct;

/// Floor applied when a product list adds up to no time at all.
pub const MIN_COMPLETION_MINUTES: u32 = 5;

/// Learner completion-time midpoints per product, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionTimes {
    pub presentation: u32,
    pub one_pager: u32,
    pub quiz: u32,
    pub video_lesson: u32,
}

impl Default for CompletionTimes {
    fn default() -> Self {
        Self {
            presentation: 8,
            one_pager: 3,
            quiz: 6,
            video_lesson: 4,
        }
    }
}

impl CompletionTimes {
    pub fn minutes(&self, product: ContentProduct) -> u32 {
        match product {
            ContentProduct::Presentation => self.presentation,
            ContentProduct::OnePager => self.one_pager,
            ContentProduct::Quiz => self.quiz,
            ContentProduct::VideoLesson => self.video_lesson,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAggregate {
    pub total: u32,
    pub breakdown: BTreeMap<ContentProduct, u32>,
}

impl CompletionAggregate {
    /// The `"Nm"` form stored in a lesson's `completionTime`.
    pub fn label(&self) -> String {
        format!("{}m", self.total)
    }

    pub fn minutes_for(&self, product: ContentProduct) -> u32 {
        self.breakdown.get(&product).copied().unwrap_or(0)
    }
}

pub fn compute_completion_aggregate(primary: &[ContentProduct]) -> CompletionAggregate {
    compute_completion_aggregate_with(primary, &CompletionTimes::default())
}

pub fn compute_completion_aggregate_with(
    primary: &[ContentProduct],
    times: &CompletionTimes,
) -> CompletionAggregate {
    let breakdown: BTreeMap<ContentProduct, u32> = primary
        .iter()
        .map(|product| (*product, times.minutes(*product)))
        .collect();

    let total: u32 = breakdown.values().sum();
    let total = if total == 0 { MIN_COMPLETION_MINUTES } else { total };

    CompletionAggregate { total, breakdown }
}
