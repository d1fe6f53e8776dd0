pub mod completion;
pub mod cost;
pub mod rates;

pub use completion::{
    compute_completion_aggregate, compute_completion_aggregate_with, CompletionAggregate,
    CompletionTimes, MIN_COMPLETION_MINUTES,
};
pub use cost::{project_hours, RateContext};
pub use rates::{
    rate_context, resolve_effective_rate, resolve_single_rate, resolve_tier, EffectiveRates,
};
