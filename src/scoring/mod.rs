pub mod candidates;
pub mod keywords;
pub mod recommender;
pub mod seed;

pub use candidates::{tier_candidates, CandidateTemplate, Signal};
pub use keywords::{keyword_scores, KeywordScores};
pub use recommender::{
    compute_recommendations, order_candidates, roulette_pick, weigh_candidates, Recommendation,
    WeightedCandidate,
};
pub use seed::{djb2_hash, seeded_score};
