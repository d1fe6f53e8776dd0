use serde::{Deserialize, Serialize};

const ONE_PAGER_KEYWORDS: [&str; 12] = [
    "introduction",
    "overview",
    "summary",
    "basics",
    "fundamentals",
    "checklist",
    "reference",
    "glossary",
    "cheat sheet",
    "quick",
    "key terms",
    "principles",
];

const PRESENTATION_KEYWORDS: [&str; 12] = [
    "presentation",
    "process",
    "framework",
    "strategy",
    "methodology",
    "concept",
    "model",
    "architecture",
    "planning",
    "analysis",
    "workflow",
    "lifecycle",
];

const VIDEO_KEYWORDS: [&str; 12] = [
    "video",
    "demo",
    "tutorial",
    "walkthrough",
    "how to",
    "hands-on",
    "step-by-step",
    "procedure",
    "technique",
    "simulation",
    "scenario",
    "practice",
];

const QUIZ_KEYWORDS: [&str; 12] = [
    "quiz",
    "test",
    "assessment",
    "exam",
    "review",
    "knowledge check",
    "evaluation",
    "certification",
    "compliance",
    "safety",
    "regulation",
    "policy",
];

/// Keyword hits needed for a signal to saturate at 1.0.
const SATURATION_HITS: f64 = 3.0;

/// Per-product cue strength for a lesson title, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordScores {
    pub one_pager: f64,
    pub presentation: f64,
    pub video: f64,
    pub quiz: f64,
}

/// Scores an already lowercased title.
pub fn keyword_scores(title: &str) -> KeywordScores {
    KeywordScores {
        one_pager: keyword_score(title, &ONE_PAGER_KEYWORDS),
        presentation: keyword_score(title, &PRESENTATION_KEYWORDS),
        video: keyword_score(title, &VIDEO_KEYWORDS),
        quiz: keyword_score(title, &QUIZ_KEYWORDS),
    }
}

fn keyword_score(title: &str, keywords: &[&str]) -> f64 {
    if title.is_empty() {
        return 0.0;
    }
    let hits = keywords.iter().filter(|keyword| title.contains(*keyword)).count();
    (hits as f64 / SATURATION_HITS).min(1.0)
}
