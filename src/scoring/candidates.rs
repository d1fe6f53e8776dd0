use crate::scoring::KeywordScores;
use crate::{ContentProduct, QualityTier};

use crate::ContentProduct::{OnePager, Presentation, Quiz, VideoLesson};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    OnePager,
    Presentation,
    Video,
    Quiz,
}

impl Signal {
    pub fn value(self, scores: &KeywordScores) -> f64 {
        match self {
            Signal::OnePager => scores.one_pager,
            Signal::Presentation => scores.presentation,
            Signal::Video => scores.video,
            Signal::Quiz => scores.quiz,
        }
    }
}

/// A product combination the scorer may recommend, with its base weight and
/// the keyword signals that boost it.
#[derive(Debug, Clone, Copy)]
pub struct CandidateTemplate {
    pub products: &'static [ContentProduct],
    pub base: f64,
    pub boosts: &'static [(Signal, f64)],
}

impl CandidateTemplate {
    pub fn weight(&self, scores: &KeywordScores) -> f64 {
        self.boosts
            .iter()
            .fold(self.base, |weight, (signal, factor)| weight + factor * signal.value(scores))
    }
}

static BASIC: [CandidateTemplate; 4] = [
    CandidateTemplate {
        products: &[OnePager],
        base: 0.40,
        boosts: &[(Signal::OnePager, 0.5)],
    },
    CandidateTemplate {
        products: &[Presentation],
        base: 0.25,
        boosts: &[(Signal::Presentation, 0.5)],
    },
    CandidateTemplate {
        products: &[OnePager, Quiz],
        base: 0.20,
        boosts: &[(Signal::OnePager, 0.3), (Signal::Quiz, 0.3)],
    },
    CandidateTemplate {
        products: &[Presentation, Quiz],
        base: 0.15,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Quiz, 0.3)],
    },
];

static INTERACTIVE: [CandidateTemplate; 5] = [
    CandidateTemplate {
        products: &[Presentation, Quiz],
        base: 0.35,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Quiz, 0.3)],
    },
    CandidateTemplate {
        products: &[OnePager, Quiz],
        base: 0.25,
        boosts: &[(Signal::OnePager, 0.3), (Signal::Quiz, 0.3)],
    },
    CandidateTemplate {
        products: &[Presentation],
        base: 0.15,
        boosts: &[(Signal::Presentation, 0.4)],
    },
    CandidateTemplate {
        products: &[VideoLesson, Quiz],
        base: 0.15,
        boosts: &[(Signal::Video, 0.4), (Signal::Quiz, 0.2)],
    },
    CandidateTemplate {
        products: &[OnePager],
        base: 0.10,
        boosts: &[(Signal::OnePager, 0.4)],
    },
];

static ADVANCED: [CandidateTemplate; 5] = [
    CandidateTemplate {
        products: &[Presentation, Quiz],
        base: 0.25,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Quiz, 0.3)],
    },
    CandidateTemplate {
        products: &[Presentation, OnePager, Quiz],
        base: 0.25,
        boosts: &[(Signal::Presentation, 0.2), (Signal::OnePager, 0.3), (Signal::Quiz, 0.2)],
    },
    CandidateTemplate {
        products: &[VideoLesson, Quiz],
        base: 0.25,
        boosts: &[(Signal::Video, 0.4), (Signal::Quiz, 0.2)],
    },
    CandidateTemplate {
        products: &[Presentation, VideoLesson],
        base: 0.15,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Video, 0.3)],
    },
    CandidateTemplate {
        products: &[OnePager, Quiz],
        base: 0.10,
        boosts: &[(Signal::OnePager, 0.3), (Signal::Quiz, 0.3)],
    },
];

static IMMERSIVE: [CandidateTemplate; 5] = [
    CandidateTemplate {
        products: &[VideoLesson, Quiz],
        base: 0.30,
        boosts: &[(Signal::Video, 0.4), (Signal::Quiz, 0.2)],
    },
    CandidateTemplate {
        products: &[Presentation, VideoLesson, Quiz],
        base: 0.30,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Video, 0.3), (Signal::Quiz, 0.2)],
    },
    CandidateTemplate {
        products: &[VideoLesson],
        base: 0.15,
        boosts: &[(Signal::Video, 0.5)],
    },
    CandidateTemplate {
        products: &[Presentation, Quiz],
        base: 0.15,
        boosts: &[(Signal::Presentation, 0.3), (Signal::Quiz, 0.3)],
    },
    CandidateTemplate {
        products: &[Presentation, OnePager, VideoLesson, Quiz],
        base: 0.10,
        boosts: &[(Signal::OnePager, 0.2), (Signal::Presentation, 0.2), (Signal::Video, 0.2)],
    },
];

pub fn tier_candidates(tier: QualityTier) -> &'static [CandidateTemplate] {
    match tier {
        QualityTier::Basic => &BASIC,
        QualityTier::Interactive => &INTERACTIVE,
        QualityTier::Advanced => &ADVANCED,
        QualityTier::Immersive => &IMMERSIVE,
    }
}
