//! Reproducible tie-break value for the recommendation roulette.
//!
//! The value looks random across titles but is a pure function of its
//! inputs: the same title and tier always produce the same seed, so the
//! scorer never needs (or uses) real entropy.

const DJB2_INIT: u32 = 5381;

/// DJB2 over UTF-16 code units: `hash = hash * 33 + unit`, wrapping at 32 bits.
pub fn djb2_hash(value: &str) -> u32 {
    value.encode_utf16().fold(DJB2_INIT, |hash, unit| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(unit))
    })
}

/// Seed in `[0, 1]` for a normalized (lowercased) title and tier label.
pub fn seeded_score(title: &str, tier: &str) -> f64 {
    let hash = djb2_hash(&format!("{}|{}", title, tier));
    f64::from(hash) / f64::from(u32::MAX)
}
