use crate::text_stats::{sentence_count, word_count};

/// Score returned for a source level without calibrated constants.
pub const UNKNOWN_TIER_SCORE: i64 = 800;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierFormula {
    pub level: u32,
    pub base: f64,
    pub sentence_anchor: f64,
    pub sentence_weight: f64,
    pub word_anchor: f64,
    pub word_weight: f64,
    pub min_score: i64,
    pub max_score: i64,
}

pub const TIER_FORMULAS: [TierFormula; 3] = [
    TierFormula {
        level: 2000,
        base: 350.0,
        sentence_anchor: 10.0,
        sentence_weight: 8.0,
        word_anchor: 4.0,
        word_weight: 15.0,
        min_score: 300,
        max_score: 500,
    },
    TierFormula {
        level: 3000,
        base: 580.0,
        sentence_anchor: 12.0,
        sentence_weight: 6.0,
        word_anchor: 4.2,
        word_weight: 12.0,
        min_score: 500,
        max_score: 700,
    },
    TierFormula {
        level: 5000,
        base: 1200.0,
        sentence_anchor: 18.0,
        sentence_weight: 5.0,
        word_anchor: 4.8,
        word_weight: 10.0,
        min_score: 1100,
        max_score: 1500,
    },
];

pub fn tier_formula(level: u32) -> Option<&'static TierFormula> {
    TIER_FORMULAS.iter().find(|formula| formula.level == level)
}

pub fn is_known_tier(level: u32) -> bool {
    tier_formula(level).is_some()
}

impl TierFormula {
    fn apply(&self, avg_sentence_len: f64, avg_word_len: f64) -> i64 {
        let raw = self.base
            + (avg_sentence_len - self.sentence_anchor) * self.sentence_weight
            + (avg_word_len - self.word_anchor) * self.word_weight;
        (raw as i64).clamp(self.min_score, self.max_score)
    }
}

pub fn average_word_length(passage: &str) -> f64 {
    let (chars, words) = passage
        .split_whitespace()
        .fold((0_usize, 0_usize), |(chars, words), token| {
            (chars + token.chars().count(), words + 1)
        });
    chars as f64 / words.max(1) as f64
}

pub fn average_sentence_length(passage: &str) -> f64 {
    word_count(passage) as f64 / sentence_count(passage).max(1) as f64
}

/// Estimates a readability score for a passage drawn from a corpus of the
/// given source level.
pub fn estimate_score(passage: &str, level: u32) -> i64 {
    match tier_formula(level) {
        Some(formula) => formula.apply(
            average_sentence_length(passage),
            average_word_length(passage),
        ),
        None => UNKNOWN_TIER_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_WORDS: &str = "Extraordinary circumstances necessitated comprehensive international \
        cooperation between governmental institutions and independent organizations \
        throughout several consecutive administrations";

    #[test]
    fn unknown_tier_yields_fixed_fallback() {
        assert_eq!(estimate_score("Anything at all.", 4000), UNKNOWN_TIER_SCORE);
        assert_eq!(estimate_score("", 0), 800);
    }

    #[test]
    fn scores_stay_inside_tier_clamp_ranges() {
        let samples = [
            "",
            "Hi.",
            "A cat sat. A dog ran. It was fun.",
            LONG_WORDS,
            "word ".repeat(400).as_str(),
        ]
        .map(str::to_string);

        for formula in &TIER_FORMULAS {
            for sample in &samples {
                let score = estimate_score(sample, formula.level);
                assert!(
                    (formula.min_score..=formula.max_score).contains(&score),
                    "tier {} produced {score}",
                    formula.level
                );
            }
        }
    }

    #[test]
    fn linear_formula_truncates_before_clamping() {
        // 10 words, 2 sentences: avg sentence 5.0, avg word length 2.8.
        let passage = "The cat sat on a mat. The dog ran in.";
        assert_eq!(average_sentence_length(passage), 5.0);
        assert!((average_word_length(passage) - 2.8).abs() < 1e-9);
        // 350 + (5 - 10) * 8 + (2.8 - 4.0) * 15 = 292 -> clamped to 300.
        assert_eq!(estimate_score(passage, 2000), 300);
        // 580 + (5 - 12) * 6 + (2.8 - 4.2) * 12 = 521.2 -> 521.
        assert_eq!(estimate_score(passage, 3000), 521);
    }

    #[test]
    fn long_words_raise_scores_within_each_tier() {
        assert_eq!(estimate_score(LONG_WORDS, 2000), 500);
        assert_eq!(estimate_score(LONG_WORDS, 3000), 685);
        assert_eq!(estimate_score(LONG_WORDS, 5000), 1252);
    }

    #[test]
    fn estimate_is_deterministic() {
        let passage = "Jisoo woke up. It was raining.";
        assert_eq!(estimate_score(passage, 3000), estimate_score(passage, 3000));
    }
}
