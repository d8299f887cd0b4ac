#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
}

impl TextStats {
    pub const EMPTY: TextStats = TextStats {
        word_count: 0,
        sentence_count: 0,
        avg_sentence_length: 0.0,
    };
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Non-empty segments between `.`, `!` and `?` terminators.
pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

pub fn text_stats(text: Option<&str>) -> TextStats {
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        return TextStats::EMPTY;
    };

    let words = word_count(text);
    let sentences = sentence_count(text);
    let avg_sentence_length = if sentences > 0 {
        round_to_tenth(words as f64 / sentences as f64)
    } else {
        0.0
    };

    TextStats {
        word_count: words,
        sentence_count: sentences,
        avg_sentence_length,
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
