//! Heuristic labelling of external passages: genre, readability score and the
//! band, audience and length metadata derived from them.

mod genre;
mod levels;
mod readability;

pub use genre::GenreClassifier;
pub use levels::{
    DEFAULT_AGE_GROUP, EXTRA_LONG_LABEL, age_group_for_band, band_for_score, grade_hint_for_band,
    intended_use_for_word_count, length_class_for_word_count, vocabulary_band_for_score,
};
pub use readability::{estimate_score, is_known_tier};
