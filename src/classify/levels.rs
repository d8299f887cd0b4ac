use crate::catalog::{BandSpec, Catalog, LengthSpec};

pub const EXTRA_LONG_LABEL: &str = "Extra Long";
pub const DEFAULT_AGE_GROUP: &str = "Middle School";

/// Length category of a word count. Counts past the largest catalog length
/// fall into the overflow class, which is not a catalog member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass<'a> {
    Within(&'a LengthSpec),
    ExtraLong,
}

impl<'a> LengthClass<'a> {
    pub fn label(&self) -> &'a str {
        match self {
            Self::Within(spec) => spec.name.as_str(),
            Self::ExtraLong => EXTRA_LONG_LABEL,
        }
    }

    /// Label restricted to catalog members: overflow maps to the largest
    /// length type.
    pub fn catalog_label(&self, catalog: &'a Catalog) -> &'a str {
        match self {
            Self::Within(spec) => spec.name.as_str(),
            Self::ExtraLong => catalog
                .lengths
                .last()
                .map(|spec| spec.name.as_str())
                .unwrap_or(EXTRA_LONG_LABEL),
        }
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::ExtraLong)
    }
}

/// Bands are half-open on their upper bound, except the last which is open.
pub fn band_for_score(catalog: &Catalog, score: i64) -> &BandSpec {
    let (last, leading) = catalog
        .bands
        .split_last()
        .expect("catalog always defines at least one band");
    leading
        .iter()
        .find(|band| score < band.max_score)
        .unwrap_or(last)
}

pub fn age_group_for_band<'a>(catalog: &'a Catalog, band: &str) -> &'a str {
    catalog
        .band(band)
        .map(|spec| spec.age_group.as_str())
        .unwrap_or(DEFAULT_AGE_GROUP)
}

pub fn grade_hint_for_band<'a>(catalog: &'a Catalog, band: &str) -> &'a str {
    catalog
        .band(band)
        .map(|spec| spec.grade_hint.as_str())
        .unwrap_or("")
}

pub fn vocabulary_band_for_score(catalog: &Catalog, score: i64) -> &str {
    band_for_score(catalog, score).vocabulary_band.as_str()
}

pub fn length_class_for_word_count(catalog: &Catalog, word_count: i64) -> LengthClass<'_> {
    catalog
        .lengths
        .iter()
        .find(|spec| word_count <= spec.max_words)
        .map(LengthClass::Within)
        .unwrap_or(LengthClass::ExtraLong)
}

pub fn intended_use_for_word_count(word_count: i64) -> &'static str {
    if word_count <= 60 {
        "warm-up"
    } else if word_count <= 230 {
        "lesson"
    } else {
        "extensive-reading"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_to_band_is_total_over_half_open_ranges() {
        let catalog = Catalog::standard();
        let cases = [
            (-5, "100-300"),
            (0, "100-300"),
            (299, "100-300"),
            (300, "300-500"),
            (499, "300-500"),
            (500, "500-700"),
            (899, "700-900"),
            (900, "900-1100"),
            (1299, "1100-1300"),
            (1300, "1300-1500"),
            (4000, "1300-1500"),
        ];
        for (score, expected) in cases {
            assert_eq!(band_for_score(&catalog, score).label, expected, "score {score}");
        }
    }

    #[test]
    fn band_metadata_lookups_fall_back_to_defaults() {
        let catalog = Catalog::standard();
        assert_eq!(age_group_for_band(&catalog, "1100-1300"), "Pre-CSAT");
        assert_eq!(age_group_for_band(&catalog, "2000-2200"), "Middle School");
        assert_eq!(grade_hint_for_band(&catalog, "300-500"), "Elementary 3-4");
        assert_eq!(grade_hint_for_band(&catalog, "bogus"), "");
        assert_eq!(vocabulary_band_for_score(&catalog, 1450), "B2/C1");
        assert_eq!(vocabulary_band_for_score(&catalog, 120), "Pre-A1");
    }

    #[test]
    fn word_count_thresholds_include_overflow_class() {
        let catalog = Catalog::standard();
        assert_eq!(length_class_for_word_count(&catalog, 0).label(), "Micro");
        assert_eq!(length_class_for_word_count(&catalog, 60).label(), "Micro");
        assert_eq!(length_class_for_word_count(&catalog, 61).label(), "Short");
        assert_eq!(length_class_for_word_count(&catalog, 230).label(), "Medium");
        assert_eq!(length_class_for_word_count(&catalog, 420).label(), "Long");

        let overflow = length_class_for_word_count(&catalog, 421);
        assert!(overflow.is_overflow());
        assert_eq!(overflow.label(), "Extra Long");
        assert_eq!(overflow.catalog_label(&catalog), "Long");
    }

    #[test]
    fn intended_use_follows_word_count_thresholds() {
        assert_eq!(intended_use_for_word_count(60), "warm-up");
        assert_eq!(intended_use_for_word_count(61), "lesson");
        assert_eq!(intended_use_for_word_count(230), "lesson");
        assert_eq!(intended_use_for_word_count(231), "extensive-reading");
    }
}
