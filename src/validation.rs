use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::model::{ReadingTextRecord, ValidationError, ValidationKind};
use crate::text_stats::word_count;

/// Allowed gap between the stored word count and the body's actual count.
pub const WORD_COUNT_TOLERANCE: i64 = 10;

/// Applies every rule to one record. Rules are independent; a record can
/// collect several findings.
pub fn validate_record(catalog: &Catalog, record: &ReadingTextRecord) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let band = present(&record.band);
    let genre = present(&record.genre);
    let length_type = present(&record.length_type);

    let required = [
        ("lexile_band", band.is_some()),
        ("lexile_score", record.score.is_some()),
        ("genre", genre.is_some()),
        ("length_type", length_type.is_some()),
    ];
    for (field, is_present) in required {
        if !is_present {
            errors.push(ValidationError::new(
                field,
                ValidationKind::MissingRequired,
                format!("{field} is required"),
            ));
        }
    }

    if let (Some(band), Some(score)) = (band, record.score) {
        if let Some(spec) = catalog.band(band) {
            if !spec.contains(score) {
                errors.push(ValidationError::new(
                    "lexile_score",
                    ValidationKind::ScoreOutOfBand,
                    format!(
                        "score {score} is outside band {band} ({}-{})",
                        spec.min_score, spec.max_score
                    ),
                ));
            }
        }
    }

    if let Some(genre) = genre {
        if catalog.genre(genre).is_none() {
            errors.push(ValidationError::new(
                "genre",
                ValidationKind::InvalidGenre,
                format!("unknown genre: {genre}"),
            ));
        }
    }

    if let Some(length_type) = length_type {
        if catalog.length(length_type).is_none() {
            errors.push(ValidationError::new(
                "length_type",
                ValidationKind::InvalidLengthType,
                format!("unknown length type: {length_type}"),
            ));
        }
    }

    if let (Some(words), Some(length_type)) = (record.word_count, length_type) {
        if let Some(spec) = catalog.length(length_type) {
            if !spec.contains(words) {
                errors.push(ValidationError::new(
                    "word_count",
                    ValidationKind::LengthMismatch,
                    format!(
                        "word count {words} does not fit {length_type} ({})",
                        spec.range_label()
                    ),
                ));
            }
        }
    }

    if let (Some(body), Some(words)) = (record.body(), record.word_count) {
        let actual = word_count(body) as i64;
        if (actual - words).abs() > WORD_COUNT_TOLERANCE {
            errors.push(ValidationError::new(
                "text_body",
                ValidationKind::WordCountMismatch,
                format!("body has {actual} words but word_count is {words}"),
            ));
        }
    }

    errors
}

/// Validates a collection, keeping only records with findings. Records
/// without an id are keyed by their position as `row-<index>`.
pub fn validate_all<'a, I>(catalog: &Catalog, records: I) -> BTreeMap<String, Vec<ValidationError>>
where
    I: IntoIterator<Item = &'a ReadingTextRecord>,
{
    let mut results = BTreeMap::new();

    for (index, record) in records.into_iter().enumerate() {
        let errors = validate_record(catalog, record);
        if errors.is_empty() {
            continue;
        }
        let key = record
            .text_id
            .clone()
            .unwrap_or_else(|| format!("row-{}", index + 1));
        results.insert(key, errors);
    }

    results
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
