use tracing::warn;

use crate::catalog::Catalog;
use crate::classify::{
    GenreClassifier, age_group_for_band, band_for_score, estimate_score, grade_hint_for_band,
    intended_use_for_word_count, length_class_for_word_count, vocabulary_band_for_score,
};
use crate::model::{ExternalRow, ReadingTextRecord, RowFailure};
use crate::text_stats::text_stats;

/// Source corpus the rows come from: its difficulty level and the label
/// recorded in provenance notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSource {
    pub level: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Converted(Box<ReadingTextRecord>),
    Skipped,
}

#[derive(Debug, Default)]
pub struct ConversionBatch {
    pub records: Vec<(usize, ReadingTextRecord)>,
    pub skipped_rows: Vec<usize>,
    pub failed_rows: Vec<RowFailure>,
}

pub struct Importer<'a> {
    catalog: &'a Catalog,
    classifier: &'a GenreClassifier,
}

impl<'a> Importer<'a> {
    pub fn new(catalog: &'a Catalog, classifier: &'a GenreClassifier) -> Self {
        Self {
            catalog,
            classifier,
        }
    }

    /// Builds a storable record from one external row. Rows whose passage is
    /// blank are skipped.
    pub fn convert_row(&self, row: &ExternalRow, source: &ExternalSource) -> RowOutcome {
        if row.passage.trim().is_empty() {
            return RowOutcome::Skipped;
        }

        let genre = self.classifier.classify(&row.title, &row.passage);
        let score = estimate_score(&row.passage, source.level);
        let band = band_for_score(self.catalog, score);

        let stats = text_stats(Some(&row.passage));
        let word_count = stats.word_count as i64;
        let length_class = length_class_for_word_count(self.catalog, word_count);
        if length_class.is_overflow() {
            warn!(
                title = %row.title,
                word_count,
                length_class = length_class.label(),
                "passage exceeds the longest length type; storing as {}",
                length_class.catalog_label(self.catalog)
            );
        }

        RowOutcome::Converted(Box::new(ReadingTextRecord {
            text_id: None,
            band: Some(band.label.clone()),
            score: Some(score),
            age_group: Some(age_group_for_band(self.catalog, &band.label).to_string()),
            grade_hint: Some(grade_hint_for_band(self.catalog, &band.label).to_string()),
            genre: Some(genre),
            topic: Some(row.title.clone()),
            word_count: Some(word_count),
            length_type: Some(length_class.catalog_label(self.catalog).to_string()),
            text_body: Some(row.passage.clone()),
            sentence_count: Some(stats.sentence_count as i64),
            avg_sentence_length: Some(stats.avg_sentence_length),
            vocabulary_band: Some(vocabulary_band_for_score(self.catalog, score).to_string()),
            intended_use: Some(intended_use_for_word_count(word_count).to_string()),
            created_date: None,
            notes: Some(format!("Source: {} (Topic {})", source.label, row.topic)),
        }))
    }

    /// Converts rows independently. Each entry carries its 1-based data row
    /// number; rows that could not be read arrive as `Err` and are recorded
    /// as failures without stopping the batch.
    pub fn convert_rows<I>(&self, rows: I, source: &ExternalSource) -> ConversionBatch
    where
        I: IntoIterator<Item = (usize, Result<ExternalRow, String>)>,
    {
        let mut batch = ConversionBatch::default();

        for (row_number, row) in rows {
            match row {
                Ok(row) => match self.convert_row(&row, source) {
                    RowOutcome::Converted(record) => batch.records.push((row_number, *record)),
                    RowOutcome::Skipped => batch.skipped_rows.push(row_number),
                },
                Err(reason) => {
                    warn!(row = row_number, reason = %reason, "external row rejected");
                    batch.failed_rows.push(RowFailure {
                        row: row_number,
                        reason,
                    });
                }
            }
        }

        batch
    }
}
