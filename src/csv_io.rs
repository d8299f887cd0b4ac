use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use csv::StringRecord;

use crate::model::{ExternalRow, ReadingTextRecord};
use crate::store::RECORD_COLUMNS;

/// A parsed data row with its 1-based row number; `Err` carries the reason
/// the row was rejected.
pub type NumberedRow<T> = (usize, std::result::Result<T, String>);

/// Reads own-schema rows. Unknown columns are ignored, missing columns stay
/// unset, and a row whose numeric field does not parse fails on its own.
pub fn read_records(path: &Path) -> Result<Vec<NumberedRow<ReadingTextRecord>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open csv {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read csv header {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let parsed = row
            .map_err(|err| err.to_string())
            .and_then(|row| record_from_csv(&headers, &row, row_number));
        rows.push((row_number, parsed));
    }
    Ok(rows)
}

fn record_from_csv(
    headers: &StringRecord,
    row: &StringRecord,
    row_number: usize,
) -> std::result::Result<ReadingTextRecord, String> {
    let field = |name: &str| -> Option<String> {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .and_then(|index| row.get(index))
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    };

    Ok(ReadingTextRecord {
        text_id: field("text_id"),
        band: field("lexile_band"),
        score: numeric(field("lexile_score"), "lexile_score", row_number)?,
        age_group: field("age_group"),
        grade_hint: field("grade_hint"),
        genre: field("genre"),
        topic: field("topic"),
        word_count: numeric(field("word_count"), "word_count", row_number)?,
        length_type: field("length_type"),
        text_body: field("text_body"),
        sentence_count: numeric(field("sentence_count"), "sentence_count", row_number)?,
        avg_sentence_length: numeric(
            field("avg_sentence_length"),
            "avg_sentence_length",
            row_number,
        )?,
        vocabulary_band: field("vocabulary_band"),
        intended_use: field("intended_use"),
        created_date: field("created_date"),
        notes: field("notes"),
    })
}

fn numeric<T: FromStr>(
    raw: Option<String>,
    column: &str,
    row_number: usize,
) -> std::result::Result<Option<T>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("row {row_number}: invalid {column} value '{raw}'")),
    }
}

/// Writes records in storage column order. Nothing is written for an empty
/// slice.
pub fn write_records(path: &Path, records: &[ReadingTextRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create csv {}", path.display()))?;
    writer.write_record(RECORD_COLUMNS)?;

    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let number = |value: Option<i64>| value.map(|value| value.to_string()).unwrap_or_default();

    for record in records {
        writer.write_record([
            text(&record.text_id),
            text(&record.band),
            number(record.score),
            text(&record.age_group),
            text(&record.grade_hint),
            text(&record.genre),
            text(&record.topic),
            number(record.word_count),
            text(&record.length_type),
            text(&record.text_body),
            number(record.sentence_count),
            record
                .avg_sentence_length
                .map(|value| value.to_string())
                .unwrap_or_default(),
            text(&record.vocabulary_band),
            text(&record.intended_use),
            text(&record.created_date),
            text(&record.notes),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush csv {}", path.display()))?;
    Ok(records.len())
}

/// Reads an external corpus file with `topic`, `title` and `passage` columns.
pub fn read_external_rows(path: &Path) -> Result<Vec<NumberedRow<ExternalRow>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open csv {}", path.display()))?;

    let rows = reader
        .deserialize::<ExternalRow>()
        .enumerate()
        .map(|(index, row)| (index + 1, row.map_err(|err| err.to_string())))
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn own_schema_rows_round_trip_through_export() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("texts.csv");
        let records = vec![ReadingTextRecord {
            text_id: Some("L700-NAR-006-001".to_string()),
            band: Some("700-900".to_string()),
            score: Some(780),
            genre: Some("Narrative".to_string()),
            text_body: Some("She said, \"Hello, world.\"\nThen left.".to_string()),
            avg_sentence_length: Some(3.5),
            ..ReadingTextRecord::default()
        }];

        assert_eq!(write_records(&path, &records).expect("export should work"), 1);
        let header = fs::read_to_string(&path).expect("csv should be readable");
        assert!(header.starts_with("text_id,lexile_band,lexile_score,age_group,"));

        let rows = read_records(&path).expect("import should work");
        assert_eq!(rows.len(), 1);
        let (row_number, parsed) = &rows[0];
        assert_eq!(*row_number, 1);
        assert_eq!(parsed.as_ref().expect("row should parse"), &records[0]);
    }

    #[test]
    fn empty_export_writes_no_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("empty.csv");
        assert_eq!(write_records(&path, &[]).expect("export should work"), 0);
        assert!(!path.exists());
    }

    #[test]
    fn bad_numeric_field_fails_only_its_row() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("mixed.csv");
        fs::write(
            &path,
            "lexile_band,lexile_score,genre,word_count\n\
             700-900,780,Narrative,100\n\
             700-900,high,Narrative,100\n\
             300-500,,Literary,\n",
        )
        .expect("csv should be written");

        let rows = read_records(&path).expect("import should work");
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].1.as_ref().expect("first row should parse").score,
            Some(780)
        );
        let error = rows[1].1.as_ref().expect_err("second row should fail");
        assert_eq!(error, "row 2: invalid lexile_score value 'high'");
        let third = rows[2].1.as_ref().expect("third row should parse");
        assert_eq!(third.score, None);
        assert_eq!(third.word_count, None);
        assert_eq!(third.genre.as_deref(), Some("Literary"));
    }

    #[test]
    fn external_rows_read_with_byte_order_mark() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("reading_2000.csv");
        fs::write(
            &path,
            "\u{feff}topic,title,passage\n1,A Walk,\"We walked, then rested.\"\n2,Empty,\n",
        )
        .expect("csv should be written");

        let rows = read_external_rows(&path).expect("rows should read");
        assert_eq!(rows.len(), 2);
        let first = rows[0].1.as_ref().expect("first row should parse");
        assert_eq!(first.topic, "1");
        assert_eq!(first.passage, "We walked, then rested.");
        assert_eq!(rows[1].1.as_ref().expect("second row should parse").passage, "");
    }
}
