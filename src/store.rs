use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::catalog::Catalog;
use crate::classify::{EXTRA_LONG_LABEL, length_class_for_word_count};
use crate::model::{GroupCount, ReadingTextRecord};
use crate::text_stats::text_stats;
use crate::util::{ensure_directory, now_utc_string, today_string};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";
pub const DB_FILE_NAME: &str = "reading_text.sqlite";

/// Storage column order; also the CSV export header.
pub const RECORD_COLUMNS: [&str; 16] = [
    "text_id",
    "lexile_band",
    "lexile_score",
    "age_group",
    "grade_hint",
    "genre",
    "topic",
    "word_count",
    "length_type",
    "text_body",
    "sentence_count",
    "avg_sentence_length",
    "vocabulary_band",
    "intended_use",
    "created_date",
    "notes",
];

pub fn open_store(db_path: &Path, catalog: &Catalog) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    seed_config_tables(&connection, catalog)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reading_text (
              text_id TEXT PRIMARY KEY,
              lexile_band TEXT NOT NULL,
              lexile_score INTEGER,
              age_group TEXT,
              grade_hint TEXT,
              genre TEXT NOT NULL,
              topic TEXT,
              word_count INTEGER,
              length_type TEXT,
              text_body TEXT,
              sentence_count INTEGER,
              avg_sentence_length REAL,
              vocabulary_band TEXT,
              intended_use TEXT,
              created_date TEXT,
              notes TEXT
            );

            CREATE TABLE IF NOT EXISTS config_bands (
              band TEXT PRIMARY KEY,
              min_score INTEGER NOT NULL,
              max_score INTEGER NOT NULL,
              age_group TEXT,
              grade TEXT,
              vocabulary_band TEXT,
              purpose TEXT
            );

            CREATE TABLE IF NOT EXISTS config_genres (
              code TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              thinking_type TEXT
            );

            CREATE TABLE IF NOT EXISTS config_lengths (
              type TEXT PRIMARY KEY,
              target_words INTEGER NOT NULL,
              word_range TEXT NOT NULL,
              purpose TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reading_text_band_genre ON reading_text(lexile_band, genre);
            CREATE INDEX IF NOT EXISTS idx_reading_text_length ON reading_text(length_type);
            ",
        )
        .context("failed to create reading_text schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;

    Ok(())
}

pub fn seed_config_tables(connection: &Connection, catalog: &Catalog) -> Result<()> {
    for band in &catalog.bands {
        connection.execute(
            "INSERT OR IGNORE INTO config_bands VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                band.label,
                band.min_score,
                band.max_score,
                band.age_group,
                band.grade_hint,
                band.vocabulary_band,
                band.purpose
            ],
        )?;
    }
    for genre in &catalog.genres {
        connection.execute(
            "INSERT OR IGNORE INTO config_genres VALUES (?1, ?2, ?3)",
            params![genre.code, genre.name, genre.thinking_type],
        )?;
    }
    for length in &catalog.lengths {
        connection.execute(
            "INSERT OR IGNORE INTO config_lengths VALUES (?1, ?2, ?3, ?4)",
            params![
                length.name,
                length.target_words,
                length.range_label(),
                length.purpose
            ],
        )?;
    }
    Ok(())
}

fn touch_updated_at(connection: &Connection) -> Result<()> {
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;
    Ok(())
}

/// Fills the fields storage derives on insert: statistics from the body,
/// the length type from the word count, and the creation date.
pub fn complete_derived_fields(catalog: &Catalog, record: &mut ReadingTextRecord) {
    if let Some(body) = record.body() {
        let stats = text_stats(Some(body));
        record.word_count.get_or_insert(stats.word_count as i64);
        record
            .sentence_count
            .get_or_insert(stats.sentence_count as i64);
        record
            .avg_sentence_length
            .get_or_insert(stats.avg_sentence_length);
        if record.length_type.is_none() {
            let words = record.word_count.unwrap_or(stats.word_count as i64);
            record.length_type = Some(
                length_class_for_word_count(catalog, words)
                    .catalog_label(catalog)
                    .to_string(),
            );
        }
    }

    if record.created_date.is_none() {
        record.created_date = Some(today_string());
    }
}

/// Next id of the form `L<band low>-<genre code>-<words>-<seq>`.
pub fn generate_text_id(
    connection: &Connection,
    catalog: &Catalog,
    band: &str,
    genre: &str,
    word_count: i64,
) -> Result<String> {
    let band_low = band.split('-').next().unwrap_or(band);
    let prefix = format!(
        "L{band_low}-{}-{word_count:03}",
        catalog.genre_code(genre)
    );

    let mut statement =
        connection.prepare("SELECT text_id FROM reading_text WHERE text_id LIKE ?1")?;
    let mut rows = statement.query([format!("{prefix}-%")])?;

    let mut max_seq = 0_u32;
    while let Some(row) = rows.next()? {
        let text_id: String = row.get(0)?;
        let seq = text_id
            .rsplit('-')
            .next()
            .and_then(|tail| tail.parse::<u32>().ok())
            .unwrap_or(0);
        max_seq = max_seq.max(seq);
    }

    Ok(format!("{prefix}-{:03}", max_seq + 1))
}

/// Inserts or replaces a record, returning its id.
pub fn insert_record(
    connection: &Connection,
    catalog: &Catalog,
    mut record: ReadingTextRecord,
) -> Result<String> {
    complete_derived_fields(catalog, &mut record);

    let Some(band) = record.band.clone().filter(|band| !band.is_empty()) else {
        bail!("lexile_band is required to store a record");
    };
    let Some(genre) = record.genre.clone().filter(|genre| !genre.is_empty()) else {
        bail!("genre is required to store a record");
    };

    let text_id = match record.text_id.clone().filter(|id| !id.is_empty()) {
        Some(text_id) => text_id,
        None => generate_text_id(
            connection,
            catalog,
            &band,
            &genre,
            record.word_count.unwrap_or(0),
        )?,
    };

    connection
        .execute(
            "
            INSERT OR REPLACE INTO reading_text(
              text_id, lexile_band, lexile_score, age_group, grade_hint,
              genre, topic, word_count, length_type, text_body,
              sentence_count, avg_sentence_length, vocabulary_band,
              intended_use, created_date, notes
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ",
            params![
                text_id,
                band,
                record.score,
                record.age_group,
                record.grade_hint,
                genre,
                record.topic,
                record.word_count,
                record.length_type,
                record.text_body,
                record.sentence_count,
                record.avg_sentence_length,
                record.vocabulary_band,
                record.intended_use,
                record.created_date,
                record.notes,
            ],
        )
        .with_context(|| format!("failed to store record {text_id}"))?;

    debug!(text_id = %text_id, "stored record");
    Ok(text_id)
}

#[derive(Debug, Clone, Default)]
pub struct TextFilter {
    pub band: Option<String>,
    pub genre: Option<String>,
    pub length_type: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    TextId,
    Score,
}

fn select_columns() -> String {
    RECORD_COLUMNS.join(", ")
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ReadingTextRecord> {
    Ok(ReadingTextRecord {
        text_id: row.get(0)?,
        band: row.get(1)?,
        score: row.get(2)?,
        age_group: row.get(3)?,
        grade_hint: row.get(4)?,
        genre: row.get(5)?,
        topic: row.get(6)?,
        word_count: row.get(7)?,
        length_type: row.get(8)?,
        text_body: row.get(9)?,
        sentence_count: row.get(10)?,
        avg_sentence_length: row.get(11)?,
        vocabulary_band: row.get(12)?,
        intended_use: row.get(13)?,
        created_date: row.get(14)?,
        notes: row.get(15)?,
    })
}

pub fn query_records(
    connection: &Connection,
    filter: &TextFilter,
    order: RecordOrder,
) -> Result<Vec<ReadingTextRecord>> {
    let mut sql = format!("SELECT {} FROM reading_text WHERE 1=1", select_columns());
    let mut values = Vec::<String>::new();

    let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());

    if let Some(band) = non_empty(&filter.band) {
        values.push(band);
        sql.push_str(&format!(" AND lexile_band = ?{}", values.len()));
    }
    if let Some(genre) = non_empty(&filter.genre) {
        values.push(genre);
        sql.push_str(&format!(" AND genre = ?{}", values.len()));
    }
    if let Some(length_type) = non_empty(&filter.length_type) {
        values.push(length_type);
        sql.push_str(&format!(" AND length_type = ?{}", values.len()));
    }
    if let Some(keyword) = non_empty(&filter.keyword) {
        values.push(format!("%{keyword}%"));
        let index = values.len();
        sql.push_str(&format!(" AND (topic LIKE ?{index} OR text_body LIKE ?{index})"));
    }

    sql.push_str(match order {
        RecordOrder::TextId => " ORDER BY text_id",
        RecordOrder::Score => " ORDER BY lexile_score, text_id",
    });

    let mut statement = connection
        .prepare(&sql)
        .context("failed to prepare record query")?;
    let records = statement
        .query_map(params_from_iter(values.iter()), record_from_row)?
        .collect::<rusqlite::Result<Vec<ReadingTextRecord>>>()?;
    Ok(records)
}

pub fn get_record(connection: &Connection, text_id: &str) -> Result<Option<ReadingTextRecord>> {
    let sql = format!(
        "SELECT {} FROM reading_text WHERE text_id = ?1",
        select_columns()
    );
    let record = connection
        .query_row(&sql, [text_id], record_from_row)
        .optional()
        .with_context(|| format!("failed to load record {text_id}"))?;
    Ok(record)
}

pub fn empty_slots(connection: &Connection) -> Result<Vec<ReadingTextRecord>> {
    let sql = format!(
        "SELECT {} FROM reading_text WHERE text_body IS NULL OR text_body = '' ORDER BY text_id",
        select_columns()
    );
    let mut statement = connection.prepare(&sql)?;
    let records = statement
        .query_map([], record_from_row)?
        .collect::<rusqlite::Result<Vec<ReadingTextRecord>>>()?;
    Ok(records)
}

/// Records of one band from shortest to longest length type, then by score.
/// Records of a band ordered by length type in catalog order, then by score.
/// The overflow label follows the catalog lengths; unknown labels come last.
pub fn curriculum_sequence(
    connection: &Connection,
    catalog: &Catalog,
    band: &str,
    limit: usize,
) -> Result<Vec<ReadingTextRecord>> {
    let sql = format!(
        "SELECT {} FROM reading_text WHERE lexile_band = ?1 ORDER BY lexile_score, text_id",
        select_columns()
    );
    let mut statement = connection.prepare(&sql)?;
    let mut records = statement
        .query_map(params![band], record_from_row)?
        .collect::<rusqlite::Result<Vec<ReadingTextRecord>>>()?;

    let length_rank = |length_type: Option<&str>| -> usize {
        let lengths = &catalog.lengths;
        match length_type {
            Some(name) => lengths
                .iter()
                .position(|length| length.name == name)
                .unwrap_or(if name == EXTRA_LONG_LABEL {
                    lengths.len()
                } else {
                    lengths.len() + 1
                }),
            None => lengths.len() + 1,
        }
    };
    records.sort_by_key(|record| length_rank(record.length_type.as_deref()));
    records.truncate(limit);
    Ok(records)
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_records(connection: &Connection) -> Result<i64> {
    count_rows(connection, "SELECT COUNT(*) FROM reading_text")
}

pub fn count_with_body(connection: &Connection) -> Result<i64> {
    count_rows(
        connection,
        "SELECT COUNT(*) FROM reading_text WHERE text_body IS NOT NULL AND text_body != ''",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupColumn {
    Band,
    Genre,
    LengthType,
    Source,
}

impl GroupColumn {
    fn sql(self) -> &'static str {
        match self {
            Self::Band => "COALESCE(lexile_band, '')",
            Self::Genre => "COALESCE(genre, '')",
            Self::LengthType => "COALESCE(length_type, '')",
            Self::Source => "SUBSTR(COALESCE(notes, ''), 1, 30)",
        }
    }
}

/// Grouped counts over the given columns; keys are joined with `/`.
/// Ordered by key, or by descending count when `by_count` is set.
pub fn count_by(
    connection: &Connection,
    columns: &[GroupColumn],
    by_count: bool,
) -> Result<Vec<GroupCount>> {
    if columns.is_empty() {
        bail!("count_by needs at least one column");
    }

    let key_sql = columns
        .iter()
        .map(|column| column.sql())
        .collect::<Vec<&str>>()
        .join(" || '/' || ");
    let order = if by_count { "cnt DESC, k" } else { "k" };
    let sql = format!(
        "SELECT {key_sql} AS k, COUNT(*) AS cnt FROM reading_text GROUP BY k ORDER BY {order}"
    );

    let mut statement = connection.prepare(&sql)?;
    let counts = statement
        .query_map([], |row| {
            Ok(GroupCount {
                key: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<GroupCount>>>()?;
    Ok(counts)
}

/// genre -> length type -> count, optionally restricted to one band.
pub fn coverage_matrix(
    connection: &Connection,
    band: Option<&str>,
) -> Result<BTreeMap<String, BTreeMap<String, i64>>> {
    let mut matrix = BTreeMap::<String, BTreeMap<String, i64>>::new();

    let mut statement = connection.prepare(
        "
        SELECT genre, COALESCE(length_type, ''), COUNT(*)
        FROM reading_text
        WHERE ?1 IS NULL OR lexile_band = ?1
        GROUP BY genre, length_type
        ",
    )?;
    let mut rows = statement.query([band])?;
    while let Some(row) = rows.next()? {
        let genre: String = row.get(0)?;
        let length_type: String = row.get(1)?;
        let count: i64 = row.get(2)?;
        *matrix
            .entry(genre)
            .or_default()
            .entry(length_type)
            .or_default() += count;
    }

    Ok(matrix)
}

pub fn db_updated_at(connection: &Connection) -> Result<Option<String>> {
    let value = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_updated_at'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn mark_updated(connection: &Connection) -> Result<()> {
    touch_updated_at(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> Connection {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        ensure_schema(&connection).expect("schema should be created");
        seed_config_tables(&connection, &Catalog::standard()).expect("config should seed");
        connection
    }

    fn record(band: &str, genre: &str, body: Option<&str>) -> ReadingTextRecord {
        ReadingTextRecord {
            band: Some(band.to_string()),
            score: Some(750),
            genre: Some(genre.to_string()),
            text_body: body.map(str::to_string),
            ..ReadingTextRecord::default()
        }
    }

    #[test]
    fn insert_derives_statistics_and_sequential_ids() {
        let connection = memory_store();
        let catalog = Catalog::standard();
        let body = "One two three. Four five six.";

        let first = insert_record(&connection, &catalog, record("700-900", "Narrative", Some(body)))
            .expect("first insert should succeed");
        let second =
            insert_record(&connection, &catalog, record("700-900", "Narrative", Some(body)))
                .expect("second insert should succeed");

        assert_eq!(first, "L700-NAR-006-001");
        assert_eq!(second, "L700-NAR-006-002");

        let stored = get_record(&connection, &first)
            .expect("lookup should succeed")
            .expect("record should exist");
        assert_eq!(stored.word_count, Some(6));
        assert_eq!(stored.sentence_count, Some(2));
        assert_eq!(stored.avg_sentence_length, Some(3.0));
        assert_eq!(stored.length_type.as_deref(), Some("Micro"));
        assert!(stored.created_date.is_some());
    }

    #[test]
    fn explicit_values_are_not_overwritten_by_derivation() {
        let catalog = Catalog::standard();
        let mut explicit = record("700-900", "Narrative", Some("Short text."));
        explicit.word_count = Some(100);
        explicit.length_type = Some("Short".to_string());
        explicit.created_date = Some("2026-02-03".to_string());

        complete_derived_fields(&catalog, &mut explicit);
        assert_eq!(explicit.word_count, Some(100));
        assert_eq!(explicit.sentence_count, Some(1));
        assert_eq!(explicit.length_type.as_deref(), Some("Short"));
        assert_eq!(explicit.created_date.as_deref(), Some("2026-02-03"));
    }

    #[test]
    fn unknown_genre_gets_unk_code_and_missing_band_is_rejected() {
        let connection = memory_store();
        let catalog = Catalog::standard();

        let id = insert_record(&connection, &catalog, record("300-500", "Unicorn", None))
            .expect("insert should succeed");
        assert_eq!(id, "L300-UNK-000-001");

        let mut missing = record("", "Narrative", None);
        missing.band = None;
        let error = insert_record(&connection, &catalog, missing)
            .expect_err("missing band should be rejected");
        assert!(error.to_string().contains("lexile_band"));
    }

    #[test]
    fn replacing_a_record_keeps_its_id() {
        let connection = memory_store();
        let catalog = Catalog::standard();
        let id = insert_record(&connection, &catalog, record("700-900", "Literary", None))
            .expect("slot insert should succeed");

        let mut filled = get_record(&connection, &id)
            .expect("lookup should succeed")
            .expect("slot should exist");
        filled.text_body = Some("The sea was calm.".to_string());
        let replaced = insert_record(&connection, &catalog, filled).expect("replace should succeed");

        assert_eq!(replaced, id);
        assert_eq!(count_records(&connection).expect("count should work"), 1);
        assert_eq!(count_with_body(&connection).expect("count should work"), 1);
        assert!(empty_slots(&connection).expect("slots should load").is_empty());
    }

    #[test]
    fn filters_combine_and_keyword_matches_topic_or_body() {
        let connection = memory_store();
        let catalog = Catalog::standard();
        let mut rivers = record("700-900", "Expository", Some("Rivers carry water to the sea."));
        rivers.topic = Some("Water".to_string());
        let mut desert = record("700-900", "Narrative", Some("The desert was quiet."));
        desert.topic = Some("Sand".to_string());
        let other_band = record("300-500", "Expository", Some("Rivers are long."));
        for item in [rivers, desert, other_band] {
            insert_record(&connection, &catalog, item).expect("insert should succeed");
        }

        let filter = TextFilter {
            band: Some("700-900".to_string()),
            keyword: Some("river".to_string()),
            ..TextFilter::default()
        };
        let found = query_records(&connection, &filter, RecordOrder::Score)
            .expect("query should succeed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].topic.as_deref(), Some("Water"));

        let all = query_records(&connection, &TextFilter::default(), RecordOrder::TextId)
            .expect("query should succeed");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn grouped_counts_and_coverage_matrix() {
        let connection = memory_store();
        let catalog = Catalog::standard();
        for item in [
            record("700-900", "Narrative", Some("A short story.")),
            record("700-900", "Narrative", Some("Another short story.")),
            record("300-500", "Literary", None),
        ] {
            insert_record(&connection, &catalog, item).expect("insert should succeed");
        }
        mark_updated(&connection).expect("metadata should update");

        let by_band = count_by(&connection, &[GroupColumn::Band], false)
            .expect("count should succeed");
        assert_eq!(by_band.len(), 2);
        assert_eq!(by_band[0].key, "300-500");
        assert_eq!(by_band[1].count, 2);

        let by_genre = count_by(&connection, &[GroupColumn::Genre], true)
            .expect("count should succeed");
        assert_eq!(by_genre[0].key, "Narrative");

        let matrix = coverage_matrix(&connection, Some("700-900")).expect("matrix should build");
        assert_eq!(matrix["Narrative"]["Micro"], 2);
        assert!(!matrix.contains_key("Literary"));
        assert!(db_updated_at(&connection).expect("metadata read").is_some());
    }

    #[test]
    fn curriculum_orders_by_length_then_score() {
        let connection = memory_store();
        let catalog = Catalog::standard();
        let mut long = record("700-900", "Narrative", None);
        long.length_type = Some("Long".to_string());
        long.score = Some(710);
        let mut micro = record("700-900", "Narrative", None);
        micro.length_type = Some("Micro".to_string());
        micro.score = Some(890);
        let mut short = record("700-900", "Expository", None);
        short.length_type = Some("Short".to_string());
        for item in [long, micro, short] {
            insert_record(&connection, &catalog, item).expect("insert should succeed");
        }

        let sequence = curriculum_sequence(&connection, &catalog, "700-900", 2)
            .expect("sequence should load");
        let lengths = sequence
            .iter()
            .map(|record| record.length_type.as_deref().unwrap_or_default())
            .collect::<Vec<&str>>();
        assert_eq!(lengths, vec!["Micro", "Short"]);
    }

    #[test]
    fn curriculum_follows_custom_catalog_length_order() {
        let connection = memory_store();
        let mut catalog = Catalog::standard();
        let names = ["Tiny", "Brief", "Standard", "Full"];
        for (length, name) in catalog.lengths.iter_mut().zip(names) {
            length.name = name.to_string();
        }
        let items = [("Full", 710), ("Unlisted", 705), ("Tiny", 890), ("Brief", 700)];
        for (length_type, score) in items {
            let mut item = record("700-900", "Narrative", None);
            item.length_type = Some(length_type.to_string());
            item.score = Some(score);
            insert_record(&connection, &catalog, item).expect("insert should succeed");
        }

        let sequence = curriculum_sequence(&connection, &catalog, "700-900", 10)
            .expect("sequence should load");
        let lengths = sequence
            .iter()
            .map(|record| record.length_type.as_deref().unwrap_or_default())
            .collect::<Vec<&str>>();
        assert_eq!(lengths, vec!["Tiny", "Brief", "Full", "Unlisted"]);
    }
}
