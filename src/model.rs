use serde::{Deserialize, Serialize};

/// One graded reading passage, or an empty slot when `text_body` is absent.
///
/// Field names follow the storage and CSV column names. Every field is
/// optional so that inconsistent rows stay representable and can be reported
/// by the validator instead of being rejected on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingTextRecord {
    pub text_id: Option<String>,
    #[serde(rename = "lexile_band")]
    pub band: Option<String>,
    #[serde(rename = "lexile_score")]
    pub score: Option<i64>,
    pub age_group: Option<String>,
    pub grade_hint: Option<String>,
    pub genre: Option<String>,
    pub topic: Option<String>,
    pub word_count: Option<i64>,
    pub length_type: Option<String>,
    pub text_body: Option<String>,
    pub sentence_count: Option<i64>,
    pub avg_sentence_length: Option<f64>,
    pub vocabulary_band: Option<String>,
    pub intended_use: Option<String>,
    pub created_date: Option<String>,
    pub notes: Option<String>,
}

impl ReadingTextRecord {
    /// Body text, treating an empty string the same as a missing body.
    pub fn body(&self) -> Option<&str> {
        self.text_body.as_deref().filter(|body| !body.is_empty())
    }

    pub fn is_empty_slot(&self) -> bool {
        self.body().is_none()
    }

    pub fn id_or_placeholder(&self) -> &str {
        self.text_id.as_deref().unwrap_or("(unassigned)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationKind {
    MissingRequired,
    ScoreOutOfBand,
    InvalidGenre,
    InvalidLengthType,
    LengthMismatch,
    WordCountMismatch,
}

impl ValidationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequired => "MISSING_REQUIRED",
            Self::ScoreOutOfBand => "SCORE_OUT_OF_BAND",
            Self::InvalidGenre => "INVALID_GENRE",
            Self::InvalidLengthType => "INVALID_LENGTH_TYPE",
            Self::LengthMismatch => "LENGTH_MISMATCH",
            Self::WordCountMismatch => "WORD_COUNT_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Row of an external passage corpus (reading_2000.csv and friends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExternalRow {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub passage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportedText {
    pub row: usize,
    pub text_id: String,
    pub lexile_band: String,
    pub genre: String,
    pub length_type: String,
    pub word_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSourceReport {
    pub path: String,
    pub sha256: String,
    pub tier: u32,
    pub source_label: String,
    pub rows_read: usize,
    pub rows_imported: usize,
    pub skipped_rows: Vec<usize>,
    pub failed_rows: Vec<RowFailure>,
    pub imported: Vec<ImportedText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub db_path: String,
    pub sources: Vec<ImportSourceReport>,
    pub missing_sources: Vec<String>,
    pub total_imported: usize,
    pub db_total: i64,
    pub coverage_by_band: Vec<GroupCount>,
    pub coverage_by_genre: Vec<GroupCount>,
    pub coverage_by_source: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordFindings {
    pub text_id: String,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub records_checked: usize,
    pub records_with_errors: usize,
    pub error_count: usize,
    pub errors_by_kind: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub status: String,
    pub db_path: String,
    pub summary: ValidationSummary,
    pub findings: Vec<RecordFindings>,
}
