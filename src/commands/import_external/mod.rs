use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::classify::{GenreClassifier, is_known_tier};
use crate::cli::ImportExternalArgs;
use crate::commands::open_catalog_store;
use crate::csv_io::read_external_rows;
use crate::importer::{ExternalSource, Importer};
use crate::model::{GroupCount, ImportRunManifest, ImportSourceReport, ImportedText, RowFailure};
use crate::store::{
    DB_SCHEMA_VERSION, GroupColumn, count_by, count_records, insert_record, mark_updated,
};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

const IMPORT_MANIFEST_VERSION: u32 = 1;

/// Tier files looked up in the source directory when no single file is given.
const STANDARD_TIERS: [u32; 3] = [2000, 3000, 5000];

mod run;

pub use run::run;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedSource {
    path: PathBuf,
    source: ExternalSource,
}
