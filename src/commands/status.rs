use std::io::{self, Write};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store::{count_records, count_with_body, db_updated_at, empty_slots};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    info!(data_root = %args.store.data_root.display(), "status requested");

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Database: {}", db_path.display())?;

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing; run `readbank init`");
        writeln!(output, "Status: not initialized")?;
        return Ok(());
    }

    let connection = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let total = count_records(&connection)?;
    let with_body = count_with_body(&connection)?;
    let empty = empty_slots(&connection)?.len();
    let updated_at = db_updated_at(&connection)?.unwrap_or_default();

    info!(
        path = %db_path.display(),
        texts = total,
        with_body,
        empty_slots = empty,
        updated_at = %updated_at,
        "database status"
    );

    writeln!(output, "Texts: {total}")?;
    writeln!(output, "With body: {with_body}")?;
    writeln!(output, "Empty slots: {empty}")?;
    if !updated_at.is_empty() {
        writeln!(output, "Updated: {updated_at}")?;
    }

    let manifest_dir = args.store.manifest_dir();
    if manifest_dir.exists() {
        writeln!(output, "Manifests: {}", manifest_dir.display())?;
    }
    Ok(())
}
