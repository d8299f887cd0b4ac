use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::InitArgs;
use crate::commands::open_catalog_store;
use crate::store::{DB_SCHEMA_VERSION, count_records, mark_updated};

pub fn run(args: InitArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    mark_updated(&connection)?;

    let db_path = args.store.resolved_db_path();
    let total = count_records(&connection)?;
    info!(
        db_path = %db_path.display(),
        schema_version = DB_SCHEMA_VERSION,
        bands = catalog.bands.len(),
        genres = catalog.genres.len(),
        lengths = catalog.lengths.len(),
        "store initialized"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Database: {}", db_path.display())?;
    writeln!(output, "Texts: {total}")?;
    Ok(())
}
