use std::io::{self, Write};

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::cli::{ExportCsvArgs, ImportCsvArgs};
use crate::commands::open_catalog_store;
use crate::csv_io::{NumberedRow, read_records, write_records};
use crate::model::{ReadingTextRecord, RowFailure};
use crate::store::{RecordOrder, TextFilter, insert_record, mark_updated, query_records};

#[derive(Debug, Default)]
struct CsvImportOutcome {
    imported: Vec<String>,
    failed_rows: Vec<RowFailure>,
}

pub fn run_import(args: ImportCsvArgs) -> Result<()> {
    let (catalog, mut connection) = open_catalog_store(&args.store)?;
    let rows = read_records(&args.path)?;
    info!(path = %args.path.display(), rows = rows.len(), "importing csv");

    let outcome = import_rows(&mut connection, &catalog, rows)?;
    for failure in &outcome.failed_rows {
        warn!(row = failure.row, reason = %failure.reason, "csv row rejected");
    }
    info!(
        imported = outcome.imported.len(),
        failed = outcome.failed_rows.len(),
        "csv import finished"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "Imported {} rows ({} failed) from {}",
        outcome.imported.len(),
        outcome.failed_rows.len(),
        args.path.display()
    )?;
    Ok(())
}

/// Stores each parsed row inside one transaction. Rows that failed to parse
/// or to store are reported and the rest are kept.
fn import_rows(
    connection: &mut Connection,
    catalog: &Catalog,
    rows: Vec<NumberedRow<ReadingTextRecord>>,
) -> Result<CsvImportOutcome> {
    let tx = connection.transaction()?;
    let mut outcome = CsvImportOutcome::default();

    for (row, parsed) in rows {
        let stored = parsed.and_then(|record| {
            insert_record(&tx, catalog, record).map_err(|err| format!("row {row}: {err:#}"))
        });
        match stored {
            Ok(text_id) => outcome.imported.push(text_id),
            Err(reason) => outcome.failed_rows.push(RowFailure { row, reason }),
        }
    }

    mark_updated(&tx)?;
    tx.commit()?;
    Ok(outcome)
}

pub fn run_export(args: ExportCsvArgs) -> Result<()> {
    let (_, connection) = open_catalog_store(&args.store)?;
    let records = query_records(&connection, &TextFilter::default(), RecordOrder::TextId)?;
    let written = write_records(&args.output, &records)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if written == 0 {
        warn!("store is empty; no csv written");
        writeln!(output, "No texts to export")?;
    } else {
        info!(path = %args.output.display(), rows = written, "exported csv");
        writeln!(output, "Exported {written} rows to {}", args.output.display())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{count_records, ensure_schema, get_record};

    #[test]
    fn failed_rows_do_not_block_the_rest() {
        let mut connection = Connection::open_in_memory().expect("in-memory db should open");
        ensure_schema(&connection).expect("schema should be created");
        let catalog = Catalog::standard();

        let good = ReadingTextRecord {
            text_id: Some("L700-NAR-100-001".to_string()),
            band: Some("700-900".to_string()),
            genre: Some("Narrative".to_string()),
            ..ReadingTextRecord::default()
        };
        let no_band = ReadingTextRecord {
            genre: Some("Narrative".to_string()),
            ..ReadingTextRecord::default()
        };
        let rows = vec![
            (1, Ok(good)),
            (2, Err("row 2: invalid word_count value 'many'".to_string())),
            (3, Ok(no_band)),
        ];

        let outcome = import_rows(&mut connection, &catalog, rows).expect("import should run");
        assert_eq!(outcome.imported, vec!["L700-NAR-100-001".to_string()]);
        assert_eq!(
            outcome
                .failed_rows
                .iter()
                .map(|failure| failure.row)
                .collect::<Vec<usize>>(),
            vec![2, 3]
        );
        assert!(outcome.failed_rows[1].reason.contains("lexile_band"));
        assert_eq!(count_records(&connection).expect("count should work"), 1);
        assert!(
            get_record(&connection, "L700-NAR-100-001")
                .expect("lookup should work")
                .is_some()
        );
    }
}
