use super::*;

pub fn run(args: ImportExternalArgs) -> Result<()> {
    let started_at = now_utc_string();
    let run_id = format!("import-{}", utc_compact_string(Utc::now()));
    let (catalog, mut connection) = open_catalog_store(&args.store)?;
    let classifier = GenreClassifier::for_catalog(&catalog);
    let importer = Importer::new(&catalog, &classifier);

    let planned = plan_sources(&args);
    let mut sources = Vec::new();
    let mut missing_sources = Vec::new();

    for plan in planned {
        if !plan.path.exists() {
            warn!(path = %plan.path.display(), "source file not found; skipping");
            missing_sources.push(plan.path.display().to_string());
            continue;
        }

        if !is_known_tier(plan.source.level) {
            warn!(
                tier = plan.source.level,
                "no readability formula for this tier; every passage gets the fallback score"
            );
        }
        info!(
            path = %plan.path.display(),
            tier = plan.source.level,
            label = %plan.source.label,
            "importing external source"
        );
        let report = import_source(&mut connection, &catalog, &importer, &plan)?;
        info!(
            path = %plan.path.display(),
            imported = report.rows_imported,
            skipped = report.skipped_rows.len(),
            failed = report.failed_rows.len(),
            "source imported"
        );
        sources.push(report);
    }

    let total_imported = sources.iter().map(|source| source.rows_imported).sum();
    let any_failed = sources.iter().any(|source| !source.failed_rows.is_empty());
    let status = if sources.is_empty() {
        "no_sources"
    } else if any_failed {
        "completed_with_errors"
    } else {
        "completed"
    };

    let manifest = ImportRunManifest {
        manifest_version: IMPORT_MANIFEST_VERSION,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        db_path: args.store.resolved_db_path().display().to_string(),
        sources,
        missing_sources,
        total_imported,
        db_total: count_records(&connection)?,
        coverage_by_band: count_by(&connection, &[GroupColumn::Band], false)?,
        coverage_by_genre: count_by(&connection, &[GroupColumn::Genre], true)?,
        coverage_by_source: count_by(&connection, &[GroupColumn::Source], true)?,
    };

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.store
            .manifest_dir()
            .join(format!("import_run_{}.json", run_id.trim_start_matches("import-")))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        manifest = %manifest_path.display(),
        status,
        total_imported,
        "import run finished"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    write_summary(&mut output, &manifest)?;
    Ok(())
}

pub(super) fn plan_sources(args: &ImportExternalArgs) -> Vec<PlannedSource> {
    if let (Some(file), Some(tier)) = (&args.file, args.tier) {
        let label = args.source_label.clone().unwrap_or_else(|| {
            file.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("reading_{tier}"))
        });
        return vec![PlannedSource {
            path: file.clone(),
            source: ExternalSource { level: tier, label },
        }];
    }

    STANDARD_TIERS
        .iter()
        .map(|tier| PlannedSource {
            path: args.source_dir.join(format!("reading_{tier}.csv")),
            source: ExternalSource {
                level: *tier,
                label: format!("reading_{tier}"),
            },
        })
        .collect()
}

/// Converts and stores one file inside a transaction. Conversion and storage
/// problems are recorded per row.
pub(super) fn import_source(
    connection: &mut Connection,
    catalog: &Catalog,
    importer: &Importer<'_>,
    plan: &PlannedSource,
) -> Result<ImportSourceReport> {
    let sha256 = sha256_file(&plan.path)?;
    let rows = read_external_rows(&plan.path)?;
    let rows_read = rows.len();
    let batch = importer.convert_rows(rows, &plan.source);

    let mut failed_rows = batch.failed_rows;
    let mut imported = Vec::new();

    let tx = connection
        .transaction()
        .context("failed to start import transaction")?;
    for (row, record) in batch.records {
        let summary = (
            record.band.clone().unwrap_or_default(),
            record.genre.clone().unwrap_or_default(),
            record.length_type.clone().unwrap_or_default(),
            record.word_count.unwrap_or_default(),
        );
        match insert_record(&tx, catalog, record) {
            Ok(text_id) => {
                let (lexile_band, genre, length_type, word_count) = summary;
                imported.push(ImportedText {
                    row,
                    text_id,
                    lexile_band,
                    genre,
                    length_type,
                    word_count,
                });
            }
            Err(err) => {
                warn!(row, error = %err, "failed to store converted row");
                failed_rows.push(RowFailure {
                    row,
                    reason: format!("{err:#}"),
                });
            }
        }
    }
    mark_updated(&tx)?;
    tx.commit().context("failed to commit import transaction")?;
    failed_rows.sort_by_key(|failure| failure.row);

    Ok(ImportSourceReport {
        path: plan.path.display().to_string(),
        sha256,
        tier: plan.source.level,
        source_label: plan.source.label.clone(),
        rows_read,
        rows_imported: imported.len(),
        skipped_rows: batch.skipped_rows,
        failed_rows,
        imported,
    })
}

fn write_groups(output: &mut impl Write, title: &str, groups: &[GroupCount]) -> Result<()> {
    writeln!(output, "{title}:")?;
    for group in groups {
        writeln!(output, "  {}: {} texts", group.key, group.count)?;
    }
    Ok(())
}

pub(super) fn write_summary(output: &mut impl Write, manifest: &ImportRunManifest) -> Result<()> {
    for missing in &manifest.missing_sources {
        writeln!(output, "[SKIP] {missing} not found")?;
    }
    for source in &manifest.sources {
        writeln!(
            output,
            "{} (tier {}): {} imported, {} skipped, {} failed",
            source.path,
            source.tier,
            source.rows_imported,
            source.skipped_rows.len(),
            source.failed_rows.len()
        )?;
        for text in &source.imported {
            writeln!(
                output,
                "  [{:3}] {} | {} | {:<15} | {:<6} | {}w",
                text.row, text.text_id, text.lexile_band, text.genre, text.length_type, text.word_count
            )?;
        }
    }
    writeln!(output, "Total imported: {}", manifest.total_imported)?;
    writeln!(output, "Database total: {}", manifest.db_total)?;
    write_groups(output, "Coverage by band", &manifest.coverage_by_band)?;
    write_groups(output, "Coverage by genre", &manifest.coverage_by_genre)?;
    write_groups(output, "Coverage by source", &manifest.coverage_by_source)?;
    Ok(())
}
