use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::commands::open_catalog_store;
use crate::model::{
    GroupCount, RecordFindings, ValidationError, ValidationReport, ValidationSummary,
};
use crate::store::{RecordOrder, TextFilter, query_records};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};
use crate::validation::validate_all;

const REPORT_MANIFEST_VERSION: u32 = 1;

pub fn run(args: ValidateArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let records = query_records(&connection, &TextFilter::default(), RecordOrder::TextId)?;

    let results = validate_all(&catalog, &records);
    let started = Utc::now();
    let report = build_report(
        format!("validate-{}", utc_compact_string(started)),
        args.store.resolved_db_path().display().to_string(),
        records.len(),
        results,
    );

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.store.manifest_dir().join(format!(
            "validation_report_{}.json",
            utc_compact_string(started)
        ))
    });
    write_json_pretty(&report_path, &report)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    for record in &report.findings {
        for error in &record.errors {
            writeln!(
                output,
                "{}\t{}\t{}\t{}",
                record.text_id,
                error.kind.as_str(),
                error.field,
                error.message
            )?;
        }
    }
    writeln!(
        output,
        "Checked {} texts: {} with findings, {} findings",
        report.summary.records_checked,
        report.summary.records_with_errors,
        report.summary.error_count
    )?;
    output.flush()?;

    if report.summary.records_with_errors == 0 {
        info!(
            records = report.summary.records_checked,
            report = %report_path.display(),
            "validation passed"
        );
    } else {
        warn!(
            records = report.summary.records_checked,
            with_findings = report.summary.records_with_errors,
            findings = report.summary.error_count,
            report = %report_path.display(),
            "validation found problems"
        );
        if args.fail_on_findings {
            bail!(
                "{} texts failed validation",
                report.summary.records_with_errors
            );
        }
    }

    Ok(())
}

fn build_report(
    run_id: String,
    db_path: String,
    records_checked: usize,
    results: BTreeMap<String, Vec<ValidationError>>,
) -> ValidationReport {
    let mut by_kind = BTreeMap::<&'static str, i64>::new();
    for error in results.values().flatten() {
        *by_kind.entry(error.kind.as_str()).or_default() += 1;
    }

    let summary = ValidationSummary {
        records_checked,
        records_with_errors: results.len(),
        error_count: results.values().map(Vec::len).sum(),
        errors_by_kind: by_kind
            .into_iter()
            .map(|(key, count)| GroupCount {
                key: key.to_string(),
                count,
            })
            .collect(),
    };

    ValidationReport {
        manifest_version: REPORT_MANIFEST_VERSION,
        run_id,
        generated_at: now_utc_string(),
        status: if summary.records_with_errors == 0 {
            "passed".to_string()
        } else {
            "failed".to_string()
        },
        db_path,
        summary,
        findings: results
            .into_iter()
            .map(|(text_id, errors)| RecordFindings { text_id, errors })
            .collect(),
    }
}
