use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::cli::{PromptArgs, PromptBatchArgs, PromptOptionArgs};
use crate::commands::open_catalog_store;
use crate::model::ReadingTextRecord;
use crate::prompts::{PromptOptions, TaskType, build_prompt, export_prompt};
use crate::store::{RecordOrder, TextFilter, get_record, query_records};
use crate::util::write_text_file;

impl From<&PromptOptionArgs> for PromptOptions {
    fn from(args: &PromptOptionArgs) -> Self {
        Self {
            num_questions: args.num_questions,
            target_band: args.target_band.clone(),
        }
    }
}

pub fn run(args: PromptArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let record = get_record(&connection, &args.text_id)?
        .with_context(|| format!("no text with id {}", args.text_id))?;
    if record.is_empty_slot() {
        warn!(text_id = %args.text_id, "text has no body; prompt will carry a placeholder");
    }

    let options = PromptOptions::from(&args.options);
    match &args.output {
        Some(path) => {
            let document = export_prompt(&catalog, &record, args.task, &options)?;
            write_text_file(path, &document)?;
            info!(path = %path.display(), task = args.task.as_str(), "prompt written");
        }
        None => {
            let prompt = build_prompt(&catalog, &record, args.task, &options)?;
            let mut output = io::BufWriter::new(io::stdout().lock());
            writeln!(output, "{prompt}")?;
        }
    }
    Ok(())
}

pub fn run_batch(args: PromptBatchArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let filter = TextFilter {
        band: Some(args.band.clone()),
        ..TextFilter::default()
    };
    let records = query_records(&connection, &filter, RecordOrder::Score)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.store.data_root.join("prompts_export"));
    let options = PromptOptions::from(&args.options);
    let written = export_batch(&catalog, &records, args.task, &options, &output_dir)?;

    info!(
        band = %args.band,
        task = args.task.as_str(),
        written = written.len(),
        output_dir = %output_dir.display(),
        "prompt batch exported"
    );
    let mut output = io::BufWriter::new(io::stdout().lock());
    if written.is_empty() {
        writeln!(output, "No texts found in band {}", args.band)?;
    } else {
        writeln!(
            output,
            "{} prompts exported to {}",
            written.len(),
            output_dir.display()
        )?;
    }
    Ok(())
}

/// Writes `<text_id>_<task>.txt` per record and returns the paths written.
pub(crate) fn export_batch(
    catalog: &Catalog,
    records: &[ReadingTextRecord],
    task: TaskType,
    options: &PromptOptions,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let path = output_dir.join(format!("{}_{}.txt", record.id_or_placeholder(), task.as_str()));
        let document = export_prompt(catalog, record, task, options)?;
        write_text_file(&path, &document)?;
        written.push(path);
    }
    Ok(written)
}
