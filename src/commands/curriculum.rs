use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::CurriculumArgs;
use crate::commands::open_catalog_store;
use crate::model::ReadingTextRecord;
use crate::prompts::{PromptOptions, TaskType, export_prompt};
use crate::store::curriculum_sequence;
use crate::util::write_text_file;

pub fn run(args: CurriculumArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let steps = curriculum_sequence(&connection, &catalog, &args.band, args.count)?;
    info!(band = %args.band, requested = args.count, found = steps.len(), "curriculum built");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if steps.is_empty() {
        writeln!(output, "No texts found in band {}", args.band)?;
        return Ok(());
    }

    writeln!(output, "Curriculum sequence: Lexile {}", args.band)?;
    for (index, record) in steps.iter().enumerate() {
        writeln!(
            output,
            "Step {}: {} ({}w) | {} | {} | {} | Lexile {}",
            index + 1,
            record.length_type.as_deref().unwrap_or("?"),
            record.word_count.unwrap_or_default(),
            record.genre.as_deref().unwrap_or(""),
            record.topic.as_deref().unwrap_or(""),
            record.id_or_placeholder(),
            record
                .score
                .map(|score| score.to_string())
                .unwrap_or_default(),
        )?;
    }

    if let Some(export_dir) = &args.export_dir {
        let written = export_lessons(&catalog, &steps, export_dir)?;
        info!(export_dir = %export_dir.display(), files = written.len(), "lesson plans exported");
        writeln!(output, "Lesson plans exported to {}", export_dir.display())?;
    }
    Ok(())
}

/// Writes `step<i>_<text_id>_lesson.txt` for every step, numbered from 1.
pub(crate) fn export_lessons(
    catalog: &Catalog,
    steps: &[ReadingTextRecord],
    export_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let options = PromptOptions::default();
    let mut written = Vec::with_capacity(steps.len());
    for (index, record) in steps.iter().enumerate() {
        let path = export_dir.join(format!(
            "step{}_{}_lesson.txt",
            index + 1,
            record.id_or_placeholder()
        ));
        let document = export_prompt(catalog, record, TaskType::LessonPlan, &options)?;
        write_text_file(&path, &document)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn lessons_are_numbered_by_step() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let steps = vec![
            ReadingTextRecord {
                text_id: Some("L700-NAR-050-001".to_string()),
                topic: Some("Friendship".to_string()),
                text_body: Some("Mina waited.".to_string()),
                ..ReadingTextRecord::default()
            },
            ReadingTextRecord {
                text_id: Some("L700-EXP-200-001".to_string()),
                topic: Some("Volcanoes".to_string()),
                text_body: Some("Lava flows.".to_string()),
                ..ReadingTextRecord::default()
            },
        ];

        let written =
            export_lessons(&Catalog::standard(), &steps, dir.path()).expect("export should work");
        assert!(written[0].ends_with("step1_L700-NAR-050-001_lesson.txt"));
        assert!(written[1].ends_with("step2_L700-EXP-200-001_lesson.txt"));
        let lesson = fs::read_to_string(&written[1]).expect("lesson should read");
        assert!(lesson.contains("Activating prior knowledge about \"Volcanoes\""));
    }
}
