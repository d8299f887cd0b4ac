use std::io::{self, Write};

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::classify::DEFAULT_AGE_GROUP;
use crate::cli::GenerateArgs;
use crate::commands::open_catalog_store;
use crate::generation::{
    AnthropicGenerator, GeneratedText, TextGenerator, batch_generate, generate_text,
};
use crate::model::ReadingTextRecord;
use crate::prompts::GenerationRequest;
use crate::store::{empty_slots, insert_record, mark_updated};

const GENERATED_INTENDED_USE: &str = "lesson";

pub fn run(args: GenerateArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let generator = AnthropicGenerator::from_env(args.model.clone(), args.max_tokens)?;

    if args.fill_empty_slots {
        let reports = fill_empty_slots(&connection, &catalog, &generator, args.limit)?;
        let filled = reports.iter().filter(|report| report.error.is_none()).count();
        let mut output = io::BufWriter::new(io::stdout().lock());
        for report in &reports {
            match &report.error {
                None => writeln!(output, "[ok]   {}", report.text_id)?,
                Some(error) => writeln!(output, "[fail] {}: {error}", report.text_id)?,
            }
        }
        writeln!(output, "Filled {filled} of {} empty slots", reports.len())?;
        return Ok(());
    }

    let request = request_from_args(&catalog, &args);
    if catalog.band(&request.band).is_none() {
        warn!(band = %request.band, "band is not in the catalog");
    }
    let generated = generate_text(&generator, &catalog, &request)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{}", generated.text_body)?;
    writeln!(
        output,
        "Words: {} | Sentences: {} | Lexile estimate: {}",
        generated
            .word_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "?".to_string()),
        generated
            .sentence_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "?".to_string()),
        generated
            .estimated_score()
            .map(|score| score.to_string())
            .unwrap_or_else(|| "?".to_string()),
    )?;

    if args.save {
        let record = generated_record(&catalog, &request, &generated);
        let text_id = insert_record(&connection, &catalog, record)?;
        mark_updated(&connection)?;
        info!(text_id = %text_id, "generated text saved");
        writeln!(output, "Saved: {text_id}")?;
    }
    Ok(())
}

fn request_from_args(catalog: &Catalog, args: &GenerateArgs) -> GenerationRequest {
    let band = catalog.band(&args.band);
    GenerationRequest {
        genre: args.genre.clone(),
        length_type: args.length_type.clone(),
        band: args.band.clone(),
        topic: args.topic.clone().filter(|topic| !topic.is_empty()),
        age_group: args
            .age_group
            .clone()
            .or_else(|| band.map(|band| band.age_group.clone()))
            .unwrap_or_else(|| DEFAULT_AGE_GROUP.to_string()),
        vocabulary_band: args
            .vocabulary_band
            .clone()
            .or_else(|| band.map(|band| band.vocabulary_band.clone())),
    }
}

/// Record for a freshly generated passage. The score is the service's
/// estimate, or the band midpoint when it gave none; counts are measured from
/// the body on insert.
pub(crate) fn generated_record(
    catalog: &Catalog,
    request: &GenerationRequest,
    generated: &GeneratedText,
) -> ReadingTextRecord {
    let band = catalog.band(&request.band);
    let score = generated
        .estimated_score()
        .or_else(|| band.map(|band| band.midpoint()))
        .or_else(|| band_midpoint_from_label(&request.band));

    ReadingTextRecord {
        band: Some(request.band.clone()),
        score,
        age_group: Some(request.age_group.clone()),
        grade_hint: band.map(|band| band.grade_hint.clone()),
        genre: Some(request.genre.clone()),
        topic: Some(request.resolved_topic(catalog)),
        length_type: Some(request.length_type.clone()),
        text_body: Some(generated.text_body.clone()),
        vocabulary_band: request.vocabulary_band.clone(),
        intended_use: Some(GENERATED_INTENDED_USE.to_string()),
        ..ReadingTextRecord::default()
    }
}

fn band_midpoint_from_label(label: &str) -> Option<i64> {
    let (low, high) = label.split_once('-')?;
    let low = low.trim().parse::<i64>().ok()?;
    let high = high.trim().parse::<i64>().ok()?;
    Some((low + high) / 2)
}

/// Slot with its body filled; derived counts are cleared so they are
/// recomputed from the new body.
pub(crate) fn filled_slot(slot: ReadingTextRecord, generated: &GeneratedText) -> ReadingTextRecord {
    ReadingTextRecord {
        score: slot.score.or_else(|| generated.estimated_score()),
        text_body: Some(generated.text_body.clone()),
        word_count: None,
        sentence_count: None,
        avg_sentence_length: None,
        intended_use: slot
            .intended_use
            .clone()
            .or_else(|| Some(GENERATED_INTENDED_USE.to_string())),
        ..slot
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlotReport {
    pub text_id: String,
    pub error: Option<String>,
}

pub(crate) fn fill_empty_slots(
    connection: &Connection,
    catalog: &Catalog,
    generator: &dyn TextGenerator,
    limit: Option<usize>,
) -> Result<Vec<SlotReport>> {
    let mut slots = empty_slots(connection)?;
    if let Some(limit) = limit {
        slots.truncate(limit);
    }
    info!(slots = slots.len(), "filling empty slots");

    let mut reports = Vec::new();
    let mut requests = Vec::new();
    for slot in slots {
        match GenerationRequest::for_slot(&slot) {
            Some(request) => requests.push((slot, request)),
            None => {
                warn!(text_id = %slot.id_or_placeholder(), "slot lacks band or genre; skipped");
                reports.push(SlotReport {
                    text_id: slot.id_or_placeholder().to_string(),
                    error: Some("slot lacks band or genre".to_string()),
                });
            }
        }
    }

    for outcome in batch_generate(generator, catalog, requests) {
        let text_id = outcome.slot.id_or_placeholder().to_string();
        let error = match outcome.result {
            Ok(generated) => {
                let filled = filled_slot(outcome.slot, &generated);
                insert_record(connection, catalog, filled)
                    .err()
                    .map(|err| format!("{err:#}"))
            }
            Err(err) => Some(err.to_string()),
        };
        reports.push(SlotReport { text_id, error });
    }

    mark_updated(connection)?;
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::generation::{GenerationError, parse_generation_response};
    use crate::store::{ensure_schema, get_record};

    struct AlternatingGenerator {
        calls: Cell<usize>,
    }

    impl TextGenerator for AlternatingGenerator {
        fn complete(&self, _prompt: &str) -> Result<GeneratedText, GenerationError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call % 2 == 0 {
                parse_generation_response(
                    "{\"text_body\": \"Birds fly south. They return in spring.\", \"lexile_estimate\": 640}",
                )
            } else {
                Err(GenerationError::Request("connection reset".to_string()))
            }
        }
    }

    fn slot(id: &str, genre: &str) -> ReadingTextRecord {
        ReadingTextRecord {
            text_id: Some(id.to_string()),
            band: Some("500-700".to_string()),
            genre: Some(genre.to_string()),
            length_type: Some("Micro".to_string()),
            ..ReadingTextRecord::default()
        }
    }

    #[test]
    fn generated_record_falls_back_to_band_midpoint() {
        let catalog = Catalog::standard();
        let request = GenerationRequest {
            genre: "Literary".to_string(),
            length_type: "Short".to_string(),
            band: "900-1100".to_string(),
            topic: None,
            age_group: "Upper Secondary".to_string(),
            vocabulary_band: Some("B1/B2".to_string()),
        };
        let generated = GeneratedText {
            text_body: "Autumn light fell softly.".to_string(),
            word_count: Some(4),
            sentence_count: Some(1),
            vocabulary_notes: None,
            lexile_estimate: None,
        };

        let record = generated_record(&catalog, &request, &generated);
        assert_eq!(record.score, Some(1000));
        assert_eq!(record.topic.as_deref(), Some("Feelings"));
        assert_eq!(record.intended_use.as_deref(), Some("lesson"));
        assert_eq!(record.grade_hint.as_deref(), Some("Middle 3-High 1"));

        let off_catalog = GenerationRequest {
            band: "1500-1700".to_string(),
            ..request
        };
        assert_eq!(
            generated_record(&catalog, &off_catalog, &generated).score,
            Some(1600)
        );
    }

    #[test]
    fn filling_slots_keeps_ids_and_reports_failures() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        ensure_schema(&connection).expect("schema should be created");
        let catalog = Catalog::standard();
        for record in [
            slot("L500-NAR-000-001", "Narrative"),
            slot("L500-EXP-000-001", "Expository"),
        ] {
            insert_record(&connection, &catalog, record).expect("slot should be stored");
        }

        let generator = AlternatingGenerator {
            calls: Cell::new(0),
        };
        let reports =
            fill_empty_slots(&connection, &catalog, &generator, None).expect("fill should run");

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].text_id, "L500-EXP-000-001");
        assert!(reports[0].error.is_none());
        assert!(
            reports[1]
                .error
                .as_deref()
                .is_some_and(|error| error.contains("connection reset"))
        );

        let filled = get_record(&connection, "L500-EXP-000-001")
            .expect("lookup should work")
            .expect("slot should still exist");
        assert_eq!(filled.word_count, Some(7));
        assert_eq!(filled.sentence_count, Some(2));
        assert_eq!(filled.score, Some(640));
        assert_eq!(empty_slots(&connection).expect("slots should load").len(), 1);
    }
}
