use super::*;

const TOPIC_PREVIEW_CHARS: usize = 30;
const BODY_PREVIEW_CHARS: usize = 400;

#[derive(Debug, Clone, Serialize)]
pub(super) struct StatsReport {
    pub total: i64,
    pub with_body: i64,
    pub empty_slots: i64,
    pub by_band: Vec<GroupCount>,
    pub by_genre: Vec<GroupCount>,
    pub by_length_type: Vec<GroupCount>,
    pub by_source: Vec<GroupCount>,
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub(super) fn write_record_table(
    output: &mut impl Write,
    records: &[ReadingTextRecord],
    matched: usize,
) -> Result<()> {
    writeln!(output, "Results: {matched}")?;
    for record in records {
        writeln!(
            output,
            "{:<20} {:<10} {:>5} {:<14} {:<7} {:>4}w  {}",
            record.id_or_placeholder(),
            text(&record.band),
            number(record.score),
            text(&record.genre),
            text(&record.length_type),
            number(record.word_count),
            preview(text(&record.topic), TOPIC_PREVIEW_CHARS),
        )?;
    }
    if records.len() < matched {
        writeln!(output, "... and {} more", matched - records.len())?;
    }
    Ok(())
}

pub(super) fn write_record_detail(
    output: &mut impl Write,
    record: &ReadingTextRecord,
) -> Result<()> {
    writeln!(output, "Text ID: {}", record.id_or_placeholder())?;
    writeln!(
        output,
        "Lexile: {} ({})",
        number(record.score),
        text(&record.band)
    )?;
    writeln!(
        output,
        "Audience: {} | {}",
        text(&record.age_group),
        text(&record.grade_hint)
    )?;
    writeln!(
        output,
        "Genre: {} | Topic: {}",
        text(&record.genre),
        text(&record.topic)
    )?;
    writeln!(
        output,
        "Length: {} | {} words | {} sentences | avg {}",
        text(&record.length_type),
        number(record.word_count),
        number(record.sentence_count),
        number(record.avg_sentence_length),
    )?;
    writeln!(
        output,
        "Vocabulary: {} | Use: {}",
        text(&record.vocabulary_band),
        text(&record.intended_use)
    )?;
    writeln!(output, "Created: {}", text(&record.created_date))?;
    if let Some(notes) = record.notes.as_deref() {
        writeln!(output, "Notes: {notes}")?;
    }
    match record.body() {
        Some(body) => {
            writeln!(output)?;
            writeln!(output, "{}", preview(body, BODY_PREVIEW_CHARS))?;
        }
        None => writeln!(output, "Body: (empty slot)")?,
    }
    Ok(())
}

/// Genre rows by length columns. Catalog entries come first in catalog
/// order; stored values outside the catalog are appended.
pub(super) fn write_coverage(
    output: &mut impl Write,
    catalog: &Catalog,
    matrix: &BTreeMap<String, BTreeMap<String, i64>>,
    band: Option<&str>,
) -> Result<()> {
    let mut genres = catalog
        .genre_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<String>>();
    for genre in matrix.keys() {
        if !genres.contains(genre) {
            genres.push(genre.clone());
        }
    }

    let mut lengths = catalog
        .length_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<String>>();
    for length in matrix.values().flat_map(|row| row.keys()) {
        if !lengths.contains(length) {
            lengths.push(length.clone());
        }
    }

    writeln!(output, "Coverage: {}", band.unwrap_or("all bands"))?;
    write!(output, "{:<15}", "Genre")?;
    for length in &lengths {
        write!(output, " {length:>10}")?;
    }
    writeln!(output, " {:>7}", "Total")?;

    let mut grand_total = 0;
    for genre in &genres {
        let row = matrix.get(genre);
        let mut row_total = 0;
        write!(output, "{genre:<15}")?;
        for length in &lengths {
            let count = row.and_then(|row| row.get(length)).copied().unwrap_or(0);
            row_total += count;
            if count == 0 {
                write!(output, " {:>10}", "-")?;
            } else {
                write!(output, " {count:>10}")?;
            }
        }
        writeln!(output, " {row_total:>7}")?;
        grand_total += row_total;
    }
    writeln!(output, "Total: {grand_total}")?;
    Ok(())
}

fn write_group(output: &mut impl Write, title: &str, counts: &[GroupCount]) -> Result<()> {
    writeln!(output, "{title}:")?;
    for group in counts {
        let key = if group.key.is_empty() {
            "(none)"
        } else {
            group.key.as_str()
        };
        writeln!(output, "  {key:<32} {:>5}", group.count)?;
    }
    Ok(())
}

pub(super) fn write_stats(output: &mut impl Write, report: &StatsReport) -> Result<()> {
    writeln!(output, "Total texts: {}", report.total)?;
    writeln!(output, "With body: {}", report.with_body)?;
    writeln!(output, "Empty slots: {}", report.empty_slots)?;
    write_group(output, "By band", &report.by_band)?;
    write_group(output, "By genre", &report.by_genre)?;
    write_group(output, "By length type", &report.by_length_type)?;
    write_group(output, "By source", &report.by_source)?;
    Ok(())
}
