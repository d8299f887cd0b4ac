use super::*;
use super::output::{
    StatsReport, write_coverage, write_record_detail, write_record_table, write_stats,
};

pub fn run_list(args: ListArgs) -> Result<()> {
    let (_, connection) = open_catalog_store(&args.store)?;

    let filter = TextFilter {
        band: args.band,
        genre: args.genre,
        length_type: args.length_type,
        keyword: args.keyword,
    };
    let order = if filter.keyword.is_some() {
        RecordOrder::Score
    } else {
        RecordOrder::TextId
    };

    let mut records = query_records(&connection, &filter, order)?;
    let matched = records.len();
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    info!(matched, shown = records.len(), "listed texts");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &records)
            .context("failed to serialize list json output")?;
        writeln!(output)?;
    } else {
        write_record_table(&mut output, &records, matched)?;
    }
    Ok(())
}

pub fn run_show(args: ShowArgs) -> Result<()> {
    let (_, connection) = open_catalog_store(&args.store)?;
    let record = get_record(&connection, &args.text_id)?
        .with_context(|| format!("no text with id {}", args.text_id))?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &record)
            .context("failed to serialize record json output")?;
        writeln!(output)?;
    } else {
        write_record_detail(&mut output, &record)?;
    }
    Ok(())
}

pub fn run_coverage(args: CoverageArgs) -> Result<()> {
    let (catalog, connection) = open_catalog_store(&args.store)?;
    let matrix = coverage_matrix(&connection, args.band.as_deref())?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    write_coverage(&mut output, &catalog, &matrix, args.band.as_deref())?;
    Ok(())
}

pub fn run_stats(args: StatsArgs) -> Result<()> {
    let (_, connection) = open_catalog_store(&args.store)?;

    let total = count_records(&connection)?;
    let with_body = count_with_body(&connection)?;
    let report = StatsReport {
        total,
        with_body,
        empty_slots: total - with_body,
        by_band: count_by(&connection, &[GroupColumn::Band], false)?,
        by_genre: count_by(&connection, &[GroupColumn::Genre], false)?,
        by_length_type: count_by(&connection, &[GroupColumn::LengthType], false)?,
        by_source: count_by(&connection, &[GroupColumn::Source], true)?,
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize stats json output")?;
        writeln!(output)?;
    } else {
        write_stats(&mut output, &report)?;
    }
    Ok(())
}
