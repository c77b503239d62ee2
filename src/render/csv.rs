use crate::log::{RunRecord, ThroughputLog};
use crate::model::{BestPick, DerivedRecord, Metric};
use crate::render::OutputColumns;
use std::io::Write;

fn metric_cell(metric: Metric, cols: &OutputColumns) -> String {
    match metric {
        Metric::Value(v) => v.to_string(),
        Metric::Missing => cols.missing.clone(),
        Metric::Undefined => cols.undefined.clone(),
    }
}

fn optional_cell(value: Option<f64>, cols: &OutputColumns) -> String {
    value.map_or_else(|| cols.missing.clone(), |v| v.to_string())
}

/// Parsed run records, one row each. The phase column appears only when
/// some record carries a phase.
pub fn write_run_records<W: Write>(
    out: W,
    records: &[RunRecord],
    cols: &OutputColumns,
) -> anyhow::Result<()> {
    let with_phase = records.iter().any(|r| r.phase.is_some());
    let mut w = ::csv::Writer::from_writer(out);

    let mut header = vec![&cols.problem_size, &cols.thread_count, &cols.policy];
    if with_phase {
        header.push(&cols.phase);
    }
    header.push(&cols.metric_value);
    w.write_record(header)?;

    for r in records {
        let mut row = vec![r.problem_size.to_string(), r.thread_count.to_string(), r.policy.clone()];
        if with_phase {
            row.push(r.phase.clone().unwrap_or_default());
        }
        row.push(r.metric_value.to_string());
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_derived<W: Write>(
    out: W,
    records: &[DerivedRecord],
    cols: &OutputColumns,
) -> anyhow::Result<()> {
    let with_phase = records.iter().any(|r| r.phase.is_some());
    let with_serial = records.iter().any(|r| r.serial_fraction.is_some());
    let mut w = ::csv::Writer::from_writer(out);

    let mut header = vec![&cols.problem_size, &cols.thread_count, &cols.policy];
    if with_phase {
        header.push(&cols.phase);
    }
    header.extend([&cols.mean_value, &cols.samples, &cols.speedup, &cols.efficiency]);
    if with_serial {
        header.push(&cols.serial_fraction);
    }
    w.write_record(header)?;

    for r in records {
        let mut row = vec![r.problem_size.to_string(), r.thread_count.to_string(), r.policy.clone()];
        if with_phase {
            row.push(r.phase.clone().unwrap_or_default());
        }
        row.extend([
            r.mean_value.to_string(),
            r.samples.to_string(),
            metric_cell(r.speedup, cols),
            metric_cell(r.efficiency, cols),
        ]);
        if with_serial {
            row.push(r.serial_fraction.map_or_else(String::new, |m| metric_cell(m, cols)));
        }
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_best<W: Write>(out: W, picks: &[BestPick], cols: &OutputColumns) -> anyhow::Result<()> {
    let with_phase = picks.iter().any(|p| p.phase.is_some());
    let mut w = ::csv::Writer::from_writer(out);

    let mut header = vec![&cols.problem_size, &cols.thread_count, &cols.policy];
    if with_phase {
        header.push(&cols.phase);
    }
    header.extend([&cols.mean_value, &cols.speedup, &cols.efficiency, &cols.candidates]);
    w.write_record(header)?;

    for p in picks {
        let mut row = vec![p.problem_size.to_string(), p.thread_count.to_string(), p.policy.clone()];
        if with_phase {
            row.push(p.phase.clone().unwrap_or_default());
        }
        row.extend([
            p.mean_value.to_string(),
            metric_cell(p.speedup, cols),
            metric_cell(p.efficiency, cols),
            p.candidates.to_string(),
        ]);
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

/// Throughput rows as `size,standard,buffered`. The delay is not a column;
/// callers report it separately.
pub fn write_throughput<W: Write>(
    out: W,
    log: &ThroughputLog,
    cols: &OutputColumns,
) -> anyhow::Result<()> {
    let mut w = ::csv::Writer::from_writer(out);
    w.write_record([&cols.size, &cols.standard, &cols.buffered])?;
    for row in &log.rows {
        w.write_record([
            row.size.to_string(),
            optional_cell(row.standard, cols),
            optional_cell(row.buffered, cols),
        ])?;
    }
    w.flush()?;
    Ok(())
}
