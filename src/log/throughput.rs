//! Parsing for the point-to-point communication log (delay + throughput).
//!
//! Expected lines:
//! Delay for 1 byte: 0.000444 ms
//! Standard Communication: Size 1024 bytes, Throughput: 100.0 Mbps
//! Buffered Communication: Size 1024 bytes, Throughput: 120.0 Mbps
//!
//! Rows are keyed by message size, so a Buffered line may come before the
//! Standard line for the same size.

use crate::log::error::{ParseError, UnrecognizedLine};
use anyhow::Context;
use log::warn;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;

const DELAY_LINE_RE: &str = r"^Delay for 1 byte: (\S+) ms$";
const THROUGHPUT_LINE_RE: &str =
    r"^(Standard|Buffered) Communication: Size (\S+) bytes, Throughput: (\S+) Mbps$";

/// Throughput for one message size, per communication mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputRow {
    pub size: u64,
    pub standard: Option<f64>,
    pub buffered: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputLog {
    /// Latest reported one-byte delay, in milliseconds.
    pub delay_ms: Option<f64>,
    /// Rows in order of first appearance of their size.
    pub rows: Vec<ThroughputRow>,
    pub unrecognized: Vec<UnrecognizedLine>,
}

/// The two-pattern line grammar of the communication log.
pub struct ThroughputParser {
    delay: Regex,
    throughput: Regex,
}

impl ThroughputParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(ThroughputParser {
            delay: Regex::new(DELAY_LINE_RE)?,
            throughput: Regex::new(THROUGHPUT_LINE_RE)?,
        })
    }

    /// Parse a whole communication log held in memory.
    pub fn parse_str(&self, text: &str) -> Result<ThroughputLog, ParseError> {
        let mut out = ThroughputLog::default();
        let mut index: HashMap<u64, usize> = HashMap::new();

        for (lineno, line) in text.lines().enumerate() {
            let lno = lineno + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(caps) = self.delay.captures(line) {
                out.delay_ms = Some(parse_metric(lno, "delay", &caps[1])?);
                continue;
            }

            let Some(caps) = self.throughput.captures(line) else {
                out.unrecognized.push(UnrecognizedLine {
                    line: lno,
                    text: line.to_string(),
                });
                continue;
            };

            let size: u64 = caps[2]
                .parse()
                .map_err(|_| ParseError::invalid(lno, "size", &caps[2]))?;
            let throughput = parse_metric(lno, "throughput", &caps[3])?;

            let slot = *index.entry(size).or_insert_with(|| {
                out.rows.push(ThroughputRow {
                    size,
                    standard: None,
                    buffered: None,
                });
                out.rows.len() - 1
            });
            let row = &mut out.rows[slot];

            // A repeated line for the same size and mode keeps the first value.
            let field = if &caps[1] == "Standard" {
                &mut row.standard
            } else {
                &mut row.buffered
            };
            if field.is_none() {
                *field = Some(throughput);
            }
        }

        Ok(out)
    }
}

pub fn parse_throughput_file(path: &str) -> anyhow::Result<ThroughputLog> {
    let bytes = fs::read(path).with_context(|| format!("read throughput log {}", path))?;
    let parsed = ThroughputParser::new()?
        .parse_str(&String::from_utf8_lossy(&bytes))
        .with_context(|| format!("throughput log parse error in {}", path))?;

    if !parsed.unrecognized.is_empty() {
        warn!(
            "{}: skipped {} unrecognized line(s)",
            path,
            parsed.unrecognized.len()
        );
    }
    for row in &parsed.rows {
        if row.standard.is_none() || row.buffered.is_none() {
            warn!("{}: size {} is missing a communication mode", path, row.size);
        }
    }
    Ok(parsed)
}

fn parse_metric(line: usize, field: &str, raw: &str) -> Result<f64, ParseError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ParseError::invalid(line, field, raw)),
    }
}
