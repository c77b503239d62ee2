use crate::log::error::{ParseError, UnrecognizedLine};
use crate::log::pattern::{HeaderKind, Match, default_patterns};
use crate::log::row::{ProblemSize, RunRecord};
use crate::log::schema::{ColumnRole, Schema, default_roles, phase_label};
use anyhow::Context;
use log::{debug, warn};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io;

/// Everything the parser needs to know about a family of logs.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Header patterns in priority order; the first full match wins.
    pub patterns: Vec<HeaderKind>,
    /// Field name -> role, used when binding column headers.
    pub roles: BTreeMap<String, ColumnRole>,
    pub separator: char,
    pub comment_prefixes: Vec<String>,
    /// Ordered problem-size labels. When None, sizes must be unsigned integers.
    pub size_categories: Option<Vec<String>>,
    /// Context seeded by the caller for logs that carry no header lines.
    pub initial_policy: Option<String>,
    pub initial_threads: Option<u32>,
    /// Problem size for logs that hold a single size and no size column.
    pub initial_size: Option<ProblemSize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            patterns: default_patterns(),
            roles: default_roles(),
            separator: ',',
            comment_prefixes: vec!["#".to_string()],
            size_categories: None,
            initial_policy: None,
            initial_threads: None,
            initial_size: None,
        }
    }
}

/// Classification of one trimmed line.
enum Line<'c> {
    Skip,
    Context {
        policy: Option<String>,
        threads: Option<u32>,
    },
    Columns(&'c str),
    Data,
    Unrecognized,
}

fn classify<'c>(config: &'c ParserConfig, line: &str) -> Line<'c> {
    if line.is_empty()
        || config
            .comment_prefixes
            .iter()
            .any(|p| line.starts_with(p.as_str()))
    {
        return Line::Skip;
    }

    let mut claimed = false;
    for kind in &config.patterns {
        match kind.matches(line) {
            Match::Context { policy, threads } => return Line::Context { policy, threads },
            Match::Columns => return Line::Columns(kind.lead()),
            Match::Claimed => claimed = true,
            Match::NoMatch => {}
        }
    }

    // A line that starts like a header never falls through to data.
    if claimed || !line.contains(config.separator) {
        Line::Unrecognized
    } else {
        Line::Data
    }
}

/// Lazy, single-pass parser over a sequence of log lines.
///
/// Yields one `RunRecord` per value column of every data line, tagged with
/// the thread count and policy in effect when the line was read. After the
/// first error it yields nothing more.
pub struct LogParser<'c, I> {
    lines: I,
    config: &'c ParserConfig,
    lineno: usize,
    policy: Option<String>,
    threads: Option<u32>,
    schema: Schema,
    pending: VecDeque<RunRecord>,
    unrecognized: Vec<UnrecognizedLine>,
    data_lines: usize,
    done: bool,
}

impl<'c, I> LogParser<'c, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I, config: &'c ParserConfig) -> Self {
        LogParser {
            lines,
            config,
            lineno: 0,
            policy: config.initial_policy.clone(),
            threads: config.initial_threads,
            schema: Schema::default_order(),
            pending: VecDeque::new(),
            unrecognized: Vec::new(),
            data_lines: 0,
            done: false,
        }
    }

    /// Lines skipped so far because they matched nothing.
    pub fn unrecognized(&self) -> &[UnrecognizedLine] {
        &self.unrecognized
    }

    /// Data lines accepted so far.
    pub fn data_lines(&self) -> usize {
        self.data_lines
    }

    fn consume(&mut self, raw: &str) -> Result<(), ParseError> {
        let config = self.config;
        let text = raw.trim();

        match classify(config, text) {
            Line::Skip => {}
            Line::Context { policy, threads } => {
                if let Some(policy) = policy {
                    self.policy = Some(policy);
                }
                if let Some(threads) = threads {
                    self.threads = Some(threads);
                }
                debug!(
                    "line {}: context policy={:?} threads={:?}",
                    self.lineno, self.policy, self.threads
                );
            }
            Line::Columns(literal) => {
                self.schema = Schema::bind(literal, config.separator, &config.roles).map_err(
                    |reason| ParseError::InvalidSchema {
                        line: self.lineno,
                        reason,
                    },
                )?;
            }
            Line::Data => {
                let records = self.parse_row(text)?;
                self.data_lines += 1;
                self.pending.extend(records);
            }
            Line::Unrecognized => {
                debug!("line {}: unrecognized: {:?}", self.lineno, text);
                self.unrecognized.push(UnrecognizedLine {
                    line: self.lineno,
                    text: text.to_string(),
                });
            }
        }
        Ok(())
    }

    fn parse_row(&self, text: &str) -> Result<Vec<RunRecord>, ParseError> {
        let line = self.lineno;
        let schema = &self.schema;

        // Context first: a row must never be attributed to a guessed context.
        let context_size = if schema.supplies(ColumnRole::ProblemSize) {
            None
        } else {
            Some(self.config.initial_size.clone().ok_or_else(|| {
                ParseError::IncompleteContext {
                    line,
                    missing: "problem size",
                    text: text.to_string(),
                }
            })?)
        };
        let context_threads = if schema.supplies(ColumnRole::Threads) {
            None
        } else {
            Some(self.threads.ok_or_else(|| ParseError::IncompleteContext {
                line,
                missing: "thread count",
                text: text.to_string(),
            })?)
        };
        let context_policy = if schema.supplies(ColumnRole::Policy) {
            None
        } else {
            Some(self.policy.clone().ok_or_else(|| ParseError::IncompleteContext {
                line,
                missing: "policy",
                text: text.to_string(),
            })?)
        };

        let fields: Vec<&str> = text.split(self.config.separator).map(str::trim).collect();
        if fields.len() != schema.columns.len() {
            return Err(ParseError::invalid(
                line,
                format!("row ({} columns expected)", schema.columns.len()),
                text,
            ));
        }

        let mut size = context_size;
        let mut threads = context_threads;
        let mut policy = context_policy;
        let mut values: Vec<(Option<String>, f64)> = Vec::with_capacity(schema.records_per_row());

        for (column, raw) in schema.columns.iter().zip(fields) {
            match column.role {
                ColumnRole::ProblemSize => size = Some(self.parse_size(&column.name, raw)?),
                ColumnRole::Threads => threads = Some(parse_thread_field(line, &column.name, raw)?),
                ColumnRole::Policy => {
                    if raw.is_empty() {
                        return Err(ParseError::invalid(line, &column.name, raw));
                    }
                    policy = Some(raw.to_string());
                }
                ColumnRole::Value => values.push((None, parse_value(line, &column.name, raw)?)),
                ColumnRole::Phase => values.push((
                    Some(phase_label(&column.name).to_string()),
                    parse_value(line, &column.name, raw)?,
                )),
                ColumnRole::Ignore => {}
            }
        }

        let size = size.ok_or_else(|| ParseError::invalid(line, "problem_size", ""))?;
        let threads = threads.ok_or_else(|| ParseError::invalid(line, "threads", ""))?;
        let policy = policy.ok_or_else(|| ParseError::invalid(line, "policy", ""))?;

        Ok(values
            .into_iter()
            .map(|(phase, metric_value)| RunRecord {
                problem_size: size.clone(),
                thread_count: threads,
                policy: policy.clone(),
                metric_value,
                phase,
                line,
            })
            .collect())
    }

    fn parse_size(&self, field: &str, raw: &str) -> Result<ProblemSize, ParseError> {
        ProblemSize::parse(raw, self.config.size_categories.as_deref())
            .ok_or_else(|| ParseError::invalid(self.lineno, field, raw))
    }
}

impl<'c, I> Iterator for LogParser<'c, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<RunRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }

            let Some(next) = self.lines.next() else {
                self.done = true;
                return None;
            };
            self.lineno += 1;

            let result = match next {
                Ok(text) => self.consume(&text),
                Err(source) => Err(ParseError::Io {
                    line: self.lineno,
                    source,
                }),
            };
            if let Err(err) = result {
                self.done = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

fn parse_unsigned(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_thread_field(line: usize, field: &str, raw: &str) -> Result<u32, ParseError> {
    parse_unsigned(raw)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| ParseError::invalid(line, field, raw))
}

fn parse_value(line: usize, field: &str, raw: &str) -> Result<f64, ParseError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ParseError::invalid(line, field, raw)),
    }
}

/// A fully parsed log.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub records: Vec<RunRecord>,
    pub unrecognized: Vec<UnrecognizedLine>,
    pub data_lines: usize,
}

/// Drive a parser to completion. On error nothing parsed so far is returned.
pub fn parse_lines<I>(lines: I, config: &ParserConfig) -> Result<ParsedLog, ParseError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut parser = LogParser::new(lines.into_iter(), config);
    let mut records = Vec::new();
    for record in parser.by_ref() {
        records.push(record?);
    }
    Ok(ParsedLog {
        records,
        unrecognized: parser.unrecognized,
        data_lines: parser.data_lines,
    })
}

pub fn parse_str(text: &str, config: &ParserConfig) -> Result<ParsedLog, ParseError> {
    parse_lines(text.lines().map(|l| Ok(l.to_string())), config)
}

/// Parse a benchmark log file. Invalid UTF-8 is decoded lossily.
pub fn parse_log_file(path: &str, config: &ParserConfig) -> anyhow::Result<ParsedLog> {
    let bytes = fs::read(path).with_context(|| format!("read log file {}", path))?;
    let text = String::from_utf8_lossy(&bytes);

    let parsed = parse_str(&text, config).with_context(|| format!("log parse error in {}", path))?;

    if !parsed.unrecognized.is_empty() {
        warn!(
            "{}: skipped {} unrecognized line(s), first at line {}",
            path,
            parsed.unrecognized.len(),
            parsed.unrecognized[0].line
        );
    }
    debug!(
        "{}: {} data line(s), {} record(s)",
        path,
        parsed.data_lines,
        parsed.records.len()
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<ParsedLog, ParseError> {
        parse_str(text, &ParserConfig::default())
    }

    fn summary(log: &ParsedLog) -> Vec<(String, u32, String, f64)> {
        log.records
            .iter()
            .map(|r| {
                (
                    r.problem_size.to_string(),
                    r.thread_count,
                    r.policy.clone(),
                    r.metric_value,
                )
            })
            .collect()
    }

    #[test]
    fn schedule_block_yields_records() {
        let log = parse("Schedule: static (threads: 2)\nchunk_size,average_time\n16,0.50\n32,0.30\n")
            .unwrap();
        assert_eq!(
            log.records,
            vec![
                RunRecord {
                    problem_size: ProblemSize::Count(16),
                    thread_count: 2,
                    policy: "static".to_string(),
                    metric_value: 0.50,
                    phase: None,
                    line: 3,
                },
                RunRecord {
                    problem_size: ProblemSize::Count(32),
                    thread_count: 2,
                    policy: "static".to_string(),
                    metric_value: 0.30,
                    phase: None,
                    line: 4,
                },
            ]
        );
        assert_eq!(log.data_lines, 2);
        assert!(log.unrecognized.is_empty());
    }

    #[test]
    fn data_before_header_is_incomplete_context() {
        let err = parse("16,0.50\nSchedule: static (threads: 2)\n32,0.30\n").unwrap_err();
        match err {
            ParseError::IncompleteContext { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn policy_without_threads_is_incomplete_context() {
        let err = parse("Schedule: dynamic\n16,0.5\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::IncompleteContext {
                missing: "thread count",
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn thread_marker_without_policy_is_incomplete_context() {
        let err = parse("Number of threads: 4\narray_size,average_time\n1024,0.1\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::IncompleteContext {
                missing: "policy",
                line: 3,
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_value_names_line_and_field() {
        let err = parse("Schedule: static (threads: 2)\nchunk_size,average_time\n16,fast\n").unwrap_err();
        match err {
            ParseError::InvalidFieldFormat { line, field, value } => {
                assert_eq!(line, 3);
                assert_eq!(field, "average_time");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_and_non_finite_values() {
        for bad in ["-1.0", "inf", "NaN"] {
            let text = format!("Schedule: static (threads: 2)\n16,{}\n", bad);
            assert!(matches!(
                parse(&text),
                Err(ParseError::InvalidFieldFormat { .. })
            ));
        }
    }

    #[test]
    fn rejects_fractional_problem_size() {
        let err = parse("Schedule: static (threads: 2)\n16.5,0.2\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFieldFormat { ref field, .. } if field == "problem_size"));
    }

    #[test]
    fn rejects_wrong_row_width() {
        let err = parse("Schedule: static (threads: 2)\n16,0.2,7\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFieldFormat { line: 2, .. }));
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let log = parse("\n# run 1\nSchedule: static (threads: 1)\n\n   \n16,1.0\n").unwrap();
        assert_eq!(log.records.len(), 1);
        assert!(log.unrecognized.is_empty());
    }

    #[test]
    fn unrecognized_lines_are_counted_not_fatal() {
        let log = parse(
            "Compiling benchmark\nSchedule: static (threads: 2)\nsome noise here\n16,0.5\nSchedule: static (threads: many)\n",
        )
        .unwrap();
        assert_eq!(log.records.len(), 1);
        let lines: Vec<usize> = log.unrecognized.iter().map(|u| u.line).collect();
        assert_eq!(lines, vec![1, 3, 5]);
    }

    #[test]
    fn malformed_header_with_separator_fails_closed() {
        // Starts like a header, so it must never be read as a data row.
        let log = parse("Schedule: static (threads: 2)\nSchedule: a,b (threads: 3)\n16,0.5\n").unwrap();
        assert_eq!(log.unrecognized.len(), 1);
        assert_eq!(summary(&log), vec![("16".to_string(), 2, "static".to_string(), 0.5)]);
    }

    #[test]
    fn later_headers_do_not_back_patch() {
        let log = parse(
            "Schedule: static (threads: 2)\n16,0.5\nSchedule: dynamic (threads: 4)\nSchedule: guided (threads: 8)\n16,0.2\n",
        )
        .unwrap();
        assert_eq!(
            summary(&log),
            vec![
                ("16".to_string(), 2, "static".to_string(), 0.5),
                ("16".to_string(), 8, "guided".to_string(), 0.2),
            ]
        );
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let log = parse("Schedule: static (threads: 2)\n16,0.5\n16,0.7\n").unwrap();
        assert_eq!(log.records.len(), 2);
    }

    #[test]
    fn synchronous_and_schedule_blocks() {
        let text = "Synchronous (threads: 1)\nchunk_size,average_time\n16,2.0\n\
                    Schedule: static (threads: 4)\nchunk_size,average_time\n16,0.6\n";
        let log = parse(text).unwrap();
        assert_eq!(
            summary(&log),
            vec![
                ("16".to_string(), 1, "synchronous".to_string(), 2.0),
                ("16".to_string(), 4, "static".to_string(), 0.6),
            ]
        );
    }

    #[test]
    fn thread_marker_and_policy_only_headers() {
        let text = "Running with 1 threads\nSchedule: static\n16,1.0\n32,1.5\n\
                    Running with 2 threads\n16,0.6\n";
        let log = parse(text).unwrap();
        assert_eq!(
            summary(&log),
            vec![
                ("16".to_string(), 1, "static".to_string(), 1.0),
                ("32".to_string(), 1, "static".to_string(), 1.5),
                ("16".to_string(), 2, "static".to_string(), 0.6),
            ]
        );
    }

    #[test]
    fn caller_seeded_policy_with_thread_markers() {
        let config = ParserConfig {
            initial_policy: Some("static".to_string()),
            ..ParserConfig::default()
        };
        let text = "Number of threads: 1\narray_size,average_time\n1024,0.4\nNumber of threads: 2\n1024,0.25\n";
        let log = parse_str(text, &config).unwrap();
        assert_eq!(
            summary(&log),
            vec![
                ("1024".to_string(), 1, "static".to_string(), 0.4),
                ("1024".to_string(), 2, "static".to_string(), 0.25),
            ]
        );
    }

    #[test]
    fn columns_supply_policy_and_categorical_sizes() {
        let config = ParserConfig {
            size_categories: Some(vec!["1G".to_string(), "5G".to_string(), "10G".to_string()]),
            initial_threads: Some(1),
            ..ParserConfig::default()
        };
        let text = "dataSize,confId,time\n1G,seq_strong,10.0\n10G,hadoop_strong,4.0\n";
        let log = parse_str(text, &config).unwrap();
        assert_eq!(
            log.records[1].problem_size,
            ProblemSize::Category {
                rank: 2,
                label: "10G".to_string()
            }
        );
        assert_eq!(log.records[0].policy, "seq_strong");

        let err = parse_str("dataSize,confId,time\n2G,seq,1.0\n", &config).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFieldFormat { ref value, .. } if value == "2G"));
    }

    #[test]
    fn phase_columns_emit_one_record_per_phase() {
        let text = "array_size,num_threads,num_buckets,initial_bucket_capacity,random_time,distribute_time,sort_time,rewrite_time,total_time\n\
                    1000000,4,64,1024,0.1,0.2,0.3,0.05,0.65\n";
        let log = parse(text).unwrap();
        assert_eq!(log.data_lines, 1);
        let phases: Vec<(&str, u32, &str)> = log
            .records
            .iter()
            .map(|r| (r.phase.as_deref().unwrap_or(""), r.thread_count, r.policy.as_str()))
            .collect();
        assert_eq!(
            phases,
            vec![
                ("random", 4, "64"),
                ("distribute", 4, "64"),
                ("sort", 4, "64"),
                ("rewrite", 4, "64"),
                ("total", 4, "64"),
            ]
        );
    }

    #[test]
    fn empty_context_block_is_valid() {
        let log = parse("Schedule: static (threads: 2)\nchunk_size,average_time\nSchedule: dynamic (threads: 2)\n16,0.5\n")
            .unwrap();
        assert_eq!(summary(&log), vec![("16".to_string(), 2, "dynamic".to_string(), 0.5)]);
    }

    #[test]
    fn parser_stops_after_first_error() {
        let config = ParserConfig::default();
        let lines = "Schedule: static (threads: 2)\n16,0.5\n16,x\n32,0.1\n"
            .lines()
            .map(|l| Ok(l.to_string()));
        let mut parser = LogParser::new(lines, &config);
        assert!(parser.next().unwrap().is_ok());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
        assert!(parser.next().is_none());
    }

    #[test]
    fn io_error_is_fatal() {
        let config = ParserConfig::default();
        let lines = vec![
            Ok("Schedule: static (threads: 2)".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad bytes")),
        ];
        let err = parse_lines(lines, &config).unwrap_err();
        assert!(matches!(err, ParseError::Io { line: 2, .. }));
    }

    #[test]
    fn claimed_line_still_matches_a_later_pattern() {
        let config = ParserConfig {
            patterns: vec![
                HeaderKind::PolicyOnly {
                    keyword: "Schedule".to_string(),
                },
                HeaderKind::PolicyWithThreads {
                    keyword: "Schedule".to_string(),
                },
            ],
            ..ParserConfig::default()
        };
        let log = parse_str("Schedule: static (threads: 2)\n16,0.5\n", &config).unwrap();
        assert!(log.unrecognized.is_empty());
        assert_eq!(summary(&log), vec![("16".to_string(), 2, "static".to_string(), 0.5)]);
    }

    #[test]
    fn first_full_match_wins() {
        let config = ParserConfig {
            patterns: vec![
                HeaderKind::ThreadMarker {
                    prefix: "Schedule:".to_string(),
                    suffix: None,
                },
                HeaderKind::PolicyOnly {
                    keyword: "Schedule".to_string(),
                },
            ],
            initial_policy: Some("static".to_string()),
            ..ParserConfig::default()
        };
        let log = parse_str("Schedule: 7\n16,0.5\n", &config).unwrap();
        assert_eq!(summary(&log), vec![("16".to_string(), 7, "static".to_string(), 0.5)]);
    }

    #[test]
    fn processor_table_takes_size_from_caller() {
        let config = ParserConfig {
            initial_policy: Some("mpi_strong".to_string()),
            initial_size: Some(ProblemSize::Count(1000)),
            ..ParserConfig::default()
        };
        let log = parse_str("Processors,Time (s)
1,8.0
2,5.0
4,3.5
", &config).unwrap();
        assert_eq!(
            summary(&log),
            vec![
                ("1000".to_string(), 1, "mpi_strong".to_string(), 8.0),
                ("1000".to_string(), 2, "mpi_strong".to_string(), 5.0),
                ("1000".to_string(), 4, "mpi_strong".to_string(), 3.5),
            ]
        );
    }

    #[test]
    fn processor_table_without_size_is_incomplete_context() {
        let config = ParserConfig {
            initial_policy: Some("mpi_strong".to_string()),
            ..ParserConfig::default()
        };
        let err = parse_str("Processors,Time (s)
1,10.0
2,5.0
", &config).unwrap_err();
        assert!(matches!(
            err,
            ParseError::IncompleteContext {
                missing: "problem size",
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn unsuffixed_running_line_is_not_a_thread_header() {
        let log = parse("Running with 4 bananas
Schedule: static (threads: 2)
16,0.5
").unwrap();
        assert_eq!(log.unrecognized.len(), 1);
        assert_eq!(log.unrecognized[0].line, 1);
        assert_eq!(summary(&log), vec![("16".to_string(), 2, "static".to_string(), 0.5)]);
    }
}
