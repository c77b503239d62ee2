//! Header-line patterns.
//!
//! Every recognized header shape is one `HeaderKind` variant. A parser holds
//! an ordered list of them; the first variant that fully matches a line
//! wins. Matching is by literal prefix and fixed punctuation only.
//!
//! Examples:
//! Schedule: static (threads: 2)      PolicyWithThreads { keyword: "Schedule" }
//! Synchronous (threads: 1)           NamedWithThreads { keyword: "Synchronous", policy: "synchronous" }
//! Number of threads: 4               ThreadMarker { prefix: "Number of threads:", suffix: None }
//! Running with 4 threads             ThreadMarker { prefix: "Running with", suffix: Some("threads") }
//! Schedule: dynamic                  PolicyOnly { keyword: "Schedule" }
//! chunk_size,average_time            ColumnHeader { literal: "chunk_size,average_time" }

use serde::Deserialize;

const THREADS_TAG: &str = "(threads:";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeaderKind {
    /// `<keyword>: <policy> (threads: <n>)`
    PolicyWithThreads { keyword: String },
    /// `<keyword> (threads: <n>)`, which implies a fixed policy label.
    NamedWithThreads { keyword: String, policy: String },
    /// `<prefix> <n> [<suffix>]`, which sets only the thread count. Nothing
    /// but the suffix may follow the count.
    ThreadMarker {
        prefix: String,
        #[serde(default)]
        suffix: Option<String>,
    },
    /// `<keyword>: <policy>`, which sets only the policy.
    PolicyOnly { keyword: String },
    /// A literal field-name listing that declares the data schema.
    ColumnHeader { literal: String },
}

/// Outcome of testing one pattern against one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// The line is a configuration change.
    Context {
        policy: Option<String>,
        threads: Option<u32>,
    },
    /// The line is the given column-header literal.
    Columns,
    /// The line starts like this pattern but does not complete it.
    Claimed,
    NoMatch,
}

impl HeaderKind {
    /// The literal prefix that makes a line belong to this pattern.
    pub fn lead(&self) -> &str {
        match self {
            HeaderKind::PolicyWithThreads { keyword }
            | HeaderKind::NamedWithThreads { keyword, .. }
            | HeaderKind::PolicyOnly { keyword } => keyword,
            HeaderKind::ThreadMarker { prefix, .. } => prefix,
            HeaderKind::ColumnHeader { literal } => literal,
        }
    }

    /// Test a trimmed line against this pattern.
    pub fn matches(&self, line: &str) -> Match {
        match self {
            HeaderKind::PolicyWithThreads { keyword } => {
                let Some(body) = after_keyword_colon(line, keyword) else {
                    return Match::NoMatch;
                };
                // Without the thread suffix the line may still be a policy-only header.
                if !body.contains(THREADS_TAG) {
                    return Match::NoMatch;
                }
                match split_threads_suffix(body) {
                    Some((policy, threads)) if is_single_token(policy) => Match::Context {
                        policy: Some(policy.to_string()),
                        threads: Some(threads),
                    },
                    _ => Match::Claimed,
                }
            }
            HeaderKind::NamedWithThreads { keyword, policy } => {
                let Some(body) = line.strip_prefix(keyword.as_str()) else {
                    return Match::NoMatch;
                };
                if !body.starts_with(char::is_whitespace) {
                    return Match::NoMatch;
                }
                match split_threads_suffix(body) {
                    Some(("", threads)) => Match::Context {
                        policy: Some(policy.clone()),
                        threads: Some(threads),
                    },
                    _ => Match::Claimed,
                }
            }
            HeaderKind::ThreadMarker { prefix, suffix } => {
                let Some(body) = line.strip_prefix(prefix.as_str()) else {
                    return Match::NoMatch;
                };
                let body = body.trim_start();
                let (count, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
                let rest = rest.trim();
                let tail_ok = match suffix {
                    Some(suffix) => rest == suffix.trim(),
                    None => rest.is_empty(),
                };
                match parse_threads(count).filter(|_| tail_ok) {
                    Some(threads) => Match::Context {
                        policy: None,
                        threads: Some(threads),
                    },
                    None => Match::Claimed,
                }
            }
            HeaderKind::PolicyOnly { keyword } => {
                let Some(body) = after_keyword_colon(line, keyword) else {
                    return Match::NoMatch;
                };
                let policy = body.trim();
                if is_single_token(policy) {
                    Match::Context {
                        policy: Some(policy.to_string()),
                        threads: None,
                    }
                } else {
                    Match::Claimed
                }
            }
            HeaderKind::ColumnHeader { literal } => {
                if line == literal {
                    Match::Columns
                } else {
                    Match::NoMatch
                }
            }
        }
    }
}

/// Header patterns covering every log shape the benchmark drivers print,
/// in priority order.
pub fn default_patterns() -> Vec<HeaderKind> {
    let mut out = vec![
        HeaderKind::PolicyWithThreads {
            keyword: "Schedule".to_string(),
        },
        HeaderKind::NamedWithThreads {
            keyword: "Synchronous".to_string(),
            policy: "synchronous".to_string(),
        },
        HeaderKind::NamedWithThreads {
            keyword: "synchronous".to_string(),
            policy: "synchronous".to_string(),
        },
        HeaderKind::ThreadMarker {
            prefix: "Number of threads:".to_string(),
            suffix: None,
        },
        HeaderKind::ThreadMarker {
            prefix: "Running with".to_string(),
            suffix: Some("threads".to_string()),
        },
        HeaderKind::PolicyOnly {
            keyword: "Schedule".to_string(),
        },
    ];
    for literal in [
        "chunk_size,average_time",
        "array_size,average_time",
        "dataSize,confId,time",
        "Processors,Time (s)",
        "array_size,num_threads,num_buckets,initial_bucket_capacity,random_time,distribute_time,sort_time,rewrite_time,total_time",
    ] {
        out.push(HeaderKind::ColumnHeader {
            literal: literal.to_string(),
        });
    }
    out
}

/// Body after `<keyword>:`, or None when the line does not start that way.
fn after_keyword_colon<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)?.strip_prefix(':')
}

/// Split `<label> (threads: <n>)` into the trimmed label and the count.
fn split_threads_suffix(body: &str) -> Option<(&str, u32)> {
    let inner = body.trim_end().strip_suffix(')')?;
    let (label, count) = inner.rsplit_once(THREADS_TAG)?;
    Some((label.trim(), parse_threads(count.trim())?))
}

fn parse_threads(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|n| *n > 0)
}

fn is_single_token(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace) && !s.contains(['(', ')', ','])
}
