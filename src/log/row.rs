use serde::Serialize;
use std::fmt;

/// Problem size of a run: either an unsigned count (chunk size, array
/// length, message size) or a label from an ordered category list
/// (e.g. "1G" < "5G" < "10G").
///
/// Ordering follows the numeric value, or the category rank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProblemSize {
    Count(u64),
    Category { rank: usize, label: String },
}

impl ProblemSize {
    /// Parse a size field. With categories the text must be one of them;
    /// otherwise it must be an unsigned integer made of digits only.
    pub fn parse(raw: &str, categories: Option<&[String]>) -> Option<Self> {
        match categories {
            Some(categories) => categories
                .iter()
                .position(|c| c == raw)
                .map(|rank| ProblemSize::Category {
                    rank,
                    label: raw.to_string(),
                }),
            None => {
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                raw.parse().ok().map(ProblemSize::Count)
            }
        }
    }
}

impl fmt::Display for ProblemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemSize::Count(n) => write!(f, "{}", n),
            ProblemSize::Category { label, .. } => f.write_str(label),
        }
    }
}

impl Serialize for ProblemSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProblemSize::Count(n) => serializer.serialize_u64(*n),
            ProblemSize::Category { label, .. } => serializer.serialize_str(label),
        }
    }
}

/// One observed measurement, as emitted by the log parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub problem_size: ProblemSize,
    pub thread_count: u32,
    pub policy: String,
    pub metric_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// 1-based line the record was read from.
    #[serde(skip)]
    pub line: usize,
}
