//! Analysis configuration (config.json).
//!
//! Every field is optional; an empty object reproduces the built-in
//! behaviour. JSON shape:
//! {
//!   "patterns": [                          // header patterns, priority order
//!     {"kind": "policy_with_threads", "keyword": "Schedule"},
//!     {"kind": "column_header", "literal": "chunk_size,average_time"}
//!   ],
//!   "columns": {"confId": "policy"},       // merged over the default roles
//!   "separator": ",",
//!   "comment_prefixes": ["#"],
//!   "size_categories": ["1G", "5G", "10G"],
//!   "initial_policy": "static",
//!   "initial_threads": 1,
//!   "initial_size": 1000,                  // or a size category label
//!   "baseline": "fixed-policy:seq_strong",
//!   "baseline_threads": 1,
//!   "serial_fraction": true,
//!   "policy_order": ["static", "dynamic"],
//!   "output": {"speedup": "Speedup"}
//! }

use crate::Result;
use crate::log::schema::{ColumnRole, Schema, default_roles};
use crate::log::{HeaderKind, ParserConfig, ProblemSize};
use crate::model::{Aggregation, BaselinePolicy, DeriveConfig};
use crate::render::OutputColumns;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub patterns: Option<Vec<HeaderKind>>,
    pub columns: BTreeMap<String, ColumnRole>,
    pub separator: Option<char>,
    pub comment_prefixes: Option<Vec<String>>,
    pub size_categories: Option<Vec<String>>,
    pub initial_policy: Option<String>,
    pub initial_threads: Option<u32>,
    pub initial_size: Option<SizeSpec>,
    pub baseline: Option<BaselinePolicy>,
    pub baseline_threads: Option<u32>,
    pub aggregation: Aggregation,
    pub serial_fraction: Option<bool>,
    pub policy_order: Vec<String>,
    pub output: OutputColumns,
}

/// A problem size as written in JSON: a count or a category label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Count(u64),
    Label(String),
}

impl SizeSpec {
    pub fn resolve(&self, categories: Option<&[String]>) -> Result<ProblemSize> {
        let raw = match self {
            SizeSpec::Count(n) => n.to_string(),
            SizeSpec::Label(label) => label.trim().to_string(),
        };
        match ProblemSize::parse(&raw, categories) {
            Some(size) => Ok(size),
            None if categories.is_some() => bail!("problem size {:?} is not a size category", raw),
            None => bail!("problem size {:?} is not an unsigned integer", raw),
        }
    }
}

/// Checked configuration, split per consumer.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub parser: ParserConfig,
    pub derive: DeriveConfig,
    pub policy_order: Vec<String>,
    pub output: OutputColumns,
}

impl AnalysisConfig {
    pub fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path))
    }

    /// Normalize and check every field, then build the parser and deriver
    /// configurations.
    pub fn validate_and_build(&self) -> Result<ValidatedConfig> {
        let defaults = ParserConfig::default();

        // Phase 1: patterns. Trim keys and reject empty or duplicate ones.
        let mut patterns = Vec::new();
        let mut literals: BTreeSet<String> = BTreeSet::new();
        for kind in self.patterns.as_ref().unwrap_or(&defaults.patterns) {
            let kind = normalize_pattern(kind)?;
            if let HeaderKind::ColumnHeader { literal } = &kind {
                if !literals.insert(literal.clone()) {
                    bail!("duplicate column header pattern: {:?}", literal);
                }
            }
            patterns.push(kind);
        }
        if patterns.is_empty() {
            bail!("config must keep at least one header pattern");
        }

        // Phase 2: separator and column roles.
        let separator = self.separator.unwrap_or(defaults.separator);
        if separator == ' ' || separator == '\n' || separator == '\r' {
            bail!("separator {:?} cannot be used", separator);
        }

        let mut roles = default_roles();
        roles.extend(
            self.columns
                .iter()
                .map(|(name, role)| (name.trim().to_string(), *role)),
        );

        // Every declared column header must bind to a usable schema.
        for literal in &literals {
            Schema::bind(literal, separator, &roles)
                .map_err(anyhow::Error::msg)
                .context("invalid column header pattern")?;
        }

        // Phase 3: problem sizes and seeded context.
        let size_categories = match &self.size_categories {
            Some(categories) => Some(unique_labels("size_categories", categories)?),
            None => None,
        };

        let initial_policy = match self.initial_policy.as_deref().map(str::trim) {
            Some("") => bail!("initial_policy cannot be empty"),
            other => other.map(str::to_string),
        };
        if self.initial_threads == Some(0) {
            bail!("initial_threads must be positive");
        }
        let initial_size = match &self.initial_size {
            Some(spec) => Some(
                spec.resolve(size_categories.as_deref())
                    .context("invalid initial_size")?,
            ),
            None => None,
        };

        // Phase 4: derivation.
        let derive_defaults = DeriveConfig::default();
        let baseline_threads = self.baseline_threads.unwrap_or(derive_defaults.baseline_threads);
        if baseline_threads == 0 {
            bail!("baseline_threads must be positive");
        }

        let policy_order = unique_labels("policy_order", &self.policy_order)?;

        Ok(ValidatedConfig {
            parser: ParserConfig {
                patterns,
                roles,
                separator,
                comment_prefixes: self
                    .comment_prefixes
                    .clone()
                    .unwrap_or(defaults.comment_prefixes)
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .collect(),
                size_categories,
                initial_policy,
                initial_threads: self.initial_threads,
                initial_size,
            },
            derive: DeriveConfig {
                baseline_threads,
                baseline_policy: self
                    .baseline
                    .clone()
                    .unwrap_or(derive_defaults.baseline_policy),
                aggregation: self.aggregation,
                serial_fraction: self.serial_fraction.unwrap_or(derive_defaults.serial_fraction),
            },
            policy_order,
            output: self.output.clone(),
        })
    }
}

fn normalize_pattern(kind: &HeaderKind) -> Result<HeaderKind> {
    let non_empty = |what: &str, s: &str| -> Result<String> {
        let s = s.trim();
        if s.is_empty() {
            bail!("header pattern has an empty {}", what);
        }
        Ok(s.to_string())
    };

    Ok(match kind {
        HeaderKind::PolicyWithThreads { keyword } => HeaderKind::PolicyWithThreads {
            keyword: non_empty("keyword", keyword)?,
        },
        HeaderKind::NamedWithThreads { keyword, policy } => HeaderKind::NamedWithThreads {
            keyword: non_empty("keyword", keyword)?,
            policy: non_empty("policy", policy)?,
        },
        HeaderKind::ThreadMarker { prefix, suffix } => HeaderKind::ThreadMarker {
            prefix: non_empty("prefix", prefix)?,
            suffix: match suffix {
                Some(suffix) => Some(non_empty("suffix", suffix)?),
                None => None,
            },
        },
        HeaderKind::PolicyOnly { keyword } => HeaderKind::PolicyOnly {
            keyword: non_empty("keyword", keyword)?,
        },
        HeaderKind::ColumnHeader { literal } => HeaderKind::ColumnHeader {
            literal: non_empty("literal", literal)?,
        },
    })
}

fn unique_labels(field: &str, labels: &[String]) -> Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            bail!("{} contains an empty entry", field);
        }
        if !seen.insert(label) {
            bail!("{} lists {:?} more than once", field, label);
        }
        out.push(label.to_string());
    }
    Ok(out)
}
