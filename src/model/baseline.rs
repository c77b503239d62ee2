use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Which policy's run supplies the baseline time for a group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum BaselinePolicy {
    /// The group's own policy at the baseline thread count.
    SamePolicy,
    /// One named reference policy for every group (e.g. "synchronous").
    Fixed(String),
}

impl BaselinePolicy {
    /// Baseline policy for a group running `policy`.
    pub fn resolve<'a>(&'a self, policy: &'a str) -> &'a str {
        match self {
            BaselinePolicy::SamePolicy => policy,
            BaselinePolicy::Fixed(name) => name,
        }
    }
}

impl FromStr for BaselinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "same-policy" {
            return Ok(BaselinePolicy::SamePolicy);
        }
        match s.strip_prefix("fixed-policy:").map(str::trim) {
            Some(name) if !name.is_empty() => Ok(BaselinePolicy::Fixed(name.to_string())),
            Some(_) => Err("fixed-policy needs a policy name".to_string()),
            None => Err(format!(
                "unknown baseline rule {:?} (expected \"same-policy\" or \"fixed-policy:<name>\")",
                s
            )),
        }
    }
}

impl TryFrom<String> for BaselinePolicy {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselinePolicy::SamePolicy => f.write_str("same-policy"),
            BaselinePolicy::Fixed(name) => write!(f, "fixed-policy:{}", name),
        }
    }
}

/// Reducer applied to repeated trials of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeriveConfig {
    pub baseline_threads: u32,
    pub baseline_policy: BaselinePolicy,
    pub aggregation: Aggregation,
    /// Report the Amdahl serial fraction (strong-scaling runs).
    pub serial_fraction: bool,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        DeriveConfig {
            baseline_threads: 1,
            baseline_policy: BaselinePolicy::SamePolicy,
            aggregation: Aggregation::Mean,
            serial_fraction: true,
        }
    }
}
