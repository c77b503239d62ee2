use crate::log::{ThroughputLog, ThroughputRow};
use serde::Serialize;

/// Render any record set as pretty-printed JSON.
///
/// Missing metrics serialize as `null` and undefined ones as the string
/// `"undefined"`, so no NaN or infinity ever reaches the output.
pub fn render_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(data)?;
    json.push('\n');
    Ok(json)
}

/// JSON shape of a throughput log.
#[derive(Debug, Serialize)]
pub struct ThroughputReport<'a> {
    pub delay_ms: Option<f64>,
    pub rows: &'a [ThroughputRow],
}

impl<'a> From<&'a ThroughputLog> for ThroughputReport<'a> {
    fn from(log: &'a ThroughputLog) -> Self {
        ThroughputReport {
            delay_ms: log.delay_ms,
            rows: &log.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{ProblemSize, RunRecord};
    use pretty_assertions::assert_eq;

    #[test]
    fn records_render_without_line_numbers() {
        let records = vec![RunRecord {
            problem_size: ProblemSize::Category {
                rank: 1,
                label: "5G".to_string(),
            },
            thread_count: 1,
            policy: "hadoop_weak".to_string(),
            metric_value: 12.5,
            phase: None,
            line: 7,
        }];
        let json = render_json(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "problem_size": "5G",
                "thread_count": 1,
                "policy": "hadoop_weak",
                "metric_value": 12.5
            }])
        );
    }

    #[test]
    fn throughput_report_shape() {
        let log = ThroughputLog {
            delay_ms: Some(0.5),
            rows: vec![ThroughputRow {
                size: 8,
                standard: Some(1.0),
                buffered: None,
            }],
            unrecognized: vec![],
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&ThroughputReport::from(&log)).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "delay_ms": 0.5,
                "rows": [{"size": 8, "standard": 1.0, "buffered": null}]
            })
        );
    }
}
