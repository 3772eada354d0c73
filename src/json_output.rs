//! JSON output format for profiling reports

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

/// Source location of one end of an interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

/// One aggregated interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonAggregate {
    /// FNV-1a fingerprint of the interval identity, as hex
    pub id: String,
    pub start: JsonSourceLocation,
    pub end: JsonSourceLocation,
    pub count: u64,
    pub average_duration_us: i64,
    pub total_duration_us: i64,
}

/// Ranked aggregates plus totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub intervals: Vec<JsonAggregate>,
    pub summary: JsonSummary,
}

/// Totals over every aggregate of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub identities: usize,
    pub total_count: u64,
    pub total_duration_us: i64,
}

fn location(loc: &crate::checkpoint::Location) -> JsonSourceLocation {
    JsonSourceLocation {
        file: loc.file.clone(),
        line: loc.line,
        function: (!loc.function.is_empty()).then(|| loc.function.clone()),
    }
}

impl JsonReport {
    /// Build the report, keeping the order of `ranked`
    pub fn from_ranked(ranked: &[Aggregate]) -> Self {
        let intervals: Vec<JsonAggregate> = ranked
            .iter()
            .map(|agg| JsonAggregate {
                id: format!("{:016x}", agg.fingerprint()),
                start: location(agg.start()),
                end: location(agg.end()),
                count: agg.count(),
                average_duration_us: agg.average_duration_us(),
                total_duration_us: agg.total_duration_us(),
            })
            .collect();

        let summary = JsonSummary {
            identities: intervals.len(),
            total_count: intervals.iter().map(|i| i.count).sum(),
            total_duration_us: intervals
                .iter()
                .fold(0i64, |acc, i| acc.saturating_add(i.total_duration_us)),
        };

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            intervals,
            summary,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
