//! CSV output format for profiling reports
//!
//! One row per aggregate, durations in plain microseconds (no separators).

use crate::aggregate::Aggregate;

/// CSV record for one aggregated interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvInterval {
    pub start_file: String,
    pub start_line: u32,
    pub end_file: String,
    pub end_line: u32,
    pub count: u64,
    pub average_us: i64,
    pub total_us: i64,
}

impl From<&Aggregate> for CsvInterval {
    fn from(agg: &Aggregate) -> Self {
        Self {
            start_file: agg.start().file.clone(),
            start_line: agg.start().line,
            end_file: agg.end().file.clone(),
            end_line: agg.end().line,
            count: agg.count(),
            average_us: agg.average_duration_us(),
            total_us: agg.total_duration_us(),
        }
    }
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<CsvInterval>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter holding `ranked` in order
    pub fn from_ranked(ranked: &[Aggregate]) -> Self {
        Self {
            rows: ranked.iter().map(CsvInterval::from).collect(),
        }
    }

    pub fn add_interval(&mut self, row: CsvInterval) {
        self.rows.push(row);
    }

    fn header() -> &'static str {
        "start_file,start_line,end_file,end_line,count,average_us,total_us"
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &CsvInterval) -> String {
        [
            Self::escape_field(&row.start_file),
            row.start_line.to_string(),
            Self::escape_field(&row.end_file),
            row.end_line.to_string(),
            row.count.to_string(),
            row.average_us.to_string(),
            row.total_us.to_string(),
        ]
        .join(",")
    }

    /// Header plus one line per row
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(Self::header());
        output.push('\n');

        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }

        output
    }
}
