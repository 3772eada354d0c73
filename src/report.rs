//! Ranking and the fixed-width text report
//!
//! The table layout is stable so that tools scraping the console or log files
//! keep working:
//!
//! ```text
//! ##########################################################################################
//! ################################# PROFILING WITH LAPSTAT #################################
//! ##########################################################################################
//! File                          |  Line   |  Hits   |       Average [us]|         Total [us]
//! ==========================================================================================
//! main.rs                       |       18|         |                   |
//!                               |       24|      200|              1,304|            260,800
//! ------------------------------------------------------------------------------------------
//! ```
//!
//! Every aggregate takes two rows: where the interval started, then where it
//! ended together with its statistics. The end file is left blank when it is
//! the same as the start file. File names longer than the column are cut from
//! the front and marked with `~`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::csv_output::CsvOutput;
use crate::json_output::JsonReport;

/// Total width of every line of the table
pub const LINE_WIDTH: usize = 90;
const FILE_WIDTH: usize = 30;
const LINE_NUMBER_WIDTH: usize = 10;
const COUNT_WIDTH: usize = 10;
const DURATION_WIDTH: usize = 20;

const TITLE: &str = " PROFILING WITH LAPSTAT ";

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Fixed-width table (default)
    #[default]
    Text,
    /// JSON document for machine parsing
    Json,
    /// CSV for spreadsheet analysis
    Csv,
}

/// Sort by total duration, most expensive first
///
/// Stable: aggregates with equal totals keep their relative input order.
pub fn rank(aggregates: &[Aggregate]) -> Vec<Aggregate> {
    let mut ranked = aggregates.to_vec();
    ranked.sort_by(|a, b| b.total_duration_us().cmp(&a.total_duration_us()));
    ranked
}

/// Render ranked aggregates as the text table
pub fn render(ranked: &[Aggregate]) -> String {
    let mut out = String::new();
    push_title(&mut out);
    push_header(&mut out);

    for (i, aggregate) in ranked.iter().enumerate() {
        push_rows(&mut out, aggregate);
        let fill = if i + 1 < ranked.len() { '-' } else { '#' };
        push_hline(&mut out, fill);
    }

    out
}

/// Render ranked aggregates in the requested format
pub fn render_as(ranked: &[Aggregate], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render(ranked)),
        OutputFormat::Json => JsonReport::from_ranked(ranked).to_json(),
        OutputFormat::Csv => Ok(CsvOutput::from_ranked(ranked).format()),
    }
}

fn push_hline(out: &mut String, fill: char) {
    out.extend(std::iter::repeat(fill).take(LINE_WIDTH));
    out.push('\n');
}

fn push_title(out: &mut String) {
    let left = (LINE_WIDTH - TITLE.len()) / 2;
    let right = LINE_WIDTH - TITLE.len() - left;

    push_hline(out, '#');
    out.push_str(&"#".repeat(left));
    out.push_str(TITLE);
    out.push_str(&"#".repeat(right));
    out.push('\n');
    push_hline(out, '#');
}

fn push_header(out: &mut String) {
    out.push_str(&format!(
        "{:<fw$}{:<lw$}{:<cw$}|{:>dw$}|{:>dw$}\n",
        "File",
        "|  Line",
        "|  Hits",
        "Average [us]",
        "Total [us]",
        fw = FILE_WIDTH,
        lw = LINE_NUMBER_WIDTH,
        cw = COUNT_WIDTH,
        dw = DURATION_WIDTH - 1,
    ));
    push_hline(out, '=');
}

fn push_rows(out: &mut String, aggregate: &Aggregate) {
    let start_file = crop_path(&aggregate.start().file);
    let end_file = crop_path(&aggregate.end().file);
    let end_file = if end_file == start_file { "" } else { end_file };

    push_row(out, start_file, aggregate.start().line, "", "", "");
    push_row(
        out,
        end_file,
        aggregate.end().line,
        &aggregate.count().to_string(),
        &group_thousands(aggregate.average_duration_us()),
        &group_thousands(aggregate.total_duration_us()),
    );
}

/// File names wider than the column keep their tail behind a `~`
fn fit_file(file: &str) -> Cow<'_, str> {
    let width = file.chars().count();
    if width <= FILE_WIDTH {
        return Cow::Borrowed(file);
    }
    let tail: String = file.chars().skip(width - (FILE_WIDTH - 1)).collect();
    Cow::Owned(format!("~{tail}"))
}

fn push_row(out: &mut String, file: &str, line: u32, count: &str, average: &str, total: &str) {
    let file = fit_file(file);
    let row = format!(
        "{:<fw$}|{:>lw$}|{:>cw$}|{:>dw$}|{:>dw$}",
        file,
        line,
        count,
        average,
        total,
        fw = FILE_WIDTH,
        lw = LINE_NUMBER_WIDTH - 1,
        cw = COUNT_WIDTH - 1,
        dw = DURATION_WIDTH - 1,
    );
    out.push_str(row.trim_end());
    out.push('\n');
}

/// File name after the last `/` or `\`
pub fn crop_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// `1234567` → `1,234,567`; the sign is kept in front
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
