//! Row-count Delta Report
//!
//! Compares the previous snapshot with the current one and renders the
//! chat message. The report is driven by the current snapshot only: a table
//! missing from the previous snapshot counts as having had 0 rows, and a
//! table missing from the current snapshot is not mentioned at all.

use crate::snapshot::stats::TableStats;
use chrono::{DateTime, Duration, Utc};
use std::fmt::Write;

/// Display offset applied to the report header, in hours east of UTC
pub const REPORT_UTC_OFFSET_HOURS: i64 = 2;

/// Timestamp layout shared by the report header and the log keys
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Direction of change for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Increase,
    Decrease,
    /// Unchanged at zero rows
    Empty,
    Unchanged,
}

impl Indicator {
    pub fn symbol(self) -> &'static str {
        match self {
            Indicator::Increase => "🟢",
            Indicator::Decrease => "🟡",
            Indicator::Empty => "🔴",
            Indicator::Unchanged => "⚪",
        }
    }

    /// Classify a count against its baseline
    pub fn classify(previous: u64, current: u64) -> Self {
        if current > previous {
            Indicator::Increase
        } else if current < previous {
            Indicator::Decrease
        } else if current == 0 {
            Indicator::Empty
        } else {
            Indicator::Unchanged
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDelta {
    pub table: String,
    pub current: u64,
    /// `None` when the table was not in the previous snapshot
    pub previous: Option<u64>,
    pub indicator: Indicator,
}

impl TableDelta {
    fn baseline(&self) -> u64 {
        self.previous.unwrap_or(0)
    }

    /// `+ n`, `- n`, or empty when nothing moved
    pub fn change_text(&self) -> String {
        match self.indicator {
            Indicator::Increase => format!("+ {}", self.current - self.baseline()),
            Indicator::Decrease => format!("- {}", self.baseline() - self.current),
            Indicator::Empty | Indicator::Unchanged => String::new(),
        }
    }

    /// Split the qualified name on its first `.`
    pub fn schema_and_table(&self) -> (&str, &str) {
        self.table.split_once('.').unwrap_or(("", self.table.as_str()))
    }

    pub fn render_line(&self) -> String {
        let (schema, table) = self.schema_and_table();
        format!(
            "Schema: {}, Table: {}, Row Count: {} {} {}",
            schema,
            table,
            self.current,
            self.indicator.symbol(),
            self.change_text()
        )
    }
}

/// Comparison of two snapshots, in current-snapshot order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaReport {
    pub entries: Vec<TableDelta>,
}

impl DeltaReport {
    pub fn build(previous: &TableStats, current: &TableStats) -> Self {
        let entries = current
            .iter()
            .map(|(table, count)| {
                let prev = previous.get(table);
                TableDelta {
                    table: table.to_string(),
                    current: count,
                    previous: prev,
                    indicator: Indicator::classify(prev.unwrap_or(0), count),
                }
            })
            .collect();

        Self { entries }
    }

    /// Render the chat message: a header line, then one line per table
    pub fn render(&self, generated_at: DateTime<Utc>) -> String {
        let mut message = format!("-- {} --\n", header_timestamp(generated_at));
        for entry in &self.entries {
            // Writing into a String cannot fail
            let _ = writeln!(message, "{}", entry.render_line());
        }
        message
    }

    pub fn count(&self, indicator: Indicator) -> usize {
        self.entries
            .iter()
            .filter(|e| e.indicator == indicator)
            .count()
    }
}

fn header_timestamp(generated_at: DateTime<Utc>) -> String {
    (generated_at + Duration::hours(REPORT_UTC_OFFSET_HOURS))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
