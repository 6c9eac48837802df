//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use verity_domain::{CreditSnapshot, FactCheckRecord};

/// Longest assessment shown in table cells before truncation
const ASSESSMENT_WIDTH: usize = 72;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format fact-check records.
    pub fn format_records(&self, records: &[FactCheckRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            OutputFormat::Table => Ok(self.format_records_table(records)),
            OutputFormat::Quiet => Ok(self.format_records_quiet(records)),
        }
    }

    /// Format records as a table.
    fn format_records_table(&self, records: &[FactCheckRecord]) -> String {
        if records.is_empty() {
            return self.colorize("No results.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Claim", "Rating", "Assessment", "Sources", "Task"]);

        for record in records {
            let (rating, assessment) = match (&record.verdict, &record.error) {
                (Some(verdict), _) => (
                    verdict.rating.to_string(),
                    truncate(&verdict.assessment, ASSESSMENT_WIDTH),
                ),
                (None, Some(error)) => ("error".to_string(), truncate(error, ASSESSMENT_WIDTH)),
                (None, None) => ("pending".to_string(), String::new()),
            };

            let sources = record
                .verdict
                .as_ref()
                .map(|v| v.sources.len())
                .unwrap_or(0);

            builder.push_record([
                truncate(&record.claim, 48),
                rating,
                assessment,
                sources.to_string(),
                record.task_id.clone().unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format records in quiet mode: one "claim: rating" line each.
    fn format_records_quiet(&self, records: &[FactCheckRecord]) -> String {
        records
            .iter()
            .map(|record| {
                let rating = record
                    .verdict
                    .as_ref()
                    .map(|v| v.rating.to_string())
                    .unwrap_or_else(|| "error".to_string());
                format!("{}: {}", record.claim, rating)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format a credit snapshot.
    pub fn format_credits(&self, snapshot: &CreditSnapshot) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
            OutputFormat::Quiet => Ok(format!(
                "{} {}",
                snapshot.daily_credits, snapshot.lifetime_credits
            )),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Daily credits", "Points", "Pro"]);
                builder.push_record([
                    snapshot.daily_credits.to_string(),
                    snapshot.lifetime_credits.to_string(),
                    if snapshot.is_pro { "yes" } else { "no" }.to_string(),
                ]);

                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a progress line.
    pub fn progress(&self, completed: usize, total: usize) -> String {
        self.colorize(
            &format!("… {}/{} claims checked", completed, total),
            "cyan",
        )
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_domain::{Rating, SessionId, Verdict};

    fn completed_record() -> FactCheckRecord {
        FactCheckRecord::completed(
            "The Eiffel Tower is 330 meters tall",
            Some(Verdict {
                rating: Rating::True,
                assessment: "Supported by the operator's published figures.".to_string(),
                sources: vec!["https://example.org/tower".to_string()],
            }),
            serde_json::json!({}),
            200,
            SessionId::new(),
            Some("task-1".to_string()),
        )
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[completed_record()]).unwrap();
        assert!(output.contains("Rating"));
        assert!(output.contains("True"));
        assert!(output.contains("task-1"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_records(&[completed_record()]).unwrap();
        assert!(output.contains("\"rating\""));
        assert!(output.contains("\"claim\""));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_records(&[completed_record()]).unwrap();
        assert_eq!(output, "The Eiffel Tower is 330 meters tall: True");
    }

    #[test]
    fn test_failed_record_shows_error() {
        let record =
            FactCheckRecord::failed("Some claim", "HTTP 502: bad gateway", Some(502), SessionId::new());
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[record]).unwrap();
        assert!(output.contains("error"));
        assert!(output.contains("bad gateway"));
    }

    #[test]
    fn test_empty_records() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[]).unwrap();
        assert!(output.contains("No results"));
    }

    #[test]
    fn test_credits_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let snapshot = CreditSnapshot {
            daily_credits: 95,
            lifetime_credits: 12,
            is_pro: false,
            temp_total: 0,
        };
        let output = formatter.format_credits(&snapshot).unwrap();
        assert!(output.contains("95"));
        assert!(output.contains("12"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("done"), "✓ done");
        assert_eq!(formatter.progress(2, 5), "… 2/5 claims checked");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(100);
        let out = truncate(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }
}
