//! Output formatting for the report viewer

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use shelfcheck_common::{StoreStatistics, TestOutcome, TestStatus};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for TestOutcome {
    fn headers() -> Vec<&'static str> {
        vec![
            "ID", "Test", "Module", "Status", "When", "Duration", "Device", "Resolution",
            "Summary",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.test_case_name.clone(),
            self.module_name.clone(),
            colored_status(self.test_status),
            self.test_datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.total_time_duration
                .map(|d| format!("{:.2}s", d))
                .unwrap_or_else(|| "-".to_string()),
            self.device_name.clone().unwrap_or_else(|| "-".to_string()),
            self.screen_resolution
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            self.error_summary.clone().unwrap_or_default(),
        ]
    }
}

impl TableDisplay for StoreStatistics {
    fn headers() -> Vec<&'static str> {
        vec!["Total", "Passed", "Failed", "Skipped", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.total.to_string(),
            self.passed.to_string().green().to_string(),
            self.failed.to_string().red().to_string(),
            self.skipped.to_string().yellow().to_string(),
            self.error.to_string().red().to_string(),
        ]
    }
}

fn colored_status(status: TestStatus) -> String {
    match status {
        TestStatus::Passed => status.as_str().green().to_string(),
        TestStatus::Failed | TestStatus::Error => status.as_str().red().to_string(),
        TestStatus::Skipped => status.as_str().yellow().to_string(),
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            table.add_row(item.row());

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(item).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (header, value) in T::headers().iter().zip(item.row().iter()) {
                println!("{}: {}", header, value);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for (header, value) in T::headers().iter().zip(item.row().iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✔".green(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_outcome_row_shape() {
        let outcome = TestOutcome {
            id: 7,
            test_case_name: "test_cart".to_string(),
            module_name: "cart".to_string(),
            test_status: TestStatus::Passed,
            test_datetime: Utc::now(),
            error_message: None,
            error_summary: None,
            total_time_duration: Some(1.5),
            device_name: Some("desktop".to_string()),
            screen_resolution: Some("1920x1080".to_string()),
            error_link: None,
            created_at: Utc::now(),
        };

        let row = outcome.row();
        assert_eq!(row.len(), TestOutcome::headers().len());
        assert_eq!(row[0], "7");
        assert_eq!(row[5], "1.50s");
    }
}
