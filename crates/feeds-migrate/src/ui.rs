//! Console output and prompts of the command line tool.

use console::{style, Style};
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::error::{Error, Result};
use crate::pipeline::{MessageKind, MigrationMessage, MigrationReport};

/// Console UI handler.
pub struct ConsoleUI {
    theme: ColorfulTheme,
}

impl Default for ConsoleUI {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUI {
    /// Creates a new UI handler.
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prints the tool header.
    pub fn print_header(&self) {
        let cyan = Style::new().cyan().bold();

        println!();
        println!("{}", cyan.apply_to("FeedAPI to Feeds migration"));
        println!("{}", cyan.apply_to("=========================="));
        println!();
    }

    /// Prints the categories a run would visit.
    pub fn print_candidates(&self, categories: &[String]) {
        let bold = Style::new().bold();

        if categories.is_empty() {
            println!("{} Nothing to migrate.", style("ℹ").blue());
            return;
        }
        println!("{}", bold.apply_to("Categories to migrate:"));
        for category in categories {
            println!("  • {category}");
        }
    }

    /// Asks before legacy settings are archived and removed.
    pub fn confirm_run(&self, categories: &[String]) -> Result<bool> {
        self.print_candidates(categories);
        println!();
        Confirm::with_theme(&self.theme)
            .with_prompt(format!(
                "Migrate {} categories? Legacy settings are archived and then removed",
                categories.len()
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Config(format!("Input cancelled: {e}")))
    }

    /// Prints the batch outcome and every message.
    pub fn print_report(&self, report: &MigrationReport, messages: &[MigrationMessage]) {
        let green = Style::new().green().bold();
        let bold = Style::new().bold();

        println!();
        if report.is_success() {
            println!("{}", green.apply_to("✅ Migration Complete!"));
        } else {
            println!("{} {}", style("⚠").yellow().bold(), bold.apply_to(report));
        }
        for line in report_lines(report, messages) {
            println!("{line}");
        }
        println!();
    }

    /// Prints cancellation message.
    pub fn print_cancelled(&self) {
        println!();
        println!("{} Migration cancelled.", style("ℹ").blue());
    }

    /// Prints error message.
    pub fn print_error(&self, message: &str) {
        println!();
        println!("{} {}", style("❌").red().bold(), message);
    }
}

/// Plain text body of a report: migrated categories, failures, warnings.
#[must_use]
pub fn report_lines(report: &MigrationReport, messages: &[MigrationMessage]) -> Vec<String> {
    let mut lines = Vec::new();

    for category in &report.migrated {
        lines.push(format!("   migrated  {category}"));
    }
    for (category, failure) in &report.failures {
        lines.push(format!("   failed    {category}: {failure}"));
    }

    let warnings: Vec<&MigrationMessage> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Warning)
        .collect();
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!("   {} warnings:", warnings.len()));
        lines.extend(warnings.iter().map(|m| format!("   - {m}")));
    }
    lines
}
