//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use fabric_enroller::{ProvisionKind, ProvisionReport, StepOutcome, StepPolicy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json, yaml",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Print any serializable value as JSON or YAML, or fall back to `pretty`.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, pretty: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Pretty => pretty(value),
    }
    Ok(())
}

/// Print a provisioning report.
pub fn print_report(format: OutputFormat, report: &ProvisionReport) -> Result<()> {
    emit(format, report, print_report_pretty)
}

fn print_report_pretty(report: &ProvisionReport) {
    let heading = match report.kind {
        ProvisionKind::Org => "Organization provisioned",
        ProvisionKind::Orderer => "Orderer organization provisioned",
        ProvisionKind::User => "User enrolled",
    };
    println!("{} {}", heading.green().bold(), report.root.display().to_string().cyan());
    println!();

    for record in &report.steps {
        let marker = match (&record.outcome, record.policy) {
            (StepOutcome::Done, _) => "ok".green(),
            (StepOutcome::Skipped, _) => "--".dimmed(),
            (StepOutcome::Failed { .. }, StepPolicy::Advisory) => "!!".yellow(),
            (StepOutcome::Failed { .. }, StepPolicy::Fatal) => "!!".red(),
        };
        println!("  [{marker}] {}", record.title);
    }

    if !report.advisories.is_empty() {
        println!();
        for advisory in &report.advisories {
            println!("{} {advisory}", "Warning:".yellow().bold());
        }
    }

    if let Some(dir) = &report.tls_dir {
        println!();
        println!("{} {}", "TLS dir:".bold(), dir.display());
        for file in &report.tls_files {
            if file.is_dir {
                println!("  {}/", file.name.blue());
            } else {
                println!("  {} ({} bytes)", file.name, file.size);
            }
        }
    }
}
