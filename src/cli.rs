use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{CalendarConfig, CalendarOverrides};
use crate::engine::{analyze_sprint, BusinessCalendar, DEFAULT_CONCURRENCY};
use crate::models::SprintInput;
use crate::timestamp;

#[derive(Parser)]
#[command(name = "sprintlens")]
#[command(author, version, about = "Sprint timeline and delivery metrics engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(flatten)]
    calendar: CalendarArgs,
}

#[derive(clap::Args)]
struct CalendarArgs {
    /// First hour of the shared working window
    #[arg(long, global = true, env = "SPRINTLENS_WORKDAY_START")]
    workday_start: Option<u32>,

    /// Hour the shared working window ends (exclusive)
    #[arg(long, global = true, env = "SPRINTLENS_WORKDAY_END")]
    workday_end: Option<u32>,

    /// Productive hours assumed per business day
    #[arg(long, global = true, env = "SPRINTLENS_EFFECTIVE_HOURS")]
    effective_hours: Option<u32>,

    /// Fixed UTC offset of the working window, in minutes
    #[arg(
        long,
        global = true,
        env = "SPRINTLENS_UTC_OFFSET_MINUTES",
        allow_hyphen_values = true
    )]
    utc_offset_minutes: Option<i32>,
}

impl CalendarArgs {
    fn overrides(&self) -> CalendarOverrides {
        CalendarOverrides {
            workday_start_hour: self.workday_start,
            workday_end_hour: self.workday_end,
            effective_hours_per_day: self.effective_hours,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify sprint issues and compute sprint and DORA metrics
    Analyze {
        /// JSON document with sprint, board, issues and builds
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum number of issues processed concurrently
        #[arg(short, long, env = "SPRINTLENS_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// Print elapsed business days between two timestamps
    BusinessDays {
        /// Start instant (RFC 3339)
        #[arg(long)]
        from: String,

        /// End instant (RFC 3339)
        #[arg(long)]
        to: String,
    },
}

#[derive(Serialize)]
struct BusinessDaysOutput {
    business_days: f64,
    seconds: f64,
    calendar: CalendarConfig,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let overrides = self.calendar.overrides();

        match &self.command {
            Commands::Analyze { input, concurrency } => {
                info!("Analyzing sprint input: {}", input.display());

                let document = read_input(input)?;
                let report = analyze_sprint(document, &overrides, *concurrency).await?;

                self.write_output(&report)
            }
            Commands::BusinessDays { from, to } => {
                let from = timestamp::parse(from)
                    .with_context(|| format!("Invalid --from timestamp: {from}"))?;
                let to =
                    timestamp::parse(to).with_context(|| format!("Invalid --to timestamp: {to}"))?;

                let config = CalendarConfig::default().with_overrides(&overrides);
                let calendar = BusinessCalendar::from_config(&config)?;
                let business_days = calendar.elapsed_business_days(from, to);

                self.write_output(&BusinessDaysOutput {
                    business_days,
                    seconds: calendar.days_to_seconds(business_days),
                    calendar: config,
                })
            }
        }
    }

    fn write_output<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

fn read_input(path: &Path) -> Result<SprintInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse sprint input {}", path.display()))
}
