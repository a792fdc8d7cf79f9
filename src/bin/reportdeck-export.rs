use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use reportdeck::config::Config;
use reportdeck::report::export::{
    export_file_name, to_delimited_text, CONVERSION_CARD_COLUMNS, CONVERSION_CARD_HEADERS,
};
use reportdeck::report::{DateRange, ReportKind, ReportRequest, ReportService};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reportdeck-export")]
#[command(about = "Fetch dashboard reports from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the conversion card as CSV
    ConversionCard {
        /// Start date (YYYY-MM-DD, today, yesterday or NdaysAgo)
        #[arg(long)]
        start: Option<String>,
        /// End date (same formats as --start)
        #[arg(long)]
        end: Option<String>,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u32>,
        /// Case-insensitive event name substring
        #[arg(long)]
        event_filter: Option<String>,
        /// Directory the CSV file is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print page-view and campaign insights
    Dashboard {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let reports = ReportService::from_config(&config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::ConversionCard {
            start,
            end,
            limit,
            event_filter,
            out_dir,
        } => {
            let range = DateRange::resolve(start.as_deref(), end.as_deref(), today)?;
            let mut request = ReportRequest::new(ReportKind::ConversionCard).with_range(range);
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }
            if let Some(filter) = event_filter {
                request = request.with_text_filter(filter);
            }

            let table = reports.conversion_card(&request, today).await?;
            if !table.issues.is_empty() {
                println!("⚠ {} row issue(s) while formatting", table.issues.len());
            }

            let csv = to_delimited_text(&table.rows, CONVERSION_CARD_COLUMNS, CONVERSION_CARD_HEADERS)?;
            let path = out_dir.join(export_file_name(ReportKind::ConversionCard.name(), today));
            std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Wrote {} rows to {}", table.rows.len(), path.display());
        }
        Commands::Dashboard { start, end } => {
            let range = DateRange::resolve(start.as_deref(), end.as_deref(), today)?;
            let summary = reports.dashboard(range, today).await?;
            let insights = &summary.insights;

            println!("Range: {} .. {}", range.start_str(), range.end_str());
            println!("Total page views: {}", insights.total_page_views);
            match &insights.top_page {
                Some(page) => println!("Top page: {} ({} active users)", page.key, page.total),
                None => println!("Top page: -"),
            }
            match &insights.peak_day {
                Some(day) => println!("Peak day: {} ({} views)", day.key, day.total),
                None => println!("Peak day: -"),
            }
            println!("Total ad cost: {:.2}", insights.total_ad_cost);
            println!("Total conversions: {}", insights.total_conversions);

            if !summary.campaigns.is_empty() {
                println!();
                println!("{:<40} {:>12} {:>8} {:>10} {:>8}", "Campaign", "Impressions", "Clicks", "Cost", "CPC");
                for campaign in &summary.campaigns {
                    println!(
                        "{:<40} {:>12} {:>8} {:>10.2} {:>8.2}",
                        campaign.campaign_name.as_deref().unwrap_or("-"),
                        campaign.impressions.map_or(0.0, |m| m.value()),
                        campaign.clicks.map_or(0.0, |m| m.value()),
                        campaign.cost.map_or(0.0, |m| m.value()),
                        campaign.cost_per_click(),
                    );
                }
            }
        }
    }

    Ok(())
}
