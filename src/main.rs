// Company Reports - command line
//
//   reports all             unified dataset as pretty JSON
//   reports source <kind>   one raw cleaned source (json | csv | pdf | pptx)
//   reports check           per-company summary lines

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use company_reports::{DataProcessor, PipelineConfig, SourceKind, VERSION};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reports", version = VERSION, about = "Unify company reports from four raw sources")]
struct Cli {
    /// Structured-record source (JSON)
    #[arg(long, env = "REPORTS_JSON", default_value = company_reports::config::DEFAULT_JSON_PATH)]
    json: PathBuf,

    /// Tabular transaction source (CSV)
    #[arg(long, env = "REPORTS_CSV", default_value = company_reports::config::DEFAULT_CSV_PATH)]
    csv: PathBuf,

    /// Document holding the quarterly table (PDF)
    #[arg(long, env = "REPORTS_PDF", default_value = company_reports::config::DEFAULT_PDF_PATH)]
    pdf: PathBuf,

    /// Slide deck with metrics and narrative summary (PPTX)
    #[arg(long, env = "REPORTS_PPTX", default_value = company_reports::config::DEFAULT_PPTX_PATH)]
    pptx: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the unified dataset
    All,
    /// Print one raw cleaned source
    Source { kind: SourceKind },
    /// Print one summary line per company
    Check,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            json_path: self.json.clone(),
            csv_path: self.csv.clone(),
            pdf_path: self.pdf.clone(),
            pptx_path: self.pptx.clone(),
            ..PipelineConfig::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let processor = DataProcessor::load(&cli.config()).context("failed to build unified dataset")?;

    match cli.command {
        Command::All => {
            let json = serde_json::to_string_pretty(processor.unified_data())?;
            println!("{}", json);
        }
        Command::Source { kind } => {
            let json = serde_json::to_string_pretty(&processor.get_data_by_type(kind.code()))?;
            println!("{}", json);
        }
        Command::Check => run_check(&processor),
    }

    Ok(())
}

fn run_check(processor: &DataProcessor) {
    println!("📊 Unified dataset");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for company in &processor.unified_data().companies {
        let name = company
            .extra
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("(unnamed)");
        let transactions = company.transactions.as_ref().map_or(0, |t| t.len());

        println!(
            "\n🏢 Company {} - {}: {} employees, {} periods, {} transactions",
            company.id,
            name,
            company.employees.len(),
            company.performance.len(),
            transactions
        );

        for summary in company.annual_summary.iter().flatten() {
            println!(
                "   {}: {} memberships, ${:.2} revenue, top location {}",
                summary.year,
                summary.total_memberships,
                summary.total_revenue,
                summary.top_location.as_deref().unwrap_or("-")
            );
        }
    }

    let deck = &processor.sources().deck;
    if !deck.corrections.is_empty() {
        println!("\n⚖️  Slide deck totals corrected from quarterly table:");
        for correction in &deck.corrections {
            println!(
                "   {}: declared {:?} → computed {}",
                correction.field, correction.declared, correction.computed
            );
        }
    }
}
