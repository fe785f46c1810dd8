//! `scout` — run one lead search from the terminal.
//!
//! Reads `APIFY_TOKEN` (required) and `OPENAI_API_KEY` (optional; without it
//! the pipeline falls back to deterministic interpretation and analysis)
//! from the environment or a `.env` file.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use leadscout::ai::OpenAiAnalyst;
use leadscout::jobs::ApifyJobRunner;
use leadscout::traits::{JobRunner, MemoryHistory, SerpOwnerResolver};
use leadscout::{Channel, LeadPipeline, RunOutcome, SearchPolicy, SearchRequest};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    /// Company-first discovery via geographic/category search.
    Maps,
    /// Person-first discovery via professional-network X-ray.
    ProfessionalNetwork,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Maps => Channel::Maps,
            ChannelArg::ProfessionalNetwork => Channel::ProfessionalNetwork,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "scout", about = "Discover qualified business leads")]
struct Args {
    /// Free-text search, e.g. "physio clinics madrid".
    query: String,

    /// Discovery channel.
    #[arg(long, value_enum, default_value_t = ChannelArg::Maps)]
    channel: ChannelArg,

    /// Number of qualified leads to return.
    #[arg(long, default_value_t = 5)]
    quota: usize,

    /// Enable the aggressive dedup criteria (domain variants, substrings).
    #[arg(long)]
    strict: bool,

    /// Accept duplicates on the final attempt rather than under-deliver.
    #[arg(long)]
    allow_final_duplicates: bool,

    /// Print the full report as JSON instead of the formatted summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let jobs: Arc<dyn JobRunner> = Arc::new(
        ApifyJobRunner::from_env().context("APIFY_TOKEN is required to run searches")?,
    );
    let resolver = Arc::new(SerpOwnerResolver::new(Arc::clone(&jobs)));

    let policy = SearchPolicy::default()
        .with_strict_dedup(args.strict)
        .allow_duplicates_on_final_attempt(args.allow_final_duplicates);

    let mut pipeline = LeadPipeline::new(jobs, Arc::new(MemoryHistory::new()))
        .with_resolver(resolver)
        .with_policy(policy);

    match OpenAiAnalyst::from_env() {
        Ok(analyst) => {
            pipeline = pipeline.with_analyst(Arc::new(analyst));
        }
        Err(_) => {
            eprintln!(
                "{}",
                style("OPENAI_API_KEY not set: using deterministic fallbacks").dim()
            );
        }
    }

    let pipeline = Arc::new(pipeline);

    let mut progress = pipeline.progress();
    let printer = tokio::spawn(async move {
        while let Some(line) = progress.recv().await {
            eprintln!("{}", style(line).dim());
        }
    });

    // Ctrl-C stops the run; the pipeline returns whatever it accumulated.
    let stopper = Arc::clone(&pipeline);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", style("Stopping after the current step...").yellow());
            stopper.stop();
        }
    });

    let request =
        SearchRequest::new(args.query.clone(), Channel::from(args.channel), args.quota);
    let report = pipeline.run(request).await;
    printer.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.outcome {
        RunOutcome::Failed(reason) => anyhow::bail!("run failed: {reason}"),
        _ => Ok(()),
    }
}

fn print_report(report: &leadscout::RunReport) {
    println!();
    for (i, lead) in report.leads.iter().enumerate() {
        println!(
            "{} {}",
            style(format!("{}.", i + 1)).bold(),
            style(&lead.company_name).bold().cyan()
        );
        if let Some(website) = &lead.website {
            println!("   {website}");
        }
        if let Some(email) = &lead.decision_maker.email {
            let name = lead.decision_maker.name.as_deref().unwrap_or("-");
            println!("   {name} <{email}>");
        }
        if !lead.analysis.executive_summary.is_empty() {
            println!("   {}", style(&lead.analysis.executive_summary).italic());
        }
        if !lead.analysis.bottleneck.is_empty() {
            println!("   bottleneck: {}", lead.analysis.bottleneck);
        }
    }

    let metrics = &report.metrics;
    println!();
    println!(
        "{} {} leads | {} candidates | {} duplicates | {} attempts | {:.1}s | success {:.0}%",
        match report.outcome {
            RunOutcome::Completed => style("done").green(),
            RunOutcome::ShortDelivery => style("short").yellow(),
            RunOutcome::Cancelled => style("cancelled").yellow(),
            RunOutcome::Failed(_) => style("failed").red(),
        },
        report.leads.len(),
        metrics.candidates_seen,
        metrics.duplicates_found,
        metrics.attempts_used,
        metrics.elapsed_ms as f64 / 1000.0,
        metrics.success_rate * 100.0
    );
}
