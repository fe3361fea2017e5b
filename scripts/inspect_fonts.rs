use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chapterwise::headings::{font_histogram, select_sizes};
use chapterwise::utils::extract_spans;
use chapterwise::BudgetPolicy;

#[derive(Debug, Parser)]
#[command(author, version, about = "Show the font-size histogram behind heading extraction")]
struct Args {
    /// PDF file to inspect
    #[arg(long)]
    pdf: PathBuf,

    /// First physical page (1-based)
    #[arg(long, default_value = "1")]
    start: i64,

    /// Last physical page (inclusive)
    #[arg(long)]
    end: i64,

    /// Word budget for the selected sizes
    #[arg(long, default_value = "2000")]
    budget: usize,

    /// Accept the size that crosses the budget
    #[arg(long, default_value = "false")]
    accept_overflow: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let bytes = fs::read(&args.pdf)
        .with_context(|| format!("Failed to read PDF: {:?}", args.pdf))?;
    let spans = extract_spans(&bytes, args.start, args.end)
        .with_context(|| format!("Failed to read spans from {:?}", args.pdf))?;
    info!("Pages {}-{}: {} spans", args.start, args.end, spans.len());

    let policy = if args.accept_overflow {
        BudgetPolicy::AcceptOverflowingSize
    } else {
        BudgetPolicy::StopBeforeOverflow
    };

    let histogram = font_histogram(&spans);
    let selected = select_sizes(&histogram, args.budget, policy);

    let styled = spans.iter().filter(|s| s.is_styled()).count();
    let mut running = 0;

    println!("{:>8}  {:>8}  {:>8}  selected", "size", "words", "total");
    for (size, words) in histogram.iter().rev() {
        running += words;
        let mark = if selected.contains(size) { "*" } else { "" };
        println!("{:>8}  {:>8}  {:>8}  {}", size.to_string(), words, running, mark);
    }
    println!();
    println!(
        "{} of {} sizes selected (budget {}, {:?}); {} bold or coloured spans kept regardless",
        selected.len(),
        histogram.len(),
        args.budget,
        policy,
        styled
    );

    Ok(())
}
