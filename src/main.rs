use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chapterwise::{AppConfig, ChatClient, LanguageModel, LazyChatClient, Session, SqliteChapterStore};

#[derive(Debug, Parser)]
#[command(author, version, about = "Chapter detection and lesson planning for PDF textbooks")]
struct Cli {
    /// Path to configuration JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chapter database (overrides store.database_path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect chapters from the index pages and store them
    Detect(DetectArgs),
    /// List stored chapters
    Chapters,
    /// Print the heading text of one chapter
    Extract(ChapterArgs),
    /// Generate a lesson plan for one chapter
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
struct DetectArgs {
    #[arg(long)]
    pdf: PathBuf,
    /// First index page (1-based)
    #[arg(long, requires = "index_end")]
    index_start: Option<u32>,
    /// Last index page (inclusive)
    #[arg(long, requires = "index_start")]
    index_end: Option<u32>,
}

#[derive(Debug, Args)]
struct ChapterArgs {
    #[arg(long)]
    pdf: PathBuf,
    /// Chapter number or title
    #[arg(long)]
    chapter: String,
    /// Physical page where the first chapter starts
    #[arg(long)]
    first_page: i64,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    chapter: ChapterArgs,
    #[arg(long)]
    periods: u32,
    #[arg(long)]
    class_level: Option<String>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Detect(args) => detect_command(config, args),
        Commands::Chapters => chapters_command(config),
        Commands::Extract(args) => extract_command(config, args),
        Commands::Plan(args) => plan_command(config, args),
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config file: {:?}", path))?
        }
        None => AppConfig::default(),
    };

    if let Some(db) = &cli.db {
        config.store.database_path = db.clone();
    }

    info!("Configuration: {}", config);
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<SqliteChapterStore> {
    SqliteChapterStore::open(&config.store.database_path)
        .with_context(|| format!("Failed to open chapter database: {:?}", config.store.database_path))
}

fn chat_client(config: &AppConfig) -> Result<ChatClient> {
    ChatClient::from_config(&config.llm).context("Failed to set up the LLM client")
}

fn open_session<M: LanguageModel>(
    model: M,
    config: AppConfig,
    pdf: &Path,
) -> Result<Session<M, SqliteChapterStore>> {
    let store = open_store(&config)?;
    Session::open(model, store, config, pdf).with_context(|| format!("Failed to load PDF: {:?}", pdf))
}

fn detect_command(config: AppConfig, args: DetectArgs) -> Result<()> {
    let mut session = open_session(chat_client(&config)?, config, &args.pdf)?;

    let chapters = match (args.index_start, args.index_end) {
        (Some(start), Some(end)) => session.detect_chapters(start, end),
        _ => session.detect_chapters_default(),
    }
    .context("Chapter detection failed; try a different index page range")?;

    info!("Stored {} chapters", chapters.len());
    for chapter in &chapters {
        println!("{}", chapter);
    }
    Ok(())
}

fn chapters_command(config: AppConfig) -> Result<()> {
    use chapterwise::ChapterStore;

    let store = open_store(&config)?;
    let chapters = store.load_all().context("Failed to read stored chapters")?;
    if chapters.is_empty() {
        warn!("No chapters stored yet; run `detect` first");
    }
    for chapter in &chapters {
        println!("{}", chapter);
    }
    Ok(())
}

fn extract_command(config: AppConfig, args: ChapterArgs) -> Result<()> {
    // Heading extraction never prompts the model
    let model = LazyChatClient::new(config.llm.clone());
    let session = open_session(model, config, &args.pdf)?;
    let chapter = session.find_chapter(&args.chapter)?;

    let text = session
        .chapter_text(&chapter, args.first_page)
        .with_context(|| format!("Failed to extract chapter {}", chapter.chapter_number))?;
    if text.is_empty() {
        warn!("No heading text found for chapter {}", chapter.chapter_number);
    }
    println!("{}", text);
    Ok(())
}

fn plan_command(config: AppConfig, args: PlanArgs) -> Result<()> {
    let session = open_session(chat_client(&config)?, config, &args.chapter.pdf)?;
    let chapter = session.find_chapter(&args.chapter.chapter)?;

    info!("Generating a {}-period plan for {}", args.periods, chapter);
    let plan = session
        .lesson_plan(
            &chapter,
            args.chapter.first_page,
            args.periods,
            args.class_level.as_deref(),
        )
        .with_context(|| format!("Failed to generate lesson plan for chapter {}", chapter.chapter_number))?;

    println!("{}", plan);
    Ok(())
}
