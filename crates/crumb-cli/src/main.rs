//! Crumb CLI
//!
//! CLI tool for crawling websites and classifying their cookies.

mod config;
mod crawler;
mod output;
#[cfg_attr(not(feature = "webdriver"), allow(dead_code))]
mod robots;
mod update;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crumb_core::domain::{extract_host, normalize_url};
use crumb_core::{Classifier, ConsentComparison, CookieDatabase};
use crumb_db::{load_database, optimize_entries, parse_cookie_database};

use config::{load_config, AppConfig};
use crawler::{create_crawler, CrawlOptions, CrawlOutput, Crawler, CrawlerBackend, ReplayCrawler};
use output::{Analysis, AnalysisOptions};

#[derive(Parser)]
#[command(name = "crumb")]
#[command(version, about = "Website cookie crawler and consent classifier")]
struct Cli {
    /// Config file (defaults to $CRUMB_CONFIG or ~/.config/crumb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a website and classify its cookies
    Analyze(AnalyzeArgs),

    /// Classify the cookies of a recorded capture
    Classify {
        /// Capture file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cookie database CSV
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compare captures taken before and after consent
    Diff {
        /// Capture before consent
        #[arg(long)]
        pre: PathBuf,

        /// Capture after consent
        #[arg(long)]
        post: PathBuf,

        /// Cookie database CSV
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show statistics for a cookie database file
    DbInfo {
        /// Cookie database CSV
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Download the Open Cookie Database
    UpdateDb {
        /// Source URL
        #[arg(long)]
        url: Option<String>,

        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Website URL (https:// is added if missing)
    url: String,

    /// Maximum number of pages to visit
    #[arg(short, long)]
    pages: Option<usize>,

    /// Cookie database CSV
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Crawler backend
    #[arg(long, value_enum, default_value = "webdriver")]
    backend: CrawlerBackend,

    /// Capture file for the replay backend
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Do not click consent banners
    #[arg(long)]
    no_consent_interaction: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    show_browser: bool,

    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Show dynamically set cookies
    #[arg(long)]
    dynamic: bool,

    /// Scan for fingerprinting indicators
    #[arg(long)]
    fingerprinting: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Write the JSON result to a file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let (config, config_warning) = load_config(cli.config.as_deref());
    init_logging(&config.log_level, cli.verbose);
    if let Some(warning) = config_warning {
        log::warn!("{}", warning);
    }

    let result = match cli.command {
        Commands::Analyze(args) => cmd_analyze(args, &config),
        Commands::Classify { input, database, json } => cmd_classify(&input, database.as_deref(), json, &config),
        Commands::Diff { pre, post, database } => cmd_diff(&pre, &post, database.as_deref(), &config),
        Commands::DbInfo { database } => cmd_db_info(database.as_deref().unwrap_or(config.database_path.as_path())),
        Commands::UpdateDb { url, output } => cmd_update_db(
            url.as_deref().unwrap_or(config.database_url.as_str()),
            output.as_deref().unwrap_or(config.database_path.as_path()),
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` forces debug.
fn init_logging(level: &str, verbose: bool) {
    let default = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// Load the database, degrading to an empty table if it is unavailable.
fn open_database(path: &Path) -> CookieDatabase {
    match load_database(path) {
        Ok(entries) => CookieDatabase::new(entries),
        Err(e) => {
            log::warn!("{}; classifying with rules only", e);
            CookieDatabase::empty()
        }
    }
}

fn cmd_analyze(args: AnalyzeArgs, config: &AppConfig) -> Result<(), String> {
    let url = normalize_url(&args.url).ok_or_else(|| format!("Invalid URL: '{}'", args.url))?;
    let site_host = extract_host(&url).map(str::to_string);

    let database = open_database(args.database.as_deref().unwrap_or(config.database_path.as_path()));
    let classifier = Classifier::new(&database);

    let options = CrawlOptions {
        url: url.clone(),
        max_pages: args.pages.unwrap_or(config.max_pages).max(1),
        respect_robots_txt: config.respect_robots_txt && !args.ignore_robots,
        interact_with_consent: config.interact_with_consent && !args.no_consent_interaction,
        chromedriver_url: config.chromedriver_url.clone(),
        headless: config.headless && !args.show_browser,
        capture_path: args.capture,
    };

    let start = Instant::now();
    let mut crawler = create_crawler(args.backend, options).map_err(|e| format!("Failed to start crawler: {}", e))?;
    let crawl = crawler.crawl().map_err(|e| format!("Failed to crawl '{}': {}", url, e))?;
    log::info!("Crawl finished in {:.1}s", start.elapsed().as_secs_f64());

    let analysis = Analysis::build(
        &crawl,
        &classifier,
        AnalysisOptions {
            site_host: site_host.as_deref(),
            fingerprinting: args.fingerprinting,
        },
    );

    if let Some(path) = &args.output {
        let json = analysis.to_json().map_err(|e| format!("Failed to serialize result: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
        println!("Wrote results to '{}'", path.display());
    }

    if args.json {
        let json = analysis.to_json().map_err(|e| format!("Failed to serialize result: {}", e))?;
        println!("{}", json);
    } else {
        print!("{}", analysis.render_text(args.dynamic));
    }

    Ok(())
}

fn read_capture(path: &Path) -> Result<CrawlOutput, String> {
    ReplayCrawler::new(path)
        .crawl()
        .map_err(|e| format!("Failed to read capture: {}", e))
}

fn cmd_classify(input: &Path, database: Option<&Path>, json: bool, config: &AppConfig) -> Result<(), String> {
    let capture = read_capture(input)?;
    let database = open_database(database.unwrap_or(config.database_path.as_path()));
    let classifier = Classifier::new(&database);

    let analysis = Analysis::build(&capture, &classifier, AnalysisOptions::default());
    if json {
        let json = analysis.to_json().map_err(|e| format!("Failed to serialize result: {}", e))?;
        println!("{}", json);
    } else {
        print!("{}", analysis.render_text(false));
    }
    Ok(())
}

fn cmd_diff(pre: &Path, post: &Path, database: Option<&Path>, config: &AppConfig) -> Result<(), String> {
    let pre = read_capture(pre)?;
    let post = read_capture(post)?;
    let database = open_database(database.unwrap_or(config.database_path.as_path()));
    let classifier = Classifier::new(&database);

    let comparison =
        ConsentComparison::build(&pre.cookies, &post.cookies, &classifier).with_storage(&pre.storage, &post.storage);
    let json = serde_json::to_string_pretty(&comparison).map_err(|e| format!("Failed to serialize result: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_db_info(path: &Path) -> Result<(), String> {
    let start = Instant::now();
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    let parsed = parse_cookie_database(&text);
    let skipped = parsed.skipped;
    let mut entries = parsed.entries;
    let stats = optimize_entries(&mut entries);
    let wildcards = entries.iter().filter(|e| e.is_wildcard).count();
    let database = CookieDatabase::new(entries);

    println!("Cookie database: {}", path.display());
    println!("  Rows:      {} ({} malformed rows skipped)", stats.before, skipped);
    println!(
        "  Entries:   {} -> {} (dedupe removed {}, {} without name)",
        stats.before, stats.after, stats.deduped, stats.empty_names
    );
    println!("  Wildcards: {}", wildcards);
    println!("  Time:      {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    if database.is_empty() {
        return Err("Database contains no usable entries".to_string());
    }
    Ok(())
}

fn cmd_update_db(url: &str, output: &Path) -> Result<(), String> {
    let entries = update::update_database(url, output)?;
    println!("Updated '{}' ({} entries)", output.display(), entries);
    Ok(())
}
