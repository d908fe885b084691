use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use formprobe_core::payloads::PayloadSet;
use formprobe_core::report::{generate_scan_report, JsonReportWriter};
use formprobe_core::scan::{execute_scan, ScanOptions, ScanSummary};
use formprobe_scanner::HttpSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use url::Url;

/// Targets containing this are always allowed; everything else needs `--i-understand`.
pub const DEMO_TARGET: &str = "vulnweb.com";

/// Parsed `scan` arguments.
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub url: String,
    pub max_pages: usize,
    pub i_understand: bool,
    pub ignore_robots: bool,
    pub payloads_dir: Option<String>,
    pub output: String,
    pub threads: usize,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub retries: u32,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for ScanArgs {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pages: 30,
            i_understand: false,
            ignore_robots: false,
            payloads_dir: None,
            output: "report.json".to_string(),
            threads: 1,
            delay_ms: 1000,
            timeout_secs: 30,
            retries: 0,
            verbose: false,
            quiet: false,
        }
    }
}

impl ScanArgs {
    pub fn from_matches(sub_matches: &ArgMatches, quiet: bool) -> Result<Self> {
        let defaults = Self::default();
        let url = sub_matches
            .get_one::<Url>("url")
            .ok_or_else(|| anyhow!("--url is required"))?;

        Ok(Self {
            url: url.to_string(),
            max_pages: sub_matches.get_one::<usize>("max-pages").copied().unwrap_or(defaults.max_pages),
            i_understand: sub_matches.get_flag("i-understand"),
            ignore_robots: sub_matches.get_flag("ignore-robots"),
            payloads_dir: sub_matches.get_one::<String>("payloads-dir").cloned(),
            output: sub_matches.get_one::<String>("output").cloned().unwrap_or(defaults.output),
            threads: sub_matches.get_one::<usize>("threads").copied().unwrap_or(defaults.threads),
            delay_ms: sub_matches.get_one::<u64>("delay-ms").copied().unwrap_or(defaults.delay_ms),
            timeout_secs: sub_matches.get_one::<u64>("timeout").copied().unwrap_or(defaults.timeout_secs),
            retries: sub_matches.get_one::<u32>("retries").copied().unwrap_or(defaults.retries),
            verbose: sub_matches.get_flag("verbose"),
            quiet,
        })
    }
}

pub fn is_authorized_target(url: &str, i_understand: bool) -> bool {
    i_understand || url.contains(DEMO_TARGET)
}

pub fn build_scan_options(args: &ScanArgs) -> ScanOptions {
    let http = HttpSettings {
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
        ..Default::default()
    };

    ScanOptions {
        url: args.url.clone(),
        max_pages: args.max_pages,
        ignore_robots: args.ignore_robots,
        workers: args.threads.max(1),
        politeness: Duration::from_millis(args.delay_ms),
        retries: args.retries,
        http,
        show_progress_bars: !args.quiet,
        ..Default::default()
    }
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Cannot expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

pub fn load_payloads(dir: Option<&str>) -> Result<PayloadSet> {
    let payloads = match dir {
        Some(dir) => PayloadSet::load_from_dir(&expand_path(dir)?)?,
        None => PayloadSet::bundled()?,
    };
    if payloads.is_empty() {
        bail!("No payloads to send ({} is empty)", payloads.name);
    }
    Ok(payloads)
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // a subscriber may already be installed when running under a test harness
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Everything `scan` does short of printing: gate, load payloads, scan, write
/// the report.
pub async fn run_scan(args: &ScanArgs) -> Result<(ScanSummary, PathBuf, String)> {
    if !is_authorized_target(&args.url, args.i_understand) {
        bail!(
            "Refusing to scan {}: pass --i-understand to scan targets other than the {} demo site",
            args.url,
            DEMO_TARGET
        );
    }

    let payloads = load_payloads(args.payloads_dir.as_deref())?;
    let output = expand_path(&args.output)?;
    let writer = JsonReportWriter::new(&output);

    let (summary, findings) = execute_scan(build_scan_options(args), &payloads, &writer)
        .await
        .with_context(|| format!("Scan of {} failed", args.url))?;

    let report = generate_scan_report(&summary, &findings);
    Ok((summary, output, report))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) {
    let args = match ScanArgs::from_matches(sub_matches, quiet) {
        Ok(args) => args,
        Err(e) => exit_with_error(&e),
    };
    init_logging(args.verbose);

    if !quiet {
        print_divider();
        println!("{} {}", "Target:".blue(), args.url.bright_white());
        println!("{} {}", "Max pages:".blue(), args.max_pages);
        println!("{} {}", "Workers:".blue(), args.threads);
        println!(
            "{} {}",
            "robots.txt:".blue(),
            if args.ignore_robots { "ignored".yellow() } else { "honored".green() }
        );
        print_divider();
        println!();
    }

    match run_scan(&args).await {
        Ok((_, output, report)) => {
            println!("\n{} Scan complete!\n", "✓".green().bold());
            print!("{}", report);
            println!("{} Report written to {}", "✓".green().bold(), display_path(&output));
        }
        Err(e) => exit_with_error(&e),
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string().bright_white().to_string()
}

fn exit_with_error(e: &anyhow::Error) -> ! {
    eprintln!("{} {:#}", "✗".red().bold(), e);
    std::process::exit(1);
}
