//! conda-store UX runner
//!
//! Runs the conda-store UI scenario against a live server. Use `--manual`
//! to watch it in a visible, slowed-down browser while developing.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use conda_store_ux::driver::Browser;
use conda_store_ux::readiness::Backoff;
use conda_store_ux::{UxConfig, UxResult, UxRunner};

#[derive(Parser, Debug)]
#[command(name = "conda-store-ux")]
#[command(author, version, about = "End-to-end UI scenario for conda-store", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "CONDA_STORE_UX_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the UI under test
    #[arg(long)]
    base_url: Option<String>,

    /// Capture screenshots at each checkpoint
    #[arg(long)]
    screenshot: bool,

    /// Output directory for screenshots and results
    #[arg(short, long)]
    results_dir: Option<PathBuf>,

    /// Browser to use
    #[arg(long, value_enum)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Delay added to every browser operation (ms)
    #[arg(long)]
    slow_mo_ms: Option<u64>,

    /// Interactive run: headed, slowed down, no readiness wait
    #[arg(long)]
    manual: bool,

    /// Skip waiting for the server to respond
    #[arg(long)]
    no_wait: bool,

    /// Give up waiting for the server after this many seconds
    #[arg(long)]
    max_wait_secs: Option<u64>,

    /// Seconds between readiness attempts
    #[arg(long)]
    retry_secs: Option<u64>,

    /// How long an environment build may take (seconds)
    #[arg(long)]
    build_timeout_secs: Option<u64>,

    /// Print the planned steps as YAML and exit
    #[arg(long)]
    print_plan: bool,

    /// Print the generated Playwright script and exit
    #[arg(long)]
    print_script: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> UxResult<UxConfig> {
        let mut config = UxConfig::load(self.config.as_deref())?;

        if self.manual {
            config = config.manual();
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if self.screenshot {
            config.screenshot = true;
        }
        if let Some(dir) = self.results_dir {
            config.results_dir = dir;
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(ms) = self.slow_mo_ms {
            config.playwright.slow_mo_ms = ms;
        }
        if self.no_wait {
            config.readiness.enabled = false;
        }
        if let Some(secs) = self.max_wait_secs {
            config.readiness.max_wait_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = self.retry_secs {
            config.readiness.backoff = Backoff::Fixed {
                interval_ms: secs.saturating_mul(1000),
            };
        }
        if let Some(secs) = self.build_timeout_secs {
            config.timeouts.build_ms = secs.saturating_mul(1000);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> UxResult<bool> {
    let print_plan = args.print_plan;
    let print_script = args.print_script;
    let runner = UxRunner::new(args.into_config()?);

    if print_plan || print_script {
        let scenario = runner.plan()?;
        if print_plan {
            print!("{}", scenario.to_yaml()?);
        }
        if print_script {
            print!("{}", runner.script(&scenario));
        }
        return Ok(true);
    }

    let report = runner.run().await?;
    Ok(report.success)
}
