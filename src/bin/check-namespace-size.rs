//! # Namespace Size Check
//!
//! Monitoring plugin entry point. Prints one summary line (plus optional
//! detail lines) on stdout and exits with the verdict's plugin exit code:
//! 0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use namespace_check::config::{decode_bytes, CheckConfig, ConfigManager, ConfigResult};
use namespace_check::constants::defaults;
use namespace_check::logging::init_structured_logging;
use namespace_check::{CheckRunner, ReportBuilder, SnapshotConnector, Verdict};

#[derive(Parser, Debug)]
#[command(name = "check-namespace-size")]
#[command(about = "Check namespace sizes and storage efficiency against tiered thresholds")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON inventory snapshot to check
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Name printed at the start of the summary line
    #[arg(long)]
    name: Option<String>,

    /// Total size warning limit, e.g. 10g
    #[arg(long)]
    total_warning: Option<String>,

    /// Total size critical limit
    #[arg(long)]
    total_critical: Option<String>,

    /// Size warning limit for resources that are not partitioned
    #[arg(long)]
    unsharded_warning: Option<String>,

    /// Size critical limit for resources that are not partitioned
    #[arg(long)]
    unsharded_critical: Option<String>,

    /// Warn when storage efficiency drops below this percentage
    #[arg(long)]
    efficiency_warning: Option<u64>,

    /// Critical when storage efficiency drops below this percentage
    #[arg(long)]
    efficiency_critical: Option<u64>,

    /// Skip the efficiency check for resources holding less data than this
    #[arg(long)]
    efficiency_size: Option<String>,

    /// Worker threads in the measurement pool
    #[arg(short, long)]
    threads: Option<usize>,

    /// Seconds each collection wave (discovery, then measurement) may take
    #[arg(long)]
    timeout: Option<f64>,

    /// Print a line for every resource at WARNING or CRITICAL
    #[arg(short, long)]
    verbose: bool,

    /// With --verbose, also print per sub-structure efficiency
    #[arg(short, long)]
    breakdown: bool,

    /// Print the full outcome as JSON instead of plugin output
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn check_name(&self) -> &str {
        self.name.as_deref().unwrap_or(defaults::CHECK_NAME)
    }

    /// Command-line flags override whatever the file and environment provided
    fn apply(&self, config: &mut CheckConfig) -> ConfigResult<()> {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }

        let thresholds = &mut config.thresholds;
        override_size(&mut thresholds.total.warning, &self.total_warning)?;
        override_size(&mut thresholds.total.critical, &self.total_critical)?;
        override_size(&mut thresholds.unsharded.warning, &self.unsharded_warning)?;
        override_size(&mut thresholds.unsharded.critical, &self.unsharded_critical)?;
        override_size(&mut thresholds.efficiency.min_data_size, &self.efficiency_size)?;

        if let Some(percent) = self.efficiency_warning {
            thresholds.efficiency.warning = Some(percent);
        }
        if let Some(percent) = self.efficiency_critical {
            thresholds.efficiency.critical = Some(percent);
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = Some(timeout);
        }

        config.verbose |= self.verbose;
        config.breakdown |= self.breakdown;
        Ok(())
    }
}

fn override_size(target: &mut Option<u64>, flag: &Option<String>) -> ConfigResult<()> {
    if let Some(text) = flag {
        *target = Some(decode_bytes(text)?);
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            error.exit()
        }
        Err(error) => {
            eprint!("{error}");
            println!("{} UNKNOWN: invalid arguments", defaults::CHECK_NAME);
            process::exit(Verdict::Unknown.exit_code());
        }
    };

    init_structured_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(error) => {
            println!("{} UNKNOWN: {error:#}", cli.check_name());
            process::exit(Verdict::Unknown.exit_code());
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let mut manager = ConfigManager::load(cli.config.as_deref())?;
    cli.apply(manager.config_mut())?;
    let config = manager.into_validated()?;

    let connector = SnapshotConnector::from_file(&cli.snapshot)
        .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?;

    let outcome = CheckRunner::new(config.clone(), Arc::new(connector))?.run();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let report = ReportBuilder::from_config(&config).build(&outcome);
        println!("{}", report.render());
    }

    Ok(outcome.exit_code())
}
