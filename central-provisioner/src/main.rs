use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use central_provisioner::config::{RawConfig, DEFAULT_CONFIG_PATH};
use central_provisioner::out::{self, OutMode};
use central_provisioner::{provision, Category, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "central-provisioner", version, about = "Assign sites, groups and hostnames to Central devices from a manifest")]
struct Cli {
    /// YAML file with credentials and data_file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Manifest to apply (overrides data_file from config/env)
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Comma separated categories to run: sites,groups,names
    #[arg(long, default_value = "sites,groups,names")]
    only: String,

    /// Read inventory but do not send any change
    #[arg(long)]
    dry_run: bool,

    /// Mutation calls in flight per category
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Final report format: text | json
    #[arg(long, default_value = "text")]
    output: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "central_provisioner=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let categories = Category::parse_list(&cli.only);
    if categories.is_empty() {
        eprintln!("--only selected no known category (expected sites, groups, names)");
        return ExitCode::from(2);
    }
    let opts = RunOptions {
        categories,
        concurrency: cli.concurrency.max(1),
        dry_run: cli.dry_run,
    };

    let result = match RawConfig::load(&cli.config) {
        Ok(raw) => provision(raw, cli.data_file.as_deref(), &opts).await,
        Err(e) => Err(e),
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    if let Err(e) = out::emit_stdout(&report, OutMode::parse(&cli.output)) {
        eprintln!("cannot render report: {e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::from(report.exit_code() as u8)
}
