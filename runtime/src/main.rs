// Copyright 2026 Linkscout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use linkscout::cli;
use linkscout::cli::discover_cmd::CrawlFlags;
use linkscout::cli::output;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "linkscout",
    about = "linkscout: find the listing page for a construction material on a commerce site",
    version,
    after_help = "Run 'linkscout <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: $LINKSCOUT_CONFIG, ./linkscout.json, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find listing pages for materials on the configured sites
    Discover {
        /// Material names (e.g. "White cement")
        materials: Vec<String>,
        /// Site id to search; repeat for several (default: all sites)
        #[arg(long = "site")]
        sites: Vec<String>,
        /// Add the built-in material list
        #[arg(long)]
        defaults: bool,
        #[command(flatten)]
        flags: CrawlFlags,
    },
    /// Explore from known starting URLs and rank what they lead to
    Seeds {
        /// Seed URLs
        urls: Vec<String>,
        #[command(flatten)]
        flags: CrawlFlags,
    },
    /// List the configured sites
    Sites,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "linkscout=debug"
    } else if cli.quiet || cli.json {
        "linkscout=warn"
    } else {
        "linkscout=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(output::color_enabled()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Global flags travel as env vars so every module can check them
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    if cli.verbose {
        std::env::set_var(output::VERBOSE_ENV, "1");
    }
    if cli.no_color {
        std::env::set_var(output::NO_COLOR_ENV, "1");
    }
    init_tracing(&cli);

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Discover {
            materials,
            sites,
            defaults,
            flags,
        } => cli::discover_cmd::run(config, materials, sites, *defaults, flags).await,
        Commands::Seeds { urls, flags } => cli::seeds_cmd::run(config, urls, flags).await,
        Commands::Sites => cli::sites_cmd::run(config).await,
        Commands::Doctor => cli::doctor::run(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "linkscout", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
