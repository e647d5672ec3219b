mod cli;

use apkscout::{
    apk::{self, ApkCatalog, ApkProvider, ApkTool},
    config,
};
use scout_fetch::{FetchEngine, ItemCatalog, MetadataProvider, RunState, Strategy};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "apkscout=trace,scout_fetch=trace,scout_core=debug".to_string()
        } else {
            "apkscout=info,scout_fetch=info".to_string()
        }
    });

    // stdout carries results; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { filter } => list_packages(cli.config.as_deref(), filter.as_deref()),
        Commands::Provides { package } => show_provides(cli.config.as_deref(), &package),
        Commands::Fetch {
            strategy,
            workers,
            call_timeout,
            filter,
            cancel_after,
            json,
        } => fetch(
            cli.config.as_deref(),
            FetchArgs {
                strategy,
                workers,
                call_timeout,
                filter,
                cancel_after,
                json,
            },
        ),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("apkscout {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn matches_filter(name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |q| name.contains(q))
}

fn list_packages(config_path: Option<&Path>, filter: Option<&str>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tool = ApkTool::from_config(&config.apk)?;

    let packages = ApkCatalog::new(tool)
        .list_items()
        .context("Failed to list packages")?;

    for pkg in packages
        .iter()
        .filter(|p| matches_filter(p.as_str(), filter))
    {
        println!("{}", pkg);
    }

    Ok(())
}

fn show_provides(config_path: Option<&Path>, package: &str) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tool = ApkTool::from_config(&config.apk)?;

    let provides = ApkProvider::new(tool)
        .fetch_provides(&package.into())
        .with_context(|| format!("Failed to look up {package}"))?;

    for line in provides {
        println!("{}", line);
    }

    Ok(())
}

struct FetchArgs {
    strategy: Option<Strategy>,
    workers: Option<usize>,
    call_timeout: Option<u64>,
    filter: Option<String>,
    cancel_after: Option<f64>,
    json: bool,
}

fn fetch(config_path: Option<&Path>, args: FetchArgs) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags override the file
    if args.workers.is_some() {
        config.fetch.workers = args.workers;
    }
    if args.call_timeout.is_some() {
        config.fetch.call_timeout_secs = args.call_timeout;
    }
    config::validate_config(&config)?;

    let cancel_after = args
        .cancel_after
        .map(|secs| {
            Duration::try_from_secs_f64(secs).with_context(|| {
                format!("--cancel-after must be a non-negative number of seconds, got {secs}")
            })
        })
        .transpose()?;

    for warning in config.warnings(num_cpus::get()) {
        tracing::warn!("{}", warning);
    }

    let strategy = args.strategy.unwrap_or(config.fetch.strategy);
    let tool = ApkTool::from_config(&config.apk)?;
    let catalog = ApkCatalog::new(tool.clone());
    let engine = FetchEngine::new(Arc::new(ApkProvider::new(tool)), config.fetch.clone());

    let run = match args.filter.as_deref() {
        Some(q) => {
            let packages = catalog.list_items().context("Failed to list packages")?;
            engine.start_run(
                packages
                    .into_iter()
                    .filter(|p| matches_filter(p.as_str(), Some(q))),
                strategy,
            )?
        }
        None => engine.start_catalog_run(&catalog, strategy)?,
    };

    let state = match cancel_after {
        Some(limit) => match run.wait_timeout(limit) {
            Some(state) => state,
            None => {
                tracing::warn!("Run still going after {:?}; cancelling", limit);
                run.cancel();
                run.await_completion()
            }
        },
        None => run.await_completion(),
    };

    let results = run.results().snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (pkg, record) in &results {
            println!("{}", pkg);
            for line in record.iter() {
                println!("  {}", line);
            }
        }
    }

    let stats = run.stats();
    eprintln!(
        "{} {} of {} packages ({} failed) with {} {} workers in {} ms",
        if state == RunState::Completed {
            "Fetched"
        } else {
            "Cancelled after"
        },
        stats.fetched,
        stats.items,
        stats.failed,
        stats.workers,
        stats.strategy,
        stats.elapsed_ms
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = apk::check_tools(&config.apk);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. apkscout needs apk to list and inspect packages.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let fetch = &config.fetch;
    let cores = num_cpus::get();
    println!("  Strategy: {}", fetch.strategy);
    println!(
        "  Workers: {} streaming / {} partitioned ({} cores)",
        fetch.worker_count(Strategy::StreamingQueue, cores),
        fetch.worker_count(Strategy::StaticPartition, cores),
        cores
    );
    match fetch.call_timeout_secs {
        Some(secs) => println!("  Call timeout: {}s", secs),
        None => println!("  Call timeout: none"),
    }
    println!("  apk: {}", config.apk.program.display());
    if let Some(ref elevate) = config.apk.elevate {
        println!("  Elevate: {}", elevate);
    }

    for warning in config.warnings(cores) {
        println!("  ! {}", warning);
    }

    Ok(())
}
