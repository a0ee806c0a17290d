//! `bedboard` - CLI for the bed occupancy service
//!
//! This binary runs the HTTP API and offers a few maintenance commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use bedboard::cli::{Cli, Command, ConfigCommand, InitCommand, ServeCommand};
use bedboard::seed::{seed_demo, seed_statuses};
use bedboard::{init_logging, Config, Storage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd),
        Command::Init(init_cmd) => handle_init(&config, &init_cmd),
        Command::Stats(stats_cmd) => handle_stats(&config, stats_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, cli.config, config_cmd),
    }
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> Result<(), Box<dyn std::error::Error>> {
    cmd.apply(&mut config);
    config.validate()?;

    let storage = Storage::open(config.database_path())?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(bedboard::server::serve(&config, storage))?;
    Ok(())
}

fn handle_init(config: &Config, cmd: &InitCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = Storage::open(config.database_path())?;
    let inserted = seed_statuses(&storage)?;

    println!("Database:  {}", storage.path().display());
    println!("Statuses:  {inserted} added");

    if cmd.demo {
        let summary = seed_demo(&mut storage)?;
        println!(
            "Demo data: {} locations, {} beds, {} patients added",
            summary.locations, summary.beds, summary.patients
        );
    }
    Ok(())
}

fn handle_stats(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::open(config.database_path())?;
    let dashboard = storage.dashboard()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    println!("Bed occupancy");
    println!("=============");
    println!();
    println!("Total beds: {}", dashboard.overall.total);
    for status in &dashboard.overall.by_status {
        println!(
            "  {:<20} {:>5}  {:>5.1}%",
            status.name, status.count, status.percentage
        );
    }

    if !dashboard.towers.is_empty() {
        println!();
        for tower in &dashboard.towers {
            println!(
                "{:<22} {:>3}/{:<3} occupied  {:>5.1}%",
                tower.tower.name, tower.occupied, tower.total, tower.occupancy_rate
            );
        }
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_path: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Database]");
                println!("  Path:            {}", config.database_path().display());
                println!("  Seed statuses:   {}", config.database.seed_statuses);
                println!();
                println!("[Server]");
                println!("  Host:            {}", config.server.host);
                println!("  Port:            {}", config.server.port);
                println!();
                println!("[Workflow]");
                println!("  Default actor:   {}", config.workflow.default_actor);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
