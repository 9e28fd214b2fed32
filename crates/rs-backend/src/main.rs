//! `rs-backend` - CLI and HTTP server for survey and story collection
//!
//! This binary loads configuration, prepares the configured storage and
//! either serves the HTTP API or runs a one-off command against the data.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rs_backend::cli::{Cli, Command, ConfigCommand, OutputArgs, ServeCommand};
use rs_backend::config::BackendKind;
use rs_backend::report::{Q_MADE_PROGRESS, Q_SET_GOAL};
use rs_backend::{init_logging, open_configured, server, Config, SurveyService};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(load_config(cli.config)?, serve_cmd),
        Command::Init => handle_init(&load_config(cli.config)?),
        Command::Report(args) => handle_report(&load_config(cli.config)?, &args),
        Command::Stories(args) => handle_stories(&load_config(cli.config)?, &args),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(config_path).context("failed to load configuration")
}

fn open_service(config: &Config) -> anyhow::Result<SurveyService> {
    let storage = open_configured(config).with_context(|| {
        format!("failed to initialize {} storage", config.storage.backend)
    })?;
    Ok(SurveyService::new(storage))
}

fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = cmd.bind {
        config.server.bind = bind;
        config.validate()?;
    }
    info!(config = ?config.redacted(), "Starting {}", config.app_name);

    // Storage is prepared before the runtime starts so a bad medium fails
    // fast. The last handle is dropped here, outside the runtime, which the
    // blocking HTTP client requires.
    let storage = open_configured(&config).with_context(|| {
        format!("failed to initialize {} storage", config.storage.backend)
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(server::serve(&config, Arc::clone(&storage)));
    drop(runtime);
    drop(storage);

    result.context("server failed")
}

fn handle_init(config: &Config) -> anyhow::Result<()> {
    let service = open_service(config)?;
    println!(
        "Initialized {} storage ({})",
        service.storage().name(),
        describe_location(config)
    );
    Ok(())
}

fn handle_report(config: &Config, args: &OutputArgs) -> anyhow::Result<()> {
    let report = open_service(config)?.get_survey_report()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Survey report");
    println!("-------------");
    println!("Total responses: {}", report.total_responses);
    if report.total_responses == 0 {
        return Ok(());
    }

    println!();
    println!("[Organizations]");
    for (org, count) in &report.organization_breakdown {
        println!("  {org:<20} {count}");
    }

    for question in [Q_SET_GOAL, Q_MADE_PROGRESS] {
        let Some(counts) = report.question(question) else {
            continue;
        };
        println!();
        println!("[{question}]");
        println!("  {:<20} yes {:>4}  no {:>4}", "all", counts.yes, counts.no);
        if let Some(by_org) = report.question_stats_by_org.get(question) {
            for (org, counts) in by_org {
                println!("  {org:<20} yes {:>4}  no {:>4}", counts.yes, counts.no);
            }
        }
    }
    Ok(())
}

fn handle_stories(config: &Config, args: &OutputArgs) -> anyhow::Result<()> {
    let stories = open_service(config)?.list_stories()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stories)?);
        return Ok(());
    }

    if stories.is_empty() {
        println!("No stories yet.");
    }
    for story in &stories {
        println!("[{}] {}", story.datetime_submitted, story.content);
    }
    Ok(())
}

fn describe_location(config: &Config) -> String {
    match config.storage.backend {
        BackendKind::Csv => config.csv_data_dir().display().to_string(),
        BackendKind::Sheets => format!(
            "spreadsheet {}",
            config.storage.sheets.spreadsheet_id.as_deref().unwrap_or("?")
        ),
    }
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("App name:             {}", config.app_name);
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  CSV data dir:       {}", config.csv_data_dir().display());
                println!(
                    "  Credentials:        {}",
                    config
                        .storage
                        .sheets
                        .credentials_path
                        .as_deref()
                        .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
                );
                println!(
                    "  Spreadsheet id:     {}",
                    config
                        .storage
                        .sheets
                        .spreadsheet_id
                        .as_deref()
                        .unwrap_or("(not set)")
                );
                println!(
                    "  Request timeout:    {}s",
                    config.storage.sheets.request_timeout_secs
                );
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
