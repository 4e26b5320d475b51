mod cli;
mod config;
mod controller;
mod dates;
mod files;
mod normalize;
mod parse;
mod scheduler;
mod scoring;
mod session;
mod store;
mod telegram;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::controller::{Controller, render};
use crate::files::{AliasStore, HistoryStore, ReminderStore};
use crate::store::TabularStore;
use crate::store::sheets::SheetsBackend;
use crate::telegram::TelegramClient;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor().await,
        Commands::Stats { date } => handle_stats(date).await,
        Commands::Activities => handle_activities(),
        Commands::Service => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            let masked = if key.contains("token") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_config()?;

    println!("starlog status");
    println!("- config: {}", Config::config_path().display());
    println!(
        "- spreadsheet_id: {}",
        value_or(&config.spreadsheet_id, "not set")
    );
    println!("- sheet_name: {}", config.sheet_name);
    println!("- scoring_policy: {}", config.scoring_policy.name());
    println!("- day_boundary_hour: {}", config.day_boundary_hour);
    println!(
        "- known_activities: {}",
        HistoryStore::new(&config.history_path).all().len()
    );
    println!(
        "- aliases: {}",
        AliasStore::new(&config.aliases_path).load().len()
    );
    println!(
        "- reminders: {}",
        ReminderStore::new(&config.reminders_path).load().len()
    );

    Ok(())
}

async fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path();
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let config = load_or_default_config()?;

    if config.bot_token().is_some() {
        println!("[OK] bot token is configured");
    } else {
        println!("[WARN] bot token is missing");
        issues.push("bot token missing");
    }

    if config.spreadsheet_id.trim().is_empty() {
        println!("[WARN] spreadsheet_id is not set");
        issues.push("spreadsheet missing");
    } else {
        println!("[OK] spreadsheet_id is set");
    }

    if config.sheets_token().is_none() {
        println!("[WARN] Sheets access token is missing");
        issues.push("sheets token missing");
    } else {
        let probe = Arc::new(config.clone());
        let headers = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let store = TabularStore::new(SheetsBackend::from_config(&probe)?);
            store.ensure_columns(&[])
        })
        .await
        .context("doctor probe task failed")?;

        match headers {
            Ok(headers) => println!("[OK] sheet reachable ({} columns)", headers.len()),
            Err(error) => {
                println!("[WARN] sheet check failed: {error}");
                issues.push("sheet unreachable");
            }
        }
    }

    if config.aliases_path.exists() {
        println!("[OK] alias file exists: {}", config.aliases_path.display());
    } else {
        println!("[WARN] alias file missing (run `starlog onboard`)");
        issues.push("alias file missing");
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn handle_stats(date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let target = parse_optional_date(date, config.day_boundary_hour)?;

    let output = tokio::task::spawn_blocking(move || -> Result<String> {
        let store = TabularStore::new(SheetsBackend::from_config(&config)?);
        let data = store.day_data(&dates::format_date(target));
        let total = data.values().sum();
        let aliases = AliasStore::new(&config.aliases_path).load();
        Ok(render::stats_text(target, &data, total, &aliases))
    })
    .await
    .context("stats task failed")??;

    println!("{output}");
    Ok(())
}

fn handle_activities() -> Result<()> {
    let config = load_config()?;
    let history = HistoryStore::new(&config.history_path);
    let aliases = AliasStore::new(&config.aliases_path).load();

    let all = history.all();
    if all.is_empty() {
        println!("No activities recorded yet.");
        return Ok(());
    }

    for key in &all {
        println!("{key} — {}", render::display_name(&aliases, key));
    }
    println!("total: {}", all.len());

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.validate_for_service()?;
    config.ensure_bootstrap_files()?;

    let shared_config = Arc::new(config);
    let bot_config = Arc::clone(&shared_config);
    let scheduler_config = Arc::clone(&shared_config);

    info!("starlog service started");

    tokio::select! {
        bot_result = run_bot(bot_config) => {
            bot_result?;
        }
        scheduler_result = scheduler::run_hourly(move |hour| {
            let config = Arc::clone(&scheduler_config);
            async move {
                tokio::task::spawn_blocking(move || run_reminder_tick(&config, hour))
                    .await
                    .context("reminder tick task failed")?
            }
        }) => {
            scheduler_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn run_bot(config: Arc<Config>) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let client = TelegramClient::from_config(&config)?;
        let backend = SheetsBackend::from_config(&config)?;
        let mut controller = Controller::new(
            TabularStore::new(backend),
            AliasStore::new(&config.aliases_path),
            HistoryStore::new(&config.history_path),
            ReminderStore::new(&config.reminders_path),
            config.scoring_policy,
            config.day_boundary_hour,
        );
        telegram::run_polling(&client, &mut controller)
    })
    .await
    .context("bot loop task failed")?
}

fn run_reminder_tick(config: &Config, hour: u32) -> Result<()> {
    let reminders = ReminderStore::new(&config.reminders_path);
    if reminders.users_for_hour(hour).is_empty() {
        return Ok(());
    }

    let channel = TelegramClient::from_config(config)?;
    let store = TabularStore::new(SheetsBackend::from_config(config)?);
    let aliases = AliasStore::new(&config.aliases_path);

    scheduler::notify_due_users(
        &store,
        &channel,
        &reminders,
        &aliases,
        hour,
        config.day_boundary_hour,
    )
}

fn parse_optional_date(input: Option<String>, boundary_hour: u32) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2024-03-09"))
        })
        .transpose()?
        .map_or_else(|| Ok(dates::logical_today(boundary_hour)), Ok)
}

fn value_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `starlog onboard` first.".to_string())
}
