use crate::config::{BOT_TOKEN_ENV, Config, SHEETS_TOKEN_ENV, parse_boundary_hour};
use crate::scoring::ScoringPolicy;
use anyhow::{Context, Result};
use dialoguer::{Input, Select, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to starlog onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let mut config = Config::load().unwrap_or_default();

    println!("\n[1/5] Telegram bot token");
    println!("  Create a bot with @BotFather and paste its token.");
    println!("  Leave empty to provide it via {BOT_TOKEN_ENV} instead.");
    let token: String = Input::with_theme(&theme)
        .with_prompt("  Bot token")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read bot token")?;
    config.bot_token = (!token.trim().is_empty()).then(|| token.trim().to_string());

    println!("\n[2/5] Spreadsheet");
    let spreadsheet_id: String = Input::with_theme(&theme)
        .with_prompt("  Spreadsheet id")
        .with_initial_text(config.spreadsheet_id.clone())
        .interact_text()
        .context("Failed to read spreadsheet id")?;
    config.spreadsheet_id = spreadsheet_id.trim().to_string();

    let sheet_name: String = Input::with_theme(&theme)
        .with_prompt("  Worksheet name")
        .default(config.sheet_name.clone())
        .interact_text()
        .context("Failed to read worksheet name")?;
    config.sheet_name = sheet_name.trim().to_string();
    println!("  Provide the API access token via {SHEETS_TOKEN_ENV} or `starlog config set sheets.token <TOKEN>`.");

    println!("\n[3/5] Scoring policy");
    let policies = [
        ScoringPolicy::Direct,
        ScoringPolicy::Proportional,
        ScoringPolicy::Hours,
    ];
    let labels = [
        "direct — store the star value as-is",
        "proportional — full stars store as 10",
        "hours — stars are hours spent",
    ];
    let selected = Select::with_theme(&theme)
        .with_prompt("  How should stars be stored?")
        .default(0)
        .items(&labels)
        .interact()
        .context("Failed to select scoring policy")?;
    config.scoring_policy = policies[selected];

    println!("\n[4/5] Day boundary");
    println!("  Entries made before this hour count for the previous day.");
    let boundary: String = Input::with_theme(&theme)
        .with_prompt("  Boundary hour (0-23)")
        .default(config.day_boundary_hour.to_string())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_boundary_hour(input)
                .map(|_| ())
                .map_err(|_| "Enter an hour between 0 and 23")
        })
        .interact_text()
        .context("Failed to read boundary hour")?;
    config.day_boundary_hour = parse_boundary_hour(&boundary)?;

    println!("\n[5/5] Data files");
    config.ensure_bootstrap_files()?;
    config.save()?;
    println!("  ✓ Config written to {}", Config::config_path().display());

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run `starlog doctor` to verify, then `starlog service`.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
