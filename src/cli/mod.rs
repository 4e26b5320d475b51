pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "starlog",
    about = "Daily activity star ratings in a date-indexed sheet"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive first-run setup.
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    /// Print one day's ratings and total.
    Stats {
        #[arg(long)]
        date: Option<String>,
    },
    /// List every known activity key.
    Activities,
    /// Run the bot and the reminder scheduler in the foreground.
    Service,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
