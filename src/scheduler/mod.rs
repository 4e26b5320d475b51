//! Hourly reminder dispatch.
//!
//! A single timer fires at minute 0 of every hour. Each tick looks up the
//! users due at that hour, reads their day so far, and pushes one nudge
//! through the notification channel. The scheduler only ever reads the
//! table; a failed tick is logged and the loop keeps going.

use crate::controller::render;
use crate::dates;
use crate::files::{AliasStore, ReminderStore};
use crate::store::{TableBackend, TabularStore};
use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

/// Result of pushing one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The recipient blocked the bot; their reminders must be dropped.
    Blocked,
    Error,
}

/// Outbound notification contract (implemented by the chat transport).
pub trait NotificationChannel {
    fn send(&self, user_id: i64, text: &str) -> SendOutcome;
}

/// Runs `task` once per hour, aligned to minute 0, forever. Task failures
/// are logged, never fatal.
pub async fn run_hourly<F, Fut>(mut task: F) -> Result<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    info!("reminder scheduler started");

    loop {
        let delay = seconds_until_next_hour(Local::now().naive_local());
        sleep(delay).await;

        let hour = Local::now().hour();
        if let Err(error) = task(hour).await {
            error!(error = %error, hour, "reminder tick failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

fn seconds_until_next_hour(now: NaiveDateTime) -> Duration {
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    Duration::from_secs(3600 - seconds_into_hour)
}

/// One tick: notify every user with a reminder registered for `hour`.
/// A `Blocked` outcome removes all of that user's reminders.
pub fn notify_due_users<B: TableBackend>(
    store: &TabularStore<B>,
    channel: &impl NotificationChannel,
    reminders: &ReminderStore,
    aliases: &AliasStore,
    hour: u32,
    boundary_hour: u32,
) -> Result<()> {
    let due = reminders.users_for_hour(hour);
    if due.is_empty() {
        return Ok(());
    }

    let date = dates::format_date(dates::logical_today(boundary_hour));
    let alias_map = aliases.load();

    for user_id in due {
        let data = store.day_data(&date);
        let text = reminder_message(&data, &alias_map);

        match channel.send(user_id, &text) {
            SendOutcome::Sent => info!(user_id, hour, "reminder sent"),
            SendOutcome::Blocked => {
                let cleared = reminders.clear_user(user_id)?;
                info!(user_id, cleared, "user blocked the bot; reminders removed");
            }
            SendOutcome::Error => warn!(user_id, hour, "reminder delivery failed"),
        }
    }

    Ok(())
}

fn reminder_message(data: &BTreeMap<String, f64>, aliases: &BTreeMap<String, String>) -> String {
    let total: f64 = data.values().sum();
    if total == 0.0 {
        return "📝 Time to log your activities!\n\n\
                Nothing recorded yet today. Tap /quick to start!"
            .to_string();
    }

    let mut entries = data
        .iter()
        .filter(|(_, score)| **score > 0.0)
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    let lines = entries
        .iter()
        .map(|(key, score)| {
            format!(
                "{}: {} ({})",
                render::display_name(aliases, key),
                render::stars_glyphs(**score),
                render::format_value(**score)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "📝 Time to log your activities!\n\n\
         📊 Today so far:\n{lines}\n\
         🎯 Total: {}\n\n\
         Tap /quick to log more!",
        render::format_value(total)
    )
}
