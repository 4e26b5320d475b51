//! Message texts and keyboard layouts for the chat flows.

use super::{Button, ButtonAction, Keyboard};
use crate::dates;
use crate::scoring::ScoringPolicy;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const HELP_TEXT: &str = "Hi! I track daily activity ratings as stars.\n\n\
Commands:\n\
/start — this greeting\n\
/help — help\n\
/quick — rate activities via buttons\n\
/stats — daily statistics\n\
/list — all known activities\n\
/reminders — reminder hours\n\
/log <text> — log pairs like `чтение:7, спорт 4` in one message\n\n\
Pick an activity, tap a star value, done. Use /quick to begin.";

/// Alias if one is registered, otherwise the capitalized key.
pub fn display_name(aliases: &BTreeMap<String, String>, key: &str) -> String {
    if let Some(alias) = aliases.get(key) {
        return alias.clone();
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn stars_glyphs(stars: f64) -> String {
    if stars == 0.0 {
        "❌".to_string()
    } else if stars < 1.0 {
        "🌟".to_string()
    } else {
        "⭐".repeat(stars as usize)
    }
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn date_label(date: NaiveDate, boundary_hour: u32) -> String {
    let today = dates::logical_today(boundary_hour);
    if date == today {
        "today".to_string()
    } else if today.signed_duration_since(date).num_days() == 1 {
        "yesterday".to_string()
    } else {
        dates::format_date(date)
    }
}

pub fn activity_prompt(date: NaiveDate, boundary_hour: u32) -> String {
    format!(
        "Logging for {}.\n\nPick an activity:",
        date_label(date, boundary_hour)
    )
}

/// Main menu: recent activities two per row, then management and date
/// controls. The "today" shortcut only appears while a date override is
/// active.
pub fn activity_menu(
    recent: &[String],
    aliases: &BTreeMap<String, String>,
    show_today: bool,
) -> Keyboard {
    let mut rows: Keyboard = recent
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|key| Button {
                    label: display_name(aliases, key),
                    action: ButtonAction::Activity(key.clone()),
                })
                .collect()
        })
        .collect();

    let mut management = Vec::new();
    if !recent.is_empty() {
        management.push(Button {
            label: "📋 All activities".to_string(),
            action: ButtonAction::ListAll,
        });
    }
    management.push(Button {
        label: "➕ Add new".to_string(),
        action: ButtonAction::AddNew,
    });
    rows.push(management);

    let mut date_row = Vec::new();
    if show_today {
        date_row.push(Button {
            label: "🏠 Today".to_string(),
            action: ButtonAction::Today,
        });
    }
    date_row.push(Button {
        label: "📅 Pick date".to_string(),
        action: ButtonAction::SelectDate,
    });
    rows.push(date_row);

    rows.push(vec![
        Button {
            label: "📊 Stats".to_string(),
            action: ButtonAction::StatsMenu,
        },
        Button {
            label: "⏰ Reminders".to_string(),
            action: ButtonAction::RemindersMenu,
        },
        Button {
            label: "📝 Aliases".to_string(),
            action: ButtonAction::AliasMenu,
        },
    ]);

    rows
}

pub fn star_menu(policy: ScoringPolicy) -> Keyboard {
    let mut rows: Keyboard = policy
        .star_menu()
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&stars| Button {
                    label: format!("{} {}", stars_glyphs(stars), format_value(stars)),
                    action: ButtonAction::Rate(stars),
                })
                .collect()
        })
        .collect();

    rows.push(vec![Button {
        label: "❌ None (0)".to_string(),
        action: ButtonAction::Rate(0.0),
    }]);
    rows.push(vec![
        Button {
            label: "← Back".to_string(),
            action: ButtonAction::Back,
        },
        Button {
            label: "📅 Pick date".to_string(),
            action: ButtonAction::SelectDate,
        },
    ]);

    rows
}

pub fn rate_prompt(display: &str, date: NaiveDate, boundary_hour: u32) -> String {
    format!(
        "⭐ Rate '{display}' for {}:",
        date_label(date, boundary_hour)
    )
}

pub fn rating_result(display: &str, stars: f64) -> String {
    format!(
        "✅ {} {display} = {}",
        stars_glyphs(stars),
        format_value(stars)
    )
}

pub fn date_menu(boundary_hour: u32) -> Keyboard {
    let mut rows: Keyboard = dates::recent_dates(7, boundary_hour)
        .into_iter()
        .map(|(date, label)| {
            vec![Button {
                label: format!("📅 {label}"),
                action: ButtonAction::PickDate(date),
            }]
        })
        .collect();

    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::Back,
    }]);
    rows
}

pub fn stats_menu(boundary_hour: u32) -> Keyboard {
    let mut rows: Keyboard = dates::recent_dates(3, boundary_hour)
        .into_iter()
        .map(|(date, label)| {
            vec![Button {
                label: format!("📊 {label}"),
                action: ButtonAction::StatsFor(date),
            }]
        })
        .collect();

    rows.push(vec![Button {
        label: "📋 Another date".to_string(),
        action: ButtonAction::StatsPickDate,
    }]);
    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::Back,
    }]);
    rows
}

pub fn stats_pick_menu(boundary_hour: u32) -> Keyboard {
    let mut rows: Keyboard = dates::recent_dates(7, boundary_hour)
        .into_iter()
        .map(|(date, label)| {
            vec![Button {
                label: format!("📊 {label}"),
                action: ButtonAction::StatsFor(date),
            }]
        })
        .collect();

    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::StatsMenu,
    }]);
    rows
}

pub fn stats_text(
    date: NaiveDate,
    data: &BTreeMap<String, f64>,
    total: f64,
    aliases: &BTreeMap<String, String>,
) -> String {
    if data.is_empty() || total == 0.0 {
        return format!("📊 Stats for {date}\n\nNothing logged for this day.");
    }

    let mut entries = data
        .iter()
        .filter(|(_, score)| **score > 0.0)
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut lines = vec![format!("📊 Stats for {date}\n")];
    for (key, score) in entries {
        lines.push(format!(
            "{}: {} ({})",
            display_name(aliases, key),
            stars_glyphs(*score),
            format_value(*score)
        ));
    }
    lines.push(format!("\n🎯 Total: {}", format_value(total)));
    lines.join("\n")
}

pub fn reminders_text(hours: &[u32]) -> String {
    if hours.is_empty() {
        "⏰ You have no reminders yet.".to_string()
    } else {
        let listed = hours
            .iter()
            .map(|hour| format!("{hour:02}:00"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("⏰ Your reminders: {listed}")
    }
}

pub fn reminders_menu(has_reminders: bool) -> Keyboard {
    let mut rows = vec![vec![Button {
        label: "➕ Add reminder".to_string(),
        action: ButtonAction::RemindersAdd,
    }]];
    if has_reminders {
        rows.push(vec![Button {
            label: "🗑 Delete reminder".to_string(),
            action: ButtonAction::RemindersDelete,
        }]);
    }
    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::Back,
    }]);
    rows
}

pub fn reminder_hours_menu() -> Keyboard {
    let mut rows: Keyboard = (0..24u32)
        .collect::<Vec<_>>()
        .chunks(6)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&hour| Button {
                    label: format!("{hour:02}:00"),
                    action: ButtonAction::AddReminder(hour),
                })
                .collect()
        })
        .collect();

    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::RemindersMenu,
    }]);
    rows
}

pub fn reminder_delete_menu(hours: &[u32]) -> Keyboard {
    let mut rows: Keyboard = hours
        .iter()
        .map(|&hour| {
            vec![Button {
                label: format!("🗑 {hour:02}:00"),
                action: ButtonAction::DeleteReminder(hour),
            }]
        })
        .collect();

    rows.push(vec![Button {
        label: "← Back".to_string(),
        action: ButtonAction::RemindersMenu,
    }]);
    rows
}

pub fn alias_menu() -> Keyboard {
    vec![
        vec![Button {
            label: "📋 List aliases".to_string(),
            action: ButtonAction::AliasList,
        }],
        vec![Button {
            label: "➕ Add alias".to_string(),
            action: ButtonAction::AliasAdd,
        }],
        vec![Button {
            label: "← Back".to_string(),
            action: ButtonAction::Back,
        }],
    ]
}

pub fn alias_list_text(aliases: &BTreeMap<String, String>) -> String {
    if aliases.is_empty() {
        return "📋 No aliases registered yet.".to_string();
    }

    let mut lines = vec!["📋 Aliases:\n".to_string()];
    for (key, display) in aliases {
        lines.push(format!("• {key} → {display}"));
    }
    lines.join("\n")
}

pub const ALIAS_PROMPT: &str = "➕ Send the alias as:\n\
`activity = Display name`\n\n\
For example:\n\
`чтение = 📚 Чтение`";
