//! Interaction controller: turns typed user events into session
//! transitions, table writes, and rendered replies.
//!
//! One event is handled at a time, to completion; the transport delivers
//! the next event only after the previous reply batch is assembled, so no
//! intra-process locking is needed around the table.

pub mod render;

use crate::dates;
use crate::files::{AliasStore, HistoryStore, ReminderStore};
use crate::normalize::activity_key;
use crate::parse;
use crate::scoring::ScoringPolicy;
use crate::session::{Mode, SessionStore};
use crate::store::{TableBackend, TabularStore};
use chrono::NaiveDate;
use tracing::{info, warn};

const MENU_ACTIVITY_COUNT: usize = 10;
const COULD_NOT_SAVE: &str = "⚠️ Could not save, try again.";

/// A discrete user event, already decoded by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Help,
    Quick,
    Stats,
    ListAll,
    Reminders,
    /// Explicit `/log <text>` command; an empty parse is reported.
    Log(String),
    /// Free text outside any command.
    Text(String),
    Button(ButtonAction),
}

/// Symbolic "button pressed" events carried in callback data.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
    Activity(String),
    Rate(f64),
    PickDate(NaiveDate),
    Today,
    AddNew,
    SelectDate,
    Back,
    ListAll,
    StatsMenu,
    StatsPickDate,
    StatsFor(NaiveDate),
    RemindersMenu,
    RemindersAdd,
    RemindersDelete,
    AddReminder(u32),
    DeleteReminder(u32),
    AliasMenu,
    AliasAdd,
    AliasList,
}

impl ButtonAction {
    pub fn encode(&self) -> String {
        match self {
            Self::Activity(key) => format!("act:{key}"),
            Self::Rate(stars) => format!("rate:{stars}"),
            Self::PickDate(date) => format!("date:{date}"),
            Self::Today => "today".to_string(),
            Self::AddNew => "add_new".to_string(),
            Self::SelectDate => "pick_date".to_string(),
            Self::Back => "back".to_string(),
            Self::ListAll => "list_all".to_string(),
            Self::StatsMenu => "stats".to_string(),
            Self::StatsPickDate => "stats_pick".to_string(),
            Self::StatsFor(date) => format!("stats:{date}"),
            Self::RemindersMenu => "rem".to_string(),
            Self::RemindersAdd => "rem_add".to_string(),
            Self::RemindersDelete => "rem_del".to_string(),
            Self::AddReminder(hour) => format!("rem_add:{hour}"),
            Self::DeleteReminder(hour) => format!("rem_del:{hour}"),
            Self::AliasMenu => "alias".to_string(),
            Self::AliasAdd => "alias_add".to_string(),
            Self::AliasList => "alias_list".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "today" => return Some(Self::Today),
            "add_new" => return Some(Self::AddNew),
            "pick_date" => return Some(Self::SelectDate),
            "back" => return Some(Self::Back),
            "list_all" => return Some(Self::ListAll),
            "stats" => return Some(Self::StatsMenu),
            "stats_pick" => return Some(Self::StatsPickDate),
            "rem" => return Some(Self::RemindersMenu),
            "rem_add" => return Some(Self::RemindersAdd),
            "rem_del" => return Some(Self::RemindersDelete),
            "alias" => return Some(Self::AliasMenu),
            "alias_add" => return Some(Self::AliasAdd),
            "alias_list" => return Some(Self::AliasList),
            _ => {}
        }

        if let Some(key) = data.strip_prefix("act:") {
            (!key.is_empty()).then(|| Self::Activity(key.to_string()))
        } else if let Some(raw) = data.strip_prefix("rate:") {
            raw.parse().ok().map(Self::Rate)
        } else if let Some(raw) = data.strip_prefix("date:") {
            raw.parse().ok().map(Self::PickDate)
        } else if let Some(raw) = data.strip_prefix("stats:") {
            raw.parse().ok().map(Self::StatsFor)
        } else if let Some(raw) = data.strip_prefix("rem_add:") {
            raw.parse().ok().map(Self::AddReminder)
        } else if let Some(raw) = data.strip_prefix("rem_del:") {
            raw.parse().ok().map(Self::DeleteReminder)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub struct Controller<B: TableBackend> {
    store: TabularStore<B>,
    sessions: SessionStore,
    aliases: AliasStore,
    history: HistoryStore,
    reminders: ReminderStore,
    policy: ScoringPolicy,
    boundary_hour: u32,
}

impl<B: TableBackend> Controller<B> {
    pub fn new(
        store: TabularStore<B>,
        aliases: AliasStore,
        history: HistoryStore,
        reminders: ReminderStore,
        policy: ScoringPolicy,
        boundary_hour: u32,
    ) -> Self {
        Self {
            store,
            sessions: SessionStore::new(),
            aliases,
            history,
            reminders,
            policy,
            boundary_hour,
        }
    }

    pub fn handle(&mut self, user_id: i64, event: Event) -> Vec<Reply> {
        match event {
            Event::Start | Event::Help => vec![Reply::text(render::HELP_TEXT)],
            Event::Quick => {
                let session = self.sessions.session(user_id);
                session.end_flow();
                session.target_date = None;
                vec![self.menu_reply(user_id)]
            }
            Event::Stats => vec![Reply::with_keyboard(
                "📊 Pick a day:",
                render::stats_menu(self.boundary_hour),
            )],
            Event::ListAll => vec![self.list_all_text()],
            Event::Reminders => vec![self.reminders_overview(user_id)],
            Event::Log(text) => self.handle_log(user_id, &text, true),
            Event::Text(text) => self.handle_text(user_id, &text),
            Event::Button(action) => self.handle_button(user_id, action),
        }
    }

    fn handle_button(&mut self, user_id: i64, action: ButtonAction) -> Vec<Reply> {
        match action {
            ButtonAction::Activity(raw) => {
                let key = activity_key(&raw);
                if key.is_empty() {
                    return vec![self.menu_reply(user_id)];
                }
                self.sessions.session(user_id).mode = Mode::AwaitingRatingStars {
                    activity: key.clone(),
                };
                vec![self.star_menu_reply(user_id, &key)]
            }
            ButtonAction::Rate(stars) => self.handle_rate(user_id, stars),
            ButtonAction::PickDate(date) => {
                let today = dates::logical_today(self.boundary_hour);
                let session = self.sessions.session(user_id);
                session.end_flow();
                session.target_date = (date != today).then_some(date);
                vec![self.menu_reply(user_id)]
            }
            ButtonAction::Today => {
                let session = self.sessions.session(user_id);
                session.end_flow();
                session.target_date = None;
                vec![self.menu_reply(user_id)]
            }
            ButtonAction::AddNew => {
                self.sessions.session(user_id).mode = Mode::AwaitingNewActivityName;
                vec![Reply::with_keyboard(
                    "✏️ Type the name of the new activity:",
                    vec![vec![Button {
                        label: "← Back".to_string(),
                        action: ButtonAction::Back,
                    }]],
                )]
            }
            ButtonAction::SelectDate => vec![Reply::with_keyboard(
                "📅 Pick a date to log for:",
                render::date_menu(self.boundary_hour),
            )],
            ButtonAction::Back => {
                // Abandons any pending flow; no partial write happens.
                self.sessions.session(user_id).end_flow();
                vec![self.menu_reply(user_id)]
            }
            ButtonAction::ListAll => {
                let all = self.history.all();
                if all.is_empty() {
                    return vec![Reply::text("📋 No activities recorded yet.")];
                }
                let aliases = self.aliases.load();
                let mut rows: Keyboard = all
                    .chunks(2)
                    .map(|pair| {
                        pair.iter()
                            .map(|key| Button {
                                label: render::display_name(&aliases, key),
                                action: ButtonAction::Activity(key.clone()),
                            })
                            .collect()
                    })
                    .collect();
                rows.push(vec![Button {
                    label: "← Back".to_string(),
                    action: ButtonAction::Back,
                }]);
                vec![Reply::with_keyboard(
                    format!("📋 All activities ({}):", all.len()),
                    rows,
                )]
            }
            ButtonAction::StatsMenu => vec![Reply::with_keyboard(
                "📊 Pick a day:",
                render::stats_menu(self.boundary_hour),
            )],
            ButtonAction::StatsPickDate => vec![Reply::with_keyboard(
                "📅 Pick a date:",
                render::stats_pick_menu(self.boundary_hour),
            )],
            ButtonAction::StatsFor(date) => {
                let data = self.store.day_data(&dates::format_date(date));
                let total = data.values().sum();
                let aliases = self.aliases.load();
                vec![Reply::with_keyboard(
                    render::stats_text(date, &data, total, &aliases),
                    render::stats_menu(self.boundary_hour),
                )]
            }
            ButtonAction::RemindersMenu => vec![self.reminders_overview(user_id)],
            ButtonAction::RemindersAdd => vec![Reply::with_keyboard(
                "⏰ Pick an hour for the reminder:",
                render::reminder_hours_menu(),
            )],
            ButtonAction::RemindersDelete => {
                let hours = self.reminders.user_hours(user_id);
                vec![Reply::with_keyboard(
                    "🗑 Pick a reminder to delete:",
                    render::reminder_delete_menu(&hours),
                )]
            }
            ButtonAction::AddReminder(hour) => {
                let text = match self.reminders.add(user_id, hour) {
                    Ok(true) => format!("✅ Reminder at {hour:02}:00 added."),
                    Ok(false) => format!("❌ Reminder at {hour:02}:00 already exists."),
                    Err(error) => {
                        warn!(error = %error, user_id, "reminder add failed");
                        COULD_NOT_SAVE.to_string()
                    }
                };
                vec![Reply::text(text), self.reminders_overview(user_id)]
            }
            ButtonAction::DeleteReminder(hour) => {
                let text = match self.reminders.remove(user_id, hour) {
                    Ok(true) => format!("✅ Reminder at {hour:02}:00 deleted."),
                    Ok(false) => format!("❌ No reminder at {hour:02}:00."),
                    Err(error) => {
                        warn!(error = %error, user_id, "reminder delete failed");
                        COULD_NOT_SAVE.to_string()
                    }
                };
                vec![Reply::text(text), self.reminders_overview(user_id)]
            }
            ButtonAction::AliasMenu => vec![Reply::with_keyboard(
                "📝 Alias management:",
                render::alias_menu(),
            )],
            ButtonAction::AliasAdd => {
                self.sessions.session(user_id).mode = Mode::AwaitingAliasText;
                vec![Reply::with_keyboard(
                    render::ALIAS_PROMPT,
                    vec![vec![Button {
                        label: "← Back".to_string(),
                        action: ButtonAction::Back,
                    }]],
                )]
            }
            ButtonAction::AliasList => vec![Reply::with_keyboard(
                render::alias_list_text(&self.aliases.load()),
                render::alias_menu(),
            )],
        }
    }

    /// A star tap is a single terminal action: exactly one write, then
    /// back to the activity menu. The session leaves the rating state no
    /// matter how the write ends.
    fn handle_rate(&mut self, user_id: i64, stars: f64) -> Vec<Reply> {
        let session = self.sessions.session(user_id);
        let Mode::AwaitingRatingStars { activity } = session.mode.clone() else {
            // Stale star button from an already-finished flow.
            return vec![self.menu_reply(user_id)];
        };
        session.end_flow();

        let date = self.target_date(user_id);
        let stored = self.policy.stored_value(stars);

        match self
            .store
            .write_values(&[(activity.clone(), stored)], &dates::format_date(date))
        {
            Ok((_, row)) => {
                info!(user_id, activity = %activity, stars, row, date = %date, "rating saved");
                if let Err(error) = self.history.push(&activity) {
                    warn!(error = %error, "history update failed");
                }
                let aliases = self.aliases.load();
                let display = render::display_name(&aliases, &activity);
                vec![
                    Reply::text(render::rating_result(&display, stars)),
                    self.menu_reply(user_id),
                ]
            }
            Err(error) => {
                warn!(error = %error, user_id, activity = %activity, "rating write failed");
                vec![Reply::text(COULD_NOT_SAVE), self.menu_reply(user_id)]
            }
        }
    }

    fn handle_text(&mut self, user_id: i64, text: &str) -> Vec<Reply> {
        let mode = self.sessions.session(user_id).mode.clone();
        match mode {
            Mode::AwaitingNewActivityName => {
                let key = activity_key(text);
                if key.is_empty() {
                    return vec![Reply::text("✏️ Type the name of the new activity:")];
                }
                self.sessions.session(user_id).mode = Mode::AwaitingRatingStars {
                    activity: key.clone(),
                };
                vec![self.star_menu_reply(user_id, &key)]
            }
            Mode::AwaitingAliasText => self.handle_alias_text(user_id, text),
            Mode::Idle | Mode::AwaitingRatingStars { .. } => {
                self.handle_log(user_id, text, false)
            }
        }
    }

    fn handle_alias_text(&mut self, user_id: i64, text: &str) -> Vec<Reply> {
        let parsed = text
            .split_once('=')
            .map(|(key, display)| (key.trim(), display.trim()))
            .filter(|(key, display)| !key.is_empty() && !display.is_empty());

        let Some((key, display)) = parsed else {
            // Malformed alias text re-prompts; the flow stays open.
            return vec![Reply::text(render::ALIAS_PROMPT)];
        };

        match self.aliases.add(key, display) {
            Ok(true) => {
                self.sessions.session(user_id).end_flow();
                vec![Reply::with_keyboard(
                    format!("✅ Alias added: {} → {display}", activity_key(key)),
                    render::alias_menu(),
                )]
            }
            Ok(false) => vec![Reply::text(render::ALIAS_PROMPT)],
            Err(error) => {
                warn!(error = %error, user_id, "alias write failed");
                self.sessions.session(user_id).end_flow();
                vec![Reply::text(COULD_NOT_SAVE), self.menu_reply(user_id)]
            }
        }
    }

    /// Ad hoc "activity score" pairs from free text, written in one batch
    /// to logical today. An empty parse is only reported when the user
    /// explicitly asked to log.
    fn handle_log(&mut self, user_id: i64, text: &str, explicit: bool) -> Vec<Reply> {
        let pairs = parse::extract_pairs(text);
        if pairs.is_empty() {
            if explicit {
                return vec![Reply::text(
                    "No (activity, score) pairs found. Example: /log чтение:7, спорт 4",
                )];
            }
            return vec![Reply::text(
                "Use /quick to log via buttons, or send pairs like `чтение:7, спорт 4`.",
            )];
        }

        let values = pairs
            .iter()
            .map(|(word, score)| (activity_key(word), *score))
            .collect::<Vec<_>>();
        let date = dates::logical_today(self.boundary_hour);

        match self.store.write_values(&values, &dates::format_date(date)) {
            Ok(_) => {
                for (key, _) in &values {
                    if let Err(error) = self.history.push(key) {
                        warn!(error = %error, "history update failed");
                    }
                }
                info!(user_id, count = values.len(), date = %date, "free-text batch saved");
                vec![
                    Reply::text(format!(
                        "✅ Logged {} activit{} for today.",
                        values.len(),
                        if values.len() == 1 { "y" } else { "ies" }
                    )),
                    self.menu_reply(user_id),
                ]
            }
            Err(error) => {
                warn!(error = %error, user_id, "free-text write failed");
                vec![Reply::text(COULD_NOT_SAVE), self.menu_reply(user_id)]
            }
        }
    }

    fn target_date(&mut self, user_id: i64) -> NaiveDate {
        self.sessions
            .session(user_id)
            .target_date
            .unwrap_or_else(|| dates::logical_today(self.boundary_hour))
    }

    fn menu_reply(&mut self, user_id: i64) -> Reply {
        let date = self.target_date(user_id);
        let show_today = date != dates::logical_today(self.boundary_hour);
        let recent = self.history.load(MENU_ACTIVITY_COUNT);
        let aliases = self.aliases.load();
        Reply::with_keyboard(
            render::activity_prompt(date, self.boundary_hour),
            render::activity_menu(&recent, &aliases, show_today),
        )
    }

    fn star_menu_reply(&mut self, user_id: i64, key: &str) -> Reply {
        let date = self.target_date(user_id);
        let aliases = self.aliases.load();
        let display = render::display_name(&aliases, key);
        Reply::with_keyboard(
            render::rate_prompt(&display, date, self.boundary_hour),
            render::star_menu(self.policy),
        )
    }

    fn list_all_text(&self) -> Reply {
        let all = self.history.all();
        if all.is_empty() {
            return Reply::text(
                "📋 No activities recorded yet.\n\nUse /quick to add the first one!",
            );
        }
        let aliases = self.aliases.load();
        let listed = all
            .iter()
            .map(|key| format!("• {}", render::display_name(&aliases, key)))
            .collect::<Vec<_>>()
            .join("\n");
        Reply::text(format!("📋 All your activities ({}):\n\n{listed}", all.len()))
    }

    fn reminders_overview(&mut self, user_id: i64) -> Reply {
        let hours = self.reminders.user_hours(user_id);
        Reply::with_keyboard(
            render::reminders_text(&hours),
            render::reminders_menu(!hours.is_empty()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ButtonAction, Controller, Event, Reply};
    use crate::dates;
    use crate::files::{AliasStore, HistoryStore, ReminderStore};
    use crate::scoring::ScoringPolicy;
    use crate::session::Mode;
    use crate::store::memory::MemoryBackend;
    use crate::store::{CellWrite, TableBackend, TabularStore};
    use anyhow::bail;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn controller(dir: &TempDir) -> Controller<MemoryBackend> {
        Controller::new(
            TabularStore::new(MemoryBackend::default()),
            AliasStore::new(dir.path().join("aliases.txt")),
            HistoryStore::new(dir.path().join("history.txt")),
            ReminderStore::new(dir.path().join("reminders.txt")),
            ScoringPolicy::Direct,
            6,
        )
    }

    fn today() -> String {
        dates::format_date(dates::logical_today(6))
    }

    #[test]
    fn rating_flow_writes_once_and_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        controller.handle(1, Event::Button(ButtonAction::Activity("йога".to_string())));
        assert_eq!(
            controller.sessions.session(1).mode,
            Mode::AwaitingRatingStars {
                activity: "йога".to_string()
            }
        );

        let replies = controller.handle(1, Event::Button(ButtonAction::Rate(3.0)));
        assert_eq!(controller.sessions.session(1).mode, Mode::Idle);
        assert!(replies[0].text.contains("✅"));

        let data = controller.store.day_data(&today());
        assert_eq!(data.get("йога"), Some(&3.0));

        // A stale star tap after the flow ended writes nothing.
        controller.handle(1, Event::Button(ButtonAction::Rate(5.0)));
        let data = controller.store.day_data(&today());
        assert_eq!(data.get("йога"), Some(&3.0));
    }

    #[test]
    fn date_override_persists_across_ratings() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        controller.handle(1, Event::Button(ButtonAction::PickDate(date)));
        controller.handle(1, Event::Button(ButtonAction::Activity("чтение".to_string())));
        controller.handle(1, Event::Button(ButtonAction::Rate(4.0)));
        controller.handle(1, Event::Button(ButtonAction::Activity("спорт".to_string())));
        controller.handle(1, Event::Button(ButtonAction::Rate(2.0)));

        let data = controller.store.day_data("2024-03-09");
        assert_eq!(data.get("чтение"), Some(&4.0));
        assert_eq!(data.get("спорт"), Some(&2.0));

        controller.handle(1, Event::Button(ButtonAction::Today));
        assert_eq!(controller.sessions.session(1).target_date, None);
    }

    #[test]
    fn back_abandons_pending_flow_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        controller.handle(1, Event::Button(ButtonAction::Activity("йога".to_string())));
        controller.handle(1, Event::Button(ButtonAction::Back));
        assert_eq!(controller.sessions.session(1).mode, Mode::Idle);
        assert!(controller.store.day_data(&today()).is_empty());
    }

    #[test]
    fn new_activity_flow_names_then_rates() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        controller.handle(1, Event::Button(ButtonAction::AddNew));
        controller.handle(1, Event::Text("  Музыка ".to_string()));
        assert_eq!(
            controller.sessions.session(1).mode,
            Mode::AwaitingRatingStars {
                activity: "музыка".to_string()
            }
        );

        controller.handle(1, Event::Button(ButtonAction::Rate(5.0)));
        let data = controller.store.day_data(&today());
        assert_eq!(data.get("музыка"), Some(&5.0));
        assert_eq!(controller.history.load(10), vec!["музыка".to_string()]);
    }

    #[test]
    fn alias_flow_commits_or_reprompts() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        controller.handle(1, Event::Button(ButtonAction::AliasAdd));
        let replies = controller.handle(1, Event::Text("nonsense".to_string()));
        // Malformed input re-prompts and keeps the flow open.
        assert_eq!(controller.sessions.session(1).mode, Mode::AwaitingAliasText);
        assert!(replies[0].text.contains("alias") || replies[0].text.contains("Send"));

        controller.handle(1, Event::Text("Чтение = 📚 Books".to_string()));
        assert_eq!(controller.sessions.session(1).mode, Mode::Idle);
        assert_eq!(
            controller.aliases.display_name("чтение").as_deref(),
            Some("📚 Books")
        );
    }

    #[test]
    fn free_text_pairs_write_to_today() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        controller.handle(1, Event::Text("чтение:7, спорт=4; музыка 0".to_string()));

        let data = controller.store.day_data(&today());
        assert_eq!(data.get("чтение"), Some(&7.0));
        assert_eq!(data.get("спорт"), Some(&4.0));
        assert_eq!(data.get("музыка"), Some(&0.0));
    }

    #[test]
    fn explicit_log_reports_empty_parse() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        let replies = controller.handle(1, Event::Log("reading eight".to_string()));
        assert!(replies[0].text.contains("No (activity, score) pairs"));

        // Passive text never surfaces an error.
        let replies = controller.handle(1, Event::Text("reading eight".to_string()));
        assert!(!replies[0].text.contains("No (activity, score) pairs"));
    }

    #[test]
    fn reminder_buttons_mutate_the_store() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        let replies = controller.handle(7, Event::Button(ButtonAction::AddReminder(9)));
        assert!(replies[0].text.contains("added"));
        assert_eq!(controller.reminders.user_hours(7), vec![9]);

        let replies = controller.handle(7, Event::Button(ButtonAction::AddReminder(9)));
        assert!(replies[0].text.contains("already exists"));

        let replies = controller.handle(7, Event::Button(ButtonAction::DeleteReminder(9)));
        assert!(replies[0].text.contains("deleted"));
        assert!(controller.reminders.user_hours(7).is_empty());
    }

    #[test]
    fn write_failure_reports_and_resets_session() {
        struct FailingBackend;

        impl TableBackend for FailingBackend {
            fn header_row(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec!["Date".to_string(), "йога".to_string()])
            }
            fn date_column(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec!["Date".to_string()])
            }
            fn row(&self, _index: usize) -> anyhow::Result<Vec<String>> {
                Ok(Vec::new())
            }
            fn append_row(&self, _cells: &[String]) -> anyhow::Result<()> {
                bail!("network down")
            }
            fn update_cells(&self, _writes: &[CellWrite]) -> anyhow::Result<()> {
                bail!("network down")
            }
        }

        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(
            TabularStore::new(FailingBackend),
            AliasStore::new(dir.path().join("aliases.txt")),
            HistoryStore::new(dir.path().join("history.txt")),
            ReminderStore::new(dir.path().join("reminders.txt")),
            ScoringPolicy::Direct,
            6,
        );

        controller.handle(1, Event::Button(ButtonAction::Activity("йога".to_string())));
        let replies = controller.handle(1, Event::Button(ButtonAction::Rate(3.0)));

        assert!(replies[0].text.contains("Could not save"));
        // The session is not left stuck in the rating state.
        assert_eq!(controller.sessions.session(1).mode, Mode::Idle);
    }

    #[test]
    fn quick_resets_date_override() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        controller.handle(1, Event::Button(ButtonAction::PickDate(date)));
        controller.handle(1, Event::Quick);
        assert_eq!(controller.sessions.session(1).target_date, None);
    }

    #[test]
    fn callback_data_round_trips() {
        let actions = [
            ButtonAction::Activity("чтение".to_string()),
            ButtonAction::Rate(0.5),
            ButtonAction::Rate(3.0),
            ButtonAction::PickDate(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
            ButtonAction::Today,
            ButtonAction::AddNew,
            ButtonAction::SelectDate,
            ButtonAction::Back,
            ButtonAction::ListAll,
            ButtonAction::StatsMenu,
            ButtonAction::StatsPickDate,
            ButtonAction::StatsFor(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
            ButtonAction::RemindersMenu,
            ButtonAction::RemindersAdd,
            ButtonAction::RemindersDelete,
            ButtonAction::AddReminder(21),
            ButtonAction::DeleteReminder(9),
            ButtonAction::AliasMenu,
            ButtonAction::AliasAdd,
            ButtonAction::AliasList,
        ];

        for action in actions {
            assert_eq!(ButtonAction::parse(&action.encode()), Some(action));
        }
        assert_eq!(ButtonAction::parse("bogus"), None);
    }

    #[test]
    fn help_lists_the_command_surface() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let replies = controller.handle(1, Event::Start);
        for command in ["/quick", "/stats", "/list", "/reminders", "/log"] {
            assert!(replies[0].text.contains(command));
        }
    }

    #[test]
    fn proportional_policy_scales_stored_value() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(
            TabularStore::new(MemoryBackend::default()),
            AliasStore::new(dir.path().join("aliases.txt")),
            HistoryStore::new(dir.path().join("history.txt")),
            ReminderStore::new(dir.path().join("reminders.txt")),
            ScoringPolicy::Proportional,
            6,
        );

        controller.handle(1, Event::Button(ButtonAction::Activity("спорт".to_string())));
        controller.handle(1, Event::Button(ButtonAction::Rate(5.0)));

        let data = controller.store.day_data(&today());
        assert_eq!(data.get("спорт"), Some(&10.0));
    }

    #[test]
    fn replies_always_offer_an_escape() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);

        let replies = controller.handle(1, Event::Button(ButtonAction::AddNew));
        let keyboard = replies[0].keyboard.as_ref().unwrap();
        let has_back = keyboard
            .iter()
            .flatten()
            .any(|button| button.action == ButtonAction::Back);
        assert!(has_back);
    }

    #[test]
    fn menu_reply_shape() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        controller.history.push("чтение").unwrap();

        let Reply { text, keyboard } = controller.menu_reply(1);
        assert!(text.contains("Pick an activity"));
        let buttons = keyboard.unwrap().into_iter().flatten().collect::<Vec<_>>();
        assert!(
            buttons
                .iter()
                .any(|b| b.action == ButtonAction::Activity("чтение".to_string()))
        );
        assert!(buttons.iter().any(|b| b.action == ButtonAction::AddNew));
    }
}
