//! Plain-text stores for aliases, activity history, and reminders.
//!
//! Each file is small, human-editable, and rewritten whole on save:
//! `aliases.txt` holds `key=display` lines, `history.txt` one activity key
//! per line (most recent first), `reminders.txt` `user_id:hour` lines.

use crate::normalize::activity_key;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const HISTORY_LIMIT: usize = 20;

fn write_lines(path: &Path, lines: impl IntoIterator<Item = String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }

    let mut content = lines.into_iter().collect::<Vec<_>>().join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_lines(path: &Path) -> Vec<String> {
    // Missing or unreadable files read as empty, never as an error.
    fs::read_to_string(path)
        .map(|content| {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Display aliases for activity keys. Lookup takes the latest registered
/// alias for a key (last line wins).
#[derive(Debug, Clone)]
pub struct AliasStore {
    path: PathBuf,
}

impl AliasStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> BTreeMap<String, String> {
        read_lines(&self.path)
            .into_iter()
            .filter_map(|line| {
                let (key, display) = line.split_once('=')?;
                let key = activity_key(key);
                let display = display.trim();
                (!key.is_empty() && !display.is_empty()).then(|| (key, display.to_string()))
            })
            .collect()
    }

    pub fn save(&self, aliases: &BTreeMap<String, String>) -> Result<()> {
        write_lines(
            &self.path,
            aliases
                .iter()
                .map(|(key, display)| format!("{key}={display}")),
        )
    }

    /// Registers a display alias. Returns false (and writes nothing) when
    /// either side is empty after trimming.
    pub fn add(&self, key: &str, display: &str) -> Result<bool> {
        let key = activity_key(key);
        let display = display.trim();
        if key.is_empty() || display.is_empty() {
            return Ok(false);
        }

        let mut aliases = self.load();
        aliases.insert(key, display.to_string());
        self.save(&aliases)?;
        Ok(true)
    }

    pub fn display_name(&self, key: &str) -> Option<String> {
        self.load().get(&activity_key(key)).cloned()
    }

    /// Seeds a starter alias file on first run. Existing files are left
    /// untouched.
    pub fn ensure_sample(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        let samples = BTreeMap::from([
            ("чтение".to_string(), "📚 Чтение".to_string()),
            ("спорт".to_string(), "🏃 Спорт".to_string()),
            ("музыка".to_string(), "🎵 Музыка".to_string()),
        ]);
        self.save(&samples)
    }
}

/// Recently used activity keys, most recent first, deduplicated, bounded
/// to [`HISTORY_LIMIT`] entries.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self, limit: usize) -> Vec<String> {
        let mut seen = Vec::new();
        for line in read_lines(&self.path) {
            let key = activity_key(&line);
            if !key.is_empty() && !seen.contains(&key) {
                seen.push(key);
            }
            if seen.len() == limit {
                break;
            }
        }
        seen
    }

    pub fn all(&self) -> Vec<String> {
        self.load(usize::MAX)
    }

    /// Moves `key` to the front, truncating to the history limit.
    pub fn push(&self, key: &str) -> Result<()> {
        let key = activity_key(key);
        if key.is_empty() {
            return Ok(());
        }

        let mut recent = self.load(HISTORY_LIMIT);
        recent.retain(|existing| *existing != key);
        recent.insert(0, key);
        recent.truncate(HISTORY_LIMIT);

        write_lines(&self.path, recent.into_iter())
    }
}

/// Per-user reminder hours. A user may hold several distinct hours; the
/// scheduler asks for everyone due at a given hour.
#[derive(Debug, Clone)]
pub struct ReminderStore {
    path: PathBuf,
}

impl ReminderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Vec<(i64, u32)> {
        read_lines(&self.path)
            .into_iter()
            .filter_map(|line| {
                let (user, hour) = line.split_once(':')?;
                let user = user.trim().parse::<i64>().ok()?;
                let hour = hour.trim().parse::<u32>().ok()?;
                (hour < 24).then_some((user, hour))
            })
            .collect()
    }

    fn save(&self, reminders: &[(i64, u32)]) -> Result<()> {
        write_lines(
            &self.path,
            reminders.iter().map(|(user, hour)| format!("{user}:{hour}")),
        )
    }

    pub fn user_hours(&self, user_id: i64) -> Vec<u32> {
        let mut hours = self
            .load()
            .into_iter()
            .filter_map(|(user, hour)| (user == user_id).then_some(hour))
            .collect::<Vec<_>>();
        hours.sort_unstable();
        hours
    }

    pub fn users_for_hour(&self, hour: u32) -> Vec<i64> {
        self.load()
            .into_iter()
            .filter_map(|(user, h)| (h == hour).then_some(user))
            .collect()
    }

    /// Returns false when the hour is invalid or already registered.
    pub fn add(&self, user_id: i64, hour: u32) -> Result<bool> {
        if hour >= 24 {
            return Ok(false);
        }

        let mut reminders = self.load();
        if reminders.contains(&(user_id, hour)) {
            return Ok(false);
        }
        reminders.push((user_id, hour));
        self.save(&reminders)?;
        Ok(true)
    }

    /// Returns false when no such reminder exists.
    pub fn remove(&self, user_id: i64, hour: u32) -> Result<bool> {
        let mut reminders = self.load();
        let before = reminders.len();
        reminders.retain(|entry| *entry != (user_id, hour));
        if reminders.len() == before {
            return Ok(false);
        }
        self.save(&reminders)?;
        Ok(true)
    }

    /// Drops every reminder for a user (after the channel reports them as
    /// blocked). Returns how many were removed.
    pub fn clear_user(&self, user_id: i64) -> Result<usize> {
        let mut reminders = self.load();
        let before = reminders.len();
        reminders.retain(|(user, _)| *user != user_id);
        let removed = before - reminders.len();
        if removed > 0 {
            self.save(&reminders)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{AliasStore, HISTORY_LIMIT, HistoryStore, ReminderStore};
    use tempfile::TempDir;

    #[test]
    fn alias_add_and_lookup() {
        let dir = TempDir::new().unwrap();
        let store = AliasStore::new(dir.path().join("aliases.txt"));

        assert!(store.add("Чтение", "📚 Чтение").unwrap());
        assert_eq!(store.display_name("чтение").as_deref(), Some("📚 Чтение"));

        // Last write wins for the same key.
        assert!(store.add("чтение ", "Books").unwrap());
        assert_eq!(store.display_name("ЧТЕНИЕ").as_deref(), Some("Books"));
    }

    #[test]
    fn alias_rejects_empty_sides() {
        let dir = TempDir::new().unwrap();
        let store = AliasStore::new(dir.path().join("aliases.txt"));

        assert!(!store.add("  ", "Books").unwrap());
        assert!(!store.add("чтение", "   ").unwrap());
        assert!(store.load().is_empty());
    }

    #[test]
    fn history_moves_to_front_and_truncates() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.txt"));

        for i in 0..HISTORY_LIMIT + 5 {
            store.push(&format!("activity{i}")).unwrap();
        }
        store.push("activity0").unwrap();

        let recent = store.load(HISTORY_LIMIT);
        assert_eq!(recent.len(), HISTORY_LIMIT);
        assert_eq!(recent[0], "activity0");
    }

    #[test]
    fn history_deduplicates_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.txt");
        std::fs::write(&path, "чтение\nспорт\nЧтение\n").unwrap();

        let store = HistoryStore::new(path);
        assert_eq!(store.load(10), vec!["чтение", "спорт"]);
    }

    #[test]
    fn reminders_add_remove_clear() {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::new(dir.path().join("reminders.txt"));

        assert!(store.add(7, 9).unwrap());
        assert!(store.add(7, 21).unwrap());
        assert!(!store.add(7, 9).unwrap());
        assert!(!store.add(7, 24).unwrap());

        assert_eq!(store.user_hours(7), vec![9, 21]);
        assert_eq!(store.users_for_hour(9), vec![7]);

        assert!(store.remove(7, 9).unwrap());
        assert!(!store.remove(7, 9).unwrap());
        assert_eq!(store.clear_user(7).unwrap(), 1);
        assert!(store.load().is_empty());
    }
}
