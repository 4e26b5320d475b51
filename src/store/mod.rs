//! Date-indexed activity table: one row per day, one column per activity.
//!
//! The table lives behind a [`TableBackend`] (a remote spreadsheet in
//! production, an in-memory grid in tests). Nothing is cached locally:
//! every operation re-reads the headers or the date column it needs, so a
//! concurrently edited sheet is picked up on the next call.

pub mod sheets;

#[cfg(test)]
pub mod memory;

use crate::normalize::activity_key;
use crate::scoring::clamp_score;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::warn;

pub const DATE_HEADER: &str = "Date";

/// One cell assignment, 1-based (row, column) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// Minimal contract the backing table service must provide.
pub trait TableBackend {
    /// Full first row (column labels). Empty when the sheet is blank.
    fn header_row(&self) -> Result<Vec<String>>;
    /// Full first column (dates), including the header cell.
    fn date_column(&self) -> Result<Vec<String>>;
    /// Row by 1-based index.
    fn row(&self, index: usize) -> Result<Vec<String>>;
    /// Appends a row after the last non-empty row.
    fn append_row(&self, cells: &[String]) -> Result<()>;
    /// Batched set of arbitrary cells.
    fn update_cells(&self, writes: &[CellWrite]) -> Result<()>;
}

pub struct TabularStore<B: TableBackend> {
    backend: B,
}

impl<B: TableBackend> TabularStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Guarantees a column exists for every label, matching by normalized
    /// key. New columns are appended at the right-hand end in call order,
    /// preserving the caller's raw casing. Returns the full header list.
    pub fn ensure_columns(&self, labels: &[String]) -> Result<Vec<String>> {
        let mut headers = self.backend.header_row()?;
        if headers.is_empty() {
            self.backend.update_cells(&[CellWrite {
                row: 1,
                col: 1,
                value: DATE_HEADER.to_string(),
            }])?;
            headers = vec![DATE_HEADER.to_string()];
        }

        let known = headers.iter().map(|h| activity_key(h)).collect::<Vec<_>>();
        let mut to_add: Vec<String> = Vec::new();
        for label in labels {
            let key = activity_key(label);
            if key.is_empty() {
                continue;
            }
            let exists = known.contains(&key)
                || to_add.iter().any(|added| activity_key(added) == key);
            if !exists {
                to_add.push(label.trim().to_string());
            }
        }

        if !to_add.is_empty() {
            let writes = to_add
                .iter()
                .enumerate()
                .map(|(offset, label)| CellWrite {
                    row: 1,
                    col: headers.len() + offset + 1,
                    value: label.clone(),
                })
                .collect::<Vec<_>>();
            self.backend.update_cells(&writes)?;
            headers.extend(to_add);
        }

        Ok(headers)
    }

    /// 1-based index of the row for `date`, creating it if absent. The
    /// date column is scanned top to bottom for an exact match; the first
    /// hit wins. Two processes racing to create the same date can still
    /// produce a duplicate row (known limitation; reads then see only the
    /// first), but within one process the dispatch loop serializes writers.
    pub fn find_or_create_row(&self, date: &str) -> Result<usize> {
        if let Some(index) = find_date(&self.backend.date_column()?, date) {
            return Ok(index);
        }

        self.backend.append_row(&[date.to_string()])?;

        // Re-scan rather than guessing where the append landed.
        find_date(&self.backend.date_column()?, date)
            .ok_or_else(|| anyhow::anyhow!("appended row for {date} not found on re-read"))
    }

    /// Upserts a batch of scores for one date: columns ensured, the row
    /// found or created, every value clamped to [0, 10], then a single
    /// batched cell write. Returns the final headers and row index.
    pub fn write_values(&self, values: &[(String, f64)], date: &str) -> Result<(Vec<String>, usize)> {
        let labels = values.iter().map(|(label, _)| label.clone()).collect::<Vec<_>>();
        let headers = self.ensure_columns(&labels)?;
        let row = self.find_or_create_row(date)?;

        let key_to_col = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (activity_key(header), i + 1))
            .collect::<BTreeMap<_, _>>();

        let writes = values
            .iter()
            .filter_map(|(label, score)| {
                key_to_col.get(&activity_key(label)).map(|col| CellWrite {
                    row,
                    col: *col,
                    value: format_score(clamp_score(*score)),
                })
            })
            .collect::<Vec<_>>();

        if !writes.is_empty() {
            self.backend.update_cells(&writes)?;
        }

        Ok((headers, row))
    }

    /// Every non-date column's value for `date`, keyed by normalized
    /// activity key, missing or unparseable cells defaulting to 0. An
    /// absent row and a read failure both yield an empty map: absence of
    /// data, not an error, is what flows upward.
    pub fn day_data(&self, date: &str) -> BTreeMap<String, f64> {
        match self.try_day_data(date) {
            Ok(data) => data,
            Err(error) => {
                warn!(error = %error, date, "day read failed; treating as empty");
                BTreeMap::new()
            }
        }
    }

    pub fn total_for_date(&self, date: &str) -> f64 {
        self.day_data(date).values().sum()
    }

    fn try_day_data(&self, date: &str) -> Result<BTreeMap<String, f64>> {
        let Some(index) = find_date(&self.backend.date_column()?, date) else {
            return Ok(BTreeMap::new());
        };

        let headers = self.backend.header_row()?;
        let row = self.backend.row(index)?;

        Ok(headers
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, header)| {
                let value = row.get(i).map(String::as_str).unwrap_or_default();
                (activity_key(header), parse_cell_number(value))
            })
            .collect())
    }
}

fn find_date(column: &[String], date: &str) -> Option<usize> {
    column.iter().position(|cell| cell == date).map(|i| i + 1)
}

/// Tolerant numeric read: `.` or `,` as decimal separator, anything else
/// counts as 0.
pub fn parse_cell_number(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0)
}

fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryBackend;
    use super::{TabularStore, parse_cell_number};

    fn store() -> TabularStore<MemoryBackend> {
        TabularStore::new(MemoryBackend::default())
    }

    #[test]
    fn ensure_columns_is_idempotent_under_normalization() {
        let store = store();

        let first = store.ensure_columns(&["Чтение".to_string()]).unwrap();
        assert_eq!(first, vec!["Date".to_string(), "Чтение".to_string()]);

        // Same key under a different raw spelling: no new column.
        let second = store.ensure_columns(&["чтение ".to_string()]).unwrap();
        assert_eq!(second, first);

        let third = store.ensure_columns(&[]).unwrap();
        assert_eq!(third, first);
    }

    #[test]
    fn ensure_columns_appends_in_call_order() {
        let store = store();
        let headers = store
            .ensure_columns(&["спорт".to_string(), "музыка".to_string(), "Спорт".to_string()])
            .unwrap();
        assert_eq!(headers, vec!["Date", "спорт", "музыка"]);
    }

    #[test]
    fn find_or_create_row_returns_same_index_twice() {
        let store = store();
        store.ensure_columns(&[]).unwrap();

        let first = store.find_or_create_row("2024-01-05").unwrap();
        let second = store.find_or_create_row("2024-01-05").unwrap();
        assert_eq!(first, second);

        let other = store.find_or_create_row("2024-01-06").unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn write_then_read_round_trip() {
        let store = store();
        store
            .write_values(&[("чтение".to_string(), 7.0)], "2024-01-05")
            .unwrap();

        let data = store.day_data("2024-01-05");
        assert_eq!(data.get("чтение"), Some(&7.0));
        assert_eq!(store.total_for_date("2024-01-05"), 7.0);
    }

    #[test]
    fn write_clamps_out_of_range_scores() {
        let store = store();
        store
            .write_values(
                &[("спорт".to_string(), 42.0), ("йога".to_string(), -3.0)],
                "2024-01-05",
            )
            .unwrap();

        let data = store.day_data("2024-01-05");
        assert_eq!(data.get("спорт"), Some(&10.0));
        assert_eq!(data.get("йога"), Some(&0.0));
    }

    #[test]
    fn missing_date_reads_empty() {
        let store = store();
        assert!(store.day_data("2024-02-01").is_empty());
        assert_eq!(store.total_for_date("2024-02-01"), 0.0);
    }

    #[test]
    fn day_data_defaults_unwritten_columns_to_zero() {
        let store = store();
        store
            .write_values(&[("чтение".to_string(), 7.0)], "2024-01-05")
            .unwrap();
        store
            .write_values(&[("спорт".to_string(), 4.0)], "2024-01-06")
            .unwrap();

        let data = store.day_data("2024-01-05");
        assert_eq!(data.get("чтение"), Some(&7.0));
        assert_eq!(data.get("спорт"), Some(&0.0));
    }

    #[test]
    fn tolerant_numeric_parsing() {
        assert_eq!(parse_cell_number("7"), 7.0);
        assert_eq!(parse_cell_number("7.5"), 7.5);
        assert_eq!(parse_cell_number("7,5"), 7.5);
        assert_eq!(parse_cell_number(" 3 "), 3.0);
        assert_eq!(parse_cell_number("n/a"), 0.0);
        assert_eq!(parse_cell_number(""), 0.0);
    }
}
