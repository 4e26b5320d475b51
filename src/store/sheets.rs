//! Google Sheets values-API backend for [`TableBackend`].
//!
//! The store addresses cells as 1-based (row, column) pairs; this module
//! translates them to A1 ranges on one worksheet of one spreadsheet.

use super::{CellWrite, TableBackend};
use crate::config::Config;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

pub struct SheetsBackend {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    values: Option<Vec<Vec<Value>>>,
}

impl SheetsBackend {
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .sheets_token()
            .context("Sheets access token is missing. Set STARLOG_SHEETS_TOKEN or `starlog config set sheets.token <TOKEN>`.")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .context("Failed to build Authorization header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds.max(5)))
            .default_headers(headers)
            .build()
            .context("Failed to create Sheets HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
        })
    }

    fn range(&self, suffix: &str) -> String {
        format!("'{}'!{}", self.sheet_name, suffix).replace(' ', "%20")
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    fn get_values(&self, suffix: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&self.range(suffix));
        let response = self
            .client
            .get(url.as_str())
            .send()
            .with_context(|| format!("Sheets read failed: {suffix}"))?;

        let status = response.status();
        let body = response.text().context("Failed to read Sheets response")?;
        if !status.is_success() {
            bail!("Sheets API error {status}: {body}");
        }

        let parsed: ValueRange = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Sheets response: {body}"))?;

        Ok(parsed
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    fn post_json(&self, url: &str, payload: &Value, what: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .with_context(|| format!("Sheets write failed: {what}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Sheets API error {status} on {what}: {body}");
        }
        Ok(())
    }
}

impl TableBackend for SheetsBackend {
    fn header_row(&self) -> Result<Vec<String>> {
        Ok(self.get_values("1:1")?.into_iter().next().unwrap_or_default())
    }

    fn date_column(&self) -> Result<Vec<String>> {
        Ok(self
            .get_values("A:A")?
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    fn row(&self, index: usize) -> Result<Vec<String>> {
        Ok(self
            .get_values(&format!("{index}:{index}"))?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn append_row(&self, cells: &[String]) -> Result<()> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(&self.range("A1"))
        );
        self.post_json(&url, &json!({ "values": [cells] }), "append row")
    }

    fn update_cells(&self, writes: &[CellWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let data = writes
            .iter()
            .map(|write| {
                json!({
                    "range": self.range(&a1_cell(write.row, write.col)),
                    "values": [[write.value]],
                })
            })
            .collect::<Vec<_>>();

        let url = format!(
            "{}/v4/spreadsheets/{}/values:batchUpdate",
            self.base_url, self.spreadsheet_id
        );
        self.post_json(
            &url,
            &json!({ "valueInputOption": "USER_ENTERED", "data": data }),
            "batch update",
        )
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

/// 1-based (row, column) to A1 notation.
fn a1_cell(row: usize, col: usize) -> String {
    let mut letters = String::new();
    let mut remaining = col;
    while remaining > 0 {
        let digit = (remaining - 1) % 26;
        letters.insert(0, (b'A' + digit as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    format!("{letters}{row}")
}

#[cfg(test)]
mod tests {
    use super::a1_cell;

    #[test]
    fn a1_conversion_covers_multi_letter_columns() {
        assert_eq!(a1_cell(1, 1), "A1");
        assert_eq!(a1_cell(5, 2), "B5");
        assert_eq!(a1_cell(2, 26), "Z2");
        assert_eq!(a1_cell(3, 27), "AA3");
        assert_eq!(a1_cell(10, 52), "AZ10");
    }
}
