//! Sheets values client.

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use reconcile::SheetSource;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Range read when none is configured.
pub const DEFAULT_RANGE: &str = "Teachers!A:ZZ";

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads one range of a spreadsheet as rows of strings.
///
/// # Example
///
/// ```no_run
/// use reconcile::SheetSource;
/// use sheets::{Authenticator, AuthorizedUser, SheetsClient};
/// use std::path::Path;
///
/// let user = AuthorizedUser::load(Path::new("token.json")).unwrap();
/// let client = SheetsClient::new(Authenticator::new(user), "1AbC", "Teachers!A:ZZ");
/// let rows = client.fetch_rows().unwrap();
/// println!("{} rows", rows.len());
/// ```
pub struct SheetsClient {
    agent: ureq::Agent,
    auth: Authenticator,
    api_base: String,
    spreadsheet_id: Mutex<String>,
    range: String,
}

impl SheetsClient {
    #[must_use]
    pub fn new(
        auth: Authenticator,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            auth,
            api_base: API_BASE.to_string(),
            spreadsheet_id: Mutex::new(spreadsheet_id.into()),
            range: range.into(),
        }
    }

    /// Use a custom API base (for testing).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Spreadsheet currently read.
    #[must_use]
    pub fn spreadsheet_id(&self) -> String {
        self.spreadsheet_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn range(&self) -> &str {
        &self.range
    }

    /// Build the values URL for the current target.
    fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}?majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE",
            self.api_base,
            self.spreadsheet_id(),
            encode_segment(&self.range)
        )
    }

    /// Fetch the range, every cell rendered as a string.
    pub fn read_values(&self) -> Result<Vec<Vec<String>>> {
        if self.spreadsheet_id().is_empty() {
            return Err(Error::NoSpreadsheet);
        }

        let token = self.auth.access_token()?;
        let url = self.values_url();
        log::debug!("GET {url}");

        let result = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {token}"))
            .call();

        let mut response = match result {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(401)) => {
                self.auth.invalidate();
                return Err(Error::http("HTTP 401", Some(401)));
            }
            Err(e) => return Err(e.into()),
        };

        let range: ValueRange = response.body_mut().read_json()?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

impl SheetSource for SheetsClient {
    fn fetch_rows(&self) -> anyhow::Result<Vec<Vec<String>>> {
        Ok(self.read_values()?)
    }

    fn retarget(&self, sheet_id: &str) {
        let mut current = self
            .spreadsheet_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != sheet_id {
            log::info!("Sheet target changed to {sheet_id}");
            *current = sheet_id.to_string();
        }
    }
}

/// Render an unformatted cell the way the sheet shows it.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Percent-encode the characters a range may carry that a path cannot.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '?' => out.push_str("%3F"),
            '\'' => out.push_str("%27"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthorizedUser;
    use serde_json::json;

    fn client(id: &str) -> SheetsClient {
        let user = AuthorizedUser::parse(
            r#"{"type":"authorized_user","client_id":"c","client_secret":"s","refresh_token":"r"}"#,
        )
        .unwrap();
        SheetsClient::new(
            Authenticator::with_token_url(user, "http://127.0.0.1:9/token"),
            id,
            DEFAULT_RANGE,
        )
        .with_api_base("http://127.0.0.1:9/v4/spreadsheets")
    }

    #[test]
    fn test_values_url() {
        let client = client("sheet-1");
        assert_eq!(
            client.values_url(),
            "http://127.0.0.1:9/v4/spreadsheets/sheet-1/values/Teachers!A:ZZ?majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE"
        );
    }

    #[test]
    fn test_range_with_spaces_is_encoded() {
        assert_eq!(encode_segment("'Staff List'!A:ZZ"), "%27Staff%20List%27!A:ZZ");
    }

    #[test]
    fn test_retarget() {
        let client = client("sheet-1");
        client.retarget("sheet-2");
        assert_eq!(client.spreadsheet_id(), "sheet-2");
        assert!(client.values_url().contains("/sheet-2/values/"));
    }

    #[test]
    fn test_cells_render_as_text() {
        assert_eq!(cell_text(&json!("Jane")), "Jane");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!(false)), "false");
        assert_eq!(cell_text(&json!(7)), "7");
        assert_eq!(cell_text(&json!(7.0)), "7");
        assert_eq!(cell_text(&json!(7.5)), "7.5");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = serde_json::from_value(json!({ "range": "Teachers!A1:ZZ1000" })).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_missing_spreadsheet_id() {
        let err = client("").read_values().unwrap_err();
        assert!(matches!(err, Error::NoSpreadsheet));
    }
}
