//! Row appends through the Sheets v4 `values:append` endpoint.

use crate::config::{PipelineConfig, Secrets};
use crate::error::SheetError;
use crate::pipeline::row::SheetRow;
use crate::sheets::auth::{fetch_access_token, ServiceAccountKey, SPREADSHEETS_SCOPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

/// Somewhere a finished row can be appended.
pub trait RowSink: Send + Sync {
    /// Append `row` as a new row. Called at most once per submission; never retried.
    fn append_row(&self, row: &SheetRow) -> impl Future<Output = Result<AppendReceipt, SheetError>> + Send;
}

/// What the spreadsheet reported after an append.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppendReceipt {
    /// A1 range the row landed in, e.g. `Sheet1!A12:E12`.
    pub updated_range: Option<String>,
    pub updated_rows: Option<u32>,
}

/// Appends rows to one worksheet of one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    spreadsheet_id: String,
    worksheet: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    major_dimension: &'static str,
    values: [[&'a str; 5]; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: Option<u32>,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, secrets: &Secrets, config: &PipelineConfig) -> Self {
        Self {
            http,
            key: secrets.service_account.clone(),
            spreadsheet_id: secrets.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            base_url: config.sheets_base_url.clone(),
        }
    }

    /// `{base}/v4/spreadsheets/{id}/values/{worksheet}:append?…`
    ///
    /// Rows are written with `USER_ENTERED` so the sheet applies its normal
    /// type coercion, and always inserted as new rows.
    pub fn append_url(&self) -> Result<Url, SheetError> {
        let range = format!("{}:append", self.worksheet);
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetError::Transport(format!("invalid Sheets base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Transport("Sheets base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }
}

impl RowSink for SheetsClient {
    async fn append_row(&self, row: &SheetRow) -> Result<AppendReceipt, SheetError> {
        let url = self.append_url()?;
        let token = fetch_access_token(&self.http, &self.key, SPREADSHEETS_SCOPE).await?;

        let body = ValueRange {
            major_dimension: "ROWS",
            values: [row.values()],
        };

        info!("Appending row to {}!{}", self.spreadsheet_id, self.worksheet);
        let response = self
            .http
            .post(url)
            .bearer_auth(&token.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SheetError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<GoogleErrorBody>(&text) {
                Ok(GoogleErrorBody { error }) => match error.status {
                    Some(s) => format!("{s}: {}", error.message),
                    None => error.message,
                },
                Err(_) => text,
            };
            warn!("Sheets append failed: HTTP {} {}", status, message);
            return Err(SheetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AppendResponse = response
            .json()
            .await
            .map_err(|e| SheetError::Transport(format!("unreadable append response: {e}")))?;

        let receipt = parsed
            .updates
            .map(|u| AppendReceipt {
                updated_range: u.updated_range,
                updated_rows: u.updated_rows,
            })
            .unwrap_or_default();

        info!("Row appended at {:?}", receipt.updated_range);
        Ok(receipt)
    }
}
