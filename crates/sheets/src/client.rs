use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use rollcall_core::AttendanceRecord;

use crate::auth::TokenProvider;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("could not load service-account credentials from `{path}`: {detail}")]
    Credentials { path: PathBuf, detail: String },
    #[error("service-account auth failed: {0}")]
    Auth(String),
    #[error("sheets request failed: {0}")]
    Http(String),
    #[error("sheets API returned an error: {0}")]
    Api(String),
    #[error("sheets response could not be decoded: {0}")]
    Decode(String),
    #[error("spreadsheet has no sheet titled `{0}`")]
    MissingSheet(String),
}

/// Resolved metadata for one tab of the spreadsheet. Must be obtained via
/// `load_sheet` before any row operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetHandle {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheet_id: i64,
}

/// The three spreadsheet operations the workflow needs. A trait so tests
/// and the store can swap in scripted backends.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn load_sheet(&self) -> Result<SheetHandle, SheetsError>;
    async fn list_rows(&self, sheet: &SheetHandle) -> Result<Vec<AttendanceRecord>, SheetsError>;
    async fn append_row(
        &self,
        sheet: &SheetHandle,
        record: &AttendanceRecord,
    ) -> Result<(), SheetsError>;
}

/// Sheets v4 REST client scoped to a single configured spreadsheet tab.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    auth: TokenProvider,
    spreadsheet_id: String,
    sheet_title: String,
}

impl GoogleSheetsClient {
    pub fn new(auth: TokenProvider, spreadsheet_id: String, sheet_title: String) -> Self {
        Self { http: reqwest::Client::new(), auth, spreadsheet_id, sheet_title }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
    ) -> Result<T, SheetsError> {
        let token = self.auth.bearer_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| SheetsError::Http(source.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("request failed ({status}): {body}")));
        }

        response.json().await.map_err(|source| SheetsError::Decode(source.to_string()))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn load_sheet(&self) -> Result<SheetHandle, SheetsError> {
        let mut url = spreadsheet_url(&self.spreadsheet_id)?;
        url.set_query(Some("fields=sheets(properties(sheetId,title))"));
        let meta: SpreadsheetMeta = self.get_json(url).await?;

        resolve_sheet(&meta, &self.spreadsheet_id, &self.sheet_title)
            .ok_or_else(|| SheetsError::MissingSheet(self.sheet_title.clone()))
    }

    async fn list_rows(&self, sheet: &SheetHandle) -> Result<Vec<AttendanceRecord>, SheetsError> {
        // A2:E skips the Name,Email,Location,Date,Time header row.
        let url = values_url(sheet, "A2:E")?;
        let range: ValueRange = self.get_json(url).await?;
        Ok(records_from_values(range.values.unwrap_or_default()))
    }

    async fn append_row(
        &self,
        sheet: &SheetHandle,
        record: &AttendanceRecord,
    ) -> Result<(), SheetsError> {
        let mut url = values_url(sheet, "A1:E1:append")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueRange { values: Some(vec![record.to_sheet_row().to_vec()]) };

        let token = self.auth.bearer_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|source| SheetsError::Http(source.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("append failed ({status}): {body}")));
        }

        Ok(())
    }
}

fn spreadsheet_url(spreadsheet_id: &str) -> Result<reqwest::Url, SheetsError> {
    let mut url = reqwest::Url::parse(SHEETS_BASE_URL)
        .map_err(|source| SheetsError::Http(source.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| SheetsError::Http("sheets base url cannot hold path segments".to_owned()))?
        .push(spreadsheet_id);
    Ok(url)
}

/// Builds a `values/{title}!{range}` URL. Pushing the range as a path
/// segment percent-encodes sheet titles containing spaces or reserved
/// characters.
fn values_url(sheet: &SheetHandle, range: &str) -> Result<reqwest::Url, SheetsError> {
    let mut url = spreadsheet_url(&sheet.spreadsheet_id)?;
    url.path_segments_mut()
        .map_err(|()| SheetsError::Http("sheets base url cannot hold path segments".to_owned()))?
        .push("values")
        .push(&format!("{}!{range}", sheet.title));
    Ok(url)
}

fn resolve_sheet(meta: &SpreadsheetMeta, spreadsheet_id: &str, title: &str) -> Option<SheetHandle> {
    meta.sheets.iter().find(|sheet| sheet.properties.title == title).map(|sheet| SheetHandle {
        spreadsheet_id: spreadsheet_id.to_owned(),
        title: sheet.properties.title.clone(),
        sheet_id: sheet.properties.sheet_id,
    })
}

fn records_from_values(values: Vec<Vec<String>>) -> Vec<AttendanceRecord> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, cells)| {
            let record = AttendanceRecord::from_sheet_row(&cells);
            if record.is_none() {
                // Row 1 is the header, data starts at row 2.
                warn!(row = index + 2, "skipping malformed attendance row");
            }
            record
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Vec<String>>>,
}
