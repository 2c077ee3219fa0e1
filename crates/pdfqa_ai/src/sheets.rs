use std::collections::BTreeMap;

use pdfqa_core::error::AppError;
use pdfqa_core::logs::{LogName, LogSink};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::http::{call_error, ServiceEndpoint};

/// Appends log rows through the Sheets `values:append` call.
///
/// Each log lives in its own spreadsheet; rows go to the first free row of `worksheet`.
#[derive(Debug, Clone)]
pub struct SheetsLogSink {
    endpoint: ServiceEndpoint,
    access_token: String,
    worksheet: String,
    spreadsheets: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: [&'a [String]; 1],
}

impl SheetsLogSink {
    pub fn new(
        endpoint: ServiceEndpoint,
        access_token: impl Into<String>,
        worksheet: impl Into<String>,
        spreadsheets: BTreeMap<String, String>,
    ) -> Self {
        Self {
            endpoint,
            access_token: access_token.into(),
            worksheet: worksheet.into(),
            spreadsheets,
        }
    }

    pub fn append_url(&self, log: LogName) -> Result<String, AppError> {
        let spreadsheet_id = self.spreadsheets.get(log.sheet_name()).ok_or_else(|| {
            AppError::new("LOGGING_FAILED", "No spreadsheet configured for log")
                .with_details(format!("log={}", log.sheet_name()))
        })?;

        let mut url = Url::parse(self.endpoint.base_url()).map_err(|e| {
            AppError::new("LOGGING_FAILED", "Invalid spreadsheet base URL")
                .with_details(e.to_string())
        })?;
        let range = format!("{}!A1:append", self.worksheet);
        url.path_segments_mut()
            .map_err(|_| {
                AppError::new("LOGGING_FAILED", "Spreadsheet base URL cannot hold a path")
            })?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url.to_string())
    }
}

impl LogSink for SheetsLogSink {
    fn append_row(&self, log: LogName, row: &[String]) -> Result<(), AppError> {
        let url = self.append_url(log)?;
        ureq::post(&url)
            .timeout(self.endpoint.timeout())
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .send_json(AppendBody { values: [row] })
            .map_err(|e| call_error("LOGGING", "Spreadsheet append", e))?;
        debug!(log = log.sheet_name(), "row appended");
        Ok(())
    }
}
