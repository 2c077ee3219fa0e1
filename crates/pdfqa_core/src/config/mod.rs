use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_TOP_K;
use crate::error::AppError;
use crate::logs::LogName;

/// Everything the pipeline needs from the secrets file, in one TOML document.
///
/// ```toml
/// temperature = 0.3
///
/// [openai]
/// api_key = "sk-..."
///
/// [pinecone]
/// api_key = "..."
/// index_host = "https://test-larg-openai-abc123.svc.pinecone.io"
/// # or, offline: backend = "memory", passages_path = "passages.json"
///
/// [log]
/// backend = "sheets"
///
/// [log.sheets]
/// access_token = "ya29..."
/// spreadsheets = { GPT_log = "1AbC...", Feedback_log = "1XyZ..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embed_timeout_secs: u64,
    pub chat_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            chat_model: "gpt-4o".to_string(),
            embed_timeout_secs: 10,
            chat_timeout_secs: 30,
        }
    }
}

/// Where passage vectors are searched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Pinecone,
    /// Brute-force index loaded from `passages_path` at startup.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub backend: IndexBackend,
    /// JSON array of passages for the memory backend.
    pub passages_path: Option<PathBuf>,
    pub api_key: String,
    pub index_name: String,
    pub index_host: String,
    pub namespace: String,
    pub top_k: u32,
    /// Drop matches scoring below this value. Unset keeps every top-K match.
    pub min_score: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            passages_path: None,
            api_key: String::new(),
            index_name: "test-larg-openai".to_string(),
            index_host: String::new(),
            namespace: String::new(),
            top_k: DEFAULT_TOP_K,
            min_score: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogBackend {
    #[default]
    Sheets,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub backend: LogBackend,
    pub sheets: SheetsConfig,
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetsConfig {
    pub base_url: String,
    pub access_token: String,
    pub worksheet: String,
    /// Log name (`GPT_log`, `Feedback_log`) to spreadsheet id.
    pub spreadsheets: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            access_token: String::new(),
            worksheet: "Sheet1".to_string(),
            spreadsheets: BTreeMap::new(),
            timeout_secs: 10,
        }
    }
}

fn default_temperature() -> f32 {
    0.0
}

fn invalid(message: &str, details: String) -> AppError {
    AppError::new("CONFIG_INVALID", message).with_details(details)
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        let cfg: AppConfig = toml::from_str(raw).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse config TOML")
                .with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid(
                "temperature must be between 0 and 2",
                format!("temperature={}", self.temperature),
            ));
        }
        if self.openai.api_key.trim().is_empty() {
            return Err(invalid("openai.api_key is required", String::new()));
        }
        let pc = &self.pinecone;
        match pc.backend {
            IndexBackend::Pinecone => {
                if pc.api_key.trim().is_empty() {
                    return Err(invalid("pinecone.api_key is required", String::new()));
                }
                if pc.index_host.trim().is_empty() {
                    return Err(invalid(
                        "pinecone.index_host is required",
                        format!("index_name={}", pc.index_name),
                    ));
                }
            }
            IndexBackend::Memory => {
                if pc.passages_path.is_none() {
                    return Err(invalid(
                        "pinecone.passages_path is required for the memory backend",
                        String::new(),
                    ));
                }
            }
        }
        if pc.top_k == 0 {
            return Err(invalid("pinecone.top_k must be at least 1", String::new()));
        }
        if let Some(min) = pc.min_score {
            if !min.is_finite() {
                return Err(invalid(
                    "pinecone.min_score must be finite",
                    format!("min_score={min}"),
                ));
            }
        }

        match self.log.backend {
            LogBackend::Sheets => {
                let sheets = &self.log.sheets;
                if sheets.access_token.trim().is_empty() {
                    return Err(invalid("log.sheets.access_token is required", String::new()));
                }
                for log in [LogName::Usage, LogName::Feedback] {
                    let present = sheets
                        .spreadsheets
                        .get(log.sheet_name())
                        .map(|id| !id.trim().is_empty())
                        .unwrap_or(false);
                    if !present {
                        return Err(invalid(
                            "log.sheets.spreadsheets is missing a spreadsheet id",
                            format!("log={}", log.sheet_name()),
                        ));
                    }
                }
            }
            LogBackend::Sqlite => {}
        }
        Ok(())
    }

    pub fn sqlite_log_path(&self) -> PathBuf {
        self.log
            .sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("pdfqa-logs.sqlite"))
    }
}
