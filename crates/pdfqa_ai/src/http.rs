use std::time::Duration;

use pdfqa_core::error::AppError;
use url::Url;

/// Base URL of a remote service, checked once at construction.
///
/// Remote services must be reached over `https://`. Plain `http://` is only accepted for
/// `127.0.0.1`, which is where local mock servers listen.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    base_url: String,
    timeout: Duration,
}

impl ServiceEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let reject = |why: &str| {
            AppError::new("CONFIG_ENDPOINT_INVALID", "Service base URL is not allowed")
                .with_details(format!("base_url={base_url}; reason={why}"))
        };

        let parsed = Url::parse(&base_url).map_err(|e| reject(&e.to_string()))?;
        let host = parsed.host_str().unwrap_or_default();
        match parsed.scheme() {
            "https" => {}
            "http" if host == "127.0.0.1" => {}
            _ => return Err(reject("scheme must be https (http only for 127.0.0.1)")),
        }
        if host.is_empty() {
            return Err(reject("missing host"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(reject("credentials in URL"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(reject("query or fragment in URL"));
        }
        if parsed.port() == Some(0) {
            return Err(reject("port 0"));
        }
        if timeout.is_zero() {
            return Err(reject("timeout must be positive"));
        }

        Ok(Self { base_url, timeout })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let io_timeout = std::error::Error::source(transport)
        .and_then(|src| src.downcast_ref::<std::io::Error>())
        .map(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        })
        .unwrap_or(false);
    io_timeout || transport.to_string().contains("timed out")
}

/// Map a failed call to `<prefix>_TIMEOUT` or `<prefix>_FAILED`.
pub fn call_error(prefix: &str, action: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            let message = format!("{action} request failed");
            AppError::new(format!("{prefix}_FAILED"), message)
                .with_details(format!("status={status}; body={body}"))
                .with_retryable(status == 429 || status >= 500)
        }
        ureq::Error::Transport(t) if is_timeout(&t) => {
            let message = format!("{action} request timed out");
            AppError::new(format!("{prefix}_TIMEOUT"), message)
                .with_details(t.to_string())
                .with_retryable(true)
        }
        ureq::Error::Transport(t) => {
            let message = format!("Failed to call {action} endpoint");
            AppError::new(format!("{prefix}_FAILED"), message)
                .with_details(t.to_string())
                .with_retryable(true)
        }
    }
}

pub fn decode_error(prefix: &str, action: &str, err: impl std::fmt::Display) -> AppError {
    let message = format!("Failed to decode {action} response");
    AppError::new(format!("{prefix}_FAILED"), message).with_details(err.to_string())
}
