use thiserror::Error;

/// Unified error type for the entire crypto-dash-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fetch cycle ─────────────────────────────────────────────────
    /// Network failure, non-success status, or a payload that could not be
    /// parsed into the expected shape. Callers never distinguish these.
    #[error("Failed to fetch data: {0}")]
    Fetch(String),

    #[error("Invalid asset identifier: {0:?}")]
    InvalidAsset(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Rendering ───────────────────────────────────────────────────
    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Chart component not registered: {0}")]
    NotRegistered(String),
}

impl CoreError {
    /// True for the fetch-failure kind (network, status, parse, shape).
    pub fn is_fetch(&self) -> bool {
        matches!(self, CoreError::Fetch(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Fetch(format!("malformed payload: {e}"))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full request URL; keep the path, drop the query.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Fetch(sanitized)
    }
}
