//! Ledger reader errors.

/// Errors returned by a ledger reader.
///
/// Transient errors leave the poll range untouched so the next cycle
/// retries it; fatal errors mean the process is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Network failure, timeout, rate limit or a node-side hiccup.
    #[error("transient ledger read error: {0}")]
    Transient(String),

    /// Bad endpoint, contract address or ABI.
    #[error("fatal ledger configuration error: {0}")]
    FatalConfig(String),
}

impl LedgerError {
    /// Returns true if the process should stop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalConfig(_))
    }

    /// Returns true if the read may succeed on a later cycle.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::FatalConfig(format!("invalid request: {}", err))
        } else if err.is_timeout() {
            Self::Transient("request timeout".to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}
