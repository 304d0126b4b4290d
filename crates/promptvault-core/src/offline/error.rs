use thiserror::Error;

use super::controller::ControllerState;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Network unavailable: {0}")]
    Unreachable(String),

    #[error("Bad response for {url}: status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Cache storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Controller is {actual}, expected {expected}")]
    InvalidState {
        actual: ControllerState,
        expected: ControllerState,
    },
}

impl OfflineError {
    /// Whether this error means the network could not be reached at all
    /// (as opposed to a reachable server answering badly).
    pub fn is_network_failure(&self) -> bool {
        matches!(self, OfflineError::Network(_) | OfflineError::Unreachable(_))
    }
}
