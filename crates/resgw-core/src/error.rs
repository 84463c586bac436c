//! Common error types for the gateway

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while registering devices and routing public
/// requests. Nothing here is fatal to the process: every failure degrades
/// to a skipped registration or a partial/empty response.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A device with this name is already registered
    #[error("Duplicate device: {0}")]
    DuplicateDevice(String),

    /// Registration entry is missing a usable name, ip, or port
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    /// Public request verb is not GET or POST
    #[error("Request not supported: {0}")]
    RequestNotSupported(String),

    /// Device exchange failed before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// No structured value found in a discovery response
    #[error("Discovery parse failure: {0}")]
    DiscoveryParse(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::DuplicateDevice(_) => 409,
            GatewayError::InvalidAddress(_) => 400,
            GatewayError::RequestNotSupported(_) => 501,
            GatewayError::Transport(_) => 503,
            GatewayError::DiscoveryParse(_) => 502,
        }
    }
}
