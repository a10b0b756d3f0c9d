use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected to an event hub")]
    NotConnected,

    #[error("Unable to send event: {0}")]
    Send(String),

    #[error("Subscription error for '{name}': {cause}")]
    Subscription { name: String, cause: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject empty required string inputs before any side effect runs.
pub(crate) fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", name)));
    }
    Ok(())
}
