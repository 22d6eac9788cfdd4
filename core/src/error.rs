use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// The match document is missing or malformed; the previously loaded
    /// match (if any) stays active.
    #[error("invalid match payload: {0}")]
    InvalidMatch(String),

    /// A live-channel payload could not be decoded. The message is dropped
    /// and the connection stays open.
    #[error("malformed live message: {0}")]
    MalformedLiveMessage(String),

    #[error("invalid live endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}
