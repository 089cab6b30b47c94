use thiserror::Error;

/// Errors surfaced by snapshot and diff sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// A message could not be decoded; the stream itself is still usable.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Snapshot request failed: {0}")]
    Snapshot(String),

    /// Listen key could not be created, refreshed or has expired.
    #[error("Listen key error: {0}")]
    ListenKey(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Channel closed")]
    ChannelClosed,
}

impl ConnectorError {
    /// Whether the stream that produced this error can keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConnectorError::Parse(_))
    }
}
