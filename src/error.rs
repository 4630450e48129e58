use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("HTTP request failed: {source}"))]
    Network { source: reqwest::Error },

    #[snafu(display("Empty data received"))]
    EmptyResponse,

    #[snafu(display("JSON decode failed: {source}"))]
    Decode { source: serde_json::Error },

    #[snafu(display("JSON-RPC call failed: {message}"))]
    RpcError { message: String },
}

/// Failure to turn a pool reply into work.
#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub(crate)))]
pub enum FetchError {
    #[snafu(display("{source}"))]
    Transport { source: TransportError },

    #[snafu(display("Failed to decode work: {source}"))]
    Decode { source: DecodeError },

    #[snafu(display("Pool {pool} has no block template"))]
    NoTemplate { pool: PoolId },

    #[snafu(display("Pool {pool} was removed"))]
    Removed { pool: PoolId },
}

impl From<TransportError> for FetchError {
    fn from(source: TransportError) -> Self {
        Self::Transport { source }
    }
}

impl From<DecodeError> for FetchError {
    fn from(source: DecodeError) -> Self {
        Self::Decode { source }
    }
}
