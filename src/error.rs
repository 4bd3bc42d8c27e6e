//! Error types for the transaction backend.

use thiserror::Error;

/// Main error type surfaced at the chain client boundary.
///
/// Upstream JSON-RPC failures with a recognizable message are classified into
/// typed variants; `Rpc` carries everything opaque.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("replacement transaction underpriced")]
    ReplacementUnderpriced,

    #[error("nonce too low")]
    NonceTooLow,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ClientError {
    /// Classify an upstream provider error by its message.
    ///
    /// go-ethereum reports these conditions as plain strings over JSON-RPC,
    /// so matching on the message is the only signal available here.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("replacement transaction underpriced") {
            ClientError::ReplacementUnderpriced
        } else if message.contains("nonce too low") {
            ClientError::NonceTooLow
        } else if message.contains("insufficient funds") {
            ClientError::InsufficientFunds(message)
        } else {
            ClientError::Rpc(message)
        }
    }

    /// True when a send collided with a pending transaction at the same nonce.
    pub fn is_replacement_underpriced(&self) -> bool {
        matches!(self, ClientError::ReplacementUnderpriced)
    }
}

/// Result type for backend operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_messages() {
        assert!(matches!(
            ClientError::classify("replacement transaction underpriced"),
            ClientError::ReplacementUnderpriced
        ));
        assert!(matches!(
            ClientError::classify("(code: -32000, message: nonce too low)"),
            ClientError::NonceTooLow
        ));
        assert!(matches!(
            ClientError::classify("insufficient funds for gas * price + value"),
            ClientError::InsufficientFunds(_)
        ));
    }

    #[test]
    fn test_classify_opaque_message_falls_back_to_rpc() {
        let err = ClientError::classify("connection reset by peer");
        assert!(matches!(err, ClientError::Rpc(_)));
        assert!(!err.is_replacement_underpriced());
    }
}
