use thiserror::Error;

/// Why a SASL negotiation did not succeed.
///
/// Only `NotAvailable` is ever returned as an `Err` by
/// [`SaslAuthenticator::negotiate`](crate::authenticator::SaslAuthenticator::negotiate);
/// the other kinds are carried inside a failed
/// [`NegotiationResult`](crate::dispatch::NegotiationResult) so the caller can
/// log them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaslError {
    /// No mutually usable mechanism. The caller may fall back to LOGIN.
    #[error("sasl: no usable mechanism")]
    NotAvailable,

    /// The server sent a continuation we could not decode.
    #[error("sasl: protocol violation: {0}")]
    ProtocolViolation(String),

    /// A mechanism asked for a credential the supplier cannot provide.
    #[error("sasl: unsupported callback: {0}")]
    CallbackUnsupported(String),

    /// The mechanism negotiated a security layer we do not implement.
    #[error("sasl: mechanism requires integrity or confidentiality ({0})")]
    UnsupportedProtection(String),

    #[error("sasl: transport failure: {0}")]
    Transport(String),

    /// The server answered NO, BAD or BYE.
    #[error("sasl: rejected by server: {0}")]
    PeerRejected(String),
}

impl SaslError {
    pub fn transport(err: anyhow::Error) -> Self {
        SaslError::Transport(format!("{:#}", err))
    }
}
