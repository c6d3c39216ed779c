use log::debug;

use crate::conn::Transport;
use crate::engine::{Completion, State};
use crate::error::SaslError;
use crate::response::{Response, Status};

/// Final status of an AUTHENTICATE command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalStatus {
    Ok,
    No,
    Bad,
    /// The server hung up, or we synthesized a BYE because the exchange
    /// could not go on.
    Bye { cause: String },
}

impl FinalStatus {
    fn of(response: &Response) -> FinalStatus {
        match response.status() {
            Some(Status::Ok) => FinalStatus::Ok,
            Some(Status::No) => FinalStatus::No,
            Some(Status::Bye) => FinalStatus::Bye { cause: response.text().to_string() },
            _ => FinalStatus::Bad,
        }
    }
}

/// What a negotiation produced.
#[derive(Debug, Clone)]
pub struct NegotiationResult {
    pub success: bool,
    pub status: FinalStatus,
    /// Unsolicited responses seen during the exchange, in arrival order.
    pub unsolicited: Vec<Response>,
    /// Capabilities announced by the final response, if any.
    pub capabilities: Option<Vec<String>>,
    /// Why the negotiation failed, when it did.
    pub error: Option<SaslError>,
    pub last_state: State,
}

impl NegotiationResult {
    /// A failure decided locally, before anything was dispatched. `status`
    /// still reports what the server answered.
    pub fn failed(err: SaslError, completion: &Completion, unsolicited: Vec<Response>, last_state: State) -> Self {
        let status = match completion {
            Completion::Tagged(r) | Completion::Bye(r) => FinalStatus::of(r),
            Completion::Aborted(cause) => FinalStatus::Bye { cause: cause.to_string() },
        };
        NegotiationResult {
            success: false,
            status,
            unsolicited,
            capabilities: None,
            error: Some(err),
            last_state,
        }
    }
}

/// Hands the outcome of an exchange back to the connection.
///
/// Unsolicited responses are replayed in arrival order, the final response's
/// capabilities are cached on the connection, and success is decided by the
/// final status alone.
pub fn finalize<T: Transport + ?Sized>(
    unsolicited: Vec<Response>,
    completion: Completion,
    last_state: State,
    conn: &mut T,
) -> NegotiationResult {
    conn.notify_unsolicited(unsolicited.clone());

    let (last, error) = match completion {
        Completion::Tagged(r) | Completion::Bye(r) => (r, None),
        Completion::Aborted(err) => (Response::bye(&err.to_string()), Some(err)),
    };
    conn.apply_capabilities(&last);

    let status = FinalStatus::of(&last);
    let success = status == FinalStatus::Ok;
    let error = match error {
        Some(err) => Some(err),
        None if !success => Some(SaslError::PeerRejected(last.to_string())),
        None => None,
    };
    debug!("sasl: AUTHENTICATE finished with {:?}", status);

    NegotiationResult {
        success,
        status,
        unsolicited,
        capabilities: last.capabilities(),
        error,
        last_state,
    }
}
