use crate::error::SaslError;
use crate::sasl::{self, MechanismContext};

/// The PLAIN mechanism name.
pub const PLAIN: &str = "PLAIN";

/// A client implementation of the PLAIN authentication mechanism, as described
/// in RFC 4616. Authorization identity may be left blank to indicate that it is
/// the same as the username.
pub struct PlainClient {
    ctx: MechanismContext,
    done: bool,
}

impl PlainClient {
    pub fn new(ctx: MechanismContext) -> Self {
        Self {
            ctx,
            done: false,
        }
    }
}

impl sasl::Mechanism for PlainClient {
    fn name(&self) -> &str {
        PLAIN
    }

    fn has_initial_response(&self) -> bool {
        true
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError> {
        if self.done {
            return Err(SaslError::ProtocolViolation(sasl::ERR_UNEXPECTED_SERVER_CHALLENGE.to_string()));
        }

        let username = self.ctx.identity()?;
        let password = self.ctx.secret()?;
        let authzid = self.ctx.authorization_id.as_deref().unwrap_or("");

        self.done = true;
        Ok(Some(format!("{}\x00{}\x00{}", authzid, username, password).into_bytes()))
    }

    fn is_complete(&self) -> bool {
        self.done
    }
}
