use crate::error::SaslError;
use crate::sasl::{self, MechanismContext};

/// The LOGIN mechanism name.
pub const LOGIN: &str = "LOGIN";

enum LoginState {
    WaitingUsername,
    WaitingPassword,
    Done,
}

/// A client implementation of the LOGIN authentication mechanism, as
/// described in http://www.iana.org/go/draft-murchison-sasl-login
///
/// It is considered obsolete, and should not be used when other mechanisms are
/// available. For plaintext password authentication use PLAIN mechanism.
pub struct LoginClient {
    ctx: MechanismContext,
    state: LoginState,
}

impl LoginClient {
    pub fn new(ctx: MechanismContext) -> Self {
        Self {
            ctx,
            state: LoginState::WaitingUsername,
        }
    }
}

impl sasl::Mechanism for LoginClient {
    fn name(&self) -> &str {
        LOGIN
    }

    fn has_initial_response(&self) -> bool {
        false
    }

    // The server prompts are informational ("Username:", "Password:"); the
    // answer depends only on how far the exchange got.
    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError> {
        match self.state {
            LoginState::WaitingUsername => {
                let username = self.ctx.identity()?;
                self.state = LoginState::WaitingPassword;
                Ok(Some(username.into_bytes()))
            }
            LoginState::WaitingPassword => {
                let password = self.ctx.secret()?;
                self.state = LoginState::Done;
                Ok(Some(password.into_bytes()))
            }
            LoginState::Done => {
                Err(SaslError::ProtocolViolation(sasl::ERR_UNEXPECTED_SERVER_CHALLENGE.to_string()))
            }
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self.state, LoginState::Done)
    }
}
