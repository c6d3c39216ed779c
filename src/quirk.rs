use log::debug;

use crate::config::SaslConfig;
use crate::conn::Transport;
use crate::error::SaslError;

/// Novell GroupWise trusted application mechanism.
pub const XGWTRUSTEDAPP: &str = "XGWTRUSTEDAPP";

const XGWTRUSTEDAPP_PREFIX: &str = "XGWTRUSTEDAPP ";

/// Quotes `value` as an IMAP quoted string.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// GroupWise deviates from the standard exchange in two ways: every
/// response carries the mechanism name as a prefix, and once authenticated
/// the client still has to LOGIN as the user it wants to act for.
pub struct XgwTrustedApp;

impl XgwTrustedApp {
    pub fn applies(mechanism: &str, config: &SaslConfig) -> bool {
        config.xgwtrustedapp_hack && mechanism == XGWTRUSTEDAPP
    }

    pub fn response_prefix(mechanism: &str, config: &SaslConfig) -> Option<&'static str> {
        if Self::applies(mechanism, config) {
            Some(XGWTRUSTEDAPP_PREFIX)
        } else {
            None
        }
    }

    /// Selects the effective user with LOGIN: the authorization identity if
    /// there is one, the authentication identity otherwise.
    ///
    /// Untagged responses are dispatched and capabilities applied like for
    /// any other command. Returns the capabilities the LOGIN response
    /// announced. A non-OK result fails the authentication.
    pub async fn apply<T: Transport + ?Sized>(
        conn: &mut T,
        authorization_id: Option<&str>,
        identity: Option<&str>,
    ) -> Result<Option<Vec<String>>, SaslError> {
        let user = authorization_id.or(identity).unwrap_or("");
        debug!("sasl: XGWTRUSTEDAPP LOGIN as {}", user);

        let mut responses = conn
            .command(&format!("LOGIN {}", quote(user)))
            .await
            .map_err(SaslError::transport)?;
        let last = responses
            .pop()
            .ok_or_else(|| SaslError::ProtocolViolation("LOGIN returned no response".to_string()))?;

        conn.notify_unsolicited(responses);
        conn.apply_capabilities(&last);

        if last.is_ok() {
            Ok(last.capabilities())
        } else {
            Err(SaslError::PeerRejected(last.to_string()))
        }
    }
}
