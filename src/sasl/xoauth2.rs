use std::sync::Arc;

use log::debug;

use crate::credentials::{Credential, CredentialRequest, CredentialSupplier};
use crate::error::SaslError;
use crate::sasl;

/// The XOAUTH2 mechanism name.
pub const XOAUTH2: &str = "XOAUTH2";

/// Builds the XOAUTH2 client response.
///
/// Format: `user={email}\x01auth=Bearer {token}\x01\x01`
pub fn xoauth2_response(user: &str, token: &str) -> Vec<u8> {
    format!("user={}\x01auth=Bearer {}\x01\x01", user, token).into_bytes()
}

/// Client for Google's XOAUTH2 bearer-token mechanism.
///
/// The whole exchange is a single response; the user name and access token
/// come from the credential supplier. When the server rejects the token it
/// sends an error challenge, which is answered with an empty response.
pub struct XOAuth2Client {
    identity: Option<String>,
    supplier: Arc<dyn CredentialSupplier>,
    user: Option<String>,
}

impl XOAuth2Client {
    pub fn new(identity: Option<String>, supplier: Arc<dyn CredentialSupplier>) -> Self {
        Self {
            identity,
            supplier,
            user: None,
        }
    }

    /// User name the response was built for, once complete.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl sasl::Mechanism for XOAuth2Client {
    fn name(&self) -> &str {
        XOAUTH2
    }

    fn has_initial_response(&self) -> bool {
        true
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError> {
        if self.user.is_some() {
            // Error details from the server after our only response.
            return Ok(Some(Vec::new()));
        }

        let answers = self.supplier.supply(&[
            CredentialRequest::Identity { default: self.identity.clone() },
            CredentialRequest::Secret,
        ])?;
        let (user, token) = match answers.as_slice() {
            [Credential::Identity(user), Credential::Secret(token)] => (user.clone(), token.clone()),
            _ => return Err(SaslError::CallbackUnsupported("identity and token".to_string())),
        };

        debug!("sasl: XOAUTH2 response for {}", user);
        let response = xoauth2_response(&user, &token);
        self.user = Some(user);
        Ok(Some(response))
    }

    fn is_complete(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::credentials::BearerCredentials;
    use crate::sasl::Mechanism;

    #[test]
    fn single_round() {
        let creds = Arc::new(BearerCredentials::new("alice@example.com", "tok123"));
        let mut c = XOAuth2Client::new(None, creds);

        assert_eq!(c.name(), XOAUTH2);
        assert!(c.has_initial_response());
        assert!(!c.is_complete());

        let response = c.evaluate_challenge(&[]).unwrap();
        assert_eq!(
            response,
            Some(b"user=alice@example.com\x01auth=Bearer tok123\x01\x01".to_vec())
        );
        assert!(c.is_complete());
        assert_eq!(c.negotiated_property(sasl::QOP), None);
    }

    #[test]
    fn second_challenge_is_ignored() {
        let creds = Arc::new(BearerCredentials::new("alice@example.com", "tok123"));
        let mut c = XOAuth2Client::new(None, creds);
        c.evaluate_challenge(&[]).unwrap();

        let error = br#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        assert_eq!(c.evaluate_challenge(error).unwrap(), Some(Vec::new()));
        assert_eq!(c.user(), Some("alice@example.com"));
        assert!(c.is_complete());
    }

    #[test]
    fn generate_xoauth2_string() {
        let s = String::from_utf8(xoauth2_response("test@example.com", "ya29.test_token")).unwrap();
        assert!(s.contains("user=test@example.com"));
        assert!(s.contains("auth=Bearer ya29.test_token"));
        assert!(s.ends_with("\x01\x01"));
    }
}
