use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::credentials::{Credential, CredentialRequest, CredentialSupplier};
use crate::error::SaslError;

pub const ERR_UNEXPECTED_SERVER_CHALLENGE: &str = "sasl: unexpected server challenge";

/// Negotiated property holding the quality of protection
/// (`auth`, `auth-int` or `auth-conf`).
pub const QOP: &str = "qop";

/// Client side of a SASL mechanism.
///
/// Implementations only ever see decoded bytes; transport encoding is the
/// engine's job. Once `is_complete` returns true the engine will not call
/// `evaluate_challenge` again.
pub trait Mechanism: Send {
    fn name(&self) -> &str;

    /// Whether the mechanism can produce a response before the server sent
    /// any challenge.
    fn has_initial_response(&self) -> bool;

    /// Answers a server challenge. `None` means there is nothing to send
    /// back, which is different from an empty response.
    fn evaluate_challenge(&mut self, challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError>;

    fn is_complete(&self) -> bool;

    /// A property agreed on during negotiation, such as [`QOP`].
    fn negotiated_property(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Everything a provider may need to build a mechanism.
#[derive(Clone)]
pub struct MechanismContext {
    pub authorization_id: Option<String>,
    pub identity: Option<String>,
    /// Service name, `imap` for IMAP.
    pub protocol: String,
    pub host: String,
    pub properties: HashMap<String, String>,
    pub supplier: Arc<dyn CredentialSupplier>,
}

impl MechanismContext {
    /// Resolves the authentication identity, offering the caller-specified
    /// one as the default.
    pub fn identity(&self) -> Result<String, SaslError> {
        let requests = [CredentialRequest::Identity { default: self.identity.clone() }];
        match self.supplier.supply(&requests)?.pop() {
            Some(Credential::Identity(identity)) => Ok(identity),
            _ => Err(SaslError::CallbackUnsupported("identity".to_string())),
        }
    }

    pub fn secret(&self) -> Result<String, SaslError> {
        match self.supplier.supply(&[CredentialRequest::Secret])?.pop() {
            Some(Credential::Secret(secret)) => Ok(secret),
            _ => Err(SaslError::CallbackUnsupported("secret".to_string())),
        }
    }
}

/// A source of mechanism implementations, looked up by name.
///
/// Returning `Ok(None)` means the provider does not know the mechanism; an
/// error means it knows it but could not build it.
pub trait MechanismProvider: Send + Sync {
    fn create(&self, name: &str, ctx: &MechanismContext) -> Result<Option<Box<dyn Mechanism>>>;
}

/// Provider for the password mechanisms shipped with this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardProvider;

impl MechanismProvider for StandardProvider {
    fn create(&self, name: &str, ctx: &MechanismContext) -> Result<Option<Box<dyn Mechanism>>> {
        let mech: Box<dyn Mechanism> = match name.to_uppercase().as_str() {
            super::PLAIN => Box::new(super::PlainClient::new(ctx.clone())),
            super::LOGIN => Box::new(super::LoginClient::new(ctx.clone())),
            _ => return Ok(None),
        };
        Ok(Some(mech))
    }
}
