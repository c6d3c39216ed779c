use std::sync::Mutex;

use anyhow::Result;
use log::debug;

use crate::error::SaslError;

/// A piece of credential material a mechanism asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRequest {
    /// Authentication identity (user name). `default` is the mechanism's
    /// suggestion, if any.
    Identity { default: Option<String> },
    Secret,
    Realm { default: Option<String> },
    /// Pick one of the realms the server offered.
    RealmChoice { choices: Vec<String>, default: usize },
}

/// The answer to one `CredentialRequest`, in the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Identity(String),
    Secret(String),
    Realm(String),
    RealmChoice(usize),
}

/// Resolves credential requests on behalf of a mechanism.
///
/// Either every request is answered, in order, or the whole call fails:
/// suppliers never hand back a partially filled set.
pub trait CredentialSupplier: Send + Sync {
    fn supply(&self, requests: &[CredentialRequest]) -> Result<Vec<Credential>, SaslError>;
}

fn unsupported(request: &CredentialRequest) -> SaslError {
    SaslError::CallbackUnsupported(format!("{:?}", request))
}

/// The default index when no realm was configured, otherwise the index of
/// the configured realm. A configured realm the server does not offer
/// leaves nothing to choose.
fn choose_realm(realm: Option<&str>, choices: &[String], default: usize) -> Option<usize> {
    match realm {
        None => Some(default),
        Some(realm) => choices.iter().position(|c| c == realm),
    }
}

/// Credentials known up front: a user name, a password and optionally a
/// realm.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub realm: Option<String>,
}

impl StaticCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            realm: None,
        }
    }

    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = Some(realm.to_string());
        self
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("realm", &self.realm)
            .finish()
    }
}

impl CredentialSupplier for StaticCredentials {
    fn supply(&self, requests: &[CredentialRequest]) -> Result<Vec<Credential>, SaslError> {
        debug!("sasl: {} credential request(s)", requests.len());
        requests
            .iter()
            .map(|request| match request {
                CredentialRequest::Identity { default } => self
                    .username
                    .clone()
                    .or_else(|| default.clone())
                    .map(Credential::Identity)
                    .ok_or_else(|| unsupported(request)),
                CredentialRequest::Secret => self
                    .password
                    .clone()
                    .map(Credential::Secret)
                    .ok_or_else(|| unsupported(request)),
                CredentialRequest::Realm { default } => self
                    .realm
                    .clone()
                    .or_else(|| default.clone())
                    .map(Credential::Realm)
                    .ok_or_else(|| unsupported(request)),
                CredentialRequest::RealmChoice { choices, default } => {
                    choose_realm(self.realm.as_deref(), choices, *default)
                        .map(Credential::RealmChoice)
                        .ok_or_else(|| unsupported(request))
                }
            })
            .collect()
    }
}

/// Obtains a fresh access token, e.g. by exchanging a refresh token.
pub type TokenExchange = Box<dyn Fn() -> Result<String> + Send + Sync>;

/// Credentials for bearer-token mechanisms: the user name plus an access
/// token that is either given directly or fetched once, on first use.
pub struct BearerCredentials {
    username: String,
    token: Mutex<Option<String>>,
    exchange: Option<TokenExchange>,
}

impl BearerCredentials {
    pub fn new(username: &str, token: &str) -> Self {
        Self {
            username: username.to_string(),
            token: Mutex::new(Some(token.to_string())),
            exchange: None,
        }
    }

    pub fn with_exchange<F>(username: &str, exchange: F) -> Self
    where F: Fn() -> Result<String> + Send + Sync + 'static {
        Self {
            username: username.to_string(),
            token: Mutex::new(None),
            exchange: Some(Box::new(exchange)),
        }
    }

    fn token(&self) -> Result<String, SaslError> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| SaslError::CallbackUnsupported("token cache poisoned".to_string()))?;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let exchange = self
            .exchange
            .as_ref()
            .ok_or_else(|| unsupported(&CredentialRequest::Secret))?;
        let fresh = exchange()
            .map_err(|e| SaslError::CallbackUnsupported(format!("token exchange failed: {:#}", e)))?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }
}

impl CredentialSupplier for BearerCredentials {
    fn supply(&self, requests: &[CredentialRequest]) -> Result<Vec<Credential>, SaslError> {
        requests
            .iter()
            .map(|request| match request {
                CredentialRequest::Identity { .. } => Ok(Credential::Identity(self.username.clone())),
                CredentialRequest::Secret => self.token().map(Credential::Secret),
                _ => Err(unsupported(request)),
            })
            .collect()
    }
}
