use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::config::SaslConfig;
use crate::conn::Transport;
use crate::credentials::{CredentialSupplier, StaticCredentials};
use crate::dispatch::{self, NegotiationResult};
use crate::engine::Engine;
use crate::error::SaslError;
use crate::negotiator::Negotiator;
use crate::quirk::XgwTrustedApp;
use crate::sasl::{MechanismProvider, StandardProvider};

/// Mechanisms the server advertises through `AUTH=` capabilities, in the
/// order it lists them.
pub fn mechanisms_from_capabilities<T: Transport + ?Sized>(conn: &T) -> Vec<String> {
    conn.capabilities()
        .iter()
        .filter_map(|c| c.strip_prefix("AUTH="))
        .map(|m| m.to_uppercase())
        .collect()
}

/// Authenticates an IMAP connection with SASL.
///
/// One `SaslAuthenticator` can serve many connections; each call runs a
/// single negotiation with a freshly built mechanism.
pub struct SaslAuthenticator {
    negotiator: Negotiator,
    host: String,
}

impl SaslAuthenticator {
    /// An authenticator offering XOAUTH2, PLAIN and LOGIN.
    pub fn new(config: SaslConfig, host: &str) -> Self {
        Self {
            negotiator: Negotiator::new(config).with_provider(StandardProvider),
            host: host.to_string(),
        }
    }

    /// Registers an extra source of mechanisms, asked after the ones
    /// already registered.
    pub fn with_provider<P: MechanismProvider + 'static>(mut self, provider: P) -> Self {
        self.negotiator.add_provider(Box::new(provider));
        self
    }

    pub fn config(&self) -> &SaslConfig {
        self.negotiator.config()
    }

    /// Authenticates with a user name and password, returning whether the
    /// server accepted us.
    ///
    /// `realm` and `authorization_id` fall back to the configured values.
    pub async fn authenticate<T: Transport + ?Sized>(
        &self,
        conn: &mut T,
        mechanisms: &[String],
        realm: Option<&str>,
        authorization_id: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> bool {
        match self.negotiate(conn, mechanisms, realm, authorization_id, user, password).await {
            Ok(result) => result.success,
            Err(err) => {
                debug!("sasl: {}", err);
                false
            }
        }
    }

    /// Like [`authenticate`](Self::authenticate), holding the connection lock
    /// for the whole negotiation.
    pub async fn authenticate_shared<T: Transport>(
        &self,
        conn: &Mutex<T>,
        mechanisms: &[String],
        realm: Option<&str>,
        authorization_id: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> bool {
        let mut conn = conn.lock().await;
        self.authenticate(&mut *conn, mechanisms, realm, authorization_id, user, password).await
    }

    /// Authenticates with a user name and password.
    ///
    /// Returns `Err(SaslError::NotAvailable)` when no offered mechanism can be
    /// used, so the caller can fall back to plain LOGIN.
    pub async fn negotiate<T: Transport + ?Sized>(
        &self,
        conn: &mut T,
        mechanisms: &[String],
        realm: Option<&str>,
        authorization_id: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<NegotiationResult, SaslError> {
        let config = self.config();
        let supplier = StaticCredentials {
            username: user.map(|s| s.to_string()),
            password: password.map(|s| s.to_string()),
            realm: realm.map(|s| s.to_string()).or_else(|| config.realm.clone()),
        };
        self.negotiate_with(conn, mechanisms, authorization_id, user, Arc::new(supplier)).await
    }

    /// Runs a negotiation with an arbitrary credential supplier.
    pub async fn negotiate_with<T: Transport + ?Sized>(
        &self,
        conn: &mut T,
        mechanisms: &[String],
        authorization_id: Option<&str>,
        identity: Option<&str>,
        supplier: Arc<dyn CredentialSupplier>,
    ) -> Result<NegotiationResult, SaslError> {
        let config = self.config();
        let authorization_id = authorization_id.or(config.authorization_id.as_deref());

        let mut mech = self
            .negotiator
            .select(mechanisms, identity, authorization_id, supplier, &self.host)?;
        let name = mech.name().to_string();

        let exchange = Engine::new(&mut *conn, config, &name).negotiate(mech.as_mut()).await;

        // Security layers are not supported: fail closed before anything is
        // surfaced to the connection.
        if let Some(err) = exchange.protection {
            return Ok(NegotiationResult::failed(
                err,
                &exchange.completion,
                exchange.unsolicited,
                exchange.last_state,
            ));
        }

        let mut result = dispatch::finalize(exchange.unsolicited, exchange.completion, exchange.last_state, &mut *conn);

        if result.success && XgwTrustedApp::applies(&name, config) {
            match XgwTrustedApp::apply(&mut *conn, authorization_id, identity).await {
                Ok(caps) => result.capabilities = caps,
                Err(err) => {
                    warn!("sasl: {} user selection failed: {}", name, err);
                    result.success = false;
                    result.error = Some(err);
                }
            }
        }

        Ok(result)
    }
}
