use std::sync::Arc;

use log::{debug, warn};

use crate::config::SaslConfig;
use crate::credentials::CredentialSupplier;
use crate::error::SaslError;
use crate::sasl::{Mechanism, MechanismContext, MechanismProvider, XOAuth2Client, XOAUTH2};

/// Picks and builds the mechanism for a negotiation.
///
/// XOAUTH2 is built in. Everything else comes from the registered
/// providers, asked in registration order.
pub struct Negotiator {
    config: SaslConfig,
    providers: Vec<Box<dyn MechanismProvider>>,
}

impl Negotiator {
    pub fn new(config: SaslConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
        }
    }

    pub fn with_provider<P: MechanismProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn add_provider(&mut self, provider: Box<dyn MechanismProvider>) {
        self.providers.push(provider);
    }

    pub fn config(&self) -> &SaslConfig {
        &self.config
    }

    /// Builds a mechanism for the first offered name that policy allows and
    /// some provider can instantiate. The peer's order is kept as is.
    pub fn select(
        &self,
        offered: &[String],
        identity: Option<&str>,
        authorization_id: Option<&str>,
        supplier: Arc<dyn CredentialSupplier>,
        host: &str,
    ) -> Result<Box<dyn Mechanism>, SaslError> {
        debug!("sasl: mechanisms offered: {}", offered.join(" "));
        if offered.is_empty() {
            return Err(SaslError::NotAvailable);
        }

        let ctx = MechanismContext {
            authorization_id: authorization_id.map(|s| s.to_string()),
            identity: identity.map(|s| s.to_string()),
            protocol: self.config.protocol.clone(),
            host: host.to_string(),
            properties: self.config.properties.clone(),
            supplier,
        };

        for name in offered {
            if !self.config.allows(name) {
                debug!("sasl: {} disabled by configuration", name);
                continue;
            }
            if let Some(mech) = self.create(name, &ctx) {
                debug!("sasl: selected {}", mech.name());
                return Ok(mech);
            }
        }

        debug!("sasl: no usable mechanism");
        Err(SaslError::NotAvailable)
    }

    fn create(&self, name: &str, ctx: &MechanismContext) -> Option<Box<dyn Mechanism>> {
        if name.eq_ignore_ascii_case(XOAUTH2) {
            return Some(Box::new(XOAuth2Client::new(ctx.identity.clone(), ctx.supplier.clone())));
        }

        for provider in &self.providers {
            match provider.create(name, ctx) {
                Ok(Some(mech)) => return Some(mech),
                Ok(None) => {}
                Err(err) => {
                    warn!("sasl: failed to create {} client: {:#}", name, err);
                }
            }
        }
        None
    }
}
