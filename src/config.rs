use std::collections::HashMap;

use serde::Deserialize;

/// Knobs for a SASL negotiation.
///
/// Can be embedded in a host application's configuration file or built from
/// JavaMail-style `mail.<protocol>.sasl.*` properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaslConfig {
    /// Service name handed to mechanisms, `imap` or `imaps`.
    pub protocol: String,
    /// Only these mechanisms may be used, if set.
    pub mechanisms: Option<Vec<String>>,
    /// These mechanisms are never used.
    pub disabled_mechanisms: Vec<String>,
    pub authorization_id: Option<String>,
    pub realm: Option<String>,
    /// Send the extra LOGIN required by GroupWise after XGWTRUSTEDAPP.
    pub xgwtrustedapp_hack: bool,
    /// Send the initial response on the AUTHENTICATE line when the server
    /// supports SASL-IR.
    pub sasl_ir: bool,
    /// Passed through to mechanism providers untouched.
    pub properties: HashMap<String, String>,
}

impl Default for SaslConfig {
    fn default() -> Self {
        SaslConfig {
            protocol: "imap".to_string(),
            mechanisms: None,
            disabled_mechanisms: Vec::new(),
            authorization_id: None,
            realm: None,
            xgwtrustedapp_hack: true,
            sasl_ir: false,
            properties: HashMap::new(),
        }
    }
}

fn bool_property(props: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match props.get(key) {
        Some(v) if v.trim().eq_ignore_ascii_case("true") => true,
        Some(v) if v.trim().eq_ignore_ascii_case("false") => false,
        _ => default,
    }
}

fn list_property(props: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    props.get(key).map(|v| {
        v.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_uppercase())
            .collect()
    })
}

impl SaslConfig {
    pub fn from_properties(protocol: &str, props: &HashMap<String, String>) -> Self {
        let key = |name: &str| format!("mail.{}.sasl.{}", protocol, name);
        let defaults = SaslConfig::default();

        SaslConfig {
            protocol: protocol.to_string(),
            mechanisms: list_property(props, &key("mechanisms")),
            disabled_mechanisms: list_property(props, &key("disabledmechanisms")).unwrap_or_default(),
            authorization_id: props.get(&key("authorizationid")).cloned(),
            realm: props.get(&key("realm")).cloned(),
            xgwtrustedapp_hack: bool_property(props, &key("xgwtrustedapphack.enable"), defaults.xgwtrustedapp_hack),
            sasl_ir: bool_property(props, &key("usesaslir"), defaults.sasl_ir),
            properties: props.clone(),
        }
    }

    /// Whether the allow/deny policy lets `name` be used.
    pub fn allows(&self, name: &str) -> bool {
        if self.disabled_mechanisms.iter().any(|m| m.eq_ignore_ascii_case(name)) {
            return false;
        }
        match &self.mechanisms {
            Some(allowed) => allowed.iter().any(|m| m.eq_ignore_ascii_case(name)),
            None => true,
        }
    }
}
