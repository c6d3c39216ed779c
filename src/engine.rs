use log::{debug, warn};

use crate::codec;
use crate::config::SaslConfig;
use crate::conn::Transport;
use crate::error::SaslError;
use crate::quirk::XgwTrustedApp;
use crate::response::Response;
use crate::sasl::{Mechanism, QOP};

const CRNL: [u8; 2] = [b'\r', b'\n'];

/// Where the engine is in the AUTHENTICATE exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Started,
    AwaitingContinuation,
    Evaluating,
    Responding,
    Completed,
}

/// How the exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The tagged response to our AUTHENTICATE command.
    Tagged(Response),
    /// The server said BYE before answering.
    Bye(Response),
    /// We gave up: I/O error, undecodable challenge or a mechanism error.
    Aborted(SaslError),
}

/// Outcome of one run of the engine.
#[derive(Debug)]
pub struct Exchange {
    pub completion: Completion,
    /// Responses that arrived during the exchange but were not part of it,
    /// in arrival order.
    pub unsolicited: Vec<Response>,
    /// State the engine was in when the exchange ended.
    pub last_state: State,
    /// Set when the mechanism negotiated a security layer.
    pub protection: Option<SaslError>,
}

struct Session {
    tag: String,
    unsolicited: Vec<Response>,
}

/// Drives the AUTHENTICATE challenge/response loop over a transport.
///
/// The engine borrows the transport mutably for its whole lifetime, so a
/// negotiation cannot interleave with anything else on that connection.
pub struct Engine<'a, T: Transport + ?Sized> {
    conn: &'a mut T,
    prefix: Option<&'static str>,
    sasl_ir: bool,
    state: State,
}

impl<'a, T: Transport + ?Sized> Engine<'a, T> {
    pub fn new(conn: &'a mut T, config: &SaslConfig, mechanism: &str) -> Self {
        Self {
            conn,
            prefix: XgwTrustedApp::response_prefix(mechanism, config),
            sasl_ir: config.sasl_ir,
            state: State::Started,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Runs one negotiation with `mech`.
    ///
    /// Never fails: every problem becomes a terminal [`Completion`].
    pub async fn negotiate(&mut self, mech: &mut dyn Mechanism) -> Exchange {
        self.state = State::Started;

        let command = match self.initial_command(mech) {
            Ok(command) => command,
            Err(err) => return self.aborted(err, Vec::new()),
        };
        let tag = match self.conn.write_command(&command).await {
            Ok(tag) => tag,
            Err(err) => return self.aborted(SaslError::transport(err), Vec::new()),
        };

        let mut session = Session {
            tag,
            unsolicited: Vec::new(),
        };

        let completion = loop {
            self.state = State::AwaitingContinuation;
            let r = match self.conn.read_response().await {
                Ok(r) => r,
                Err(err) => {
                    debug!("sasl: read failed: {:#}", err);
                    return self.aborted(SaslError::transport(err), session.unsolicited);
                }
            };

            match r {
                Response::Continuation { data } => {
                    if let Err(err) = self.round(mech, &data).await {
                        return self.aborted(err, session.unsolicited);
                    }
                }
                r if r.is_tagged_with(&session.tag) => break Completion::Tagged(r),
                r if r.is_bye() => break Completion::Bye(r),
                r => {
                    debug!("sasl: unsolicited response during AUTHENTICATE: {}", r);
                    session.unsolicited.push(r);
                }
            }
        };

        self.state = State::Completed;
        Exchange {
            completion,
            unsolicited: session.unsolicited,
            last_state: self.state,
            protection: protection_error(mech),
        }
    }

    fn initial_command(&mut self, mech: &mut dyn Mechanism) -> Result<String, SaslError> {
        let mut command = format!("AUTHENTICATE {}", mech.name());

        if self.sasl_ir && mech.has_initial_response() && self.conn.has_capability("SASL-IR") {
            self.state = State::Evaluating;
            if let Some(ir) = mech.evaluate_challenge(&[])? {
                command.push(' ');
                if ir.is_empty() {
                    command.push_str(&String::from_utf8_lossy(codec::EMPTY_RESPONSE));
                } else {
                    command.push_str(&String::from_utf8_lossy(&codec::encode(&ir)));
                }
            }
            self.state = State::Started;
        }

        debug!("sasl: {}", command.split(' ').take(2).collect::<Vec<_>>().join(" "));
        Ok(command)
    }

    async fn round(&mut self, mech: &mut dyn Mechanism, data: &str) -> Result<(), SaslError> {
        self.state = State::Evaluating;
        let response = if mech.is_complete() {
            // Nothing more to say; an empty line lets the server finish.
            None
        } else {
            let challenge = codec::decode(data)?;
            debug!("sasl: challenge of {} byte(s)", challenge.len());
            mech.evaluate_challenge(&challenge)?
        };

        self.state = State::Responding;
        let line = response_line(response.as_deref(), self.prefix);
        match &response {
            Some(r) => debug!("sasl: response of {} byte(s)", r.len()),
            None => debug!("sasl: no response"),
        }
        self.conn.write_raw(&line).await.map_err(SaslError::transport)
    }

    fn aborted(&mut self, err: SaslError, unsolicited: Vec<Response>) -> Exchange {
        warn!("sasl: negotiation aborted in state {:?}: {}", self.state, err);
        let last_state = self.state;
        self.state = State::Completed;
        Exchange {
            completion: Completion::Aborted(err),
            unsolicited,
            last_state,
            protection: None,
        }
    }
}

/// Builds the line answering a continuation. Absent data is a bare CRLF,
/// present but empty data is `=`.
pub fn response_line(response: Option<&[u8]>, prefix: Option<&str>) -> Vec<u8> {
    let mut line = Vec::new();
    if let Some(data) = response {
        if let Some(prefix) = prefix {
            line.extend_from_slice(prefix.as_bytes());
        }
        if data.is_empty() {
            line.extend_from_slice(codec::EMPTY_RESPONSE);
        } else {
            line.extend_from_slice(&codec::encode(data));
        }
    }
    line.extend_from_slice(&CRNL);
    line
}

/// Security layers are not implemented, so a mechanism that negotiated one
/// must not be used.
fn protection_error(mech: &dyn Mechanism) -> Option<SaslError> {
    if !mech.is_complete() {
        return None;
    }
    let qop = mech.negotiated_property(QOP)?;
    if qop.eq_ignore_ascii_case("auth-int") || qop.eq_ignore_ascii_case("auth-conf") {
        warn!("sasl: {} negotiated {}, which is not supported", mech.name(), qop);
        return Some(SaslError::UnsupportedProtection(qop));
    }
    None
}
