#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;

use rs_imap_sasl::conn::Conn;
use rs_imap_sasl::error::SaslError;
use rs_imap_sasl::response::Response;
use rs_imap_sasl::sasl::{Mechanism, MechanismContext, MechanismProvider, QOP};

/// A single-round mechanism answering every challenge with a fixed payload.
pub struct FixedMechanism {
    pub name: &'static str,
    pub response: Vec<u8>,
    pub qop: Option<&'static str>,
    pub done: bool,
}

impl Mechanism for FixedMechanism {
    fn name(&self) -> &str {
        self.name
    }

    fn has_initial_response(&self) -> bool {
        true
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError> {
        assert!(!self.done, "evaluated after completion");
        self.done = true;
        Ok(Some(self.response.clone()))
    }

    fn is_complete(&self) -> bool {
        self.done
    }

    fn negotiated_property(&self, name: &str) -> Option<String> {
        if name == QOP {
            self.qop.map(|q| q.to_string())
        } else {
            None
        }
    }
}

/// Provides one `FixedMechanism` under its own name.
pub struct FixedProvider {
    pub name: &'static str,
    pub response: &'static [u8],
    pub qop: Option<&'static str>,
}

impl MechanismProvider for FixedProvider {
    fn create(&self, name: &str, _ctx: &MechanismContext) -> Result<Option<Box<dyn Mechanism>>> {
        if name != self.name {
            return Ok(None);
        }
        Ok(Some(Box::new(FixedMechanism {
            name: self.name,
            response: self.response.to_vec(),
            qop: self.qop,
            done: false,
        })))
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Records every unsolicited response the connection dispatches.
pub fn record_unsolicited<RW>(conn: &mut Conn<RW>) -> Arc<Mutex<Vec<String>>>
where RW: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    conn.add_response_handler(move |r: &Response| sink.lock().unwrap().push(r.to_string()));
    seen
}

/// Needs `rounds` challenges before it is complete.
pub struct CountingMechanism {
    pub rounds: usize,
    pub seen: usize,
}

impl Mechanism for CountingMechanism {
    fn name(&self) -> &str {
        "X-COUNT"
    }

    fn has_initial_response(&self) -> bool {
        false
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> Result<Option<Vec<u8>>, SaslError> {
        assert!(self.seen < self.rounds, "evaluated after completion");
        self.seen += 1;
        Ok(Some(format!("round {}", self.seen).into_bytes()))
    }

    fn is_complete(&self) -> bool {
        self.seen == self.rounds
    }
}

/// A transport replaying canned server lines and recording what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    pub incoming: std::collections::VecDeque<Result<Response, String>>,
    pub commands: Vec<String>,
    pub written: Vec<Vec<u8>>,
    pub notified: Vec<Response>,
    pub capabilities: Vec<String>,
    tag: u32,
}

impl ScriptedTransport {
    pub fn new(lines: &[&str]) -> Self {
        let mut t = ScriptedTransport::default();
        for line in lines {
            t.push(line);
        }
        t
    }

    pub fn push(&mut self, line: &str) {
        self.incoming.push_back(Ok(Response::parse(line).unwrap()));
    }

    pub fn push_error(&mut self, cause: &str) {
        self.incoming.push_back(Err(cause.to_string()));
    }
}

#[async_trait::async_trait]
impl rs_imap_sasl::conn::Transport for ScriptedTransport {
    async fn write_command(&mut self, command: &str) -> Result<String> {
        let tag = format!("A{}", self.tag);
        self.tag += 1;
        self.commands.push(command.to_string());
        Ok(tag)
    }

    async fn read_response(&mut self) -> Result<Response> {
        match self.incoming.pop_front() {
            Some(Ok(r)) => Ok(r),
            Some(Err(cause)) => Err(anyhow::anyhow!(cause)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.push(bytes.to_vec());
        Ok(())
    }

    fn notify_unsolicited(&mut self, responses: Vec<Response>) {
        self.notified.extend(responses);
    }

    fn apply_capabilities(&mut self, response: &Response) {
        if let Some(caps) = response.capabilities() {
            self.capabilities = caps;
        }
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(capability))
    }

    fn capabilities(&self) -> Vec<String> {
        self.capabilities.clone()
    }
}
