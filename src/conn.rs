use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::response::Response;

const TAG_PREFIX: &str = "A";
/// Largest literal accepted from the server by default.
pub const MAX_LITERAL_SIZE: usize = 64 * 1024;
const CRNL: [u8; 2] = [b'\r', b'\n'];

/// The pieces of an IMAP connection the authentication engine relies on.
///
/// Implementations must process responses strictly in arrival order. The
/// engine holds `&mut` access for a whole negotiation, so nothing else can
/// interleave commands.
#[async_trait]
pub trait Transport: Send {
    /// Sends `<tag> <command>` and returns the tag.
    async fn write_command(&mut self, command: &str) -> Result<String>;

    /// Blocks until the next response line arrives.
    async fn read_response(&mut self) -> Result<Response>;

    /// Writes bytes verbatim and flushes.
    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Runs a command to completion. The last element is the tagged
    /// response, or an untagged BYE if the server hung up on us.
    async fn command(&mut self, command: &str) -> Result<Vec<Response>> {
        let tag = self.write_command(command).await?;
        let mut responses = Vec::new();
        loop {
            let r = self.read_response().await?;
            let done = r.is_tagged_with(&tag) || r.is_bye();
            responses.push(r);
            if done {
                return Ok(responses);
            }
        }
    }

    /// Hands responses that were not part of a command's result to whoever
    /// listens for them.
    fn notify_unsolicited(&mut self, responses: Vec<Response>);

    /// Replaces the cached capability set if `response` carries one.
    fn apply_capabilities(&mut self, response: &Response);

    fn has_capability(&self, capability: &str) -> bool;

    fn capabilities(&self) -> Vec<String>;
}

pub type ResponseHandler = Box<dyn Fn(&Response) + Send + Sync>;

/// An IMAP client connection over any tokio byte stream.
pub struct Conn<RW: AsyncRead + AsyncWrite + Unpin + Send> {
    pub stream: BufReader<RW>,
    tag: u32,
    capabilities: Vec<String>,
    handlers: Vec<ResponseHandler>,
    pub max_literal_size: usize,
}

impl<RW: AsyncRead + AsyncWrite + Unpin + Send> Conn<RW> {
    pub fn new(stream: RW) -> Self {
        Self {
            stream: BufReader::new(stream),
            tag: 0,
            capabilities: Vec::new(),
            handlers: Vec::new(),
            max_literal_size: MAX_LITERAL_SIZE,
        }
    }

    pub fn add_response_handler<F>(&mut self, handler: F)
    where F: Fn(&Response) + Send + Sync + 'static {
        self.handlers.push(Box::new(handler));
    }

    fn next_tag(&mut self) -> String {
        let tag = format!("{}{}", TAG_PREFIX, self.tag);
        self.tag += 1;
        tag
    }

    async fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let n = self.stream.read_until(b'\n', buf).await?;
        if n == 0 {
            bail!("connection closed by server");
        }
        Ok(())
    }

    /// Size of a trailing `{n}` literal marker, if any.
    fn literal_size(line: &[u8]) -> Result<Option<u64>> {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim_end(),
            Err(_) => return Ok(None),
        };
        let digits = match line.strip_suffix('}').and_then(|l| l.rfind('{').map(|open| &l[open + 1..])) {
            Some(d) if !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()) => d,
            _ => return Ok(None),
        };
        digits
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("literal size out of range: {{{}}}", digits))
    }

    pub async fn close(&mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await.map_err(|e| anyhow!(e))
    }
}

#[async_trait]
impl<RW: AsyncRead + AsyncWrite + Unpin + Send> Transport for Conn<RW> {
    async fn write_command(&mut self, command: &str) -> Result<String> {
        let tag = self.next_tag();
        let w = self.stream.get_mut();
        w.write_all(tag.as_bytes()).await?;
        w.write_all(b" ").await?;
        w.write_all(command.as_bytes()).await?;
        w.write_all(&CRNL).await?;
        w.flush().await?;
        Ok(tag)
    }

    async fn read_response(&mut self) -> Result<Response> {
        let mut buf = Vec::new();
        self.read_line(&mut buf).await?;

        // Literals are inlined so the response stays a single line.
        while let Some(size) = Self::literal_size(&buf)? {
            if size > self.max_literal_size as u64 {
                bail!("literal of {} bytes exceeds the limit of {}", size, self.max_literal_size);
            }
            let n = (&mut self.stream).take(size).read_to_end(&mut buf).await?;
            if (n as u64) < size {
                bail!("connection closed inside a literal");
            }
            self.read_line(&mut buf).await?;
        }

        let line = String::from_utf8_lossy(&buf);
        Response::parse(&line)
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let w = self.stream.get_mut();
        w.write_all(bytes).await?;
        w.flush().await.map_err(|e| anyhow!(e))
    }

    fn notify_unsolicited(&mut self, responses: Vec<Response>) {
        if self.handlers.is_empty() && !responses.is_empty() {
            debug!("imap: dropping {} unsolicited response(s), no handler", responses.len());
        }
        for r in &responses {
            for handler in &self.handlers {
                handler(r);
            }
        }
    }

    fn apply_capabilities(&mut self, response: &Response) {
        if let Some(caps) = response.capabilities() {
            if caps.is_empty() {
                warn!("imap: empty capability list in {}", response);
            }
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
