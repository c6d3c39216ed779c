use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
    Bye,
    Preauth,
}

impl Status {
    fn parse(s: &str) -> Option<Status> {
        match s.to_uppercase().as_str() {
            "OK" => Some(Status::Ok),
            "NO" => Some(Status::No),
            "BAD" => Some(Status::Bad),
            "BYE" => Some(Status::Bye),
            "PREAUTH" => Some(Status::Preauth),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::No => "NO",
            Status::Bad => "BAD",
            Status::Bye => "BYE",
            Status::Preauth => "PREAUTH",
        };
        write!(f, "{}", s)
    }
}

/// One server response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+ <data>`: the server wants more data for the current command.
    Continuation { data: String },
    /// `<tag> <status> [<code>] <text>`: completion of a command.
    Tagged {
        tag: String,
        status: Status,
        code: Option<String>,
        text: String,
    },
    /// `* ...`: status responses carry `status`, server data does not.
    Untagged {
        status: Option<Status>,
        code: Option<String>,
        text: String,
    },
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(OK|NO|BAD|BYE|PREAUTH)\b(?:\s+\[([^\]]*)\])?\s*(.*)$").unwrap()
    })
}

impl Response {
    /// Parses a single line, with or without its CRLF terminator.
    pub fn parse(line: &str) -> Result<Response> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');

        if let Some(rest) = line.strip_prefix('+') {
            let data = rest.strip_prefix(' ').unwrap_or(rest);
            return Ok(Response::Continuation { data: data.to_string() });
        }

        let (tag, rest) = match line.split_once(' ') {
            Some((tag, rest)) => (tag, rest),
            None => (line, ""),
        };
        if tag.is_empty() {
            bail!("Malformed response: {:?}", line);
        }

        let caps = status_re().captures(rest);
        if tag == "*" {
            return Ok(match caps {
                Some(caps) => Response::Untagged {
                    status: Status::parse(&caps[1]),
                    code: caps.get(2).map(|m| m.as_str().to_string()),
                    text: caps[3].to_string(),
                },
                None => Response::Untagged {
                    status: None,
                    code: None,
                    text: rest.to_string(),
                },
            });
        }

        match caps.and_then(|caps| Status::parse(&caps[1]).map(|status| (status, caps))) {
            Some((status, caps)) => Ok(Response::Tagged {
                tag: tag.to_string(),
                status,
                code: caps.get(2).map(|m| m.as_str().to_string()),
                text: caps[3].to_string(),
            }),
            None => bail!("Tagged response without status: {:?}", line),
        }
    }

    /// A BYE synthesized locally, e.g. when the connection dropped.
    pub fn bye(cause: &str) -> Response {
        Response::Untagged {
            status: Some(Status::Bye),
            code: None,
            text: cause.to_string(),
        }
    }

    pub fn is_continuation(&self) -> bool {
        matches!(self, Response::Continuation { .. })
    }

    pub fn is_tagged_with(&self, expected: &str) -> bool {
        matches!(self, Response::Tagged { tag, .. } if tag == expected)
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Response::Untagged { status: Some(Status::Bye), .. })
    }

    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Tagged { status, .. } => Some(*status),
            Response::Untagged { status, .. } => *status,
            Response::Continuation { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status() == Some(Status::Ok)
    }

    pub fn text(&self) -> &str {
        match self {
            Response::Continuation { data } => data,
            Response::Tagged { text, .. } | Response::Untagged { text, .. } => text,
        }
    }

    /// Capabilities announced by this response, either as a
    /// `[CAPABILITY ...]` response code or as `* CAPABILITY ...` data.
    pub fn capabilities(&self) -> Option<Vec<String>> {
        let list = match self {
            Response::Tagged { code: Some(code), .. }
            | Response::Untagged { code: Some(code), .. } => code.as_str(),
            Response::Untagged { status: None, text, .. } => text.as_str(),
            _ => return None,
        };

        let mut words = list.split_whitespace();
        match words.next() {
            Some(first) if first.eq_ignore_ascii_case("CAPABILITY") => {
                Some(words.map(|w| w.to_uppercase()).collect())
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Continuation { data } => write!(f, "+ {}", data),
            Response::Tagged { tag, status, code, text } => {
                write!(f, "{} {}", tag, status)?;
                if let Some(code) = code {
                    write!(f, " [{}]", code)?;
                }
                write!(f, " {}", text)
            }
            Response::Untagged { status: None, text, .. } => write!(f, "* {}", text),
            Response::Untagged { status: Some(status), code, text } => {
                write!(f, "* {}", status)?;
                if let Some(code) = code {
                    write!(f, " [{}]", code)?;
                }
                write!(f, " {}", text)
            }
        }
    }
}
