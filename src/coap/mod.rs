//! Request/response message model shared by every node.
//!
//! The wire protocol and its framing live outside this crate; adapters
//! translate between their transport and these plain types.
//!
//! ```text
//!  ┌──────────────┐  Request   ┌──────────────┐
//!  │  node task   │───────────▶│   CoapPort   │──▶ transport (external)
//!  │              │◀───────────│   adapter    │
//!  └──────────────┘  Option<Response>  (None = timeout)
//! ```

pub mod payload;

use core::fmt;
use std::net::Ipv6Addr;

use crate::error::ExchangeError;

/// Default UDP port of the constrained-network protocol.
pub const DEFAULT_PORT: u16 = 5683;

// ───────────────────────────────────────────────────────────────
// Methods and status codes
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// Status codes in use across the mesh, encoded as `class << 5 | detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Code {
    Created = 0x41,
    Changed = 0x44,
    Content = 0x45,
    BadRequest = 0x80,
    NotFound = 0x84,
    MethodNotAllowed = 0x85,
    InternalServerError = 0xA0,
    ServiceUnavailable = 0xA3,
}

impl Code {
    pub const fn class(self) -> u8 {
        self as u8 >> 5
    }

    pub const fn detail(self) -> u8 {
        self as u8 & 0x1F
    }

    /// 2.xx
    pub const fn is_success(self) -> bool {
        self.class() == 2
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())
    }
}

// ───────────────────────────────────────────────────────────────
// Endpoint
// ───────────────────────────────────────────────────────────────

/// Network address of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub addr: Ipv6Addr,
    pub port: u16,
}

impl Endpoint {
    pub const fn new(addr: Ipv6Addr) -> Self {
        Self {
            addr,
            port: DEFAULT_PORT,
        }
    }

    /// Parse a bare address, accepting it only when its textual form starts
    /// with the mesh prefix (e.g. `fd00::`). Anything else is `None`.
    pub fn parse_prefixed(text: &str, prefix: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with(prefix) {
            return None;
        }
        text.parse::<Ipv6Addr>().ok().map(Self::new)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coap://[{}]:{}", self.addr, self.port)
    }
}

// ───────────────────────────────────────────────────────────────
// Request / Response
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Resource path without leading slash, e.g. `res_alarm`.
    pub path: String,
    pub query: Option<String>,
    pub payload: String,
    /// Ask the server to keep pushing the resource state on change.
    pub observe: bool,
}

impl Request {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.trim_start_matches('/').to_owned(),
            query: None,
            payload: String::new(),
            observe: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str, payload: impl Into<String>) -> Self {
        Self::new(Method::Post, path).with_payload(payload)
    }

    pub fn put(path: &str, payload: impl Into<String>) -> Self {
        Self::new(Method::Put, path).with_payload(payload)
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    #[must_use]
    pub fn observe(mut self) -> Self {
        self.observe = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: Code,
    pub payload: String,
}

impl Response {
    pub fn new(code: Code) -> Self {
        Self {
            code,
            payload: String::new(),
        }
    }

    pub fn content(payload: impl Into<String>) -> Self {
        Self {
            code: Code::Content,
            payload: payload.into(),
        }
    }
}

/// Classify an exchange outcome: no response is a timeout, a non-2.xx
/// code is a status error.
pub fn success(response: Option<Response>) -> Result<Response, ExchangeError> {
    match response {
        None => Err(ExchangeError::Timeout),
        Some(r) if r.code.is_success() => Ok(r),
        Some(r) => Err(ExchangeError::Status(r.code)),
    }
}
