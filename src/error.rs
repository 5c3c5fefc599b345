//! Unified error types for the edge and actuator nodes.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! node task's error handling uniform. All variants are `Copy` so they can be
//! passed through the service and logged without allocation.
//!
//! None of these are fatal: the node task logs them and carries on, relying
//! on the next fusion cycle to converge.

use core::fmt;

use crate::coap::Code;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound payload could not be decoded or was out of domain.
    Payload(PayloadError),
    /// A request/response exchange with a peer did not succeed.
    Exchange(ExchangeError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload(e) => write!(f, "payload: {e}"),
            Self::Exchange(e) => write!(f, "exchange: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

/// Rejections at the payload boundary. Each maps to a Bad Request status
/// when serving a request, and to a silent drop for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// No payload bytes at all.
    Empty,
    /// Payload exceeds the resource's buffer size.
    TooLarge,
    /// Not parseable, or a required field is missing.
    Malformed,
    /// Parsed, but a value lies outside its domain.
    /// The `&'static str` names the offending field.
    OutOfRange(&'static str),
    /// The payload names no field this resource understands.
    UnknownField,
    /// An outbound value could not be serialised.
    Unencodable,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::TooLarge => write!(f, "payload too large"),
            Self::Malformed => write!(f, "malformed payload"),
            Self::OutOfRange(field) => write!(f, "{field} out of range"),
            Self::UnknownField => write!(f, "no recognised field"),
            Self::Unencodable => write!(f, "payload could not be encoded"),
        }
    }
}

impl From<PayloadError> for Error {
    fn from(e: PayloadError) -> Self {
        Self::Payload(e)
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(_: serde_json::Error) -> Self {
        Self::Malformed
    }
}

// ---------------------------------------------------------------------------
// Exchange errors
// ---------------------------------------------------------------------------

/// Outcome of a request that did not produce a usable success response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError {
    /// No response arrived (transport-level timeout).
    Timeout,
    /// The peer answered with a 4.xx/5.xx status.
    Status(Code),
    /// The peer answered 2.xx but the body could not be used.
    BadBody,
    /// The destination has not been resolved by discovery.
    Unresolved,
    /// The request body could not be encoded; nothing was sent.
    Unencodable,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "no response (timeout)"),
            Self::Status(code) => write!(f, "error status {code}"),
            Self::BadBody => write!(f, "unusable response body"),
            Self::Unresolved => write!(f, "peer not resolved"),
            Self::Unencodable => write!(f, "request body not encodable"),
        }
    }
}

impl From<ExchangeError> for Error {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io,
    /// The file could not be parsed as TOML.
    Parse,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Parse => write!(f, "parse error"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
