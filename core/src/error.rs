/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Sonda, a hand-written HTTP/1.0 client.
 *
 * Sonda is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sonda is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sonda.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Errors raised by the HTTP engine.
//!
//! Internal layers propagate these with `?`. The session client is the only place that turns
//! them into degraded results (empty string, empty header map, `false`).

use std::fmt;
use std::io;
use std::time::Duration;

/// Failure of one request/response exchange or of one of its stages.
#[derive(Debug)]
pub enum HttpError {
    /// The URL could not be split into scheme, host, port and path.
    InvalidUrl(String),
    /// TCP connect failed: refused, unresolved host, or socket fault.
    Connect {
        host: String,
        port: u16,
        source: io::Error,
    },
    /// TLS handshake failure or unusable certificate/key material.
    Tls(String),
    /// A read did not complete within the configured request timeout.
    Timeout { url: String, timeout: Duration },
    /// Unparsable status line or header.
    Malformed(String),
    /// The shared redirect budget was exhausted before this URL could be fetched.
    RedirectBudget { url: String, limit: u32 },
    /// The response stream was corrupted mid-transfer; never degraded to a partial body.
    Corrupt(String),
    /// Any other transport error.
    Io(io::Error),
}

impl HttpError {
    pub fn connect(host: &str, port: u16, source: io::Error) -> Self {
        Self::Connect {
            host: host.to_string(),
            port,
            source,
        }
    }

    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// Corruption is the one failure that is escalated instead of yielding a partial body.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, HttpError::Corrupt(_))
    }

    /// Classify a transport error raised while reading the response stream.
    pub(crate) fn from_read(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::InvalidData => HttpError::Corrupt(e.to_string()),
            _ => HttpError::Io(e),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::InvalidUrl(url) => write!(f, "invalid URL: {}", url),
            HttpError::Connect { host, port, source } => {
                write!(f, "cannot connect to {}:{}: {}", host, port, source)
            }
            HttpError::Tls(m) => write!(f, "TLS: {}", m),
            HttpError::Timeout { url, timeout } => {
                write!(f, "timed out after {} ms reading {}", timeout.as_millis(), url)
            }
            HttpError::Malformed(m) => write!(f, "malformed response: {}", m),
            HttpError::RedirectBudget { url, limit } => {
                write!(f, "recursion limit {} reached, not fetching {}", limit, url)
            }
            HttpError::Corrupt(m) => write!(f, "response stream corrupted: {}", m),
            HttpError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Connect { source, .. } => Some(source),
            HttpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_data_is_corruption() {
        let e = HttpError::from_read(io::Error::new(io::ErrorKind::InvalidData, "bad record mac"));
        assert!(e.is_corrupt());
        let e = HttpError::from_read(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(!e.is_corrupt());
    }

    #[test]
    fn timeout_message_names_url_and_duration() {
        let e = HttpError::Timeout {
            url: "http://h.com/".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert!(e.is_timeout());
        assert_eq!(e.to_string(), "timed out after 1500 ms reading http://h.com/");
    }
}
