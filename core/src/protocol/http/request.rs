/*
 * request.rs
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

//! Outgoing request: method, request target, the fixed header set, extra headers and a body.
//!
//! Exactly one body representation is active at a time; a streamed body carries the length it
//! declares and the writer copies exactly that many bytes.

use std::fmt;

use bytes::Bytes;
use tokio::io::AsyncRead;

/// HTTP request method. `ShortGet` is the minimal request mode: request line only, no headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    ShortGet,
    Post,
    Head,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get | Method::ShortGet => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
        }
    }
}

/// Request body.
pub enum Body {
    Empty,
    /// In-memory body (text or bytes), written in bounded chunks.
    Bytes(Bytes),
    /// Streamed body copied 1:1 to the wire; `length` is the declared `Content-length`.
    Stream {
        reader: Box<dyn AsyncRead + Unpin + Send>,
        length: u64,
    },
}

impl Body {
    pub fn text(s: impl Into<String>) -> Self {
        Body::Bytes(Bytes::from(s.into()))
    }

    pub fn stream(reader: impl AsyncRead + Unpin + Send + 'static, length: u64) -> Self {
        Body::Stream {
            reader: Box::new(reader),
            length,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Declared length, or None when there is no body.
    pub fn length(&self) -> Option<u64> {
        match self {
            Body::Empty => None,
            Body::Bytes(b) => Some(b.len() as u64),
            Body::Stream { length, .. } => Some(*length),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Empty"),
            Body::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Body::Stream { length, .. } => write!(f, "Stream({} bytes)", length),
        }
    }
}

/// One outgoing request. Optional headers that are None are not sent.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Path (with query), or the absolute URL when sent to a plain-HTTP proxy.
    pub target: String,
    pub keep_alive: bool,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    /// Base64 token for `Authorization: Basic`.
    pub basic_auth: Option<String>,
    /// Sent after the fixed headers, in insertion order.
    pub extra_headers: Vec<(String, String)>,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            keep_alive: false,
            referer: None,
            user_agent: None,
            host: None,
            accept: None,
            content_type: None,
            content_encoding: None,
            basic_auth: None,
            extra_headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Add an extra header (sent after the fixed set).
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn body(&mut self, body: Body) -> &mut Self {
        self.body = body;
        self
    }

    pub fn declared_length(&self) -> Option<u64> {
        self.body.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_get_uses_get_verb() {
        assert_eq!(Method::ShortGet.as_str(), "GET");
        assert_eq!(Method::Put.as_str(), "PUT");
    }

    #[test]
    fn declared_length_follows_body() {
        let mut r = Request::new(Method::Post, "/form");
        assert_eq!(r.declared_length(), None);
        r.body(Body::text("a=1"));
        assert_eq!(r.declared_length(), Some(3));
        r.body(Body::stream(&b"0123456789"[..], 10));
        assert_eq!(r.declared_length(), Some(10));
        assert_eq!(format!("{:?}", r.body), "Stream(10 bytes)");
    }
}
