/*
 * response.rs
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

//! Received response: status classification, headers, redirect target and body.

use crate::protocol::http::headers::Headers;

/// Status classification. Codes outside the recognized set map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    MovedPermanently,
    Found,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    Unknown,
}

impl Status {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Status::Ok,
            201 => Status::Created,
            204 => Status::NoContent,
            301 => Status::MovedPermanently,
            302 => Status::Found,
            400 => Status::BadRequest,
            401 => Status::Unauthorized,
            403 => Status::Forbidden,
            404 => Status::NotFound,
            500..=599 => Status::ServerError,
            _ => Status::Unknown,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Status::MovedPermanently | Status::Found)
    }
}

/// Body of a response: materialized text, or the byte count written to a caller's sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Not read (HEAD, or a redirect skipped during a sink download).
    None,
    Text(String),
    Sink(u64),
}

#[derive(Debug, Clone)]
pub struct Response {
    /// Numeric code from the status line; 0 when it could not be parsed.
    pub code: u16,
    pub status: Status,
    pub status_line: String,
    pub headers: Headers,
    /// Location value, set only for 30x responses.
    pub location: Option<String>,
    pub body: ResponseBody,
    /// True when the body read stopped early (timeout or transport error).
    pub truncated: bool,
}

impl Response {
    pub fn new(code: u16, status_line: impl Into<String>, headers: Headers) -> Self {
        let status = Status::from_code(code);
        let location = if (300..400).contains(&code) {
            headers.get("location").map(str::to_string)
        } else {
            None
        };
        Self {
            code,
            status,
            status_line: status_line.into(),
            headers,
            location,
            body: ResponseBody::None,
            truncated: false,
        }
    }

    /// Text body, or "" when the body was not materialized.
    pub fn text(&self) -> &str {
        match &self.body {
            ResponseBody::Text(t) => t,
            _ => "",
        }
    }

    pub fn into_text(self) -> String {
        match self.body {
            ResponseBody::Text(t) => t,
            _ => String::new(),
        }
    }
}

/// Decode bytes as ISO-8859-1: one byte, one character.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(Status::from_code(200), Status::Ok);
        assert_eq!(Status::from_code(201), Status::Created);
        assert_eq!(Status::from_code(302), Status::Found);
        assert_eq!(Status::from_code(503), Status::ServerError);
        assert_eq!(Status::from_code(307), Status::Unknown);
        assert_eq!(Status::from_code(0), Status::Unknown);
        assert!(Status::MovedPermanently.is_redirect());
        assert!(!Status::Ok.is_redirect());
    }

    #[test]
    fn location_only_for_redirects() {
        let mut h = Headers::new();
        h.append("location", "/next");
        assert_eq!(Response::new(302, "HTTP/1.0 302 Found", h.clone()).location.as_deref(), Some("/next"));
        assert_eq!(Response::new(200, "HTTP/1.0 200 OK", h).location, None);
    }

    #[test]
    fn latin1_maps_each_byte() {
        assert_eq!(latin1(b"caf\xe9"), "café");
    }
}
