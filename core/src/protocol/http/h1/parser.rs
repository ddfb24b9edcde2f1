/*
 * parser.rs
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

//! HTTP/1.0 response reader: a buffered line reader driving a small state machine for the
//! status line and header block, followed by length-bounded or read-until-close body reads.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HttpError;
use crate::net::within;
use crate::protocol::http::headers::Headers;
use crate::protocol::http::request::Method;
use crate::protocol::http::response::latin1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StatusLine,
    HeaderLine,
    /// Inside a multi-line `NNN-` block, until the matching `NNN ` line.
    ContinuationLine,
    Body,
}

/// Status line and header block of one response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status_line: String,
    /// Three-digit code, 0 when the status line could not be parsed.
    pub code: u16,
    pub headers: Headers,
    /// Lines of any `NNN-` multi-line block seen among the headers.
    pub continuation: Vec<String>,
}

/// How the body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    UntilClose,
    Length(u64),
}

impl BodyMode {
    pub fn select(method: Method, code: u16, headers: &Headers) -> Self {
        if method == Method::ShortGet {
            return BodyMode::UntilClose;
        }
        if method == Method::Head || code == 204 || code == 304 {
            return BodyMode::Length(0);
        }
        match headers.get("content-length").map(str::trim) {
            Some(v) => match v.parse::<u64>() {
                Ok(n) => BodyMode::Length(n),
                Err(_) => {
                    tracing::warn!("ignoring unparsable Content-length {:?}", v);
                    BodyMode::UntilClose
                }
            },
            None => BodyMode::UntilClose,
        }
    }
}

/// Result of a body read. Reads never fail outright: whatever arrived is kept and the reason the
/// read stopped early, if any, is carried alongside.
#[derive(Debug)]
pub struct BodyRead<T> {
    pub value: T,
    pub error: Option<HttpError>,
}

impl<T> BodyRead<T> {
    fn done(value: T) -> Self {
        Self { value, error: None }
    }

    fn partial(value: T, error: HttpError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Three-digit code of a status line (`HTTP/1.0 200 OK`), if well formed.
pub fn status_code(line: &str) -> Option<u16> {
    let token = line.split_whitespace().nth(1)?;
    if token.len() != 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// True for the opening line of a multi-line block: three digits then `-`.
fn opens_block(line: &str) -> bool {
    let b = line.as_bytes();
    b.len() >= 4 && b[..3].iter().all(u8::is_ascii_digit) && b[3] == b'-'
}

/// True when `line` closes the block opened with `code`: the same digits then a space or nothing.
fn closes_block(line: &str, code: &str) -> bool {
    line.starts_with(code) && matches!(line.as_bytes().get(3), None | Some(b' '))
}

pub struct ResponseParser<R> {
    reader: R,
    state: ParseState,
    timeout: Duration,
    url: String,
    received: u64,
}

impl<R: AsyncBufRead + Unpin> ResponseParser<R> {
    /// `limit` bounds every individual read; `url` is used in timeout reports.
    pub fn new(reader: R, limit: Duration, url: impl Into<String>) -> Self {
        Self {
            reader,
            state: ParseState::StatusLine,
            timeout: limit,
            url: url.into(),
            received: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Body bytes consumed so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn timeout_error(url: &str, limit: Duration) -> HttpError {
        HttpError::Timeout {
            url: url.to_string(),
            timeout: limit,
        }
    }

    /// Next line without its terminator (CRLF or LF), or None at end of stream.
    async fn read_line(&mut self) -> Result<Option<String>, HttpError> {
        let mut buf = Vec::with_capacity(128);
        let n = match within(self.timeout, self.reader.read_until(b'\n', &mut buf)).await {
            Err(_) => return Err(Self::timeout_error(&self.url, self.timeout)),
            Ok(Err(e)) => return Err(HttpError::from_read(e)),
            Ok(Ok(n)) => n,
        };
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(Some(latin1(&buf)))
    }

    /// True when the buffered input begins with a status line. Used for short requests, whose
    /// replies may be a bare body.
    pub async fn starts_with_status(&mut self) -> Result<bool, HttpError> {
        match within(self.timeout, self.reader.fill_buf()).await {
            Err(_) => Err(Self::timeout_error(&self.url, self.timeout)),
            Ok(Err(e)) => Err(HttpError::from_read(e)),
            Ok(Ok(buf)) => Ok(buf.starts_with(b"HTTP")),
        }
    }

    /// Skip to the body for a reply that has no head.
    pub fn skip_head(&mut self) {
        self.state = ParseState::Body;
    }

    /// Read the status line and header block. A `100 Continue` block is skipped up to its blank
    /// line before the real status line is read. Malformed header lines are logged and skipped.
    pub async fn read_head(&mut self) -> Result<ResponseHead, HttpError> {
        self.state = ParseState::StatusLine;
        let mut status_line = self.next_status_line().await?;
        while status_code(&status_line) == Some(100) {
            tracing::debug!("skipping interim response: {}", status_line);
            loop {
                match self.read_line().await? {
                    None => return Err(HttpError::malformed("stream ended inside 100 Continue block")),
                    Some(line) if line.is_empty() => break,
                    Some(_) => {}
                }
            }
            status_line = self.next_status_line().await?;
        }

        let mut headers = Headers::new();
        let mut continuation = Vec::new();
        let mut block_code = String::new();
        self.state = ParseState::HeaderLine;
        loop {
            let line = match self.read_line().await? {
                Some(line) => line,
                None => {
                    if self.state == ParseState::ContinuationLine {
                        tracing::warn!("stream ended inside multi-line header block from {}", self.url);
                    }
                    break;
                }
            };
            if line.is_empty() {
                if self.state == ParseState::ContinuationLine {
                    tracing::warn!("unterminated multi-line header block from {}", self.url);
                }
                break;
            }
            match self.state {
                ParseState::ContinuationLine => {
                    if closes_block(&line, &block_code) {
                        self.state = ParseState::HeaderLine;
                    }
                    continuation.push(line);
                }
                _ => {
                    if line.starts_with("HTTP") {
                        status_line = line;
                    } else if line.starts_with(' ') || line.starts_with('\t') {
                        if !headers.extend_last(line.trim()) {
                            tracing::warn!("folded header line with no header before it: {:?}", line);
                        }
                    } else if opens_block(&line) {
                        block_code = line[..3].to_string();
                        self.state = ParseState::ContinuationLine;
                        continuation.push(line);
                    } else if let Some((name, value)) = line.split_once(':') {
                        headers.append(name.trim().to_ascii_lowercase(), value.trim());
                    } else {
                        tracing::warn!("skipping malformed header line: {:?}", line);
                    }
                }
            }
        }
        self.state = ParseState::Body;

        let code = match status_code(&status_line) {
            Some(code) => code,
            None => {
                tracing::warn!("malformed status line from {}: {:?}", self.url, status_line);
                0
            }
        };
        Ok(ResponseHead {
            status_line,
            code,
            headers,
            continuation,
        })
    }

    async fn next_status_line(&mut self) -> Result<String, HttpError> {
        loop {
            match self.read_line().await? {
                None => return Err(HttpError::malformed("connection closed before status line")),
                Some(line) if line.is_empty() => continue,
                Some(line) => return Ok(line),
            }
        }
    }

    fn remaining(&self, mode: BodyMode) -> Option<u64> {
        match mode {
            BodyMode::UntilClose => None,
            BodyMode::Length(n) => Some(n.saturating_sub(self.received)),
        }
    }

    fn short_body(&self, mode: BodyMode) -> Option<HttpError> {
        match mode {
            BodyMode::Length(n) if self.received < n => Some(HttpError::malformed(format!(
                "body ended after {} of {} declared bytes",
                self.received, n
            ))),
            _ => None,
        }
    }

    /// Accumulate the body as text, one character per byte.
    pub async fn read_text(&mut self, mode: BodyMode) -> BodyRead<String> {
        let mut text = String::new();
        loop {
            let remaining = self.remaining(mode);
            if remaining == Some(0) {
                return BodyRead::done(text);
            }
            let chunk = match within(self.timeout, self.reader.fill_buf()).await {
                Err(_) => return BodyRead::partial(text, Self::timeout_error(&self.url, self.timeout)),
                Ok(Err(e)) => return BodyRead::partial(text, HttpError::from_read(e)),
                Ok(Ok(chunk)) => chunk,
            };
            if chunk.is_empty() {
                break;
            }
            let n = take(chunk.len(), remaining);
            text.push_str(&latin1(&chunk[..n]));
            self.reader.consume(n);
            self.received += n as u64;
        }
        match self.short_body(mode) {
            Some(e) => BodyRead::partial(text, e),
            None => BodyRead::done(text),
        }
    }

    /// Copy the body into `sink` without materializing it. Returns the byte count written.
    pub async fn copy_to<W>(&mut self, mode: BodyMode, sink: &mut W) -> BodyRead<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        loop {
            let remaining = self.remaining(mode);
            if remaining == Some(0) {
                break;
            }
            let chunk = match within(self.timeout, self.reader.fill_buf()).await {
                Err(_) => return BodyRead::partial(written, Self::timeout_error(&self.url, self.timeout)),
                Ok(Err(e)) => return BodyRead::partial(written, HttpError::from_read(e)),
                Ok(Ok(chunk)) => chunk,
            };
            if chunk.is_empty() {
                if let Some(e) = self.short_body(mode) {
                    return BodyRead::partial(written, e);
                }
                break;
            }
            let n = take(chunk.len(), remaining);
            if let Err(e) = sink.write_all(&chunk[..n]).await {
                return BodyRead::partial(written, HttpError::Io(e));
            }
            self.reader.consume(n);
            self.received += n as u64;
            written += n as u64;
        }
        if let Err(e) = sink.flush().await {
            return BodyRead::partial(written, HttpError::Io(e));
        }
        BodyRead::done(written)
    }
}

fn take(available: usize, remaining: Option<u64>) -> usize {
    match remaining {
        Some(r) if (available as u64) > r => r as usize,
        _ => available,
    }
}
