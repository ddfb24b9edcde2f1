/*
 * writer.rs
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

//! HTTP/1.0 request serializer. Header order is fixed: Connection, Referer, User-Agent, Host,
//! Accept, Content-type, Content-encoding, Authorization, extra headers, Content-length.

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::LineEnding;
use crate::error::HttpError;
use crate::protocol::http::request::{Body, Method, Request};

/// Largest single write for in-memory bodies.
pub const WRITE_CHUNK: usize = 512;

fn push_line(out: &mut Vec<u8>, line: &str, eol: LineEnding) {
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(eol.as_bytes());
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &Option<String>, eol: LineEnding) {
    if let Some(v) = value {
        push_line(out, &format!("{}: {}", name, v), eol);
    }
}

/// Request line and header block, including the terminating blank line.
pub fn encode_head(request: &Request, eol: LineEnding) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    if request.method == Method::ShortGet {
        push_line(&mut out, &format!("GET {}", request.target), eol);
        out.extend_from_slice(eol.as_bytes());
        return out;
    }
    push_line(
        &mut out,
        &format!("{} {} HTTP/1.0", request.method.as_str(), request.target),
        eol,
    );
    let connection = if request.keep_alive { "Keep-Alive" } else { "close" };
    push_line(&mut out, &format!("Connection: {}", connection), eol);
    push_header(&mut out, "Referer", &request.referer, eol);
    push_header(&mut out, "User-Agent", &request.user_agent, eol);
    push_header(&mut out, "Host", &request.host, eol);
    push_header(&mut out, "Accept", &request.accept, eol);
    push_header(&mut out, "Content-type", &request.content_type, eol);
    push_header(&mut out, "Content-encoding", &request.content_encoding, eol);
    if let Some(token) = &request.basic_auth {
        push_line(&mut out, &format!("Authorization: Basic {}", token), eol);
    }
    for (name, value) in &request.extra_headers {
        push_line(&mut out, &format!("{}: {}", name, value), eol);
    }
    if let Some(len) = request.declared_length() {
        push_line(&mut out, &format!("Content-length: {}", len), eol);
    }
    out.extend_from_slice(eol.as_bytes());
    out
}

/// Write the request to the channel. Streamed bodies are consumed. Returns the number of body
/// bytes written.
pub async fn write_request<W>(writer: &mut W, request: &mut Request, eol: LineEnding) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let head = encode_head(request, eol);
    tracing::debug!("request head:\n{}", String::from_utf8_lossy(&head).trim_end());
    writer.write_all(&head).await?;
    let written = if request.method == Method::ShortGet {
        0
    } else {
        match &mut request.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => {
                for chunk in bytes.chunks(WRITE_CHUNK) {
                    writer.write_all(chunk).await?;
                }
                bytes.len() as u64
            }
            Body::Stream { reader, length } => {
                let copied = tokio::io::copy(&mut reader.take(*length), writer).await?;
                if copied != *length {
                    return Err(HttpError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("body source ended after {} of {} declared bytes", copied, length),
                    )));
                }
                copied
            }
        }
    };
    writer.flush().await?;
    Ok(written)
}
