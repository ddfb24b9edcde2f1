/*
 * connection.rs
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

//! Connection manager: one TCP or TLS channel per request, optionally through a proxy.
//!
//! A plain-HTTP proxy only changes where the TCP connection goes; the request line then carries
//! the absolute URL. For HTTPS through a proxy a tunnel is requested with a literal
//! `open host:port` line and the TLS handshake runs over it.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::net::{self, within};
use crate::uri::{Scheme, Target};

/// What one in-flight request connects to.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub target: Target,
    /// Normalized URL, used in logs and timeout reports.
    pub url: String,
    pub timeout: Duration,
}

impl ConnectionContext {
    pub fn new(target: Target, timeout: Duration) -> Self {
        let url = target.url();
        Self { target, url, timeout }
    }

    pub fn is_tls(&self) -> bool {
        self.target.scheme == Scheme::Https
    }
}

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for HttpStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

pub type ChannelReader = BufReader<ReadHalf<HttpStream>>;
pub type ChannelWriter = WriteHalf<HttpStream>;

/// An open channel split into a buffered reader and a writer. Either half can be released
/// independently; [`Connection::close`] releases both and may be called any number of times.
pub struct Connection {
    reader: Option<ChannelReader>,
    writer: Option<ChannelWriter>,
    peer: String,
    timeout: Duration,
}

async fn connect_tcp(host: &str, port: u16, limit: Duration) -> Result<TcpStream, HttpError> {
    tracing::debug!("connecting to {}:{}", host, port);
    match within(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(tcp)) => Ok(tcp),
        Ok(Err(e)) => Err(HttpError::connect(host, port, e)),
        Err(_) => Err(HttpError::Timeout {
            url: format!("{}:{}", host, port),
            timeout: limit,
        }),
    }
}

impl Connection {
    /// Open the channel described by `ctx`: direct or via the configured proxy, then TLS for
    /// https targets.
    pub async fn open(ctx: &ConnectionContext, config: &ClientConfig) -> Result<Self, HttpError> {
        let target = &ctx.target;
        let (host, port) = match &config.proxy {
            Some(proxy) => (proxy.host.as_str(), proxy.port),
            None => (target.host.as_str(), target.port),
        };
        let mut tcp = connect_tcp(host, port, ctx.timeout).await?;
        let stream = if ctx.is_tls() {
            if config.proxy.is_some() {
                let line = format!("open {}:{}{}", target.host, target.port, config.line_ending.as_str());
                tracing::debug!("requesting tunnel via {}:{}: {}", host, port, line.trim_end());
                match within(ctx.timeout, tcp.write_all(line.as_bytes())).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return Err(HttpError::connect(host, port, e)),
                    Err(_) => {
                        return Err(HttpError::Timeout {
                            url: format!("{}:{}", host, port),
                            timeout: ctx.timeout,
                        })
                    }
                }
            }
            HttpStream::Tls(Box::new(net::handshake(tcp, &target.host, config, ctx.timeout).await?))
        } else {
            HttpStream::Plain(tcp)
        };
        let (read_half, write_half) = tokio::io::split(stream);
        tracing::debug!("connected to {} via {}:{}", ctx.url, host, port);
        Ok(Self {
            reader: Some(BufReader::new(read_half)),
            writer: Some(write_half),
            peer: format!("{}:{}", host, port),
            timeout: ctx.timeout,
        })
    }

    fn closed(&self) -> HttpError {
        HttpError::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            format!("connection to {} is closed", self.peer),
        ))
    }

    pub fn reader_mut(&mut self) -> Result<&mut ChannelReader, HttpError> {
        let err = self.closed();
        self.reader.as_mut().ok_or(err)
    }

    pub fn writer_mut(&mut self) -> Result<&mut ChannelWriter, HttpError> {
        let err = self.closed();
        self.writer.as_mut().ok_or(err)
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some() || self.writer.is_some()
    }

    /// Release the writer and the reader. Failures are logged and otherwise ignored.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            match within(self.timeout, writer.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("closing writer to {}: {}", self.peer, e),
                Err(_) => tracing::debug!("closing writer to {}: timed out", self.peer),
            }
        }
        if self.reader.take().is_some() {
            tracing::debug!("closed connection to {}", self.peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt};
    use tokio::net::TcpListener;

    fn context(url: &str) -> ConnectionContext {
        ConnectionContext::new(Target::parse(url).unwrap(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn plain_channel_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(b"pong\n").await.unwrap();
            buf
        });
        let ctx = context(&format!("http://127.0.0.1:{}/", port));
        let mut conn = Connection::open(&ctx, &ClientConfig::default()).await.unwrap();
        conn.writer_mut().unwrap().write_all(b"ping").await.unwrap();
        let mut line = String::new();
        conn.reader_mut().unwrap().read_line(&mut line).await.unwrap();
        assert_eq!(line, "pong\n");
        assert_eq!(&server.await.unwrap(), b"ping");
        conn.close().await;
        conn.close().await;
        assert!(!conn.is_open());
        assert!(conn.reader_mut().is_err());
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let ctx = context(&format!("http://127.0.0.1:{}/", port));
        let err = Connection::open(&ctx, &ClientConfig::default()).await.err().unwrap();
        assert!(matches!(err, HttpError::Connect { .. }));
    }

    #[tokio::test]
    async fn plain_proxy_connects_to_proxy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move { listener.accept().await.is_ok() });
        let config = ClientConfig::default().with_proxy("127.0.0.1", port);
        let ctx = context("http://unreachable.invalid/page");
        let mut conn = Connection::open(&ctx, &config).await.unwrap();
        assert!(server.await.unwrap());
        conn.close().await;
    }

    #[tokio::test]
    async fn tls_through_proxy_sends_tunnel_line_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            let mut reader = tokio::io::BufReader::new(sock);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            line
        });
        let config = ClientConfig::default().with_proxy("127.0.0.1", port);
        let ctx = context("https://secure.example:8443/");
        let result = Connection::open(&ctx, &config).await;
        assert_eq!(server.await.unwrap(), "open secure.example:8443\r\n");
        assert!(matches!(result, Err(HttpError::Tls(_))));
    }
}
