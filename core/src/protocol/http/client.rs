/*
 * client.rs
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

//! Session client: the public face of the engine.
//!
//! Every operation opens one connection per request, writes the request, reads the response,
//! updates the cookie jar and decides whether to follow up (Location, meta refresh, frames).
//! Failures never escape: they are logged, kept as [`HttpClient::last_error`], and the call
//! returns an empty or partial result.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::AsyncWrite;

use crate::config::ClientConfig;
use crate::cookie::CookieJar;
use crate::error::HttpError;
use crate::protocol::http::connection::{Connection, ConnectionContext};
use crate::protocol::http::frames::{find_frames, splice};
use crate::protocol::http::h1::{write_request, BodyMode, ResponseParser};
use crate::protocol::http::headers::Headers;
use crate::protocol::http::multipart::{self, FieldValue};
use crate::protocol::http::redirect::{follow_up, looks_like_markup, RedirectBudget};
use crate::protocol::http::request::{Body, Method, Request};
use crate::protocol::http::response::{Response, ResponseBody};
use crate::uri::{append_query, encode_form, Scheme, Target};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Sink<'s> = &'s mut (dyn AsyncWrite + Unpin + Send);

pub struct HttpClient {
    config: ClientConfig,
    jar: Option<CookieJar>,
    rng: StdRng,
    requests_sent: u64,
    bytes_received: u64,
    last_status: Option<u16>,
    last_error: Option<HttpError>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Client with a seeded generator, so multipart boundaries are reproducible.
    pub fn with_seed(config: ClientConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ClientConfig, rng: StdRng) -> Self {
        let jar = config.allow_cookies.then(|| {
            let mut jar = CookieJar::new();
            jar.set_allow_foreign_cookies(config.allow_foreign_cookies);
            jar
        });
        Self {
            config,
            jar,
            rng,
            requests_sent: 0,
            bytes_received: 0,
            last_status: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// None when cookies are disabled.
    pub fn cookie_jar(&self) -> Option<&CookieJar> {
        self.jar.as_ref()
    }

    pub fn cookie_jar_mut(&mut self) -> Option<&mut CookieJar> {
        self.jar.as_mut()
    }

    /// Requests written by this client, follow-ups included.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// Response body bytes read by this client.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Status code of the most recent response.
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Most recent failure, kept until the next one.
    pub fn last_error(&self) -> Option<&HttpError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<HttpError> {
        self.last_error.take()
    }

    // ---- public operations ----

    /// Fetch a URL and return its text, following redirects and inlining frames.
    pub async fn get(&mut self, url: &str) -> String {
        tracing::info!("GET {}", url);
        let mut budget = RedirectBudget::new(self.config.recursion_limit);
        let text = self.fetch_text(url.to_string(), None, &mut budget).await;
        tracing::info!("GET {} done: {} chars, {} requests", url, text.len(), budget.used());
        text
    }

    /// GET with form parameters appended to the query string.
    pub async fn get_with_params<K, V>(&mut self, url: &str, params: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = append_query(url, &encode_form(params));
        self.get(&url).await
    }

    /// Minimal request: the request line only, body read until the server closes. No follow-ups.
    pub async fn get_short(&mut self, url: &str) -> String {
        tracing::info!("short GET {}", url);
        let Some(target) = self.target(url) else {
            return String::new();
        };
        let request = self.build_request(Method::ShortGet, &target, None);
        match self.execute(&target, request, None).await {
            Ok(response) => response.into_text(),
            Err(e) => {
                self.fail(e);
                String::new()
            }
        }
    }

    /// Stream the body of a URL into `sink`, following Location redirects. Returns the number of
    /// bytes written; nothing is materialized, so meta refresh and frames are not considered.
    pub async fn get_to_sink<W>(&mut self, url: &str, sink: &mut W) -> u64
    where
        W: AsyncWrite + Unpin + Send,
    {
        tracing::info!("GET {} to sink", url);
        let mut budget = RedirectBudget::new(self.config.recursion_limit);
        let mut url = url.to_string();
        let mut referer: Option<String> = None;
        loop {
            let Some(target) = self.target(&url) else {
                return 0;
            };
            if !budget.enter() {
                self.fail(HttpError::RedirectBudget {
                    url,
                    limit: budget.limit(),
                });
                return 0;
            }
            let request = self.build_request(Method::Get, &target, referer.as_deref());
            let out: Sink<'_> = &mut *sink;
            let response = match self.execute(&target, request, Some(out)).await {
                Ok(r) => r,
                Err(e) => {
                    self.fail(e);
                    return 0;
                }
            };
            match response.location {
                Some(location) => {
                    url = target.resolve(&location);
                    tracing::debug!("following Location to {}", url);
                    referer = Some(target.url());
                }
                None => {
                    return match response.body {
                        ResponseBody::Sink(n) => n,
                        _ => 0,
                    }
                }
            }
        }
    }

    /// POST form parameters (`application/x-www-form-urlencoded` unless configured otherwise).
    pub async fn post<K, V>(&mut self, url: &str, params: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let content_type = self.config.content_type.clone();
        self.post_body(url, Body::text(encode_form(params)), Some(content_type)).await
    }

    /// POST a body as given.
    pub async fn post_raw(&mut self, url: &str, body: impl Into<Bytes>, content_type: &str) -> String {
        self.post_body(url, Body::Bytes(body.into()), Some(content_type.to_string())).await
    }

    /// POST the contents of a file, streamed from disk.
    pub async fn post_file(&mut self, url: &str, path: impl AsRef<Path>, content_type: &str) -> String {
        match open_body(path.as_ref()).await {
            Ok(body) => self.post_body(url, body, Some(content_type.to_string())).await,
            Err(e) => {
                self.fail(e);
                String::new()
            }
        }
    }

    /// POST `multipart/form-data`. `content_types` maps a field name to its part's content type;
    /// a `<field>_filename` key gives the part's filename.
    pub async fn post_multipart(
        &mut self,
        url: &str,
        content_types: &HashMap<String, String>,
        fields: &[(String, FieldValue)],
    ) -> String {
        let encoded = multipart::encode(&mut self.rng, fields, content_types);
        tracing::debug!("multipart body: {} parts, {} bytes", fields.len(), encoded.len());
        let content_type = encoded.content_type();
        self.post_body(url, Body::Bytes(encoded.body), Some(content_type)).await
    }

    /// HEAD request. Returns the response headers, empty on failure.
    pub async fn head(&mut self, url: &str) -> Headers {
        tracing::info!("HEAD {}", url);
        match self.round_trip(url, Method::Head, Body::Empty, None).await {
            Some(response) => response.headers,
            None => Headers::new(),
        }
    }

    /// PUT a body. True iff the server answered `201 Created`.
    pub async fn put(&mut self, url: &str, body: impl Into<Bytes>, content_type: &str) -> bool {
        tracing::info!("PUT {}", url);
        let response = self
            .round_trip(url, Method::Put, Body::Bytes(body.into()), Some(content_type.to_string()))
            .await;
        created(response)
    }

    /// PUT the contents of a file, streamed from disk. True iff `201 Created`.
    pub async fn put_file(&mut self, url: &str, path: impl AsRef<Path>, content_type: &str) -> bool {
        tracing::info!("PUT {} from {}", url, path.as_ref().display());
        let body = match open_body(path.as_ref()).await {
            Ok(body) => body,
            Err(e) => {
                self.fail(e);
                return false;
            }
        };
        let response = self
            .round_trip(url, Method::Put, body, Some(content_type.to_string()))
            .await;
        created(response)
    }

    // ---- orchestration ----

    fn target(&mut self, url: &str) -> Option<Target> {
        match Target::parse(url) {
            Ok(t) => Some(t),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    fn fail(&mut self, e: HttpError) {
        match &e {
            HttpError::Connect { .. } | HttpError::Tls(_) | HttpError::Corrupt(_) => tracing::error!("{}", e),
            _ => tracing::warn!("{}", e),
        }
        self.last_error = Some(e);
    }

    async fn post_body(&mut self, url: &str, body: Body, content_type: Option<String>) -> String {
        tracing::info!("POST {}", url);
        let Some(target) = self.target(url) else {
            return String::new();
        };
        let mut budget = RedirectBudget::new(self.config.recursion_limit);
        if !budget.enter() {
            self.fail(HttpError::RedirectBudget {
                url: url.to_string(),
                limit: budget.limit(),
            });
            return String::new();
        }
        let mut request = self.build_request(Method::Post, &target, None);
        self.attach_body(&mut request, body, content_type);
        self.resolve(target, request, &mut budget).await
    }

    /// One request with no follow-ups.
    async fn round_trip(
        &mut self,
        url: &str,
        method: Method,
        body: Body,
        content_type: Option<String>,
    ) -> Option<Response> {
        let target = self.target(url)?;
        let mut request = self.build_request(method, &target, None);
        self.attach_body(&mut request, body, content_type);
        match self.execute(&target, request, None).await {
            Ok(response) => Some(response),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// GET `url` as part of the call owning `budget`. Boxed because redirects and frames recurse.
    fn fetch_text<'a>(
        &'a mut self,
        url: String,
        referer: Option<String>,
        budget: &'a mut RedirectBudget,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(target) = self.target(&url) else {
                return String::new();
            };
            if !budget.enter() {
                self.fail(HttpError::RedirectBudget {
                    url,
                    limit: budget.limit(),
                });
                return String::new();
            }
            let request = self.build_request(Method::Get, &target, referer.as_deref());
            self.resolve(target, request, budget).await
        })
    }

    /// Send `request`, then follow up or inline frames as the response requires.
    async fn resolve(&mut self, target: Target, request: Request, budget: &mut RedirectBudget) -> String {
        let response = match self.execute(&target, request, None).await {
            Ok(r) => r,
            Err(e) => {
                self.fail(e);
                return String::new();
            }
        };
        if let Some(next) = follow_up(&response, &target, &self.config) {
            tracing::debug!("{} -> {:?}", target.url(), next);
            return self.fetch_text(next.url().to_string(), Some(target.url()), budget).await;
        }
        let text = response.into_text();
        self.inline_frames(&target, text, budget).await
    }

    async fn inline_frames(&mut self, base: &Target, text: String, budget: &mut RedirectBudget) -> String {
        if !self.config.load_frames || text.len() > self.config.meta_scan_limit || !looks_like_markup(&text) {
            return text;
        }
        let frames = find_frames(&text);
        if frames.is_empty() {
            return text;
        }
        let mut inlined = Vec::with_capacity(frames.len());
        for frame in frames {
            let url = base.resolve(&frame.src);
            tracing::debug!("loading frame {}", url);
            let content = self.fetch_text(url.clone(), Some(base.url()), budget).await;
            inlined.push((frame, url, content));
        }
        splice(&text, &inlined)
    }

    /// Open a connection, exchange one request and response, and close the connection on every
    /// path.
    async fn execute(&mut self, target: &Target, request: Request, sink: Option<Sink<'_>>) -> Result<Response, HttpError> {
        let ctx = ConnectionContext::new(target.clone(), self.config.timeout);
        let mut conn = Connection::open(&ctx, &self.config).await?;
        let result = self.exchange(&ctx, &mut conn, request, sink).await;
        conn.close().await;
        result
    }

    async fn exchange(
        &mut self,
        ctx: &ConnectionContext,
        conn: &mut Connection,
        mut request: Request,
        sink: Option<Sink<'_>>,
    ) -> Result<Response, HttpError> {
        let method = request.method;
        self.requests_sent += 1;
        write_request(conn.writer_mut()?, &mut request, self.config.line_ending).await?;
        drop(request);

        let mut parser = ResponseParser::new(conn.reader_mut()?, ctx.timeout, ctx.url.clone());
        let mut response = if method == Method::ShortGet && !parser.starts_with_status().await? {
            parser.skip_head();
            Response::new(0, "", Headers::new())
        } else {
            let head = parser.read_head().await?;
            if !head.continuation.is_empty() {
                tracing::debug!("multi-line header block: {:?}", head.continuation);
            }
            Response::new(head.code, head.status_line, head.headers)
        };
        self.last_status = Some(response.code);
        tracing::debug!("{} {} -> {}", method.as_str(), ctx.url, response.status_line);
        self.absorb_cookies(&ctx.target, &response.headers);

        let mode = BodyMode::select(method, response.code, &response.headers);
        let error = match sink {
            Some(sink) if response.location.is_none() => {
                let read = parser.copy_to(mode, sink).await;
                response.body = ResponseBody::Sink(read.value);
                read.error
            }
            Some(_) => None,
            None => {
                let read = parser.read_text(mode).await;
                response.body = ResponseBody::Text(read.value);
                read.error
            }
        };
        self.bytes_received += parser.received();
        if let Some(e) = error {
            if e.is_corrupt() {
                return Err(e);
            }
            response.truncated = true;
            self.fail(e);
        }
        Ok(response)
    }

    fn absorb_cookies(&mut self, target: &Target, headers: &Headers) {
        let Some(jar) = self.jar.as_mut() else {
            return;
        };
        for raw in headers.get_all("set-cookie") {
            jar.add_cookie(raw, &target.host, target.path_only());
        }
    }

    /// Request with the configured header set and any applicable cookies.
    fn build_request(&self, method: Method, target: &Target, referer: Option<&str>) -> Request {
        let config = &self.config;
        let request_target = if config.proxy.is_some() && target.scheme == Scheme::Http {
            target.url()
        } else {
            target.path.clone()
        };
        let mut request = Request::new(method, request_target);
        request.keep_alive = config.keep_alive;
        if config.send_referer {
            request.referer = referer.map(str::to_string);
        }
        if config.send_user_agent {
            request.user_agent = Some(config.user_agent.clone());
        }
        if config.send_host {
            request.host = Some(target.host_header());
        }
        if config.send_accept {
            request.accept = Some(config.accept.clone());
        }
        if let Some((user, password)) = &config.basic_auth {
            request.basic_auth = Some(STANDARD.encode(format!("{}:{}", user, password)));
        }
        for (name, value) in &config.extra_headers {
            request.header(name.clone(), value.clone());
        }
        if let Some(cookies) = self
            .jar
            .as_ref()
            .and_then(|jar| jar.cookie_header_for(&target.host, target.path_only()))
        {
            request.header("Cookie", cookies);
        }
        request
    }

    fn attach_body(&self, request: &mut Request, body: Body, content_type: Option<String>) {
        if body.is_empty() {
            return;
        }
        if self.config.send_content_type {
            request.content_type = content_type;
        }
        request.body(body);
    }
}

fn created(response: Option<Response>) -> bool {
    response.map(|r| r.code == 201).unwrap_or(false)
}

async fn open_body(path: &Path) -> Result<Body, HttpError> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    Ok(Body::stream(file, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_configured_headers() {
        let config = ClientConfig::default().with_basic_auth("user", "pass").with_header("X-Test", "1");
        let client = HttpClient::new(config);
        let target = Target::parse("http://h.com:8080/a?b=1").unwrap();
        let request = client.build_request(Method::Get, &target, Some("http://h.com/"));
        assert_eq!(request.target, "/a?b=1");
        assert_eq!(request.host.as_deref(), Some("h.com:8080"));
        assert_eq!(request.referer.as_deref(), Some("http://h.com/"));
        assert_eq!(request.basic_auth.as_deref(), Some("dXNlcjpwYXNz"));
        assert_eq!(request.extra_headers, [("X-Test".to_string(), "1".to_string())]);
    }

    #[test]
    fn plain_proxy_gets_absolute_url() {
        let client = HttpClient::new(ClientConfig::default().with_proxy("proxy", 3128));
        let http = Target::parse("http://h.com/x").unwrap();
        assert_eq!(client.build_request(Method::Get, &http, None).target, "http://h.com/x");
        let https = Target::parse("https://h.com/x").unwrap();
        assert_eq!(client.build_request(Method::Get, &https, None).target, "/x");
    }

    #[test]
    fn disabled_headers_are_left_out() {
        let mut config = ClientConfig::default();
        config.send_referer = false;
        config.send_user_agent = false;
        config.send_host = false;
        config.send_accept = false;
        config.send_content_type = false;
        let client = HttpClient::new(config);
        let target = Target::parse("http://h.com/").unwrap();
        let mut request = client.build_request(Method::Post, &target, Some("http://r/"));
        client.attach_body(&mut request, Body::text("a=1"), Some("text/plain".to_string()));
        assert!(request.referer.is_none() && request.user_agent.is_none());
        assert!(request.host.is_none() && request.accept.is_none());
        assert!(request.content_type.is_none());
        assert_eq!(request.declared_length(), Some(3));
    }

    #[test]
    fn matching_cookies_are_attached() {
        let mut client = HttpClient::new(ClientConfig::default());
        let jar = client.cookie_jar_mut().unwrap();
        jar.add_cookie("sid=42; path=/app", "h.com", "/app/login");
        let target = Target::parse("http://h.com/app/home").unwrap();
        let request = client.build_request(Method::Get, &target, None);
        assert!(request.extra_headers.contains(&("Cookie".to_string(), "sid=42".to_string())));
        let elsewhere = Target::parse("http://h.com/other").unwrap();
        assert!(client.build_request(Method::Get, &elsewhere, None).extra_headers.is_empty());
    }

    #[test]
    fn cookies_disabled_means_no_jar() {
        let mut config = ClientConfig::default();
        config.allow_cookies = false;
        assert!(HttpClient::new(config).cookie_jar().is_none());
    }

    #[tokio::test]
    async fn invalid_url_degrades_to_empty() {
        let mut client = HttpClient::new(ClientConfig::default());
        assert_eq!(client.get("ftp://h.com/file").await, "");
        assert!(matches!(client.last_error(), Some(HttpError::InvalidUrl(_))));
        assert!(!client.put("gopher://x/", "data", "text/plain").await);
        assert!(client.head("ftp://x/").await.is_empty());
        assert_eq!(client.requests_sent(), 0);
    }
}
