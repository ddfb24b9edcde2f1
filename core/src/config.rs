/*
 * config.rs
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

//! Client options. Defaults can be supplied by an external key/value store through
//! [`OptionSource`]; everything else is set programmatically or by the CLI.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::net::{InsecureTrustAll, ServerTrust};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECURSION_LIMIT: u32 = 5;
pub const DEFAULT_ACCEPT: &str = "*/*";
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Bodies larger than this are not scanned for meta-refresh or frames.
pub const DEFAULT_META_SCAN_LIMIT: usize = 64 * 1024;

pub fn default_user_agent() -> String {
    format!("Sonda/{}", env!("CARGO_PKG_VERSION"))
}

/// Line terminator used when serializing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

/// Proxy server. Plain HTTP goes through it with absolute-URL request targets; HTTPS is tunneled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

/// PEM files presented as the TLS client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Every option the engine consults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect, handshake and per-read timeout. Zero disables it.
    pub timeout: Duration,
    /// Ceiling of the redirect budget shared by one top-level call.
    pub recursion_limit: u32,
    pub auto_redirect: bool,
    pub load_frames: bool,
    pub allow_cookies: bool,
    pub allow_foreign_cookies: bool,
    pub line_ending: LineEnding,
    pub keep_alive: bool,
    pub user_agent: String,
    pub accept: String,
    pub content_type: String,
    pub send_referer: bool,
    pub send_user_agent: bool,
    pub send_host: bool,
    pub send_accept: bool,
    pub send_content_type: bool,
    pub proxy: Option<ProxyConfig>,
    /// (user, password) for `Authorization: Basic`.
    pub basic_auth: Option<(String, String)>,
    pub client_cert: Option<ClientCertConfig>,
    pub trust: Arc<dyn ServerTrust>,
    pub meta_scan_limit: usize,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            auto_redirect: true,
            load_frames: true,
            allow_cookies: true,
            allow_foreign_cookies: false,
            line_ending: LineEnding::CrLf,
            keep_alive: false,
            user_agent: default_user_agent(),
            accept: DEFAULT_ACCEPT.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            send_referer: true,
            send_user_agent: true,
            send_host: true,
            send_accept: true,
            send_content_type: true,
            proxy: None,
            basic_auth: None,
            client_cert: None,
            trust: Arc::new(InsecureTrustAll),
            meta_scan_limit: DEFAULT_META_SCAN_LIMIT,
            extra_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyConfig {
            host: host.into(),
            port,
        });
        self
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    pub fn with_client_cert(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(ClientCertConfig {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        });
        self
    }

    pub fn with_trust(mut self, trust: Arc<dyn ServerTrust>) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Build a configuration from an external option store. Missing keys keep their defaults;
    /// unparsable values are logged and ignored.
    pub fn from_source(source: &dyn OptionSource) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parsed::<u64>(source, keys::TIMEOUT) {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parsed(source, keys::RECURSION_LIMIT) {
            config.recursion_limit = n;
        }
        if let Some(b) = flag(source, keys::AUTO_REDIRECT) {
            config.auto_redirect = b;
        }
        if let Some(b) = flag(source, keys::LOAD_FRAMES) {
            config.load_frames = b;
        }
        if let Some(b) = flag(source, keys::ALLOW_COOKIES) {
            config.allow_cookies = b;
        }
        if let Some(b) = flag(source, keys::ALLOW_FOREIGN_COOKIES) {
            config.allow_foreign_cookies = b;
        }
        if let Some(b) = flag(source, keys::KEEP_ALIVE) {
            config.keep_alive = b;
        }
        if let Some(s) = source.get(keys::USER_AGENT) {
            config.user_agent = s;
        }
        if let Some(s) = source.get(keys::ACCEPT) {
            config.accept = s;
        }
        if let Some(s) = source.get(keys::CONTENT_TYPE) {
            config.content_type = s;
        }
        if let Some(s) = source.get(keys::LINE_ENDING) {
            match s.trim().to_ascii_lowercase().as_str() {
                "crlf" => config.line_ending = LineEnding::CrLf,
                "lf" => config.line_ending = LineEnding::Lf,
                other => tracing::warn!("ignoring {}={:?}: expected crlf or lf", keys::LINE_ENDING, other),
            }
        }
        if let (Some(host), Some(port)) = (source.get(keys::PROXY_HOST), parsed(source, keys::PROXY_PORT)) {
            config.proxy = Some(ProxyConfig { host, port });
        }
        if let (Some(cert), Some(key)) = (source.get(keys::CERT_FILE), source.get(keys::KEY_FILE)) {
            config.client_cert = Some(ClientCertConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            });
        }
        if let Some(n) = parsed(source, keys::META_SCAN_LIMIT) {
            config.meta_scan_limit = n;
        }
        config
    }
}

/// Key/value store supplying default option values (an external collaborator).
pub trait OptionSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl OptionSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Keys read by [`ClientConfig::from_source`].
pub mod keys {
    pub const TIMEOUT: &str = "http.timeout";
    pub const RECURSION_LIMIT: &str = "http.recursionlimit";
    pub const AUTO_REDIRECT: &str = "http.autoredirect";
    pub const LOAD_FRAMES: &str = "http.loadframes";
    pub const ALLOW_COOKIES: &str = "http.allowcookies";
    pub const ALLOW_FOREIGN_COOKIES: &str = "http.allowforeigncookies";
    pub const KEEP_ALIVE: &str = "http.keepalive";
    pub const USER_AGENT: &str = "http.useragent";
    pub const ACCEPT: &str = "http.accept";
    pub const CONTENT_TYPE: &str = "http.contenttype";
    pub const LINE_ENDING: &str = "http.lineending";
    pub const PROXY_HOST: &str = "http.proxyhost";
    pub const PROXY_PORT: &str = "http.proxyport";
    pub const CERT_FILE: &str = "http.certfile";
    pub const KEY_FILE: &str = "http.keyfile";
    pub const META_SCAN_LIMIT: &str = "http.metascanlimit";
}

fn parsed<T: FromStr>(source: &dyn OptionSource, key: &str) -> Option<T> {
    let raw = source.get(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

fn flag(source: &dyn OptionSource, key: &str) -> Option<bool> {
    let raw = source.get(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => {
            tracing::warn!("ignoring {}={:?}: not a boolean", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.recursion_limit, 5);
        assert_eq!(c.line_ending, LineEnding::CrLf);
        assert!(c.auto_redirect);
        assert!(!c.allow_foreign_cookies);
        assert!(c.user_agent.starts_with("Sonda/"));
        assert_eq!(c.trust.name(), "insecure-trust-all");
    }

    #[test]
    fn from_source_reads_known_keys() {
        let s = source(&[
            (keys::TIMEOUT, "2500"),
            (keys::RECURSION_LIMIT, "9"),
            (keys::AUTO_REDIRECT, "no"),
            (keys::LINE_ENDING, "LF"),
            (keys::PROXY_HOST, "proxy.local"),
            (keys::PROXY_PORT, "3128"),
        ]);
        let c = ClientConfig::from_source(&s);
        assert_eq!(c.timeout, Duration::from_millis(2500));
        assert_eq!(c.recursion_limit, 9);
        assert!(!c.auto_redirect);
        assert_eq!(c.line_ending, LineEnding::Lf);
        assert_eq!(
            c.proxy,
            Some(ProxyConfig {
                host: "proxy.local".to_string(),
                port: 3128
            })
        );
    }

    #[test]
    fn from_source_ignores_garbage() {
        let s = source(&[(keys::RECURSION_LIMIT, "many"), (keys::ALLOW_COOKIES, "maybe")]);
        let c = ClientConfig::from_source(&s);
        assert_eq!(c.recursion_limit, DEFAULT_RECURSION_LIMIT);
        assert!(c.allow_cookies);
    }

    #[test]
    fn proxy_needs_host_and_port() {
        let s = source(&[(keys::PROXY_HOST, "proxy.local")]);
        assert!(ClientConfig::from_source(&s).proxy.is_none());
    }
}
