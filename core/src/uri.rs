/*
 * uri.rs
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

//! Request targets: split an http/https URL into scheme, host, port and path, resolve relative
//! references against it, and encode form parameters.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::HttpError;

/// Characters left unescaped in `application/x-www-form-urlencoded` values.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'*');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// The scheme name of an absolute URL: letters, digits, `+`, `-` or `.` starting with a letter,
/// followed by `://` before any `/`, `?` or `#`. URLs embedded in a query string do not count.
fn scheme_prefix(url: &str) -> Option<&str> {
    let end = url.find(|c: char| c == '/' || c == '?' || c == '#').unwrap_or(url.len());
    let name = url[..end].strip_suffix(':')?;
    if !url[end..].starts_with("//") {
        return None;
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    valid.then_some(name)
}

/// A parsed absolute URL. `path` always starts with `/` and keeps the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    /// Parse a URL as given by a caller or a redirect. Surrounding whitespace is stripped, `&amp;`
    /// is unescaped, the scheme defaults to http and the port to the scheme's default.
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let cleaned = url.trim().replace("&amp;", "&");
        let (scheme, rest) = match scheme_prefix(&cleaned) {
            Some(name) => {
                let scheme = match name.to_ascii_lowercase().as_str() {
                    "http" => Scheme::Http,
                    "https" => Scheme::Https,
                    _ => return Err(HttpError::InvalidUrl(url.to_string())),
                };
                (scheme, &cleaned[name.len() + 3..])
            }
            None => (Scheme::Http, cleaned.as_str()),
        };
        let rest = rest.split('#').next().unwrap_or("");
        let split = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
        let (authority, path) = rest.split_at(split);
        // userinfo is not used for authentication here; credentials come from the config
        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        let (host, port) = match host_port.rfind(':') {
            Some(colon) => {
                let port = host_port[colon + 1..]
                    .parse::<u16>()
                    .map_err(|_| HttpError::InvalidUrl(url.to_string()))?;
                (&host_port[..colon], port)
            }
            None => (host_port, scheme.default_port()),
        };
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(HttpError::InvalidUrl(url.to_string()));
        }
        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('?') {
            format!("/{}", path)
        } else {
            path.to_string()
        };
        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path,
        })
    }

    /// `scheme://host[:port]`, omitting the default port.
    pub fn origin(&self) -> String {
        if self.port == self.scheme.default_port() {
            format!("{}://{}", self.scheme.as_str(), self.host)
        } else {
            format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }

    /// Full normalized URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.origin(), self.path)
    }

    /// Value of the `Host` header.
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Path without the query string.
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or("/")
    }

    /// Directory of the path (query excluded), ending with `/`.
    pub fn directory(&self) -> &str {
        let path = self.path_only();
        match path.rfind('/') {
            Some(i) => &path[..=i],
            None => "/",
        }
    }

    /// Resolve a Location value, meta-refresh URL or frame source against this target.
    pub fn resolve(&self, reference: &str) -> String {
        let reference = reference.trim().replace("&amp;", "&");
        if scheme_prefix(&reference).is_some() {
            reference
        } else if let Some(rest) = reference.strip_prefix("//") {
            format!("{}://{}", self.scheme.as_str(), rest)
        } else if reference.starts_with('/') {
            format!("{}{}", self.origin(), reference)
        } else if reference.starts_with('?') {
            format!("{}{}{}", self.origin(), self.path_only(), reference)
        } else if reference.is_empty() {
            self.url()
        } else {
            format!("{}{}{}", self.origin(), self.directory(), reference)
        }
    }
}

/// Encode parameters as `application/x-www-form-urlencoded`.
pub fn encode_form<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k.as_ref()), encode_component(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, FORM_VALUE).to_string().replace("%20", "+")
}

/// Append an encoded query to a URL, using `&` when it already has one.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// Split `a=1&b=2` into pairs. Values are taken verbatim.
pub fn split_params(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (p.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_scheme_and_port() {
        let t = Target::parse("  example.com/index.html ").unwrap();
        assert_eq!(t.scheme, Scheme::Http);
        assert_eq!(t.host, "example.com");
        assert_eq!(t.port, 80);
        assert_eq!(t.path, "/index.html");

        let t = Target::parse("https://Example.com").unwrap();
        assert_eq!(t.port, 443);
        assert_eq!(t.path, "/");
        assert_eq!(t.url(), "https://example.com/");
    }

    #[test]
    fn parse_explicit_port_and_query() {
        let t = Target::parse("http://h.com:8080/a/b?x=1&amp;y=2#frag").unwrap();
        assert_eq!(t.port, 8080);
        assert_eq!(t.path, "/a/b?x=1&y=2");
        assert_eq!(t.host_header(), "h.com:8080");
        assert_eq!(t.url(), "http://h.com:8080/a/b?x=1&y=2");
    }

    #[test]
    fn parse_query_without_path() {
        let t = Target::parse("http://h.com?q=1").unwrap();
        assert_eq!(t.path, "/?q=1");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Target::parse("ftp://h.com/").is_err());
        assert!(Target::parse("http://h.com:port/").is_err());
        assert!(Target::parse("http:///x").is_err());
    }

    #[test]
    fn resolve_absolute_path() {
        let base = Target::parse("http://h.com/a/b?q=1").unwrap();
        assert_eq!(base.resolve("/x"), "http://h.com/x");
    }

    #[test]
    fn resolve_relative_excludes_query() {
        let base = Target::parse("http://h.com/a/b?q=1").unwrap();
        assert_eq!(base.resolve("y"), "http://h.com/a/y");
        let base = Target::parse("http://h.com/a/b?next=/c/d").unwrap();
        assert_eq!(base.resolve("y"), "http://h.com/a/y");
    }

    #[test]
    fn resolve_other_forms() {
        let base = Target::parse("https://h.com:8443/dir/page").unwrap();
        assert_eq!(base.resolve("http://other.org/z"), "http://other.org/z");
        assert_eq!(base.resolve("//cdn.h.com/s.js"), "https://cdn.h.com/s.js");
        assert_eq!(base.resolve("?page=2"), "https://h.com:8443/dir/page?page=2");
        assert_eq!(base.resolve("sub/x.html"), "https://h.com:8443/dir/sub/x.html");
    }

    #[test]
    fn embedded_url_in_query_stays_relative() {
        let base = Target::parse("http://h.com/a/b?q=1").unwrap();
        let login = base.resolve("/login?next=http://h.com/a");
        assert_eq!(login, "http://h.com/login?next=http://h.com/a");
        let t = Target::parse(&login).unwrap();
        assert_eq!(t.host, "h.com");
        assert_eq!(t.path, "/login?next=http://h.com/a");
        assert_eq!(base.resolve("go?to=https://x.org/"), "http://h.com/a/go?to=https://x.org/");
    }

    #[test]
    fn schemeless_url_with_embedded_url() {
        let t = Target::parse("h.com/go?u=http://x.com/").unwrap();
        assert_eq!(t.scheme, Scheme::Http);
        assert_eq!(t.host, "h.com");
        assert_eq!(t.path, "/go?u=http://x.com/");
        let t = Target::parse("h.com:8080?u=https://x.com").unwrap();
        assert_eq!(t.port, 8080);
        assert_eq!(t.path, "/?u=https://x.com");
    }

    #[test]
    fn form_encoding() {
        let q = encode_form(&[("name", "a b"), ("expr", "1+1=2&x")]);
        assert_eq!(q, "name=a+b&expr=1%2B1%3D2%26x");
        assert_eq!(append_query("http://h.com/s", &q), format!("http://h.com/s?{}", q));
        assert_eq!(append_query("http://h.com/s?a=1", "b=2"), "http://h.com/s?a=1&b=2");
    }

    #[test]
    fn split_params_keeps_values() {
        let p = split_params("a=1&flag&b=x=y");
        assert_eq!(
            p,
            vec![
                ("a".to_string(), "1".to_string()),
                ("flag".to_string(), String::new()),
                ("b".to_string(), "x=y".to_string()),
            ]
        );
    }
}
