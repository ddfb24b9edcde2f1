/*
 * cookie.rs
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

//! Session cookie jar: records from `Set-Cookie` headers, scoped by domain and path.
//!
//! Lookup and replacement both use containment: a request host must end with the cookie's
//! domain and its path must start with the cookie's path. Expired cookies stay in the jar and
//! are still sent unless expiry enforcement is switched on.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats tried, in order, for the `expires` attribute (zone suffix removed first). `%Y`
/// accepts a two-digit year as year 00NN, so the `%y` form has to come first.
const EXPIRY_FORMATS: &[&str] = &[
    "%a, %d-%b-%y %H:%M:%S",
    "%a, %d-%b-%Y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            path: None,
            domain: None,
            secure: false,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Parse a raw `Set-Cookie` value. Name and value come from the text before the first `;`;
    /// attributes are found by case-insensitive search in the rest. Returns None without a name.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (pair, attrs) = match raw.find(';') {
            Some(i) => (&raw[..i], &raw[i + 1..]),
            None => (raw, ""),
        };
        let eq = pair.find('=')?;
        let name = pair[..eq].trim();
        if name.is_empty() {
            return None;
        }
        let lower = attrs.to_ascii_lowercase();
        let expires = attribute(attrs, &lower, "expires=").and_then(|v| {
            let parsed = parse_expiry(v);
            if parsed.is_none() {
                tracing::warn!("cookie {}: cannot parse expiry {:?}", name, v);
            }
            parsed
        });
        Some(Self {
            name: name.to_string(),
            value: pair[eq + 1..].trim().to_string(),
            expires,
            path: attribute(attrs, &lower, "path=").map(str::to_string),
            domain: attribute(attrs, &lower, "domain=").map(str::to_string),
            secure: lower.split(';').any(|a| a.trim() == "secure"),
        })
    }

    /// True when the host ends with this cookie's domain and the path starts with its path.
    /// A missing domain or path matches everything.
    pub fn covers(&self, host: &str, path: &str) -> bool {
        let domain_ok = match &self.domain {
            Some(d) => host
                .to_ascii_lowercase()
                .ends_with(&d.trim_start_matches('.').to_ascii_lowercase()),
            None => true,
        };
        let path_ok = match &self.path {
            Some(p) => path.starts_with(p.as_str()),
            None => true,
        };
        domain_ok && path_ok
    }

    /// `name=value` with the value cut at any embedded `;`.
    pub fn pair(&self) -> String {
        let value = self.value.split(';').next().unwrap_or("");
        format!("{}={}", self.name, value)
    }

    fn replaces(&self, existing: &Cookie) -> bool {
        let domain = self.domain.as_deref().unwrap_or("");
        let path = self.path.as_deref().unwrap_or("");
        self.name == existing.name
            && domain.ends_with(existing.domain.as_deref().unwrap_or(""))
            && path.starts_with(existing.path.as_deref().unwrap_or(""))
    }
}

/// Parse a cookie expiry date. Zone suffixes are ignored; all dates are taken as UTC.
pub fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let value = value
        .strip_suffix("GMT")
        .or_else(|| value.strip_suffix("UTC"))
        .unwrap_or(value)
        .trim();
    EXPIRY_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|naive| naive.and_utc())
}

/// Whether the cookie's expiry lies at or before `now`. Cookies without expiry never expire.
pub fn is_expired(cookie: &Cookie, now: DateTime<Utc>) -> bool {
    cookie.expires.map_or(false, |t| t <= now)
}

fn attribute<'a>(attrs: &'a str, lower: &str, key: &str) -> Option<&'a str> {
    let start = lower.find(key)? + key.len();
    let end = lower[start..].find(';').map_or(attrs.len(), |i| start + i);
    let value = attrs[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
    allow_foreign: bool,
    enforce_expiry: bool,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_foreign_cookies(&self) -> bool {
        self.allow_foreign
    }

    /// When true, cookies are accepted and sent regardless of the request's host and path.
    pub fn set_allow_foreign_cookies(&mut self, allow: bool) {
        self.allow_foreign = allow;
    }

    /// When true, expired cookies are left out of outgoing `Cookie` headers.
    pub fn set_enforce_expiry(&mut self, enforce: bool) {
        self.enforce_expiry = enforce;
    }

    /// Add a cookie from a raw `Set-Cookie` value received for `host` and `path`. Missing domain
    /// and path default to the request's host and `/`. Returns whether the cookie was stored.
    pub fn add_cookie(&mut self, raw: &str, host: &str, path: &str) -> bool {
        let Some(mut cookie) = Cookie::parse(raw) else {
            tracing::warn!("ignoring unparsable cookie {:?}", raw);
            return false;
        };
        if cookie.domain.is_none() {
            cookie.domain = Some(host.to_string());
        }
        if cookie.path.is_none() {
            cookie.path = Some("/".to_string());
        }
        if !self.allow_foreign && !cookie.covers(host, path) {
            tracing::debug!("rejecting foreign cookie {} for {}{}", cookie.name, host, path);
            return false;
        }
        self.insert(cookie);
        true
    }

    /// Store a cookie, replacing in place a record with the same name whose domain and path
    /// contain the new one's.
    pub fn insert(&mut self, cookie: Cookie) {
        match self.cookies.iter().position(|c| cookie.replaces(c)) {
            Some(i) => {
                tracing::debug!("replacing cookie {}", cookie.name);
                self.cookies[i] = cookie;
            }
            None => {
                tracing::debug!("adding cookie {}", cookie.name);
                self.cookies.push(cookie);
            }
        }
    }

    /// Value of the `Cookie` header for a request, or None when no cookie applies.
    pub fn cookie_header_for(&self, host: &str, path: &str) -> Option<String> {
        let now = Utc::now();
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| self.allow_foreign || c.covers(host, path))
            .filter(|c| !self.enforce_expiry || !is_expired(c, now))
            .map(Cookie::pair)
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}
