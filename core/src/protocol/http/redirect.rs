/*
 * redirect.rs
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

//! Redirect resolution: `Location` on 30x responses, `<meta http-equiv="refresh">` in markup
//! bodies, and the budget shared by every follow-up request of one top-level call.

use crate::config::ClientConfig;
use crate::protocol::http::response::Response;
use crate::uri::Target;

/// Number of leading non-whitespace characters inspected by [`looks_like_markup`].
const MARKUP_PREFIX: usize = 50;

/// Bounds the number of fetches one top-level call may make, including the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectBudget {
    used: u32,
    limit: u32,
}

impl RedirectBudget {
    pub fn new(limit: u32) -> Self {
        Self { used: 0, limit }
    }

    /// Take one unit. Returns false when the budget is exhausted.
    pub fn enter(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// Why another request is needed, with the resolved absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Location(String),
    MetaRefresh(String),
}

impl FollowUp {
    pub fn url(&self) -> &str {
        match self {
            FollowUp::Location(u) | FollowUp::MetaRefresh(u) => u,
        }
    }
}

/// Decide whether `response`, received for `target`, calls for another request.
pub fn follow_up(response: &Response, target: &Target, config: &ClientConfig) -> Option<FollowUp> {
    if let Some(location) = &response.location {
        return Some(FollowUp::Location(target.resolve(location)));
    }
    if !config.auto_redirect || (300..400).contains(&response.code) {
        return None;
    }
    let text = response.text();
    if text.len() > config.meta_scan_limit || !looks_like_markup(text) {
        return None;
    }
    find_meta_refresh(text).map(|url| FollowUp::MetaRefresh(target.resolve(&url)))
}

fn markup_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/'\"=<>-!:.;?,".contains(c)
}

/// Heuristic HTML/XML check: after leading whitespace the text opens with `<`, and its first
/// non-whitespace characters are all letters, digits or markup punctuation. `;` `?` and `,`
/// count as markup so that an early refresh tag or an XML prolog passes.
pub fn looks_like_markup(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('<') {
        return false;
    }
    trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(MARKUP_PREFIX)
        .all(markup_char)
}

/// Value of attribute `name` in a single tag, quoted or bare. `lower` is the ASCII-lowercased
/// copy of `original`; names are matched in `lower` and the value is cut from `original`.
pub(crate) fn attribute(original: &str, lower: &str, name: &str) -> Option<String> {
    let mut from = 0;
    while let Some(i) = lower[from..].find(name) {
        let start = from + i;
        from = start + name.len();
        let boundary_ok = start == 0 || lower[..start].ends_with(|c: char| c.is_whitespace());
        let rest = lower[from..].trim_start();
        if !boundary_ok || !rest.starts_with('=') {
            continue;
        }
        let value_start = lower.len() - rest.len() + 1;
        let value = original[value_start..].trim_start();
        let value = match value.chars().next() {
            Some(q @ ('"' | '\'')) => value[1..].split(q).next().unwrap_or(""),
            _ => value
                .split(|c: char| c.is_whitespace() || c == '>')
                .next()
                .unwrap_or(""),
        };
        return Some(value.to_string());
    }
    None
}

/// URL of the first `<meta http-equiv="refresh" content="N;url=...">` tag.
pub fn find_meta_refresh(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(i) = lower[from..].find("<meta") {
        let start = from + i;
        let end = lower[start..].find('>').map(|e| start + e).unwrap_or(lower.len());
        from = end;
        let (tag, tag_lower) = (&text[start..end], &lower[start..end]);
        let is_refresh = attribute(tag, tag_lower, "http-equiv")
            .map(|v| v.eq_ignore_ascii_case("refresh"))
            .unwrap_or(false);
        if !is_refresh {
            continue;
        }
        let Some(content) = attribute(tag, tag_lower, "content") else {
            continue;
        };
        let Some(at) = content.to_ascii_lowercase().find("url=") else {
            continue;
        };
        let url = content[at + 4..].trim().trim_matches(|c| c == '\'' || c == '"');
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::http::headers::Headers;
    use crate::protocol::http::response::ResponseBody;

    fn html(code: u16, body: &str) -> Response {
        let mut r = Response::new(code, format!("HTTP/1.0 {}", code), Headers::new());
        r.body = ResponseBody::Text(body.to_string());
        r
    }

    #[test]
    fn budget_counts_every_entry() {
        let mut b = RedirectBudget::new(2);
        assert!(b.enter());
        assert!(b.enter());
        assert!(!b.enter());
        assert_eq!(b.used(), 2);
        assert_eq!(b.remaining(), 0);
    }

    #[test]
    fn location_is_resolved_against_the_request() {
        let target = Target::parse("http://h.com/a/b?q=1").unwrap();
        let mut headers = Headers::new();
        headers.append("location", "/x");
        let r = Response::new(302, "HTTP/1.0 302 Found", headers.clone());
        let config = ClientConfig::default();
        assert_eq!(follow_up(&r, &target, &config), Some(FollowUp::Location("http://h.com/x".into())));
        headers.insert("location", "y");
        let r = Response::new(301, "HTTP/1.0 301 Moved", headers);
        assert_eq!(follow_up(&r, &target, &config).unwrap().url(), "http://h.com/a/y");
    }

    #[test]
    fn meta_refresh_in_markup() {
        let target = Target::parse("http://h.com/").unwrap();
        let body = "<html><head><META HTTP-EQUIV=\"Refresh\" CONTENT=\"0;URL=http://h.com/z\"></head></html>";
        let config = ClientConfig::default();
        assert_eq!(
            follow_up(&html(200, body), &target, &config),
            Some(FollowUp::MetaRefresh("http://h.com/z".into()))
        );
        let mut off = ClientConfig::default();
        off.auto_redirect = false;
        assert_eq!(follow_up(&html(200, body), &target, &off), None);
    }

    #[test]
    fn meta_refresh_ignored_in_plain_text_and_large_bodies() {
        let target = Target::parse("http://h.com/").unwrap();
        let text = "see <meta http-equiv=\"refresh\" content=\"0;url=/z\">";
        assert_eq!(follow_up(&html(200, text), &target, &ClientConfig::default()), None);
        let mut small = ClientConfig::default();
        small.meta_scan_limit = 10;
        let body = "<html><meta http-equiv=refresh content=\"5; url=/z\"></html>";
        assert_eq!(follow_up(&html(200, body), &target, &small), None);
    }

    #[test]
    fn markup_heuristic() {
        assert!(looks_like_markup("  \n<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(looks_like_markup("<html><body>"));
        assert!(looks_like_markup("<?xml version=\"1.0\"?><page/>"));
        assert!(!looks_like_markup("{\"json\": true}"));
        assert!(!looks_like_markup("plain <b>text</b>"));
        assert!(!looks_like_markup("<html>(weird)</html>"));
    }

    #[test]
    fn meta_refresh_forms() {
        assert_eq!(
            find_meta_refresh("<meta http-equiv='refresh' content='3; URL=next.html'>").as_deref(),
            Some("next.html")
        );
        assert_eq!(find_meta_refresh("<meta name=\"refresh\" content=\"0;url=/x\">"), None);
        assert_eq!(find_meta_refresh("<meta http-equiv=\"refresh\" content=\"30\">"), None);
        assert_eq!(
            find_meta_refresh("<meta charset=utf-8><meta http-equiv=refresh content=\"0;url=/two\">").as_deref(),
            Some("/two")
        );
    }

    #[test]
    fn refresh_without_url_is_skipped() {
        let text = "<meta http-equiv=refresh content=\"30\"><meta http-equiv=refresh content=\"0;url=/go\">";
        assert_eq!(find_meta_refresh(text).as_deref(), Some("/go"));
        let text = "<meta http-equiv=refresh><meta http-equiv=refresh content=\"1; url=\"><meta http-equiv=refresh content='0;url=/last'>";
        assert_eq!(find_meta_refresh(text).as_deref(), Some("/last"));
    }
}
