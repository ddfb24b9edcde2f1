/*
 * frames.rs
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

//! `<frame>` / `<iframe>` scanning and inline splicing of fetched frame content.

use crate::protocol::http::redirect::attribute;

/// One frame tag found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    /// Byte offset just past the tag's closing `>`.
    pub tag_end: usize,
    /// `src` attribute as written.
    pub src: String,
}

fn opens_frame(lower: &str, at: usize) -> Option<usize> {
    let rest = &lower[at..];
    let name_len = if rest.starts_with("<frame") {
        6
    } else if rest.starts_with("<iframe") {
        7
    } else {
        return None;
    };
    match rest[name_len..].chars().next() {
        Some(c) if c.is_whitespace() || c == '/' || c == '>' => Some(name_len),
        _ => None,
    }
}

/// Every frame or iframe tag with a non-empty `src`, in document order.
pub fn find_frames(text: &str) -> Vec<FrameRef> {
    let lower = text.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(i) = lower[from..].find('<') {
        let start = from + i;
        from = start + 1;
        if opens_frame(&lower, start).is_none() {
            continue;
        }
        let end = match lower[start..].find('>') {
            Some(e) => start + e + 1,
            None => break,
        };
        from = end;
        if let Some(src) = attribute(&text[start..end], &lower[start..end], "src") {
            let src = src.trim().to_string();
            if !src.is_empty() {
                found.push(FrameRef { tag_end: end, src });
            }
        }
    }
    found
}

/// Insert each fetched frame after its tag, delimited by comments naming the URL.
/// `inlined` holds (frame, resolved url, content) and must be in document order.
pub fn splice(text: &str, inlined: &[(FrameRef, String, String)]) -> String {
    let extra: usize = inlined.iter().map(|(_, url, body)| body.len() + 2 * url.len() + 48).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut copied = 0;
    for (frame, url, body) in inlined {
        out.push_str(&text[copied..frame.tag_end]);
        out.push_str(&format!("<!-- begin frame: {} -->", url));
        out.push_str(body);
        out.push_str(&format!("<!-- end frame: {} -->", url));
        copied = frame.tag_end;
    }
    out.push_str(&text[copied..]);
    out
}
