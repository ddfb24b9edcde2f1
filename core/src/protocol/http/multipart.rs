/*
 * multipart.rs
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

//! `multipart/form-data` encoder.
//!
//! The optional content-type map is keyed by field name; a `<field>_filename` entry in the same
//! map supplies the filename for that part.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use rand::distributions::Alphanumeric;
use rand::Rng;

const BOUNDARY_PREFIX: &str = "----SondaFormBoundary";
const TOKEN_LEN: usize = 16;
const EOL: &[u8] = b"\r\n";

/// Value of one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Binary(Bytes),
}

impl FieldValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FieldValue::Text(s) => s.as_bytes(),
            FieldValue::Binary(b) => b,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Binary(Bytes::from(v))
    }
}

/// An encoded body and the boundary that delimits its parts.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Bytes,
}

impl MultipartBody {
    /// Value for the request's `Content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn boundary<R: Rng + ?Sized>(rng: &mut R, fields: &[(String, FieldValue)]) -> String {
    loop {
        let token: String = (0..TOKEN_LEN).map(|_| char::from(rng.sample(Alphanumeric))).collect();
        let candidate = format!("{}{}", BOUNDARY_PREFIX, token);
        if fields.iter().any(|(_, v)| contains(v.as_bytes(), candidate.as_bytes())) {
            tracing::debug!("boundary {} collides with a field value, regenerating", candidate);
            continue;
        }
        return candidate;
    }
}

/// Encode `fields` in order, one part each.
pub fn encode<R: Rng + ?Sized>(
    rng: &mut R,
    fields: &[(String, FieldValue)],
    content_types: &HashMap<String, String>,
) -> MultipartBody {
    let boundary = boundary(rng, fields);
    let mut out = BytesMut::new();
    for (name, value) in fields {
        out.put_slice(b"--");
        out.put_slice(boundary.as_bytes());
        out.put_slice(EOL);
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", name);
        if let Some(filename) = content_types.get(&format!("{}_filename", name)) {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        out.put_slice(disposition.as_bytes());
        out.put_slice(EOL);
        if let Some(mime) = content_types.get(name) {
            out.put_slice(format!("Content-Type: {}", mime).as_bytes());
            out.put_slice(EOL);
        }
        out.put_slice(EOL);
        let bytes = value.as_bytes();
        out.put_slice(bytes);
        if !bytes.ends_with(b"\n") {
            out.put_slice(EOL);
        }
    }
    out.put_slice(b"--");
    out.put_slice(boundary.as_bytes());
    out.put_slice(b"--");
    out.put_slice(EOL);
    MultipartBody {
        boundary,
        body: out.freeze(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field(name: &str, value: impl Into<FieldValue>) -> (String, FieldValue) {
        (name.to_string(), value.into())
    }

    /// Minimal reference decoder: splits on the boundary and reads name + value of each part.
    fn decode(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
        let delimiter = format!("--{}", boundary);
        let text = body.iter().map(|&b| b as char).collect::<String>();
        let mut parts = Vec::new();
        for chunk in text.split(delimiter.as_str()).skip(1) {
            if chunk.starts_with("--") {
                break;
            }
            let chunk = chunk.strip_prefix("\r\n").unwrap();
            let (head, value) = chunk.split_once("\r\n\r\n").unwrap();
            let name = head
                .split("name=\"")
                .nth(1)
                .and_then(|s| s.split('"').next())
                .unwrap()
                .to_string();
            let value = value.strip_suffix("\r\n").unwrap_or(value);
            parts.push((name, value.chars().map(|c| c as u8).collect()));
        }
        parts
    }

    #[test]
    fn fields_survive_a_reference_decode() {
        let mut rng = StdRng::seed_from_u64(7);
        let fields = vec![
            field("user", "alice"),
            field("comment", "two\r\nlines"),
            field("blob", vec![0u8, 1, 2, 255]),
        ];
        let encoded = encode(&mut rng, &fields, &HashMap::new());
        let decoded = decode(&encoded.body, &encoded.boundary);
        assert_eq!(decoded.len(), 3);
        for ((name, value), (dname, dvalue)) in fields.iter().zip(&decoded) {
            assert_eq!(name, dname);
            assert_eq!(value.as_bytes(), dvalue.as_slice());
        }
    }

    #[test]
    fn filename_and_content_type_per_part() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut types = HashMap::new();
        types.insert("upload".to_string(), "image/png".to_string());
        types.insert("upload_filename".to_string(), "a.png".to_string());
        let encoded = encode(&mut rng, &[field("upload", vec![1u8, 2])], &types);
        let text = String::from_utf8_lossy(&encoded.body).to_string();
        assert!(text.contains("Content-Disposition: form-data; name=\"upload\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\n"));
        assert!(text.ends_with(&format!("--{}--\r\n", encoded.boundary)));
        assert_eq!(encoded.content_type(), format!("multipart/form-data; boundary={}", encoded.boundary));
    }

    #[test]
    fn value_ending_in_newline_gets_no_extra_terminator() {
        let mut rng = StdRng::seed_from_u64(3);
        let encoded = encode(&mut rng, &[field("a", "x\n")], &HashMap::new());
        let text = String::from_utf8_lossy(&encoded.body).to_string();
        assert!(text.contains("\r\n\r\nx\n--"));
    }

    #[test]
    fn boundary_never_appears_in_values() {
        let mut peek_rng = StdRng::seed_from_u64(11);
        let first = boundary(&mut peek_rng, &[]);
        let mut rng = StdRng::seed_from_u64(11);
        let fields = vec![field("trap", format!("prefix {} suffix", first))];
        let encoded = encode(&mut rng, &fields, &HashMap::new());
        assert_ne!(encoded.boundary, first);
        assert!(!contains(fields[0].1.as_bytes(), encoded.boundary.as_bytes()));
    }
}
