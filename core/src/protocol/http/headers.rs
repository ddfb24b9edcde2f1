/*
 * headers.rs
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

//! Header multimap: case-insensitive names, first-seen order, one or more values per name.

/// One header name and every value received for it, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Add a value, keeping any earlier values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].values.push(value.into()),
            None => self.entries.push(Header {
                name,
                values: vec![value.into()],
            }),
        }
    }

    /// Set a single value, dropping earlier ones. The name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].values = vec![value.into()],
            None => self.entries.push(Header {
                name,
                values: vec![value.into()],
            }),
        }
    }

    /// First value for the name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries[i].values.first())
            .map(String::as_str)
    }

    /// All values for the name; empty when absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].values,
            None => &[],
        }
    }

    /// Append to the most recent value of the most recently added header (folded lines).
    /// Returns false when there is no header yet.
    pub fn extend_last(&mut self, text: &str) -> bool {
        match self.entries.last_mut().and_then(|h| h.values.last_mut()) {
            Some(v) => {
                if !v.is_empty() {
                    v.push(' ');
                }
                v.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Header> {
        self.position(name).map(|i| self.entries.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
