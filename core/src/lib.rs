/*
 * lib.rs
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

//! Sonda core: a hand-written HTTP/1.0 client engine.
//!
//! The engine talks to TCP and TLS sockets directly: it serializes requests itself, parses
//! responses line by line, keeps a cookie jar across a session, follows `Location` and
//! meta-refresh redirects under a shared budget, and can inline `<frame>` content. Start with
//! [`HttpClient`] and a [`ClientConfig`].

pub mod config;
pub mod cookie;
pub mod error;
pub mod net;
pub mod protocol;
pub mod uri;

pub use config::{ClientConfig, LineEnding, OptionSource};
pub use cookie::{Cookie, CookieJar};
pub use error::HttpError;
pub use net::{InsecureTrustAll, ServerTrust, WebPkiTrust};
pub use protocol::http::{FieldValue, Headers, HttpClient, Method, Response, Status};
pub use uri::Target;
