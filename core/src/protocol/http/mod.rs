/*
 * mod.rs
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

//! HTTP/1.0 client engine.
//!
//! Layers, leaf first: `headers`, `request` and `response` models; the `h1` wire codec;
//! `connection` (plain, TLS, proxy, proxy tunnel); `multipart`; `redirect` and `frames`, which
//! decide on follow-up requests; and `client`, which drives them per call.

pub mod client;
pub mod connection;
pub mod frames;
pub mod h1;
pub mod headers;
pub mod multipart;
pub mod redirect;
pub mod request;
pub mod response;

pub use client::HttpClient;
pub use connection::{Connection, ConnectionContext, HttpStream};
pub use headers::{Header, Headers};
pub use multipart::{FieldValue, MultipartBody};
pub use redirect::{FollowUp, RedirectBudget};
pub use request::{Body, Method, Request};
pub use response::{Response, ResponseBody, Status};
