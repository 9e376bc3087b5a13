//! Basic-Auth gate for the admin routes

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::Credentials;

/// Whether the request carries the configured credentials.
///
/// With no credentials configured nobody is let in.
pub fn is_authorized(headers: &HeaderMap, credentials: Option<&Credentials>) -> bool {
    let Some(expected) = credentials else {
        return false;
    };

    match basic_credentials(headers) {
        Some((username, password)) => {
            username == expected.username && password == expected.password
        }
        None => false,
    }
}

/// Decode `Authorization: Basic <base64(user:pass)>`; the password may contain ':'
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
