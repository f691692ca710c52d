//! Signed client-side session and flashed messages.
//!
//! Both live in cookies signed with a key derived from the configured
//! secret, so the server keeps no session state of its own.

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::warn;

use crate::user_models::SessionUser;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

/// Cookie signing key. The secret is stretched to the 64 bytes `Key` expects.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

pub fn current_user(jar: &SignedCookieJar) -> Option<SessionUser> {
    jar.get(SESSION_COOKIE).and_then(|cookie| decode(cookie.value()))
}

pub fn sign_in(jar: SignedCookieJar, user: &SessionUser) -> SignedCookieJar {
    match encode(user) {
        Ok(value) => jar.add(build_cookie(SESSION_COOKIE, value)),
        Err(err) => {
            warn!(error = %err, "failed to encode session");
            jar
        }
    }
}

/// Drops the session together with any pending flashes.
pub fn sign_out(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(removal_cookie(SESSION_COOKIE))
        .remove(removal_cookie(FLASH_COOKIE))
}

pub fn flash(jar: SignedCookieJar, category: FlashCategory, message: impl Into<String>) -> SignedCookieJar {
    let mut pending: Vec<Flash> = jar
        .get(FLASH_COOKIE)
        .and_then(|cookie| decode(cookie.value()))
        .unwrap_or_default();
    pending.push(Flash {
        category,
        message: message.into(),
    });

    match encode(&pending) {
        Ok(value) => jar.add(build_cookie(FLASH_COOKIE, value)),
        Err(err) => {
            warn!(error = %err, "failed to encode flash messages");
            jar
        }
    }
}

/// Returns pending flashes and removes them from the jar.
pub fn take_flashes(jar: SignedCookieJar) -> (SignedCookieJar, Vec<Flash>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let flashes = decode(cookie.value()).unwrap_or_default();
            (jar.remove(removal_cookie(FLASH_COOKIE)), flashes)
        }
        None => (jar, Vec::new()),
    }
}

fn build_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let json = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&json).ok()
}
