#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tempfile::TempDir;
use tower::ServiceExt;

use user_portal::config::Config;
use user_portal::{app, AppState};

const BOUNDARY: &str = "----portal-test-boundary";

/// A router plus a tiny cookie store, standing in for a browser.
pub struct TestClient {
    pub state: AppState,
    router: Router,
    cookies: BTreeMap<String, String>,
    _dir: TempDir,
}

impl TestClient {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            database: dir.path().join("portal.db").to_string_lossy().into_owned(),
            secret_key: "integration-test-secret".to_string(),
            debug: false,
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            upload_dir: dir.path().join("uploads"),
            max_upload_bytes: 1024 * 1024,
            bcrypt_cost: 4,
        };
        let state = AppState::new(config).await.expect("app state");
        Self {
            router: app(state.clone()),
            state,
            cookies: BTreeMap::new(),
            _dir: dir,
        }
    }

    /// Second browser against the same server and datastore.
    pub fn fresh_browser(&self) -> Self {
        // The temp dir stays owned by the original client.
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
            cookies: BTreeMap::new(),
            _dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, cookie_header.parse().expect("cookie header"));
        }

        let response = self.router.clone().oneshot(request).await.expect("infallible");

        for value in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().expect("ascii cookie").to_string()).expect("cookie");
            let removed = cookie.value().is_empty()
                || cookie.max_age().is_some_and(|age| age.is_zero() || age.is_negative());
            if removed {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        self.send(request).await
    }

    pub async fn get_text(&mut self, uri: &str) -> String {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        text(response).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = serde_urlencoded::to_string(fields).expect("form body");
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    pub async fn signup(&mut self, username: &str, password: &str, email: &str) -> Response<Body> {
        self.post_form(
            "/registered",
            &[
                ("username", username),
                ("password", password),
                ("firstName", "Test"),
                ("lastName", "User"),
                ("email", email),
                ("address", "12 Test Lane"),
            ],
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &[("username", username), ("password", password)])
            .await
    }

    /// Registers and signs in, asserting both steps succeed.
    pub async fn signed_in(&mut self, username: &str) {
        let email = format!("{username}@example.com");
        let response = self.signup(username, "hunter22", &email).await;
        assert_eq!(location(&response), "/");
        let response = self.login(username, "hunter22").await;
        assert_eq!(location(&response), "/profile");
    }

    /// `files` are (filename, contents) pairs sent as one multipart body.
    pub async fn upload(&mut self, files: &[(&str, &[u8])]) -> Response<Body> {
        let mut body = Vec::new();
        for (filename, contents) in files {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n").as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }
}

pub fn location(response: &Response<Body>) -> &str {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub async fn bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.expect("body").to_bytes()
}

pub async fn text(response: Response<Body>) -> String {
    String::from_utf8(bytes(response).await.to_vec()).expect("utf-8 body")
}
