//! Integration tests for Modern Shop.
//!
//! The routers are driven in-process with `tower::ServiceExt::oneshot`
//! over the in-memory document store and session store; no database or
//! network is needed.
//!
//! ```bash
//! cargo test -p modern-shop-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use modern_shop_admin::services::{
    IdentityProvider, PasswordIdentityProvider, RoleDirectory,
};
use modern_shop_core::docstore::{MemoryDocumentStore, SharedDocumentStore};
use modern_shop_core::identity::UserRecord;
use modern_shop_core::{Email, Role};
use modern_shop_storefront::storage::{MemoryKeyValueStore, SharedKeyValueStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

/// Password used for every account created by [`create_user`].
pub const TEST_PASSWORD: &str = "integration-test-password";

/// A fresh in-memory document store shared by both apps.
#[must_use]
pub fn documents() -> SharedDocumentStore {
    Arc::new(MemoryDocumentStore::new())
}

/// Storefront router over `documents` with an in-memory catalog snapshot.
///
/// Like the binary, the snapshot is refreshed from the document store once
/// at startup; with no published catalog the sample products are kept.
///
/// # Panics
///
/// Panics if the application state cannot be built.
#[allow(clippy::unwrap_used)]
pub async fn storefront(documents: SharedDocumentStore) -> Router {
    use modern_shop_storefront::config::StorefrontConfig;
    use modern_shop_storefront::state::AppState;

    let kv: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
    let state = AppState::new(StorefrontConfig::local("unused"), None, documents, kv, None)
        .await
        .unwrap();
    state
        .catalog()
        .refresh_from(state.documents().as_ref())
        .await
        .unwrap();
    modern_shop_storefront::app::build_router(state, MemoryStore::default())
}

/// Admin router over `documents`, without an image host.
#[must_use]
pub fn admin(documents: &SharedDocumentStore) -> Router {
    use modern_shop_admin::config::AdminConfig;
    use modern_shop_admin::state::AppState;

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(PasswordIdentityProvider::new(Arc::clone(documents)));
    let state = AppState::new(AdminConfig::local(), None, documents, identity, None);
    modern_shop_admin::app::build_router(state, MemoryStore::default())
}

/// Create a password user, optionally granting the admin role.
///
/// # Panics
///
/// Panics if the user cannot be created.
#[allow(clippy::unwrap_used)]
pub async fn create_user(documents: &SharedDocumentStore, email: &str, admin: bool) -> UserRecord {
    let identity = PasswordIdentityProvider::new(Arc::clone(documents));
    let role = if admin { Role::Admin } else { Role::Customer };
    let email = Email::parse(email).unwrap();
    let user = identity.create_user(&email, TEST_PASSWORD, role).await.unwrap();
    if admin {
        RoleDirectory::new(Arc::clone(documents))
            .grant_admin(&user.id, &user.email)
            .await
            .unwrap();
    }
    user
}

/// Response captured by [`TestClient`].
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Decode the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics with the raw body if it is not valid JSON for `T`.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "invalid JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Value of a response header, if present and ASCII.
    #[must_use]
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// In-process client that keeps cookies between requests, like a browser.
pub struct TestClient {
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self {
            router,
            cookies: BTreeMap::new(),
        }
    }

    /// A client with no cookies over the same router.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.router.clone())
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, None).await
    }

    pub async fn delete(&mut self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None, None).await
    }

    pub async fn post_json(&mut self, path: &str, body: &impl Serialize) -> TestResponse {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put_json(&mut self, path: &str, body: &impl Serialize) -> TestResponse {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch_json(&mut self, path: &str, body: &impl Serialize) -> TestResponse {
        self.send_json(Method::PATCH, path, body).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    ///
    /// Values are expected to be URL-safe already.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Method::POST,
            path,
            Some("application/x-www-form-urlencoded"),
            Some(body.into_bytes()),
        )
        .await
    }

    /// POST a raw body with the given content type.
    pub async fn post_bytes(
        &mut self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> TestResponse {
        self.send(Method::POST, path, Some(content_type), Some(body))
            .await
    }

    /// Sign in through the admin login form.
    pub async fn login(&mut self, email: &str) -> TestResponse {
        let email = email.replace('@', "%40");
        self.post_form("/login", &[("email", email.as_str()), ("password", TEST_PASSWORD)])
            .await
    }

    #[allow(clippy::unwrap_used)]
    async fn send_json(&mut self, method: Method, path: &str, body: &impl Serialize) -> TestResponse {
        let body = serde_json::to_vec(body).unwrap();
        self.send(method, path, Some("application/json"), Some(body))
            .await
    }

    #[allow(clippy::unwrap_used)]
    async fn send(
        &mut self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie);
        }
        let request = request
            .body(body.map_or_else(Body::empty, Body::from))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        self.store_cookies(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn store_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                if value.is_empty() {
                    self.cookies.remove(name.trim());
                } else {
                    self.cookies
                        .insert(name.trim().to_string(), value.trim().to_string());
                }
            }
        }
    }
}
