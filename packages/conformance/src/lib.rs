//! Shared helpers for the socialgraph conformance test suite.
//!
//! Provides [`spawn_server`] — binds a `TcpListener` on an ephemeral port,
//! wires up an in-process server over the given storage, and returns the
//! local URL — plus a small signed HTTP client, [`Client`], that acts as a
//! registered user the same way the `sgraph` CLI does.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use reqwest::{Method, Response};
use serde_json::{json, Value};
use socialgraph::{encode_public_key, sign_request, UserId, UserRef};
use socialgraph_api::{ErrorResponse, UserProfile, UserRefList, UserRefPage};
use socialgraph_server::{build_router, MemoryStorage, ServerConfig, Storage};

/// Start an ephemeral in-process server over `storage` and return its base URL.
///
/// The server runs in a background `tokio` task and is bound to an
/// OS-assigned port on `127.0.0.1`, e.g. `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails.
pub async fn spawn_server_with(storage: Arc<dyn Storage>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = ServerConfig {
        bind_addr: addr,
        ..ServerConfig::default()
    };
    let router = build_router(storage, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    format!("http://{addr}")
}

/// Start an ephemeral in-memory server and return `(base_url, storage)`.
///
/// The returned `Arc<MemoryStorage>` is the instance the server uses, so
/// tests can inspect state without going through HTTP.
pub async fn spawn_server() -> (String, Arc<MemoryStorage>) {
    let mem_storage = Arc::new(MemoryStorage::new());
    let storage: Arc<dyn Storage> = Arc::clone(&mem_storage) as Arc<dyn Storage>;
    (spawn_server_with(storage).await, mem_storage)
}

/// An HTTP client acting as one user, with that user's signing key.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    host: String,
    key: Arc<SigningKey>,
    pub id: UserId,
}

impl Client {
    /// Register a fresh user over HTTP and return a client acting as them.
    pub async fn register(base_url: &str, handle: &str) -> Client {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("build HTTP client");
        let key = SigningKey::generate(&mut OsRng);

        let resp = http
            .post(format!("{base_url}/v1/users"))
            .json(&json!({
                "display_name": handle.to_uppercase(),
                "handle": handle,
                "email": format!("{handle}@example.com"),
                "public_key": encode_public_key(&key.verifying_key()),
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status(), 201, "registering {handle}");
        let profile: UserProfile = resp.json().await.expect("profile body");
        let id = profile.id;

        Client {
            http,
            base_url: base_url.to_string(),
            host: base_url.trim_start_matches("http://").to_string(),
            key: Arc::new(key),
            id,
        }
    }

    /// Send a request signed as this user.
    pub async fn signed(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let (date, signature) =
            sign_request(&self.key, &self.id.to_string(), method.as_str(), path, &self.host);
        let mut req = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("host", &self.host)
            .header("date", date)
            .header("signature", signature);
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.expect("signed request")
    }

    /// Send an unsigned request.
    pub async fn unsigned(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.expect("unsigned request")
    }

    pub async fn follow(&self, followee: UserId) -> Response {
        self.signed(
            Method::POST,
            &format!("/v1/users/{}/following", self.id),
            Some(json!({ "followee_id": followee })),
        )
        .await
    }

    pub async fn unfollow(&self, followee: UserId) -> Response {
        self.signed(
            Method::DELETE,
            &format!("/v1/users/{}/following/{followee}", self.id),
            None,
        )
        .await
    }

    /// GET a listing (`following`, `followers`, `mutual`) for `user` and
    /// return the ids in order.
    ///
    /// `mutual` answers with an unpaged [`UserRefList`]; the other two with a
    /// [`UserRefPage`].
    pub async fn list_ids(&self, user: UserId, listing: &str) -> Vec<i64> {
        let resp = self
            .signed(Method::GET, &format!("/v1/users/{user}/{listing}"), None)
            .await;
        assert_eq!(resp.status(), 200, "GET {listing} of {user}");
        let items: Vec<UserRef> = if listing == "mutual" {
            resp.json::<UserRefList>().await.expect("mutual body").items
        } else {
            resp.json::<UserRefPage>().await.expect("page body").items
        };
        items.iter().map(|u| u.id.get()).collect()
    }
}

/// Decode an error body and return its machine-readable `code`.
pub async fn error_code(resp: Response) -> String {
    let body: ErrorResponse = resp.json().await.expect("error body");
    body.code
}
